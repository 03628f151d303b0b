use serde::Deserialize;

use super::{ApiFailure, ErrorClassifier};

/// YouTube Data API: `{"error":{"code":401,"status":"UNAUTHENTICATED","message":"..."}}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct YoutubeClassifier;

#[derive(Debug, Deserialize)]
struct Envelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    status: String,
    message: String,
}

impl ErrorClassifier for YoutubeClassifier {
    fn classify(&self, body: &[u8]) -> Option<ApiFailure> {
        let envelope: Envelope = serde_json::from_slice(body).ok()?;
        let ErrorBody { status, message } = envelope.error;
        Some(match status.as_str() {
            "PERMISSION_DENIED" => ApiFailure::LoginNeeded,
            "UNAUTHENTICATED" => ApiFailure::ExpiredToken,
            _ => ApiFailure::Unknown { status, message },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(body: &str) -> Option<ApiFailure> {
        YoutubeClassifier.classify(body.as_bytes())
    }

    #[test]
    fn status_codes_map_to_failures() {
        assert_eq!(
            classify(r#"{"error":{"code":403,"status":"PERMISSION_DENIED","message":"denied"}}"#),
            Some(ApiFailure::LoginNeeded)
        );
        assert_eq!(
            classify(r#"{"error":{"code":401,"status":"UNAUTHENTICATED","message":"expired"}}"#),
            Some(ApiFailure::ExpiredToken)
        );
        assert_eq!(
            classify(r#"{"error":{"code":400,"status":"INVALID_ARGUMENT","message":"bad q"}}"#),
            Some(ApiFailure::Unknown {
                status: "INVALID_ARGUMENT".into(),
                message: "bad q".into()
            })
        );
    }

    #[test]
    fn numeric_status_is_not_a_youtube_envelope() {
        assert_eq!(classify(r#"{"error":{"status":401,"message":"x"}}"#), None);
    }

    #[test]
    fn search_results_are_not_errors() {
        assert_eq!(
            classify(r#"{"kind":"youtube#searchListResponse","items":[]}"#),
            None
        );
    }
}
