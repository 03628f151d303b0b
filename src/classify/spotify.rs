use serde::Deserialize;

use super::{ApiFailure, ErrorClassifier};

const NO_TOKEN: &str = "No token provided";
const BEARER_ONLY: &str = "Only valid bearer authentication supported";
const TOKEN_EXPIRED: &str = "The access token expired";

/// Spotify Web API: `{"error":{"status":401,"message":"..."}}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpotifyClassifier;

#[derive(Debug, Deserialize)]
struct Envelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    status: i64,
    message: String,
}

impl ErrorClassifier for SpotifyClassifier {
    fn classify(&self, body: &[u8]) -> Option<ApiFailure> {
        let envelope: Envelope = serde_json::from_slice(body).ok()?;
        let ErrorBody { status, message } = envelope.error;
        Some(match message.as_str() {
            NO_TOKEN | BEARER_ONLY => ApiFailure::LoginNeeded,
            TOKEN_EXPIRED => ApiFailure::ExpiredToken,
            _ => ApiFailure::Unknown {
                status: status.to_string(),
                message,
            },
        })
    }
}
