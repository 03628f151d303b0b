//! Provider error-envelope classification.
//!
//! Providers answer failed calls with a JSON envelope instead of (or in
//! addition to) an HTTP status, so classification looks at the body only.

mod spotify;
mod youtube;

use std::sync::Arc;

pub use spotify::SpotifyClassifier;
pub use youtube::YoutubeClassifier;

use crate::service::MusicService;

/// Recognized provider failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiFailure {
    /// The caller has no usable session; renewal cannot help.
    LoginNeeded,
    /// The token was valid once; a renewal should fix it.
    ExpiredToken,
    Unknown { status: String, message: String },
}

/// Decide whether a response body is a provider error.
pub trait ErrorClassifier: Send + Sync {
    /// `None` when the bytes are not an error envelope, in which case they
    /// are the success payload.
    fn classify(&self, body: &[u8]) -> Option<ApiFailure>;
}

/// Classifier for the given service.
pub fn for_service(service: MusicService) -> Arc<dyn ErrorClassifier> {
    match service {
        MusicService::Spotify => Arc::new(SpotifyClassifier),
        MusicService::YoutubeMusic => Arc::new(YoutubeClassifier),
    }
}
