//! Error types for API calls made through the request coordinator.

use thiserror::Error;

use crate::classify::ApiFailure;

/// Failure of a single HTTP round trip. Never retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Timeout after {0}ms")]
    Timeout(u64),
}

/// Primary error type for coordinated API calls.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Login needed")]
    LoginNeeded,

    #[error("Access token expired")]
    ExpiredToken,

    #[error("API error (status {status}): {message}")]
    Unknown { status: String, message: String },

    #[error("Session renewal failed: {0}")]
    RenewalFailed(String),

    #[error("Logged out before the request could be replayed")]
    LoggedOut,

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Broad error category for routing recovery logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Timeout,
    Authentication,
    Api,
    Serialization,
    Configuration,
}

/// Suggested recovery action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoverySuggestion {
    Login,
    RetryLater,
    CheckRequest,
    ContactSupport,
}

impl ApiError {
    /// Classify this error into a category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Transport(TransportError::Network(_)) => ErrorCategory::Network,
            Self::Transport(TransportError::Timeout(_)) => ErrorCategory::Timeout,
            Self::LoginNeeded | Self::ExpiredToken | Self::RenewalFailed(_) | Self::LoggedOut => {
                ErrorCategory::Authentication
            }
            Self::Unknown { .. } => ErrorCategory::Api,
            Self::Decode(_) => ErrorCategory::Serialization,
            Self::InvalidRequest(_) => ErrorCategory::Configuration,
        }
    }

    /// Whether the coordinator recovers from this error on its own.
    ///
    /// Only an expired token is ever retried, and only behind a renewal.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ExpiredToken)
    }

    /// Suggest recovery actions.
    pub fn recovery_suggestion(&self) -> RecoverySuggestion {
        match self.category() {
            ErrorCategory::Authentication => RecoverySuggestion::Login,
            ErrorCategory::Network | ErrorCategory::Timeout => RecoverySuggestion::RetryLater,
            ErrorCategory::Configuration => RecoverySuggestion::CheckRequest,
            ErrorCategory::Api | ErrorCategory::Serialization => {
                RecoverySuggestion::ContactSupport
            }
        }
    }
}

impl From<ApiFailure> for ApiError {
    fn from(failure: ApiFailure) -> Self {
        match failure {
            ApiFailure::LoginNeeded => Self::LoginNeeded,
            ApiFailure::ExpiredToken => Self::ExpiredToken,
            ApiFailure::Unknown { status, message } => Self::Unknown { status, message },
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(error: serde_json::Error) -> Self {
        Self::Decode(error.to_string())
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, ApiError>;
