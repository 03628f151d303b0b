use thiserror::Error;

/// Normalized authentication errors across identity providers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Not logged in")]
    NotLoggedIn,
    #[error("Already logged in")]
    AlreadyLoggedIn,
    #[error("No login in progress")]
    NoLoginInProgress,
    #[error("Login was cancelled")]
    LoginCancelled,
    #[error("OAuth state mismatch")]
    StateMismatch,
    #[error("Access denied: {0}")]
    AccessDenied(String),
    #[error("Expired or invalid grant")]
    ExpiredOrInvalidGrant,
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<reqwest::Error> for AuthError {
    fn from(error: reqwest::Error) -> Self {
        Self::Network(error.to_string())
    }
}

impl From<std::io::Error> for AuthError {
    fn from(error: std::io::Error) -> Self {
        Self::Io(error.to_string())
    }
}

impl From<serde_json::Error> for AuthError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

impl From<toml::de::Error> for AuthError {
    fn from(error: toml::de::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

impl From<toml::ser::Error> for AuthError {
    fn from(error: toml::ser::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}
