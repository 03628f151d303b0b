use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Credential bundle for one provider.
///
/// Owned by [`AuthManager`](super::AuthManager); callers only ever see copies.
///
/// # Example
/// ```no_run
/// use moodplay::auth::Session;
/// use chrono::{Duration, Utc};
///
/// let session = Session {
///     access_token: "access".to_string(),
///     refresh_token: Some("refresh".to_string()),
///     expires_at: Some(Utc::now() + Duration::hours(1)),
///     scopes: Some(vec!["playlist-read-private".to_string()]),
///     token_type: Some("Bearer".to_string()),
///     last_refresh: Some(Utc::now()),
/// };
/// assert!(session.is_plausible());
/// ```
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub scopes: Option<Vec<String>>,
    pub token_type: Option<String>,
    pub last_refresh: Option<DateTime<Utc>>,
}

impl Session {
    /// A session carrying only an access token.
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            expires_at: None,
            scopes: None,
            token_type: None,
            last_refresh: None,
        }
    }

    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    pub fn with_expires_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Whether a restored session is worth adopting without a round trip.
    ///
    /// Expiry is not checked here: an expired token is renewed lazily on first use.
    pub fn is_plausible(&self) -> bool {
        !self.access_token.trim().is_empty()
    }

    /// Expiry hint; `false` when the provider gave none.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| now >= expires_at)
    }

    /// Time left until the expiry hint, if any.
    pub fn remaining(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.expires_at.map(|expires_at| expires_at - now)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("expires_at", &self.expires_at)
            .field("scopes", &self.scopes)
            .field("token_type", &self.token_type)
            .field("last_refresh", &self.last_refresh)
            .finish()
    }
}
