use super::session::Session;

/// Lifecycle of one provider's session.
///
/// Exactly one value is live at a time; [`AuthManager`](super::AuthManager)
/// owns every transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    LoggedOut,
    LoggingIn,
    LoggedIn(Session),
    /// A renewal is on the wire; the old session is still attached to requests.
    Renewing(Session),
    Failed(String),
}

impl AuthState {
    pub fn session(&self) -> Option<&Session> {
        match self {
            Self::LoggedIn(session) | Self::Renewing(session) => Some(session),
            _ => None,
        }
    }

    pub fn is_logged_in(&self) -> bool {
        self.session().is_some()
    }

    pub fn is_renewing(&self) -> bool {
        matches!(self, Self::Renewing(_))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::LoggedOut => "logged_out",
            Self::LoggingIn => "logging_in",
            Self::LoggedIn(_) => "logged_in",
            Self::Renewing(_) => "renewing",
            Self::Failed(_) => "failed",
        }
    }
}

/// Notifications published by [`AuthManager`](super::AuthManager).
///
/// `Renewed` is distinct from `LoggedIn`: only a renewal replays queued requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    LoggedIn,
    Renewed,
    LoggedOut,
    AuthFailed { reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renewing_still_counts_as_logged_in() {
        let state = AuthState::Renewing(Session::new("old"));
        assert!(state.is_logged_in());
        assert!(state.is_renewing());
        assert_eq!(state.session().map(|s| s.access_token.as_str()), Some("old"));
    }

    #[test]
    fn failed_and_logged_out_carry_no_session() {
        assert!(AuthState::LoggedOut.session().is_none());
        assert!(AuthState::LoggingIn.session().is_none());
        assert!(AuthState::Failed("denied".into()).session().is_none());
        assert_eq!(AuthState::Failed("denied".into()).name(), "failed");
    }
}
