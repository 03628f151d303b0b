use std::sync::Arc;

use reqwest::Url;
use tokio::sync::{broadcast, oneshot, watch, Mutex};
use tracing::{debug, info, warn};

use super::error::AuthError;
use super::oauth::{IdentityProvider, LoginChallenge};
use super::session::Session;
use super::state::{AuthEvent, AuthState};
use super::store::SessionStore;

const EVENT_CAPACITY: usize = 64;

/// Handle for an interactive login started by [`AuthManager::login`].
#[derive(Debug)]
pub struct PendingLogin {
    pub authorize_url: String,
    pub state: String,
    rx: oneshot::Receiver<Result<Session, AuthError>>,
}

impl PendingLogin {
    /// Resolves once the redirect is handled or the login is superseded.
    pub async fn wait(self) -> Result<Session, AuthError> {
        self.rx.await.unwrap_or(Err(AuthError::LoginCancelled))
    }
}

struct InFlightLogin {
    challenge: LoginChallenge,
    done: oneshot::Sender<Result<Session, AuthError>>,
}

impl InFlightLogin {
    fn finish(self, result: Result<Session, AuthError>) {
        let _ = self.done.send(result);
    }
}

struct Inner {
    /// Bumped by logout and by every new login; a network result captured
    /// under an older epoch is never committed.
    epoch: u64,
    login: Option<InFlightLogin>,
}

/// Owns one provider's session lifecycle.
///
/// Transitions are serialized by an async mutex; readers observe the
/// committed state through a `watch` channel without blocking, and
/// lifecycle notifications go out on a `broadcast` channel.
pub struct AuthManager {
    label: String,
    provider: Arc<dyn IdentityProvider>,
    store: Arc<dyn SessionStore>,
    store_key: String,
    state_tx: watch::Sender<AuthState>,
    events: broadcast::Sender<AuthEvent>,
    inner: Mutex<Inner>,
}

impl AuthManager {
    /// Build a manager and optimistically restore a persisted session.
    ///
    /// A plausible stored session is adopted as-is; expiry is discovered on
    /// first use. Load failures are logged and leave the manager logged out.
    pub fn new(
        label: impl Into<String>,
        provider: Arc<dyn IdentityProvider>,
        store: Arc<dyn SessionStore>,
        store_key: impl Into<String>,
    ) -> Self {
        let label = label.into();
        let store_key = store_key.into();

        let initial = match store.load(&store_key) {
            Ok(Some(session)) if session.is_plausible() => {
                info!(provider = %label, "Restored persisted session");
                AuthState::LoggedIn(session)
            }
            Ok(Some(_)) => {
                warn!(provider = %label, "Ignoring persisted session without an access token");
                AuthState::LoggedOut
            }
            Ok(None) => AuthState::LoggedOut,
            Err(err) => {
                warn!(provider = %label, error = %err, "Failed to load persisted session");
                AuthState::LoggedOut
            }
        };

        let (state_tx, _) = watch::channel(initial);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            label,
            provider,
            store,
            store_key,
            state_tx,
            events,
            inner: Mutex::new(Inner {
                epoch: 0,
                login: None,
            }),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Latest committed access token, or an empty string when logged out.
    pub fn current_token(&self) -> String {
        self.state_tx
            .borrow()
            .session()
            .map(|session| session.access_token.clone())
            .unwrap_or_default()
    }

    pub fn state(&self) -> AuthState {
        self.state_tx.borrow().clone()
    }

    pub fn is_logged_in(&self) -> bool {
        self.state_tx.borrow().is_logged_in()
    }

    pub fn watch_state(&self) -> watch::Receiver<AuthState> {
        self.state_tx.subscribe()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    /// Start an interactive login.
    ///
    /// Supersedes a login that is already waiting for its redirect.
    pub async fn login(&self) -> Result<PendingLogin, AuthError> {
        let mut inner = self.inner.lock().await;
        let logged_in = self.state_tx.borrow().is_logged_in();
        if logged_in {
            return Err(AuthError::AlreadyLoggedIn);
        }

        let challenge = LoginChallenge::generate();
        let authorize_url = self.provider.authorize_url(&challenge)?;

        if let Some(previous) = inner.login.take() {
            debug!(provider = %self.label, "Superseding pending login");
            previous.finish(Err(AuthError::LoginCancelled));
        }

        inner.epoch += 1;
        let (done, rx) = oneshot::channel();
        let state = challenge.state.clone();
        inner.login = Some(InFlightLogin { challenge, done });
        self.set_state(AuthState::LoggingIn);
        info!(provider = %self.label, "Login started");

        Ok(PendingLogin {
            authorize_url,
            state,
            rx,
        })
    }

    /// Complete the in-flight login with the redirect URL delivered by the
    /// identity provider.
    ///
    /// A redirect whose `state` does not match is rejected and the login stays
    /// pending.
    pub async fn handle_redirect(&self, redirect_url: &str) -> Result<Session, AuthError> {
        let parsed = Url::parse(redirect_url)
            .map_err(|err| AuthError::InvalidResponse(format!("Invalid redirect URL: {err}")))?;

        let mut code = None;
        let mut returned_state = None;
        let mut provider_error = None;
        for (key, value) in parsed.query_pairs() {
            match key.as_ref() {
                "code" => code = Some(value.into_owned()),
                "state" => returned_state = Some(value.into_owned()),
                "error" => provider_error = Some(value.into_owned()),
                _ => {}
            }
        }

        let (login, code, epoch) = {
            let mut inner = self.inner.lock().await;
            let login = match inner.login.take() {
                Some(login) => login,
                None => return Err(AuthError::NoLoginInProgress),
            };

            if returned_state.as_deref() != Some(login.challenge.state.as_str()) {
                warn!(provider = %self.label, "Rejected redirect with mismatched state");
                inner.login = Some(login);
                return Err(AuthError::StateMismatch);
            }

            if let Some(reason) = provider_error {
                let err = AuthError::AccessDenied(reason);
                self.fail_login(&err);
                login.finish(Err(err.clone()));
                return Err(err);
            }

            let code = match code {
                Some(code) if !code.is_empty() => code,
                _ => {
                    inner.login = Some(login);
                    return Err(AuthError::InvalidResponse(
                        "Redirect is missing the authorization code".to_string(),
                    ));
                }
            };

            (login, code, inner.epoch)
        };

        let result = self.provider.exchange_code(&code, &login.challenge).await;

        let inner = self.inner.lock().await;
        if inner.epoch != epoch {
            debug!(provider = %self.label, "Discarding superseded login result");
            login.finish(Err(AuthError::LoginCancelled));
            return Err(AuthError::LoginCancelled);
        }

        let committed = result.and_then(|session| {
            self.store.save(&self.store_key, &session)?;
            Ok(session)
        });

        match committed {
            Ok(session) => {
                self.set_state(AuthState::LoggedIn(session.clone()));
                self.emit(AuthEvent::LoggedIn);
                info!(provider = %self.label, "Logged in");
                login.finish(Ok(session.clone()));
                Ok(session)
            }
            Err(err) => {
                self.fail_login(&err);
                login.finish(Err(err.clone()));
                Err(err)
            }
        }
    }

    /// Clear the session in memory and in the store. Idempotent.
    ///
    /// Any renewal or login exchange still on the wire is invalidated.
    pub async fn logout(&self) -> Result<(), AuthError> {
        let mut inner = self.inner.lock().await;
        inner.epoch += 1;
        if let Some(login) = inner.login.take() {
            login.finish(Err(AuthError::LoginCancelled));
        }

        self.set_state(AuthState::LoggedOut);
        let deleted = self.store.delete(&self.store_key);
        if let Err(err) = &deleted {
            warn!(provider = %self.label, error = %err, "Failed to delete persisted session");
        }
        self.emit(AuthEvent::LoggedOut);
        info!(provider = %self.label, "Logged out");
        deleted
    }

    /// Refresh the current session.
    ///
    /// A no-op while another renewal is in flight. Failure logs the provider
    /// out and emits [`AuthEvent::AuthFailed`].
    pub async fn renew(&self) -> Result<(), AuthError> {
        let (session, epoch) = {
            let inner = self.inner.lock().await;
            let current = self.state_tx.borrow().clone();
            match current {
                AuthState::Renewing(_) => {
                    debug!(provider = %self.label, "Renewal already in flight");
                    return Ok(());
                }
                AuthState::LoggedIn(session) => {
                    self.set_state(AuthState::Renewing(session.clone()));
                    (session, inner.epoch)
                }
                other => {
                    debug!(provider = %self.label, state = other.name(), "Cannot renew");
                    self.emit(AuthEvent::AuthFailed {
                        reason: AuthError::NotLoggedIn.to_string(),
                    });
                    return Err(AuthError::NotLoggedIn);
                }
            }
        };

        debug!(provider = %self.label, "Renewing session");
        let result = self.provider.refresh(&session).await;

        let mut inner = self.inner.lock().await;
        if inner.epoch != epoch {
            debug!(provider = %self.label, "Discarding renewal result after logout");
            return Err(AuthError::NotLoggedIn);
        }

        let committed = result.and_then(|renewed| {
            self.store.save(&self.store_key, &renewed)?;
            Ok(renewed)
        });

        match committed {
            Ok(renewed) => {
                self.set_state(AuthState::LoggedIn(renewed));
                self.emit(AuthEvent::Renewed);
                info!(provider = %self.label, "Session renewed");
                Ok(())
            }
            Err(err) => {
                warn!(provider = %self.label, error = %err, "Session renewal failed; logging out");
                inner.epoch += 1;
                self.set_state(AuthState::LoggedOut);
                if let Err(delete_err) = self.store.delete(&self.store_key) {
                    warn!(provider = %self.label, error = %delete_err, "Failed to delete persisted session");
                }
                self.emit(AuthEvent::AuthFailed {
                    reason: err.to_string(),
                });
                Err(err)
            }
        }
    }

    fn fail_login(&self, err: &AuthError) {
        warn!(provider = %self.label, error = %err, "Login failed");
        self.set_state(AuthState::Failed(err.to_string()));
        self.emit(AuthEvent::AuthFailed {
            reason: err.to_string(),
        });
    }

    fn set_state(&self, state: AuthState) {
        debug!(provider = %self.label, state = state.name(), "Auth state changed");
        self.state_tx.send_replace(state);
    }

    fn emit(&self, event: AuthEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

impl std::fmt::Debug for AuthManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthManager")
            .field("label", &self.label)
            .field("store_key", &self.store_key)
            .field("state", &self.state_tx.borrow().name())
            .finish()
    }
}
