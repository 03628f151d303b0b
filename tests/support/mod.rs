#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use moodplay::auth::{
    AuthError, AuthManager, IdentityProvider, LoginChallenge, Session, SessionStore,
};
use moodplay::classify::SpotifyClassifier;
use moodplay::config::CoordinatorSettings;
use moodplay::coordinator::RequestCoordinator;
use moodplay::transport::ReqwestTransport;
use reqwest::Url;
use tokio::sync::Semaphore;
use wiremock::MockServer;

pub const STORE_KEY: &str = "spotify_session";

#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: Mutex<HashMap<String, Session>>,
    fail_saves: AtomicBool,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seeded(key: &str, session: Session) -> Self {
        let store = Self::new();
        store.seed(key, session);
        store
    }

    pub fn seed(&self, key: &str, session: Session) {
        self.sessions
            .lock()
            .expect("store lock poisoned")
            .insert(key.to_string(), session);
    }

    pub fn get(&self, key: &str) -> Option<Session> {
        self.sessions
            .lock()
            .expect("store lock poisoned")
            .get(key)
            .cloned()
    }

    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }
}

impl SessionStore for InMemorySessionStore {
    fn load(&self, key: &str) -> Result<Option<Session>, AuthError> {
        Ok(self.get(key))
    }

    fn save(&self, key: &str, session: &Session) -> Result<(), AuthError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(AuthError::Io("disk full".to_string()));
        }
        self.seed(key, session.clone());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), AuthError> {
        self.sessions
            .lock()
            .expect("store lock poisoned")
            .remove(key);
        Ok(())
    }
}

/// Identity provider with scripted results and call counters.
///
/// Refreshes block on `gate` when one is installed; each refresh consumes
/// one permit.
#[derive(Default)]
pub struct ScriptedIdentity {
    refreshes: AtomicUsize,
    finished_refreshes: AtomicUsize,
    exchanges: AtomicUsize,
    refresh_results: Mutex<VecDeque<Result<Session, AuthError>>>,
    exchange_results: Mutex<VecDeque<Result<Session, AuthError>>>,
    gate: Option<Arc<Semaphore>>,
}

impl ScriptedIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refreshes wait until the returned semaphore is given permits.
    pub fn gated() -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        let identity = Self {
            gate: Some(Arc::clone(&gate)),
            ..Self::default()
        };
        (identity, gate)
    }

    pub fn push_refresh(&self, result: Result<Session, AuthError>) {
        self.refresh_results
            .lock()
            .expect("lock poisoned")
            .push_back(result);
    }

    pub fn push_exchange(&self, result: Result<Session, AuthError>) {
        self.exchange_results
            .lock()
            .expect("lock poisoned")
            .push_back(result);
    }

    pub fn refreshes(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }

    pub fn finished_refreshes(&self) -> usize {
        self.finished_refreshes.load(Ordering::SeqCst)
    }

    pub fn exchanges(&self) -> usize {
        self.exchanges.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityProvider for ScriptedIdentity {
    fn authorize_url(&self, challenge: &LoginChallenge) -> Result<String, AuthError> {
        Ok(format!(
            "https://accounts.example.com/authorize?state={}&code_challenge={}",
            challenge.state, challenge.code_challenge
        ))
    }

    async fn exchange_code(
        &self,
        code: &str,
        _challenge: &LoginChallenge,
    ) -> Result<Session, AuthError> {
        self.exchanges.fetch_add(1, Ordering::SeqCst);
        let scripted = self
            .exchange_results
            .lock()
            .expect("lock poisoned")
            .pop_front();
        scripted.unwrap_or_else(|| Ok(Session::new(format!("code-{code}")).with_refresh_token("r")))
    }

    async fn refresh(&self, _session: &Session) -> Result<Session, AuthError> {
        let n = self.refreshes.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(gate) = &self.gate {
            gate.acquire().await.expect("gate closed").forget();
        }
        let scripted = self
            .refresh_results
            .lock()
            .expect("lock poisoned")
            .pop_front();
        self.finished_refreshes.fetch_add(1, Ordering::SeqCst);
        scripted.unwrap_or_else(|| {
            Ok(Session::new(format!("renewed-{n}")).with_refresh_token("refresh"))
        })
    }
}

pub fn session(token: &str) -> Session {
    Session::new(token).with_refresh_token("refresh")
}

pub fn manager(store: Arc<InMemorySessionStore>, identity: Arc<ScriptedIdentity>) -> Arc<AuthManager> {
    Arc::new(AuthManager::new("Spotify", identity, store, STORE_KEY))
}

pub fn spotify_base(server: &MockServer) -> Url {
    Url::parse(&format!("{}/v1/", server.uri())).expect("mock server url")
}

pub fn spotify_coordinator(
    auth: Arc<AuthManager>,
    server: &MockServer,
    settings: CoordinatorSettings,
) -> Arc<RequestCoordinator> {
    let transport = ReqwestTransport::new(Duration::from_secs(5)).expect("transport");
    RequestCoordinator::new(
        auth,
        Arc::new(transport),
        Arc::new(SpotifyClassifier),
        spotify_base(server),
        settings,
    )
}

pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

pub fn spotify_error(status: u16, message: &str) -> serde_json::Value {
    serde_json::json!({ "error": { "status": status, "message": message } })
}
