//! Request coordination across token expiry.
//!
//! Every API call goes through [`RequestCoordinator`]. A call that comes back
//! with an expired-token envelope is parked until the session is renewed and
//! then replayed with the fresh token; callers only ever see the final
//! outcome. Renewal is single-flight: however many calls expire at once, one
//! `AuthManager::renew` runs.

mod descriptor;
mod queue;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use bytes::Bytes;
use reqwest::Url;
use serde::de::DeserializeOwned;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::oneshot;
use tracing::{debug, warn};

pub use descriptor::RequestDescriptor;

use queue::{PendingRequest, RenewalQueue};

use crate::auth::{AuthEvent, AuthManager, AuthState};
use crate::classify::{ApiFailure, ErrorClassifier};
use crate::config::CoordinatorSettings;
use crate::error::{ApiError, Result};
use crate::transport::HttpTransport;
use crate::util::timeout::with_timeout;

enum Attempt {
    Done(Result<Bytes>),
    Expired { token: String },
}

enum Parked {
    Queued { start_renewal: bool },
    RetryNow(PendingRequest),
    Resolved,
}

/// Executes API requests for one service, renewing the session when needed.
pub struct RequestCoordinator {
    auth: Arc<AuthManager>,
    transport: Arc<dyn HttpTransport>,
    classifier: Arc<dyn ErrorClassifier>,
    base_url: Url,
    settings: CoordinatorSettings,
    queue: Mutex<RenewalQueue>,
}

impl RequestCoordinator {
    /// Build a coordinator and spawn its auth-event listener.
    ///
    /// Must be called from within a tokio runtime. The listener stops once
    /// the coordinator is dropped.
    pub fn new(
        auth: Arc<AuthManager>,
        transport: Arc<dyn HttpTransport>,
        classifier: Arc<dyn ErrorClassifier>,
        base_url: Url,
        settings: CoordinatorSettings,
    ) -> Arc<Self> {
        let events = auth.subscribe();
        let coordinator = Arc::new(Self {
            auth,
            transport,
            classifier,
            base_url,
            settings,
            queue: Mutex::new(RenewalQueue::default()),
        });
        tokio::spawn(listen(Arc::downgrade(&coordinator), events));
        coordinator
    }

    pub fn auth(&self) -> &Arc<AuthManager> {
        &self.auth
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Requests currently parked behind a renewal.
    pub fn pending_requests(&self) -> usize {
        self.lock_queue().len()
    }

    pub fn renewal_in_flight(&self) -> bool {
        self.lock_queue().is_renewing()
    }

    /// Execute a request and decode its JSON payload.
    pub async fn perform<T: DeserializeOwned>(
        self: &Arc<Self>,
        descriptor: RequestDescriptor,
    ) -> Result<T> {
        let body = self.perform_raw(descriptor).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Execute a request and return the raw success payload.
    pub async fn perform_raw(self: &Arc<Self>, descriptor: RequestDescriptor) -> Result<Bytes> {
        let (slot, rx) = oneshot::channel();
        let request = PendingRequest {
            descriptor,
            requeues: 0,
            slot,
        };
        Arc::clone(self).execute(request).await;
        rx.await.unwrap_or_else(|_| {
            Err(ApiError::RenewalFailed(
                "request was dropped before completing".to_string(),
            ))
        })
    }

    /// Drive one request until it is resolved or parked.
    async fn execute(self: Arc<Self>, mut request: PendingRequest) {
        loop {
            match self.attempt(&request.descriptor).await {
                Attempt::Done(result) => {
                    request.resolve(result);
                    return;
                }
                Attempt::Expired { token } => match self.park(request, &token) {
                    Parked::Queued { start_renewal } => {
                        if start_renewal {
                            self.start_renewal();
                        }
                        return;
                    }
                    Parked::RetryNow(retry) => {
                        debug!(service = %self.auth.label(), "Token already renewed; retrying");
                        request = retry;
                    }
                    Parked::Resolved => return,
                },
            }
        }
    }

    async fn attempt(&self, descriptor: &RequestDescriptor) -> Attempt {
        let url = match descriptor.resolve(&self.base_url) {
            Ok(url) => url,
            Err(err) => return Attempt::Done(Err(err)),
        };
        let token = self.auth.current_token();

        let body = match with_timeout(
            self.settings.request_timeout,
            self.transport.get(&url, &token),
        )
        .await
        {
            Ok(body) => body,
            Err(err) => {
                warn!(service = %self.auth.label(), url = %url, error = %err, "Transport failure");
                return Attempt::Done(Err(err.into()));
            }
        };

        match self.classifier.classify(&body) {
            None => Attempt::Done(Ok(body)),
            Some(ApiFailure::ExpiredToken) => {
                debug!(service = %self.auth.label(), url = %url, "Access token expired");
                Attempt::Expired { token }
            }
            Some(failure) => {
                debug!(service = %self.auth.label(), url = %url, failure = ?failure, "API error");
                Attempt::Done(Err(failure.into()))
            }
        }
    }

    /// Decide what happens to a request whose token expired.
    fn park(&self, mut request: PendingRequest, token_used: &str) -> Parked {
        let mut queue = self.lock_queue();

        if request.requeues > self.settings.max_requeues {
            drop(queue);
            warn!(service = %self.auth.label(), "Token still expired after renewal; giving up");
            request.resolve(Err(ApiError::ExpiredToken));
            return Parked::Resolved;
        }
        request.requeues += 1;

        match self.auth.state() {
            AuthState::LoggedIn(session)
                if !queue.is_renewing() && session.access_token != token_used =>
            {
                return Parked::RetryNow(request);
            }
            AuthState::LoggedIn(_) | AuthState::Renewing(_) => {}
            _ => {
                drop(queue);
                request.resolve(Err(ApiError::LoginNeeded));
                return Parked::Resolved;
            }
        }

        let start_renewal = queue.enqueue(request);
        debug!(
            service = %self.auth.label(),
            pending = queue.len(),
            start_renewal,
            "Request parked until renewal"
        );
        Parked::Queued { start_renewal }
    }

    fn start_renewal(&self) {
        let auth = Arc::clone(&self.auth);
        tokio::spawn(async move {
            // Failures reach the queue through the event stream.
            if let Err(err) = auth.renew().await {
                debug!(service = %auth.label(), error = %err, "Renewal did not complete");
            }
        });
    }

    fn replay_pending(self: &Arc<Self>) {
        let drained = self.lock_queue().drain();
        if drained.is_empty() {
            return;
        }
        debug!(service = %self.auth.label(), count = drained.len(), "Replaying parked requests");
        for request in drained {
            tokio::spawn(Arc::clone(self).execute(request));
        }
    }

    fn fail_pending(&self, error: ApiError) {
        let drained = self.lock_queue().drain();
        if drained.is_empty() {
            return;
        }
        warn!(service = %self.auth.label(), count = drained.len(), error = %error, "Failing parked requests");
        for request in drained {
            request.resolve(Err(error.clone()));
        }
    }

    fn recover_from_lag(self: &Arc<Self>) {
        match self.auth.state() {
            AuthState::LoggedIn(_) => self.replay_pending(),
            AuthState::Renewing(_) => {}
            _ => self.fail_pending(ApiError::LoggedOut),
        }
    }

    fn lock_queue(&self) -> MutexGuard<'_, RenewalQueue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for RequestCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestCoordinator")
            .field("service", &self.auth.label())
            .field("base_url", &self.base_url.as_str())
            .field("settings", &self.settings)
            .finish()
    }
}

async fn listen(coordinator: Weak<RequestCoordinator>, mut events: broadcast::Receiver<AuthEvent>) {
    loop {
        let event = events.recv().await;
        let Some(coordinator) = coordinator.upgrade() else {
            break;
        };
        match event {
            Ok(AuthEvent::Renewed) => coordinator.replay_pending(),
            Ok(AuthEvent::LoggedOut) => coordinator.fail_pending(ApiError::LoggedOut),
            Ok(AuthEvent::AuthFailed { reason }) => {
                coordinator.fail_pending(ApiError::RenewalFailed(reason))
            }
            Ok(AuthEvent::LoggedIn) => {}
            Err(RecvError::Lagged(skipped)) => {
                warn!(service = %coordinator.auth.label(), skipped, "Auth event stream lagged");
                coordinator.recover_from_lag();
            }
            Err(RecvError::Closed) => break,
        }
    }
}
