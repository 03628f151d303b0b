//! Authenticated HTTP transport.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::ACCEPT;
use reqwest::Url;

use crate::error::TransportError;

/// One authenticated GET round trip.
///
/// Returns the raw body whatever the HTTP status: provider errors are
/// recognized from the body by an [`ErrorClassifier`](crate::classify::ErrorClassifier).
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn get(&self, url: &Url, bearer: &str) -> Result<Bytes, TransportError>;
}

/// [`HttpTransport`] backed by a `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    timeout: Duration,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(10)
            .build()
            .map_err(|err| TransportError::Network(err.to_string()))?;
        Ok(Self { client, timeout })
    }

    /// Use a preconfigured client; `timeout` is only reported in errors.
    pub fn with_client(client: reqwest::Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    fn map_error(&self, err: reqwest::Error) -> TransportError {
        if err.is_timeout() {
            TransportError::Timeout(self.timeout.as_millis() as u64)
        } else {
            TransportError::Network(err.to_string())
        }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &Url, bearer: &str) -> Result<Bytes, TransportError> {
        let resp = self
            .client
            .get(url.clone())
            .bearer_auth(bearer)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|err| self.map_error(err))?;

        tracing::trace!(url = %url, status = resp.status().as_u16(), "Response received");
        resp.bytes().await.map_err(|err| self.map_error(err))
    }
}
