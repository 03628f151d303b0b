use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{Duration, Utc};
use reqwest::Url;
use serde::Deserialize;
use sha2::{Digest, Sha256};

use super::error::AuthError;
use super::session::Session;
use crate::config::ProviderConfig;

/// Per-login PKCE material. A fresh challenge is generated for every login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginChallenge {
    pub state: String,
    pub code_verifier: String,
    pub code_challenge: String,
}

impl LoginChallenge {
    pub fn generate() -> Self {
        let code_verifier = URL_SAFE_NO_PAD.encode(random_bytes::<32>());
        let code_challenge = compute_code_challenge(&code_verifier);
        Self {
            state: URL_SAFE_NO_PAD.encode(random_bytes::<16>()),
            code_verifier,
            code_challenge,
        }
    }
}

/// Identity provider seam used by [`AuthManager`](super::AuthManager).
///
/// Implementations perform network I/O only; they never touch the store or
/// the auth state.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Browser URL that starts the interactive login.
    fn authorize_url(&self, challenge: &LoginChallenge) -> Result<String, AuthError>;

    /// Exchange the authorization code delivered by the redirect for a session.
    async fn exchange_code(
        &self,
        code: &str,
        challenge: &LoginChallenge,
    ) -> Result<Session, AuthError>;

    /// Obtain a fresh session from the refresh token of `session`.
    async fn refresh(&self, session: &Session) -> Result<Session, AuthError>;
}

/// OAuth 2.0 authorization-code client with PKCE (S256).
///
/// # Example
/// ```no_run
/// use moodplay::auth::{IdentityProvider, LoginChallenge, OAuthClient};
/// use moodplay::config::ProviderConfig;
///
/// let client = OAuthClient::new(ProviderConfig::spotify());
/// let url = client.authorize_url(&LoginChallenge::generate())?;
/// println!("open {url}");
/// # Ok::<(), moodplay::auth::AuthError>(())
/// ```
#[derive(Debug, Clone)]
pub struct OAuthClient {
    client: reqwest::Client,
    config: ProviderConfig,
}

impl OAuthClient {
    pub fn new(config: ProviderConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    fn client_id(&self) -> Result<&str, AuthError> {
        let client_id = self.config.client_id.trim();
        if client_id.is_empty() {
            return Err(AuthError::Configuration(
                "OAuth client id is not configured".to_string(),
            ));
        }
        Ok(client_id)
    }

    async fn post_token_form(
        &self,
        url: &str,
        mut form: Vec<(&str, String)>,
    ) -> Result<TokenResponse, AuthError> {
        if let Some(secret) = self.config.client_secret.as_deref() {
            form.push(("client_secret", secret.to_string()));
        }

        let resp = self
            .client
            .post(url)
            .header("Accept", "application/json")
            .form(&form)
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            return Err(token_error(status.as_u16(), &body));
        }

        serde_json::from_str::<TokenResponse>(&body).map_err(|err| {
            AuthError::InvalidResponse(format!("Malformed token response: {err}"))
        })
    }
}

#[async_trait]
impl IdentityProvider for OAuthClient {
    fn authorize_url(&self, challenge: &LoginChallenge) -> Result<String, AuthError> {
        let client_id = self.client_id()?;
        let scope = self.config.scopes.join(" ");
        let url = Url::parse_with_params(
            &self.config.authorize_url,
            &[
                ("client_id", client_id),
                ("response_type", "code"),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("scope", scope.as_str()),
                ("state", challenge.state.as_str()),
                ("code_challenge", challenge.code_challenge.as_str()),
                ("code_challenge_method", "S256"),
            ],
        )
        .map_err(|err| AuthError::Configuration(format!("Invalid authorize URL: {err}")))?;
        Ok(url.to_string())
    }

    async fn exchange_code(
        &self,
        code: &str,
        challenge: &LoginChallenge,
    ) -> Result<Session, AuthError> {
        let client_id = self.client_id()?.to_string();
        let payload = self
            .post_token_form(
                &self.config.token_url,
                vec![
                    ("grant_type", "authorization_code".to_string()),
                    ("client_id", client_id),
                    ("code", code.to_string()),
                    ("redirect_uri", self.config.redirect_uri.clone()),
                    ("code_verifier", challenge.code_verifier.clone()),
                ],
            )
            .await?;
        Ok(payload.into_session(None))
    }

    async fn refresh(&self, session: &Session) -> Result<Session, AuthError> {
        let refresh_token = session
            .refresh_token
            .as_ref()
            .ok_or(AuthError::ExpiredOrInvalidGrant)?;
        let client_id = self.client_id()?.to_string();

        let payload = self
            .post_token_form(
                &self.config.refresh_url,
                vec![
                    ("grant_type", "refresh_token".to_string()),
                    ("client_id", client_id),
                    ("refresh_token", refresh_token.clone()),
                ],
            )
            .await?;
        Ok(payload.into_session(Some(refresh_token)))
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    token_type: Option<String>,
    expires_in: Option<i64>,
    refresh_token: Option<String>,
    scope: Option<String>,
}

impl TokenResponse {
    fn into_session(self, previous_refresh: Option<&String>) -> Session {
        let now = Utc::now();
        Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token.or_else(|| previous_refresh.cloned()),
            expires_at: self.expires_in.map(|secs| now + Duration::seconds(secs)),
            scopes: self
                .scope
                .map(|scope| scope.split_whitespace().map(str::to_string).collect()),
            token_type: self.token_type,
            last_refresh: Some(now),
        }
    }
}

#[derive(Debug, Deserialize)]
struct OAuthErrorBody {
    error: String,
    error_description: Option<String>,
}

fn token_error(status: u16, body: &str) -> AuthError {
    match serde_json::from_str::<OAuthErrorBody>(body) {
        Ok(err) if err.error == "invalid_grant" => AuthError::ExpiredOrInvalidGrant,
        Ok(err) => AuthError::InvalidResponse(match err.error_description {
            Some(description) => format!("{}: {description}", err.error),
            None => err.error,
        }),
        Err(_) => AuthError::InvalidResponse(format!(
            "Token request failed with status {status}"
        )),
    }
}

fn random_bytes<const N: usize>() -> [u8; N] {
    let mut buf = [0u8; N];
    for chunk in buf.chunks_mut(16) {
        let id = uuid::Uuid::new_v4();
        let len = chunk.len();
        chunk.copy_from_slice(&id.as_bytes()[..len]);
    }
    buf
}

fn compute_code_challenge(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}
