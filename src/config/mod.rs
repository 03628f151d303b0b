//! Configuration system (layered: code > env > config file > defaults).

use std::path::{Path, PathBuf};
use std::time::Duration;

use bon::Builder;
use serde::{Deserialize, Serialize};

use crate::auth::{AuthError, SessionStoreConfig};
use crate::service::MusicService;

const SPOTIFY_CLIENT_ID: &str = "2f4647040f594d49a3d0c8369090182c";
const SPOTIFY_AUTHORIZE_URL: &str = "https://accounts.spotify.com/authorize";
const SPOTIFY_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
const SPOTIFY_REDIRECT_URI: &str = "musicmoodplayer://spotify-login-callback";
const SPOTIFY_SCOPES: &[&str] = &[
    "playlist-read-collaborative",
    "playlist-read-private",
    "app-remote-control",
];
const SPOTIFY_API_BASE_URL: &str = "https://api.spotify.com/v1/";

const GOOGLE_AUTHORIZE_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const YOUTUBE_REDIRECT_URI: &str = "musicmoodplayer://youtube-login-callback";
const YOUTUBE_SCOPE: &str = "https://www.googleapis.com/auth/youtube.readonly";
const YOUTUBE_API_BASE_URL: &str = "https://www.googleapis.com/youtube/v3/";

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// OAuth and API endpoints for one music service.
#[derive(Debug, Clone, PartialEq, Eq, Builder, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[builder(into)]
    pub client_id: String,
    #[builder(into)]
    pub client_secret: Option<String>,
    #[builder(into)]
    pub authorize_url: String,
    /// Endpoint for the authorization-code exchange.
    #[builder(into)]
    pub token_url: String,
    /// Endpoint for refresh-token grants; often the same as `token_url`.
    #[builder(into)]
    pub refresh_url: String,
    #[builder(into)]
    pub redirect_uri: String,
    #[builder(default)]
    pub scopes: Vec<String>,
    #[builder(into)]
    pub api_base_url: String,
}

impl ProviderConfig {
    pub fn spotify() -> Self {
        Self::builder()
            .client_id(SPOTIFY_CLIENT_ID)
            .authorize_url(SPOTIFY_AUTHORIZE_URL)
            .token_url(SPOTIFY_TOKEN_URL)
            .refresh_url(SPOTIFY_TOKEN_URL)
            .redirect_uri(SPOTIFY_REDIRECT_URI)
            .scopes(SPOTIFY_SCOPES.iter().map(|s| s.to_string()).collect())
            .api_base_url(SPOTIFY_API_BASE_URL)
            .build()
    }

    /// Google OAuth defaults. There is no public client id; one must be
    /// configured before logging in.
    pub fn youtube() -> Self {
        Self::builder()
            .client_id("")
            .authorize_url(GOOGLE_AUTHORIZE_URL)
            .token_url(GOOGLE_TOKEN_URL)
            .refresh_url(GOOGLE_TOKEN_URL)
            .redirect_uri(YOUTUBE_REDIRECT_URI)
            .scopes(vec![YOUTUBE_SCOPE.to_string()])
            .api_base_url(YOUTUBE_API_BASE_URL)
            .build()
    }

    pub fn for_service(service: MusicService) -> Self {
        match service {
            MusicService::Spotify => Self::spotify(),
            MusicService::YoutubeMusic => Self::youtube(),
        }
    }
}

/// Partial [`ProviderConfig`] as found in a config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderOverrides {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub authorize_url: Option<String>,
    pub token_url: Option<String>,
    pub refresh_url: Option<String>,
    pub redirect_uri: Option<String>,
    pub scopes: Option<Vec<String>>,
    pub api_base_url: Option<String>,
}

impl ProviderOverrides {
    pub fn apply(self, config: &mut ProviderConfig) {
        if let Some(value) = self.client_id {
            config.client_id = value;
        }
        if let Some(value) = self.client_secret {
            config.client_secret = Some(value);
        }
        if let Some(value) = self.authorize_url {
            config.authorize_url = value;
        }
        if let Some(value) = self.token_url {
            config.token_url = value;
        }
        if let Some(value) = self.refresh_url {
            config.refresh_url = value;
        }
        if let Some(value) = self.redirect_uri {
            config.redirect_uri = value;
        }
        if let Some(value) = self.scopes {
            config.scopes = value;
        }
        if let Some(value) = self.api_base_url {
            config.api_base_url = value;
        }
    }
}

/// Tuning for [`RequestCoordinator`](crate::coordinator::RequestCoordinator).
#[derive(Debug, Clone, PartialEq, Eq, Builder)]
pub struct CoordinatorSettings {
    /// Upper bound for one HTTP round trip.
    #[builder(default = Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS))]
    pub request_timeout: Duration,
    /// How many times a request may be parked behind a renewal beyond the
    /// first before it fails with `ExpiredToken`.
    #[builder(default = 1)]
    pub max_requeues: u32,
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self::builder().build()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    session_dir: Option<PathBuf>,
    request_timeout_secs: Option<u64>,
    max_requeues: Option<u32>,
    spotify: ProviderOverrides,
    youtube: ProviderOverrides,
}

/// Complete configuration for both services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoodplayConfig {
    pub spotify: ProviderConfig,
    pub youtube: ProviderConfig,
    pub settings: CoordinatorSettings,
    pub session_dir: PathBuf,
}

impl Default for MoodplayConfig {
    fn default() -> Self {
        Self {
            spotify: ProviderConfig::spotify(),
            youtube: ProviderConfig::youtube(),
            settings: CoordinatorSettings::default(),
            session_dir: SessionStoreConfig::default_dir(),
        }
    }
}

impl MoodplayConfig {
    pub fn provider(&self, service: MusicService) -> &ProviderConfig {
        match service {
            MusicService::Spotify => &self.spotify,
            MusicService::YoutubeMusic => &self.youtube,
        }
    }

    pub fn session_store_config(&self) -> SessionStoreConfig {
        SessionStoreConfig::new(self.session_dir.clone())
    }

    /// Defaults plus environment variables (MOODPLAY_SPOTIFY_CLIENT_ID, etc.).
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        let mut config = Self::default();
        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    /// Config file at the default path, then environment variables on top.
    pub fn load() -> Result<Self, AuthError> {
        let _ = dotenvy::dotenv();
        let mut config = Self::load_from_path(&Self::default_path())?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// `~/.moodplay/config.toml`
    pub fn default_path() -> PathBuf {
        SessionStoreConfig::default_dir().join("config.toml")
    }

    /// Read a TOML config file; a missing file yields the defaults.
    pub fn load_from_path(path: &Path) -> Result<Self, AuthError> {
        let raw = match std::fs::read_to_string(path) {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(err) => return Err(err.into()),
        };
        let file: ConfigFile = toml::from_str(&raw)?;

        let mut config = Self::default();
        if let Some(dir) = file.session_dir {
            config.session_dir = dir;
        }
        if let Some(secs) = file.request_timeout_secs {
            config.settings.request_timeout = Duration::from_secs(secs);
        }
        if let Some(max) = file.max_requeues {
            config.settings.max_requeues = max;
        }
        file.spotify.apply(&mut config.spotify);
        file.youtube.apply(&mut config.youtube);
        Ok(config)
    }

    /// Apply `MOODPLAY_*` overrides read through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        env_overrides("MOODPLAY_SPOTIFY", &lookup).apply(&mut self.spotify);
        env_overrides("MOODPLAY_YOUTUBE", &lookup).apply(&mut self.youtube);

        if let Some(dir) = lookup("MOODPLAY_SESSION_DIR") {
            self.session_dir = PathBuf::from(dir);
        }
        if let Some(raw) = lookup("MOODPLAY_REQUEST_TIMEOUT_SECS") {
            match raw.trim().parse::<u64>() {
                Ok(secs) => self.settings.request_timeout = Duration::from_secs(secs),
                Err(_) => tracing::warn!(value = %raw, "Ignoring invalid MOODPLAY_REQUEST_TIMEOUT_SECS"),
            }
        }
    }
}

fn env_overrides(prefix: &str, lookup: &impl Fn(&str) -> Option<String>) -> ProviderOverrides {
    let var = |name: &str| lookup(&format!("{prefix}_{name}")).filter(|v| !v.trim().is_empty());
    ProviderOverrides {
        client_id: var("CLIENT_ID"),
        client_secret: var("CLIENT_SECRET"),
        authorize_url: var("AUTHORIZE_URL"),
        token_url: var("TOKEN_URL"),
        refresh_url: var("REFRESH_URL"),
        redirect_uri: var("REDIRECT_URI"),
        scopes: var("SCOPES").map(|s| s.split_whitespace().map(str::to_string).collect()),
        api_base_url: var("API_BASE_URL"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn spotify_defaults_match_the_registered_app() {
        let spotify = ProviderConfig::spotify();
        assert_eq!(spotify.client_id, "2f4647040f594d49a3d0c8369090182c");
        assert_eq!(spotify.redirect_uri, "musicmoodplayer://spotify-login-callback");
        assert_eq!(spotify.api_base_url, "https://api.spotify.com/v1/");
        assert_eq!(spotify.scopes.len(), 3);
    }

    #[test]
    fn coordinator_settings_defaults() {
        let settings = CoordinatorSettings::default();
        assert_eq!(settings.request_timeout, Duration::from_secs(30));
        assert_eq!(settings.max_requeues, 1);

        let custom = CoordinatorSettings::builder()
            .request_timeout(Duration::from_millis(200))
            .build();
        assert_eq!(custom.max_requeues, 1);
    }

    #[test]
    fn env_overrides_apply_per_service() {
        let mut config = MoodplayConfig::default();
        config.apply_env(lookup(&[
            ("MOODPLAY_SPOTIFY_CLIENT_ID", "custom-spotify"),
            ("MOODPLAY_SPOTIFY_REFRESH_URL", "https://refresh.example.com/"),
            ("MOODPLAY_YOUTUBE_CLIENT_ID", "custom-google"),
            ("MOODPLAY_YOUTUBE_CLIENT_SECRET", "shh"),
            ("MOODPLAY_SESSION_DIR", "/tmp/moodplay"),
            ("MOODPLAY_REQUEST_TIMEOUT_SECS", "5"),
        ]));

        assert_eq!(config.spotify.client_id, "custom-spotify");
        assert_eq!(config.spotify.refresh_url, "https://refresh.example.com/");
        assert_eq!(config.spotify.token_url, "https://accounts.spotify.com/api/token");
        assert_eq!(config.youtube.client_id, "custom-google");
        assert_eq!(config.youtube.client_secret.as_deref(), Some("shh"));
        assert_eq!(config.session_dir, PathBuf::from("/tmp/moodplay"));
        assert_eq!(config.settings.request_timeout, Duration::from_secs(5));
    }

    #[test]
    fn invalid_timeout_is_ignored() {
        let mut config = MoodplayConfig::default();
        config.apply_env(lookup(&[("MOODPLAY_REQUEST_TIMEOUT_SECS", "soon")]));
        assert_eq!(config.settings.request_timeout, Duration::from_secs(30));
    }

    #[test]
    fn missing_config_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let config = MoodplayConfig::load_from_path(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config, MoodplayConfig::default());
    }

    #[test]
    fn config_file_overrides_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
session_dir = "/var/lib/moodplay"
request_timeout_secs = 10
max_requeues = 2

[youtube]
client_id = "from-file"
scopes = ["a", "b"]
"#,
        )
        .unwrap();

        let config = MoodplayConfig::load_from_path(&path).unwrap();
        assert_eq!(config.session_dir, PathBuf::from("/var/lib/moodplay"));
        assert_eq!(config.settings.request_timeout, Duration::from_secs(10));
        assert_eq!(config.settings.max_requeues, 2);
        assert_eq!(config.youtube.client_id, "from-file");
        assert_eq!(config.youtube.scopes, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(config.spotify, ProviderConfig::spotify());
    }

    #[test]
    fn malformed_config_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "max_requeues = \"many\"").unwrap();
        assert!(matches!(
            MoodplayConfig::load_from_path(&path),
            Err(AuthError::Serialization(_))
        ));
    }
}
