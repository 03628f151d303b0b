//! Music services and their assembled auth + request stacks.

use std::sync::Arc;

use reqwest::Url;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tokio::sync::{watch, Mutex};

use crate::auth::{
    AuthError, AuthManager, AuthState, IdentityProvider, OAuthClient, PendingLogin, Session,
    SessionStore,
};
use crate::classify;
use crate::config::{CoordinatorSettings, MoodplayConfig};
use crate::coordinator::RequestCoordinator;
use crate::error::ApiError;
use crate::playlist::{Playlist, PlaylistFeed, PlaylistSource, SpotifyPlaylists, YoutubePlaylists};
use crate::transport::{HttpTransport, ReqwestTransport};

/// Supported streaming services.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
#[serde(rename_all = "kebab-case")]
pub enum MusicService {
    Spotify,
    #[strum(to_string = "youtube-music", serialize = "youtube", serialize = "yt")]
    YoutubeMusic,
}

impl MusicService {
    pub const ALL: [MusicService; 2] = [MusicService::Spotify, MusicService::YoutubeMusic];

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Spotify => "Spotify",
            Self::YoutubeMusic => "Youtube Music",
        }
    }

    /// Key under which the session is persisted.
    pub fn store_key(&self) -> &'static str {
        match self {
            Self::Spotify => "spotify_session",
            Self::YoutubeMusic => "youtube_session",
        }
    }

    /// Host of the app-scheme redirect URL for this service.
    pub fn callback_host(&self) -> &'static str {
        match self {
            Self::Spotify => "spotify-login-callback",
            Self::YoutubeMusic => "youtube-login-callback",
        }
    }

    /// Route a login redirect URL to the service it belongs to.
    pub fn from_callback_url(url: &str) -> Option<Self> {
        let parsed = Url::parse(url).ok()?;
        let host = parsed.host_str()?;
        Self::ALL
            .into_iter()
            .find(|service| service.callback_host().eq_ignore_ascii_case(host))
    }
}

/// One service's auth manager and request coordinator, wired together.
pub struct StreamService {
    service: MusicService,
    auth: Arc<AuthManager>,
    coordinator: Arc<RequestCoordinator>,
    default_feed: Mutex<Box<dyn PlaylistSource>>,
}

impl StreamService {
    /// Build the stack for `service` from configuration.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(
        service: MusicService,
        config: &MoodplayConfig,
        store: Arc<dyn SessionStore>,
    ) -> Result<Self, ApiError> {
        let provider_config = config.provider(service).clone();
        let base_url = Url::parse(&provider_config.api_base_url).map_err(|err| {
            ApiError::InvalidRequest(format!(
                "Invalid API base URL {}: {err}",
                provider_config.api_base_url
            ))
        })?;
        let transport = ReqwestTransport::new(config.settings.request_timeout)?;
        let identity = OAuthClient::new(provider_config);

        Ok(Self::with_parts(
            service,
            Arc::new(identity),
            store,
            Arc::new(transport),
            base_url,
            config.settings.clone(),
        ))
    }

    pub fn spotify(
        config: &MoodplayConfig,
        store: Arc<dyn SessionStore>,
    ) -> Result<Self, ApiError> {
        Self::new(MusicService::Spotify, config, store)
    }

    pub fn youtube(
        config: &MoodplayConfig,
        store: Arc<dyn SessionStore>,
    ) -> Result<Self, ApiError> {
        Self::new(MusicService::YoutubeMusic, config, store)
    }

    /// Assemble from explicit parts.
    pub fn with_parts(
        service: MusicService,
        identity: Arc<dyn IdentityProvider>,
        store: Arc<dyn SessionStore>,
        transport: Arc<dyn HttpTransport>,
        base_url: Url,
        settings: CoordinatorSettings,
    ) -> Self {
        let auth = Arc::new(AuthManager::new(
            service.display_name(),
            identity,
            store,
            service.store_key(),
        ));
        let coordinator = RequestCoordinator::new(
            Arc::clone(&auth),
            transport,
            classify::for_service(service),
            base_url,
            settings,
        );
        let default_feed = Mutex::new(default_feed(service, Arc::clone(&coordinator)));
        Self {
            service,
            auth,
            coordinator,
            default_feed,
        }
    }

    pub fn service(&self) -> MusicService {
        self.service
    }

    pub fn auth(&self) -> &Arc<AuthManager> {
        &self.auth
    }

    pub fn coordinator(&self) -> &Arc<RequestCoordinator> {
        &self.coordinator
    }

    pub async fn login(&self) -> Result<PendingLogin, AuthError> {
        self.auth.login().await
    }

    pub async fn handle_redirect(&self, url: &str) -> Result<Session, AuthError> {
        self.auth.handle_redirect(url).await
    }

    /// Log out and start the default feed over.
    pub async fn logout(&self) -> Result<(), AuthError> {
        let result = self.auth.logout().await;
        self.default_feed.lock().await.reset();
        result
    }

    pub fn is_logged_in(&self) -> bool {
        self.auth.is_logged_in()
    }

    pub fn watch_state(&self) -> watch::Receiver<AuthState> {
        self.auth.watch_state()
    }

    /// A fresh feed for `query`.
    pub fn playlists(&self, query: &str) -> Box<dyn PlaylistSource> {
        let coordinator = Arc::clone(&self.coordinator);
        match self.service {
            MusicService::Spotify => {
                Box::new(PlaylistFeed::new(SpotifyPlaylists::new(query), coordinator))
            }
            MusicService::YoutubeMusic => {
                Box::new(PlaylistFeed::new(YoutubePlaylists::new(query), coordinator))
            }
        }
    }

    /// Next page of the service's default feed.
    pub async fn load_playlists(&self) -> Result<Vec<Playlist>, ApiError> {
        self.default_feed.lock().await.load_next_page().await
    }
}

impl std::fmt::Debug for StreamService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamService")
            .field("service", &self.service)
            .field("auth", &self.auth)
            .finish()
    }
}

fn default_feed(
    service: MusicService,
    coordinator: Arc<RequestCoordinator>,
) -> Box<dyn PlaylistSource> {
    match service {
        MusicService::Spotify => {
            Box::new(PlaylistFeed::new(SpotifyPlaylists::default(), coordinator))
        }
        MusicService::YoutubeMusic => {
            Box::new(PlaylistFeed::new(YoutubePlaylists::default(), coordinator))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn parses_aliases_case_insensitively() {
        assert_eq!(MusicService::from_str("spotify").unwrap(), MusicService::Spotify);
        assert_eq!(MusicService::from_str("Spotify").unwrap(), MusicService::Spotify);
        assert_eq!(
            MusicService::from_str("youtube-music").unwrap(),
            MusicService::YoutubeMusic
        );
        assert_eq!(MusicService::from_str("YT").unwrap(), MusicService::YoutubeMusic);
        assert_eq!(MusicService::from_str("youtube").unwrap(), MusicService::YoutubeMusic);
        assert!(MusicService::from_str("apple-music").is_err());
    }

    #[test]
    fn display_uses_canonical_names() {
        assert_eq!(MusicService::Spotify.to_string(), "spotify");
        assert_eq!(MusicService::YoutubeMusic.to_string(), "youtube-music");
    }

    #[test]
    fn callback_urls_route_to_their_service() {
        assert_eq!(
            MusicService::from_callback_url("musicmoodplayer://spotify-login-callback?code=abc"),
            Some(MusicService::Spotify)
        );
        assert_eq!(
            MusicService::from_callback_url("musicmoodplayer://youtube-login-callback?code=abc"),
            Some(MusicService::YoutubeMusic)
        );
        assert_eq!(MusicService::from_callback_url("musicmoodplayer://other"), None);
        assert_eq!(MusicService::from_callback_url("not a url"), None);
    }

    #[test]
    fn store_keys_are_distinct() {
        assert_ne!(
            MusicService::Spotify.store_key(),
            MusicService::YoutubeMusic.store_key()
        );
    }
}
