use reqwest::Url;
use serde::Deserialize;

use super::{non_empty, Playlist, PlaylistProvider};
use crate::coordinator::RequestDescriptor;
use crate::service::MusicService;

const DEFAULT_QUERY: &str = "genre:\"rock\"";
const DEFAULT_LIMIT: u32 = 5;

/// Spotify playlist search. Pages are followed through the absolute `next`
/// URL returned with each page.
#[derive(Debug, Clone)]
pub struct SpotifyPlaylists {
    query: String,
    limit: u32,
}

impl SpotifyPlaylists {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            limit: DEFAULT_LIMIT,
        }
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }
}

impl Default for SpotifyPlaylists {
    fn default() -> Self {
        Self::new(DEFAULT_QUERY)
    }
}

/// `GET /search?type=playlist` response.
#[derive(Debug, Deserialize)]
pub struct SpotifySearchPage {
    playlists: PlaylistsPage,
}

#[derive(Debug, Deserialize)]
struct PlaylistsPage {
    next: Option<String>,
    items: Option<Vec<Option<Item>>>,
}

#[derive(Debug, Deserialize)]
struct Item {
    id: Option<String>,
    name: Option<String>,
    description: Option<String>,
    images: Option<Vec<Image>>,
    tracks: Option<Tracks>,
    external_urls: Option<ExternalUrls>,
    owner: Option<Owner>,
}

#[derive(Debug, Deserialize)]
struct Image {
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Tracks {
    total: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ExternalUrls {
    spotify: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Owner {
    display_name: Option<String>,
}

impl PlaylistProvider for SpotifyPlaylists {
    type Page = SpotifySearchPage;

    fn service(&self) -> MusicService {
        MusicService::Spotify
    }

    fn initial_request(&self) -> RequestDescriptor {
        RequestDescriptor::endpoint("search")
            .with_query("q", self.query.as_str())
            .with_query("type", "playlist")
            .with_query("limit", self.limit.to_string())
    }

    fn next_request(&self, page: &Self::Page) -> Option<RequestDescriptor> {
        let next = page.playlists.next.as_deref()?;
        match Url::parse(next) {
            Ok(url) => Some(RequestDescriptor::url(url)),
            Err(err) => {
                tracing::warn!(next, error = %err, "Ignoring malformed Spotify next URL");
                None
            }
        }
    }

    fn into_items(&self, page: Self::Page) -> Vec<Playlist> {
        page.playlists
            .items
            .unwrap_or_default()
            .into_iter()
            .flatten()
            .filter_map(|item| {
                let id = non_empty(item.id)?;
                Some(Playlist {
                    title: item.name.unwrap_or_default(),
                    subtitle: non_empty(item.description),
                    image_url: item
                        .images
                        .and_then(|images| images.into_iter().find_map(|image| image.url)),
                    external_url: item.external_urls.and_then(|urls| urls.spotify),
                    track_count: item.tracks.and_then(|tracks| tracks.total),
                    owner: item.owner.and_then(|owner| owner.display_name),
                    service: MusicService::Spotify,
                    id,
                })
            })
            .collect()
    }
}
