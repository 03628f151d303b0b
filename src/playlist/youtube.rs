use serde::Deserialize;

use super::{non_empty, Playlist, PlaylistProvider};
use crate::coordinator::RequestDescriptor;
use crate::service::MusicService;

const DEFAULT_QUERY: &str = "rock music";
const DEFAULT_MAX_RESULTS: u32 = 5;

/// YouTube Data API playlist search, paginated with `pageToken`.
#[derive(Debug, Clone)]
pub struct YoutubePlaylists {
    query: String,
    max_results: u32,
}

impl YoutubePlaylists {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            max_results: DEFAULT_MAX_RESULTS,
        }
    }

    pub fn with_max_results(mut self, max_results: u32) -> Self {
        self.max_results = max_results;
        self
    }
}

impl Default for YoutubePlaylists {
    fn default() -> Self {
        Self::new(DEFAULT_QUERY)
    }
}

/// `GET /search?type=playlist` response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YoutubeSearchPage {
    next_page_token: Option<String>,
    #[serde(default)]
    items: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    id: ItemId,
    snippet: Option<Snippet>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemId {
    playlist_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snippet {
    title: Option<String>,
    description: Option<String>,
    channel_title: Option<String>,
    thumbnails: Option<Thumbnails>,
}

#[derive(Debug, Deserialize)]
struct Thumbnails {
    default: Option<Thumbnail>,
    medium: Option<Thumbnail>,
    high: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
}

impl Thumbnails {
    fn best(self) -> Option<String> {
        self.high
            .or(self.medium)
            .or(self.default)
            .map(|thumbnail| thumbnail.url)
    }
}

impl PlaylistProvider for YoutubePlaylists {
    type Page = YoutubeSearchPage;

    fn service(&self) -> MusicService {
        MusicService::YoutubeMusic
    }

    fn initial_request(&self) -> RequestDescriptor {
        RequestDescriptor::endpoint("search")
            .with_query("part", "snippet")
            .with_query("type", "playlist")
            .with_query("q", self.query.as_str())
            .with_query("maxResults", self.max_results.to_string())
    }

    fn next_request(&self, page: &Self::Page) -> Option<RequestDescriptor> {
        let token = page.next_page_token.as_deref().filter(|t| !t.is_empty())?;
        Some(self.initial_request().with_query("pageToken", token))
    }

    fn into_items(&self, page: Self::Page) -> Vec<Playlist> {
        page.items
            .into_iter()
            .filter_map(|item| {
                let id = non_empty(item.id.playlist_id)?;
                let snippet = item.snippet;
                let (title, description, channel, thumbnails) = match snippet {
                    Some(s) => (s.title, s.description, s.channel_title, s.thumbnails),
                    None => (None, None, None, None),
                };
                Some(Playlist {
                    external_url: Some(format!("https://www.youtube.com/playlist?list={id}")),
                    title: title.unwrap_or_default(),
                    subtitle: non_empty(description),
                    image_url: thumbnails.and_then(Thumbnails::best),
                    track_count: None,
                    owner: non_empty(channel),
                    service: MusicService::YoutubeMusic,
                    id,
                })
            })
            .collect()
    }
}
