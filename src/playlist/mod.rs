//! Paginated, deduplicated playlist feeds on top of the request coordinator.

mod spotify;
mod youtube;

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

pub use spotify::{SpotifyPlaylists, SpotifySearchPage};
pub use youtube::{YoutubePlaylists, YoutubeSearchPage};

use crate::coordinator::{RequestCoordinator, RequestDescriptor};
use crate::error::ApiError;
use crate::service::MusicService;

/// A playlist normalized across services.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Playlist {
    pub id: String,
    pub service: MusicService,
    pub title: String,
    pub subtitle: Option<String>,
    pub image_url: Option<String>,
    pub external_url: Option<String>,
    pub track_count: Option<u32>,
    pub owner: Option<String>,
}

/// Service-specific half of a playlist feed: how to ask for pages and how
/// to read them.
pub trait PlaylistProvider: Send + Sync {
    type Page: DeserializeOwned + Send;

    fn service(&self) -> MusicService;

    fn initial_request(&self) -> RequestDescriptor;

    /// `None` when `page` is the last one.
    fn next_request(&self, page: &Self::Page) -> Option<RequestDescriptor>;

    fn into_items(&self, page: Self::Page) -> Vec<Playlist>;
}

#[derive(Debug, Clone)]
enum Cursor {
    Start,
    Next(RequestDescriptor),
    Exhausted,
}

/// Object-safe view of a [`PlaylistFeed`].
#[async_trait]
pub trait PlaylistSource: Send {
    fn service(&self) -> MusicService;

    async fn load_next_page(&mut self) -> Result<Vec<Playlist>, ApiError>;

    fn is_exhausted(&self) -> bool;

    fn reset(&mut self);
}

/// Pagination state for one query.
///
/// Items whose id was already returned by an earlier page are filtered out.
pub struct PlaylistFeed<P> {
    provider: P,
    coordinator: Arc<RequestCoordinator>,
    cursor: Cursor,
    seen: HashSet<String>,
}

impl<P: PlaylistProvider> PlaylistFeed<P> {
    pub fn new(provider: P, coordinator: Arc<RequestCoordinator>) -> Self {
        Self {
            provider,
            coordinator,
            cursor: Cursor::Start,
            seen: HashSet::new(),
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Fetch the next page. Once the last page has been read this returns an
    /// empty list without making a request. On error the cursor is left in
    /// place so the same page can be retried.
    pub async fn load_next_page(&mut self) -> Result<Vec<Playlist>, ApiError> {
        let descriptor = match &self.cursor {
            Cursor::Start => self.provider.initial_request(),
            Cursor::Next(descriptor) => descriptor.clone(),
            Cursor::Exhausted => return Ok(Vec::new()),
        };

        let page: P::Page = self.coordinator.perform(descriptor).await?;

        self.cursor = match self.provider.next_request(&page) {
            Some(next) => Cursor::Next(next),
            None => Cursor::Exhausted,
        };

        let items = self.provider.into_items(page);
        let total = items.len();
        let fresh: Vec<Playlist> = items
            .into_iter()
            .filter(|item| self.seen.insert(item.id.clone()))
            .collect();
        tracing::debug!(
            service = %self.provider.service(),
            received = total,
            fresh = fresh.len(),
            exhausted = self.is_exhausted(),
            "Loaded playlist page"
        );
        Ok(fresh)
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self.cursor, Cursor::Exhausted)
    }

    /// Start over from the first page and forget seen ids.
    pub fn reset(&mut self) {
        self.cursor = Cursor::Start;
        self.seen.clear();
    }
}

#[async_trait]
impl<P: PlaylistProvider + 'static> PlaylistSource for PlaylistFeed<P> {
    fn service(&self) -> MusicService {
        self.provider.service()
    }

    async fn load_next_page(&mut self) -> Result<Vec<Playlist>, ApiError> {
        PlaylistFeed::load_next_page(self).await
    }

    fn is_exhausted(&self) -> bool {
        PlaylistFeed::is_exhausted(self)
    }

    fn reset(&mut self) {
        PlaylistFeed::reset(self)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
