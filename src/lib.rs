//! Moodplay: session-authenticated access to music streaming APIs.
//!
//! Each service gets an [`auth::AuthManager`] that owns the OAuth session
//! and a [`coordinator::RequestCoordinator`] that runs API calls through it,
//! transparently renewing an expired token and replaying the calls that hit
//! it. Playlist feeds sit on top of the coordinator.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use moodplay::auth::FileSessionStore;
//! use moodplay::config::MoodplayConfig;
//! use moodplay::service::StreamService;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = MoodplayConfig::from_env();
//! let store = Arc::new(FileSessionStore::new(config.session_store_config()));
//! let spotify = StreamService::spotify(&config, store)?;
//! for playlist in spotify.load_playlists().await? {
//!     println!("{}", playlist.title);
//! }
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod classify;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod playlist;
pub mod service;
pub mod transport;
pub mod util;

#[cfg(feature = "cli")]
pub mod cli;
