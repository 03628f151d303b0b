//! CLI entry point for moodplay.

pub mod auth;
pub mod playlists;

use clap::{Parser, Subcommand};

use crate::service::MusicService;

/// Moodplay CLI
#[derive(Parser, Debug)]
#[command(name = "moodplay", version, about = "Moodplay: music service sessions and playlists")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Authentication management
    Auth(AuthArgs),
    /// Browse playlists from a service
    Playlists(PlaylistArgs),
}

/// Arguments for the `auth` subcommand group.
#[derive(Parser, Debug)]
pub struct AuthArgs {
    #[command(subcommand)]
    pub command: AuthCommands,
}

/// Auth subcommands for login, status, and logout.
#[derive(Subcommand, Debug)]
pub enum AuthCommands {
    /// Login to a service
    Login(ServiceArgs),
    /// Show authentication status
    Status,
    /// Logout from a service
    Logout(ServiceArgs),
}

/// A single service argument (spotify, youtube).
#[derive(Parser, Debug)]
pub struct ServiceArgs {
    /// Service (spotify, youtube)
    pub service: MusicService,
}

/// Arguments for `moodplay playlists`.
#[derive(Parser, Debug)]
pub struct PlaylistArgs {
    /// Service (spotify, youtube)
    pub service: MusicService,

    /// Search query; defaults to the service's built-in feed
    #[arg(short, long)]
    pub query: Option<String>,

    /// Number of pages to load
    #[arg(short, long, default_value = "1")]
    pub pages: u32,
}
