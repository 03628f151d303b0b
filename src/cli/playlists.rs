//! `moodplay playlists` handler.

use crate::config::MoodplayConfig;
use crate::playlist::Playlist;
use crate::service::StreamService;

use super::auth::open_store;
use super::PlaylistArgs;

/// Handle `moodplay playlists <service>`.
pub async fn handle_playlists(args: PlaylistArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = MoodplayConfig::load()?;
    let stream = StreamService::new(args.service, &config, open_store(&config))?;

    if !stream.is_logged_in() {
        eprintln!(
            "❌ Not logged in to {}. Run `moodplay auth login {}` first.",
            args.service.display_name(),
            args.service
        );
        std::process::exit(1);
    }

    let mut feed = args.query.as_deref().map(|query| stream.playlists(query));

    for page in 1..=args.pages.max(1) {
        let items = match feed.as_mut() {
            Some(feed) => {
                if feed.is_exhausted() {
                    break;
                }
                feed.load_next_page().await?
            }
            None => stream.load_playlists().await?,
        };

        if items.is_empty() {
            println!("📭 No more playlists.");
            break;
        }

        println!("📄 Page {page}");
        for item in &items {
            print_playlist(item);
        }
    }
    Ok(())
}

fn print_playlist(item: &Playlist) {
    let tracks = item
        .track_count
        .map(|count| format!(" · {count} tracks"))
        .unwrap_or_default();
    let owner = item
        .owner
        .as_deref()
        .map(|owner| format!(" · by {owner}"))
        .unwrap_or_default();
    println!("  🎵 {}{owner}{tracks}", item.title);
    if let Some(url) = &item.external_url {
        println!("     {url}");
    }
}
