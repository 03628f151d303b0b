//! Moodplay CLI binary entry point.

use clap::Parser;
use moodplay::cli::{AuthCommands, Cli, Commands};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("moodplay=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Auth(auth_args) => match auth_args.command {
            AuthCommands::Login(args) => moodplay::cli::auth::handle_login(args.service).await,
            AuthCommands::Status => moodplay::cli::auth::handle_status().await,
            AuthCommands::Logout(args) => moodplay::cli::auth::handle_logout(args.service).await,
        },
        Commands::Playlists(args) => moodplay::cli::playlists::handle_playlists(args).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
