//! CLI auth command handlers for login, status, and logout.

use std::io::Write;
use std::sync::Arc;

use crate::auth::{FileSessionStore, SessionStore};
use crate::config::MoodplayConfig;
use crate::service::{MusicService, StreamService};

pub(crate) fn open_store(config: &MoodplayConfig) -> Arc<dyn SessionStore> {
    Arc::new(FileSessionStore::new(config.session_store_config()))
}

/// Handle `moodplay auth login <service>`.
pub async fn handle_login(service: MusicService) -> Result<(), Box<dyn std::error::Error>> {
    let config = MoodplayConfig::load()?;
    let stream = StreamService::new(service, &config, open_store(&config))?;

    if stream.is_logged_in() {
        println!("✅ Already logged in to {}", service.display_name());
        return Ok(());
    }

    let pending = stream.login().await?;
    println!("🔗 Visit: {}", pending.authorize_url);
    println!("📋 After authorizing, paste the redirect URL below:");
    print!("> ");
    std::io::stdout().flush()?;

    let mut response = String::new();
    std::io::stdin().read_line(&mut response)?;
    let response = response.trim();

    if response.is_empty() {
        eprintln!("❌ No redirect URL provided.");
        std::process::exit(1);
    }

    let session = stream.handle_redirect(response).await?;
    match session.expires_at {
        Some(expires) => println!(
            "✅ {} login successful! (expires {})",
            service.display_name(),
            expires.format("%Y-%m-%d %H:%M")
        ),
        None => println!("✅ {} login successful!", service.display_name()),
    }
    Ok(())
}

/// Handle `moodplay auth status`.
pub async fn handle_status() -> Result<(), Box<dyn std::error::Error>> {
    let config = MoodplayConfig::load()?;
    let store = open_store(&config);

    println!("🔐 Authentication Status\n");

    for service in MusicService::ALL {
        let name = service.display_name();
        match store.load(service.store_key()) {
            Ok(Some(session)) => {
                let status = match session.expires_at {
                    Some(expires) if expires > chrono::Utc::now() => format!(
                        "✅ Logged in (expires {})",
                        expires.format("%Y-%m-%d %H:%M")
                    ),
                    Some(_) => "⚠️  Token expired (renews on next request)".to_string(),
                    None => "✅ Logged in".to_string(),
                };
                println!("  {name}: {status}");
            }
            Ok(None) => println!("  {name}: ❌ Not logged in"),
            Err(e) => println!("  {name}: ⚠️  Error: {e}"),
        }
    }

    println!("\n📁 Sessions: {}", config.session_dir.display());
    Ok(())
}

/// Handle `moodplay auth logout <service>`.
pub async fn handle_logout(service: MusicService) -> Result<(), Box<dyn std::error::Error>> {
    let config = MoodplayConfig::load()?;
    let stream = StreamService::new(service, &config, open_store(&config))?;
    stream.logout().await?;
    println!("✅ Logged out from {}", service.display_name());
    Ok(())
}
