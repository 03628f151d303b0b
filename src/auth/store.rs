use std::fs;
use std::io::Write;
#[cfg(unix)]
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::AuthError;
use super::session::Session;

/// Storage abstraction for one persisted session per provider key.
///
/// Each call must be atomic on its own; callers serialize everything else.
pub trait SessionStore: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<Session>, AuthError>;
    fn save(&self, key: &str, session: &Session) -> Result<(), AuthError>;
    /// Deleting an absent key succeeds.
    fn delete(&self, key: &str) -> Result<(), AuthError>;
}

/// Configuration for file-backed session storage.
#[derive(Debug, Clone)]
pub struct SessionStoreConfig {
    pub base_dir: PathBuf,
}

impl SessionStoreConfig {
    pub fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    pub fn default_dir() -> PathBuf {
        default_moodplay_dir()
    }
}

/// File-backed session store writing one TOML file per key.
///
/// # Example
/// ```no_run
/// use moodplay::auth::{FileSessionStore, Session, SessionStore};
///
/// let store = FileSessionStore::new_default();
/// store.save("spotify_session", &Session::new("access"))?;
/// # Ok::<(), moodplay::auth::AuthError>(())
/// ```
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    base_dir: PathBuf,
}

impl FileSessionStore {
    pub fn new(config: SessionStoreConfig) -> Self {
        Self {
            base_dir: config.base_dir,
        }
    }

    pub fn new_default() -> Self {
        Self {
            base_dir: default_moodplay_dir(),
        }
    }

    fn session_path(&self, key: &str) -> PathBuf {
        self.base_dir.join(format!("{}.toml", normalize_key(key)))
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self, key: &str) -> Result<Option<Session>, AuthError> {
        let path = self.session_path(key);
        let raw = match fs::read_to_string(&path) {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(AuthError::Io(err.to_string())),
        };
        let file: SessionFile = toml::from_str(&raw)?;
        Ok(Some(file.session))
    }

    fn save(&self, key: &str, session: &Session) -> Result<(), AuthError> {
        let file = SessionFile {
            key: key.to_string(),
            session: session.clone(),
            saved_at: Utc::now(),
        };
        let serialized = toml::to_string(&file)?;
        atomic_write(&self.session_path(key), serialized.as_bytes())
    }

    fn delete(&self, key: &str) -> Result<(), AuthError> {
        match fs::remove_file(self.session_path(key)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(AuthError::Io(err.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SessionFile {
    key: String,
    saved_at: DateTime<Utc>,
    session: Session,
}

fn default_moodplay_dir() -> PathBuf {
    directories::UserDirs::new()
        .map(|dirs| dirs.home_dir().join(".moodplay"))
        .unwrap_or_else(|| PathBuf::from(".moodplay"))
}

fn normalize_key(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return "default".to_string();
    }
    let out: String = trimmed
        .chars()
        .map(|ch| {
            let lower = ch.to_ascii_lowercase();
            if lower.is_ascii_alphanumeric() || lower == '-' || lower == '_' {
                lower
            } else {
                '-'
            }
        })
        .collect();
    if out.trim_matches(|c| c == '-' || c == '_').is_empty() {
        "default".to_string()
    } else {
        out
    }
}

fn atomic_write(path: &Path, data: &[u8]) -> Result<(), AuthError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let file_name = path
        .file_name()
        .ok_or_else(|| AuthError::Io(format!("Session path {} has no file name", path.display())))?;

    let nonce = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let temp_path = path.with_file_name(format!(
        ".{}.tmp-{}-{nonce}",
        file_name.to_string_lossy(),
        std::process::id()
    ));

    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    options.mode(0o600);

    let write_result = (|| -> std::io::Result<()> {
        let mut temp_file = options.open(&temp_path)?;
        temp_file.write_all(data)?;
        temp_file.sync_all()?;
        Ok(())
    })();

    if let Err(err) = write_result {
        let _ = fs::remove_file(&temp_path);
        return Err(err.into());
    }

    if let Err(err) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(err.into());
    }

    #[cfg(unix)]
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::TempDir;

    fn temp_store() -> (TempDir, FileSessionStore) {
        let dir = TempDir::new().unwrap();
        let store = FileSessionStore::new(SessionStoreConfig::new(dir.path().to_path_buf()));
        (dir, store)
    }

    #[test]
    fn saved_session_loads_back() {
        let (_dir, store) = temp_store();
        let expires_at = Utc::now() + Duration::hours(1);
        let session = Session::new("access")
            .with_refresh_token("refresh")
            .with_expires_at(expires_at);
        store.save("spotify_session", &session).unwrap();

        let loaded = store.load("spotify_session").unwrap().unwrap();
        assert_eq!(loaded.access_token, "access");
        assert_eq!(loaded.refresh_token.as_deref(), Some("refresh"));
        assert_eq!(loaded.expires_at, Some(expires_at));
    }

    #[test]
    fn load_missing_key_returns_none() {
        let (_dir, store) = temp_store();
        assert!(store.load("youtube_session").unwrap().is_none());
    }

    #[test]
    fn delete_removes_session_and_is_idempotent() {
        let (_dir, store) = temp_store();
        store.save("spotify_session", &Session::new("access")).unwrap();
        store.delete("spotify_session").unwrap();
        assert!(store.load("spotify_session").unwrap().is_none());
        store.delete("spotify_session").unwrap();
    }

    #[test]
    fn keys_do_not_share_files() {
        let (dir, store) = temp_store();
        store.save("spotify_session", &Session::new("a")).unwrap();
        store.save("youtube_session", &Session::new("b")).unwrap();
        assert!(dir.path().join("spotify_session.toml").exists());
        assert!(dir.path().join("youtube_session.toml").exists());
        assert_eq!(
            store.load("youtube_session").unwrap().unwrap().access_token,
            "b"
        );
    }

    #[test]
    fn corrupt_file_is_a_serialization_error() {
        let (dir, store) = temp_store();
        fs::write(dir.path().join("spotify_session.toml"), "not = [toml").unwrap();
        let err = store.load("spotify_session").unwrap_err();
        assert!(matches!(err, AuthError::Serialization(_)));
    }

    #[test]
    fn save_leaves_no_temp_files() {
        let (dir, store) = temp_store();
        store.save("spotify_session", &Session::new("a")).unwrap();
        let has_tmp = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .any(|name| name.contains(".tmp-"));
        assert!(!has_tmp);
    }

    #[cfg(unix)]
    #[test]
    fn save_sets_owner_only_permissions() {
        let (dir, store) = temp_store();
        store.save("spotify_session", &Session::new("a")).unwrap();
        let mode = fs::metadata(dir.path().join("spotify_session.toml"))
            .unwrap()
            .permissions()
            .mode()
            & 0o777;
        assert_eq!(mode, 0o600);
    }

    #[test]
    fn normalize_key_replaces_path_characters() {
        assert_eq!(normalize_key("../etc/passwd"), "---etc-passwd");
        assert_eq!(normalize_key("  "), "default");
        assert_eq!(normalize_key("Spotify_Session"), "spotify_session");
    }
}
