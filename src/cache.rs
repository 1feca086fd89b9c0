//! Disk cache for the session record.
//!
//! The cache is a single JSON file at a fixed per-user path. Corruption is
//! never fatal: an unreadable or half-written file is reported as a miss and
//! the next successful login overwrites it.

use crate::{Result, Session};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Reads and writes the cached [`Session`].
///
/// # Security
///
/// - Cache files are created with mode 0600 (owner read/write only) on Unix
/// - Parent directories are created with mode 0700 (owner access only)
/// - Tokens are never logged
pub struct TokenCache {
    path: PathBuf,
}

impl TokenCache {
    /// Creates a cache backed by `path`.
    ///
    /// Nothing is touched on disk until [`load`](Self::load) or
    /// [`save`](Self::save) is called.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Loads the cached session from disk.
    ///
    /// Returns `Ok(None)` if the file does not exist or does not parse as a
    /// session record. Only unexpected I/O failures (permissions, etc.) are
    /// returned as errors.
    pub async fn load(&self) -> Result<Option<Session>> {
        let data = match fs::read(&self.path).await {
            Ok(d) => d,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_slice(&data) {
            Ok(session) => Ok(Some(session)),
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "discarding unparseable session cache");
                Ok(None)
            }
        }
    }

    /// Saves a session to disk, creating parent directories as needed.
    ///
    /// Best-effort: a write interrupted mid-way leaves a file that the next
    /// [`load`](Self::load) treats as a miss.
    pub async fn save(&self, session: &Session) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                let mut perms = fs::metadata(parent).await?.permissions();
                perms.set_mode(0o700);
                fs::set_permissions(parent, perms).await?;
            }
        }

        let json = serde_json::to_vec_pretty(session)?;

        let mut file = fs::File::create(&self.path).await?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = file.metadata().await?.permissions();
            perms.set_mode(0o600);
            fs::set_permissions(&self.path, perms).await?;
        }

        file.write_all(&json).await?;
        file.flush().await?;

        Ok(())
    }

    /// Removes the cached session.
    ///
    /// Idempotent - clearing an absent cache is not an error.
    pub async fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path).await {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use tempfile::tempdir;

    fn sample_session() -> Session {
        Session {
            client_id: "client-id".to_string(),
            client_secret: "client-secret".to_string(),
            client_secret_expires_at: 1_700_000_000,
            device_code: "device-code".to_string(),
            verification_uri_complete: "https://device.sso/verify?code=X".to_string(),
            access_token: "access-token".to_string(),
            access_token_expires_at: Utc::now() + Duration::hours(7),
            login_url: "https://example.awsapps.com/start".to_string(),
        }
    }

    #[tokio::test]
    async fn test_save_and_load_roundtrip() {
        let dir = tempdir().unwrap();
        let cache = TokenCache::new(dir.path().join("access-token.json"));

        let session = sample_session();
        cache.save(&session).await.unwrap();

        let loaded = cache.load().await.unwrap().unwrap();
        assert_eq!(loaded, session);
    }

    #[tokio::test]
    async fn test_missing_file_is_a_miss() {
        let dir = tempdir().unwrap();
        let cache = TokenCache::new(dir.path().join("nope.json"));
        assert!(cache.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_malformed_file_is_a_miss() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("access-token.json");
        tokio::fs::write(&path, b"{ not json").await.unwrap();

        let cache = TokenCache::new(&path);
        assert!(cache.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_creates_parent_directories() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sso").join("cache").join("access-token.json");

        let cache = TokenCache::new(&path);
        cache.save(&sample_session()).await.unwrap();

        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_clear_is_idempotent() {
        let dir = tempdir().unwrap();
        let cache = TokenCache::new(dir.path().join("access-token.json"));

        cache.save(&sample_session()).await.unwrap();
        cache.clear().await.unwrap();
        cache.clear().await.unwrap();

        assert!(cache.load().await.unwrap().is_none());
    }
}
