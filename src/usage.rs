//! Last-used account/role shortcut.
//!
//! A small convenience record beside the token cache: `refresh` reads it to
//! renew the previously assumed role without prompting. Missing or malformed
//! content just means there is nothing to refresh.

use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

/// The account/role pair of the most recent successful assumption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastUsage {
    pub account_id: String,
    pub account_name: String,
    pub role_name: String,
}

/// Reads and writes the last-usage record.
pub struct UsageCache {
    path: PathBuf,
}

impl UsageCache {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Returns the recorded pair, or `None` when nothing usable is stored.
    pub async fn load(&self) -> Result<Option<LastUsage>> {
        let data = match fs::read(&self.path).await {
            Ok(d) => d,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        Ok(serde_json::from_slice(&data).ok())
    }

    /// Records the pair, creating parent directories as needed.
    pub async fn save(&self, usage: &LastUsage) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&self.path, serde_json::to_vec_pretty(usage)?).await?;
        Ok(())
    }
}
