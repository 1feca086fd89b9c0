//! Configuration and well-known paths.
//!
//! The broker keeps its state in the same places the rest of the AWS tooling
//! expects (`~/.aws/...`), plus a YAML config file for the start URL and
//! region so neither has to be passed on every invocation. All paths are
//! resolved once at startup into a [`Paths`] value and threaded into the
//! components explicitly.

use crate::select::{match_label, Prompt};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Regions the interactive config prompt offers.
pub const AWS_REGIONS: &[&str] = &[
    "us-east-2",
    "us-east-1",
    "us-west-1",
    "us-west-2",
    "af-south-1",
    "ap-east-1",
    "ap-south-1",
    "ap-northeast-3",
    "ap-northeast-2",
    "ap-southeast-1",
    "ap-southeast-2",
    "ap-northeast-1",
    "ca-central-1",
    "eu-central-1",
    "eu-west-1",
    "eu-west-2",
    "eu-south-1",
    "eu-west-3",
    "eu-north-1",
    "me-south-1",
    "sa-east-1",
    "us-gov-east-1",
    "us-gov-west-1",
];

/// Persistent defaults for the CLI, stored as YAML in the user config dir.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// SSO start URL, e.g. `https://my-login.awsapps.com/start#/`.
    #[serde(rename = "start-url", default)]
    pub start_url: String,
    /// Region the SSO endpoints live in.
    #[serde(default)]
    pub region: String,
}

impl AppConfig {
    /// Loads the config file. Missing file means no config (`Ok(None)`);
    /// a file that exists but does not parse is an error, since the user
    /// wrote it.
    pub fn load(path: impl AsRef<Path>) -> Result<Option<Self>> {
        let data = match std::fs::read_to_string(path.as_ref()) {
            Ok(d) => d,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let config = serde_yaml::from_str(&data)
            .map_err(|e| anyhow::anyhow!("could not parse config file: {e}"))?;
        Ok(Some(config))
    }

    /// Writes the config file, creating parent directories as needed.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let yaml =
            serde_yaml::to_string(self).map_err(|e| anyhow::anyhow!("could not serialize config: {e}"))?;
        std::fs::write(path, yaml)?;

        info!(path = %path.display(), "config file written");
        Ok(())
    }

    /// Interactively fills in the config, offering current values as
    /// defaults.
    pub fn prompt_values(&self, prompt: &dyn Prompt) -> Result<Self> {
        let start_url = prompt.input("SSO start URL", &self.start_url)?;

        let regions: Vec<String> = AWS_REGIONS.iter().map(|r| r.to_string()).collect();
        let matcher = |input: &str, index: usize| match_label(input, &regions[index]);
        let index = prompt.select(
            "Select your region - fuzzy search supported",
            &regions,
            &matcher,
        )?;

        Ok(Self {
            start_url,
            region: regions[index].clone(),
        })
    }
}

/// Every file path the broker touches, resolved once at startup.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Cached session record.
    pub token_cache: PathBuf,
    /// Last-used account/role record.
    pub last_usage: PathBuf,
    /// Cross-process authorization lock.
    pub lock_file: PathBuf,
    /// Multi-profile credentials store.
    pub credentials_file: PathBuf,
    /// YAML config file.
    pub config_file: PathBuf,
}

impl Paths {
    /// Resolves the standard per-user locations.
    pub fn resolve() -> Result<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("could not determine the home directory"))?;
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("could not determine the config directory"))?;

        let sso_cache = home.join(".aws").join("sso").join("cache");

        Ok(Self {
            token_cache: sso_cache.join("access-token.json"),
            last_usage: sso_cache.join("last-usage.json"),
            lock_file: std::env::temp_dir().join("ssobroker.lock"),
            credentials_file: home.join(".aws").join("credentials"),
            config_file: config_dir.join("ssobroker").join("config.yml"),
        })
    }
}
