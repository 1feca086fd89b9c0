//! The multi-profile credentials store.
//!
//! An INI-style file (one section per named profile) shared with other
//! tooling, so writes must be surgical: replacing one profile may not
//! disturb any other section. Sections are deleted and recreated wholesale
//! so no stale key survives a shape change.

use crate::client::RoleCredentials;
use crate::{BrokerError, Result};
use chrono::{DateTime, Duration, Utc};
use ini::Ini;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Longest profile name accepted as a section header.
const MAX_PROFILE_NAME_LENGTH: usize = 255;

/// One named entry in the credentials store.
///
/// Exactly one shape is written per profile: either the credentials
/// themselves or a `credential_process` command that produces them on
/// demand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialProfile {
    /// Persisted short-lived keys.
    Keys {
        access_key_id: String,
        secret_access_key: String,
        session_token: String,
        region: String,
    },
    /// Delegation to an external credential process.
    Process { command: String, region: String },
}

/// JSON payload of the `credential_process` protocol, printed to stdout by
/// `assume --quiet`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CredentialProcessOutput {
    pub version: u32,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: String,
    pub expiration: String,
}

impl CredentialProcessOutput {
    pub fn from_credentials(credentials: &RoleCredentials) -> Self {
        let expiration = DateTime::from_timestamp_millis(credentials.expiration)
            .unwrap_or_else(|| Utc::now() + Duration::hours(1));
        Self {
            version: 1,
            access_key_id: credentials.access_key_id.clone(),
            secret_access_key: credentials.secret_access_key.clone(),
            session_token: credentials.session_token.clone(),
            expiration: expiration.to_rfc3339(),
        }
    }
}

/// Validates a profile name for use as an INI section header.
pub fn validate_profile_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(BrokerError::InvalidProfileName(
            "name cannot be empty".to_string(),
        ));
    }

    if name.len() > MAX_PROFILE_NAME_LENGTH {
        return Err(BrokerError::InvalidProfileName(format!(
            "name exceeds maximum length of {MAX_PROFILE_NAME_LENGTH} characters"
        )));
    }

    if name.chars().any(|c| c.is_control()) {
        return Err(BrokerError::InvalidProfileName(
            "name contains control characters".to_string(),
        ));
    }

    if name.contains('[') || name.contains(']') {
        return Err(BrokerError::InvalidProfileName(
            "name contains section delimiters".to_string(),
        ));
    }

    Ok(())
}

/// Reads and rewrites the credentials file one profile at a time.
pub struct CredentialsStore {
    path: PathBuf,
}

impl CredentialsStore {
    /// Creates a store backed by `path`.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Creates the parent directory and an empty store file if absent.
    pub fn ensure_exists(&self) -> Result<()> {
        if self.path.exists() {
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::File::create(&self.path)?;
        Ok(())
    }

    /// Writes `profile` into the store, replacing any prior section of the
    /// same name and leaving every other section untouched.
    ///
    /// The section is deleted and recreated so that switching a profile
    /// between shapes never leaves keys of the old shape behind.
    pub fn write_profile(&self, name: &str, profile: &CredentialProfile) -> Result<()> {
        validate_profile_name(name)?;
        self.ensure_exists()?;

        let mut store = match Ini::load_from_file(&self.path) {
            Ok(ini) => ini,
            Err(ini::Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => Ini::new(),
            Err(e) => return Err(anyhow::anyhow!("could not parse credentials file: {e}").into()),
        };

        debug!(profile = name, "recreating credentials profile");
        store.delete(Some(name));

        match profile {
            CredentialProfile::Keys {
                access_key_id,
                secret_access_key,
                session_token,
                region,
            } => {
                store
                    .with_section(Some(name))
                    .set("aws_access_key_id", access_key_id.as_str())
                    .set("aws_secret_access_key", secret_access_key.as_str())
                    .set("aws_session_token", session_token.as_str())
                    .set("region", region.as_str());
            }
            CredentialProfile::Process { command, region } => {
                store
                    .with_section(Some(name))
                    .set("credential_process", command.as_str())
                    .set("region", region.as_str());
            }
        }

        store.write_to_file(&self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn keys_profile() -> CredentialProfile {
        CredentialProfile::Keys {
            access_key_id: "AKIA123".to_string(),
            secret_access_key: "secret".to_string(),
            session_token: "session".to_string(),
            region: "eu-central-1".to_string(),
        }
    }

    #[test]
    fn test_ensure_exists_creates_parents_and_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(".aws").join("credentials");
        let store = CredentialsStore::new(&path);

        store.ensure_exists().unwrap();
        store.ensure_exists().unwrap();

        assert!(path.exists());
    }

    #[test]
    fn test_write_profile_roundtrips_keys_shape() {
        let dir = tempdir().unwrap();
        let store = CredentialsStore::new(dir.path().join("credentials"));

        store.write_profile("default", &keys_profile()).unwrap();

        let ini = Ini::load_from_file(dir.path().join("credentials")).unwrap();
        let section = ini.section(Some("default")).unwrap();
        assert_eq!(section.get("aws_access_key_id"), Some("AKIA123"));
        assert_eq!(section.get("aws_session_token"), Some("session"));
        assert_eq!(section.get("region"), Some("eu-central-1"));
        assert_eq!(section.get("credential_process"), None);
    }

    #[test]
    fn test_rewrite_is_idempotent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("credentials");
        let store = CredentialsStore::new(&path);

        store.write_profile("default", &keys_profile()).unwrap();
        let first = std::fs::read_to_string(&path).unwrap();

        store.write_profile("default", &keys_profile()).unwrap();
        let second = std::fs::read_to_string(&path).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_writing_one_profile_leaves_others_untouched() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("credentials");
        std::fs::write(
            &path,
            "[other]\naws_access_key_id=UNRELATED\nregion=us-east-1\n",
        )
        .unwrap();

        let store = CredentialsStore::new(&path);
        store.write_profile("default", &keys_profile()).unwrap();

        let ini = Ini::load_from_file(&path).unwrap();
        let other = ini.section(Some("other")).unwrap();
        assert_eq!(other.get("aws_access_key_id"), Some("UNRELATED"));
        assert_eq!(other.get("region"), Some("us-east-1"));
        assert!(ini.section(Some("default")).is_some());
    }

    #[test]
    fn test_shape_switch_drops_stale_keys() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("credentials");
        let store = CredentialsStore::new(&path);

        store.write_profile("default", &keys_profile()).unwrap();
        store
            .write_profile(
                "default",
                &CredentialProfile::Process {
                    command: "ssobroker assume -q -a 111 -n Admin".to_string(),
                    region: "eu-central-1".to_string(),
                },
            )
            .unwrap();

        let ini = Ini::load_from_file(&path).unwrap();
        let section = ini.section(Some("default")).unwrap();
        assert_eq!(
            section.get("credential_process"),
            Some("ssobroker assume -q -a 111 -n Admin")
        );
        assert_eq!(section.get("aws_access_key_id"), None);
        assert_eq!(section.get("aws_session_token"), None);
    }

    #[test]
    fn test_profile_name_validation() {
        assert!(validate_profile_name("default").is_ok());
        assert!(validate_profile_name("team-dev.admin").is_ok());
        assert!(validate_profile_name("").is_err());
        assert!(validate_profile_name("bad[section]").is_err());
        assert!(validate_profile_name("two\nlines").is_err());
        assert!(validate_profile_name(&"x".repeat(300)).is_err());
    }

    #[test]
    fn test_credential_process_output_shape() {
        let creds = RoleCredentials {
            access_key_id: "AKIA123".to_string(),
            secret_access_key: "secret".to_string(),
            session_token: "session".to_string(),
            expiration: 1_700_000_000_000,
        };

        let out = CredentialProcessOutput::from_credentials(&creds);
        let json = serde_json::to_string(&out).unwrap();

        assert!(json.contains("\"Version\":1"));
        assert!(json.contains("\"AccessKeyId\":\"AKIA123\""));
        assert!(json.contains("\"Expiration\""));
    }
}
