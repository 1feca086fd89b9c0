//! Cross-process guard around the device-authorization flow.
//!
//! Two invocations racing through the browser login at once would leave the
//! user staring at a second, confusing verification prompt. The lock is a
//! small JSON file in the OS temp directory holding only the time it was
//! taken: a lock is considered held for one minute after that, so a process
//! that crashes mid-flow self-heals without manual cleanup.
//!
//! The lock is advisory and time-bound rather than ownership-bound. No
//! process identity is recorded, and [`AuthorizationLock::acquire`] performs
//! its held-check and its write back-to-back without an atomic check-and-set:
//! two flows started within the same instant can both proceed. Given the
//! human-speed nature of a browser login this narrow race is accepted.

use crate::{BrokerError, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LockRecord {
    lock_time: DateTime<Utc>,
}

/// TTL-based, file-backed mutual exclusion for the authorization flow.
pub struct AuthorizationLock {
    path: PathBuf,
    ttl: Duration,
}

impl AuthorizationLock {
    /// Creates a lock backed by `path` with the standard one-minute TTL.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            ttl: Duration::minutes(1),
        }
    }

    /// Overrides the staleness TTL. Exposed so a stricter (or faster-expiring)
    /// policy can be substituted without touching the callers.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Whether another flow currently holds the lock.
    ///
    /// An absent lock file means not held. An unparseable one is treated as
    /// not held too - corruption must never wedge the tool.
    pub fn is_held(&self) -> bool {
        let data = match std::fs::read(&self.path) {
            Ok(d) => d,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("no lock file found");
                return false;
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "could not read lock file");
                return false;
            }
        };

        let record: LockRecord = match serde_json::from_slice(&data) {
            Ok(r) => r,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "ignoring unparseable lock file");
                return false;
            }
        };

        Utc::now() < record.lock_time + self.ttl
    }

    /// Takes the lock, failing fast when another flow already holds it.
    ///
    /// On success the lock file is written unconditionally and a [`FlowGuard`]
    /// is returned; dropping the guard releases the lock, so every exit path
    /// of the guarded section - success, remote failure, or panic unwind -
    /// releases it.
    pub fn acquire(&self) -> Result<FlowGuard> {
        if self.is_held() {
            return Err(BrokerError::FlowInProgress);
        }

        let record = LockRecord {
            lock_time: Utc::now(),
        };
        std::fs::write(&self.path, serde_json::to_vec(&record)?)?;

        Ok(FlowGuard {
            path: self.path.clone(),
        })
    }

    /// Deletes the lock file. Safe to call when no lock exists; this is what
    /// `--force` uses to clear a lock left by a crashed flow.
    pub fn release(&self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %self.path.display(), error = %e, "could not remove lock file");
            }
        }
    }
}

/// RAII handle for a held authorization lock.
///
/// Releases the lock on drop.
pub struct FlowGuard {
    path: PathBuf,
}

impl Drop for FlowGuard {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %self.path.display(), error = %e, "could not release authorization lock");
            }
        }
    }
}
