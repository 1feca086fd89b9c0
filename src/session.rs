//! The persisted session record.
//!
//! A [`Session`] bundles everything the broker needs to reuse an SSO login:
//! the registered OAuth client, the device authorization it last ran, and the
//! access token that came out of it. The record is cached on disk by
//! [`TokenCache`](crate::cache::TokenCache) and keyed by the login URL.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Cached OAuth client + token state for one login URL.
///
/// Created by the device-authorization flow on first use (or whenever the
/// login URL changes) and mutated in place when the access token is renewed:
/// the client id/secret survive a renewal, the device code and token are
/// replaced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// OAuth client id issued by the provider's register-client operation.
    pub client_id: String,
    /// OAuth client secret paired with `client_id`.
    pub client_secret: String,
    /// When the client registration itself expires (epoch seconds).
    pub client_secret_expires_at: i64,
    /// Device code of the most recent device authorization.
    pub device_code: String,
    /// Browser URL (including the user code) for the most recent login.
    pub verification_uri_complete: String,
    /// The short-lived SSO access token.
    pub access_token: String,
    /// When `access_token` stops being usable.
    pub access_token_expires_at: DateTime<Utc>,
    /// The SSO start URL this session was issued for. Sessions are never
    /// reused across login URLs, even when unexpired.
    pub login_url: String,
}

impl Session {
    /// Whether the access token has expired at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.access_token_expires_at
    }

    /// Whether this session can serve requests for `login_url` at `now`.
    pub fn is_usable_for(&self, login_url: &str, now: DateTime<Utc>) -> bool {
        self.login_url == login_url && !self.is_expired(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn session(expires_at: DateTime<Utc>) -> Session {
        Session {
            client_id: "client-id".to_string(),
            client_secret: "client-secret".to_string(),
            client_secret_expires_at: 1_700_000_000,
            device_code: "device-code".to_string(),
            verification_uri_complete: "https://device.sso/verify?code=X".to_string(),
            access_token: "token".to_string(),
            access_token_expires_at: expires_at,
            login_url: "https://example.awsapps.com/start".to_string(),
        }
    }

    #[test]
    fn test_fresh_token_is_not_expired() {
        let now = Utc::now();
        let s = session(now + Duration::hours(8) - Duration::minutes(5));
        assert!(!s.is_expired(now));
    }

    #[test]
    fn test_old_token_is_expired() {
        let now = Utc::now();
        let s = session(now - Duration::hours(8));
        assert!(s.is_expired(now));
    }

    #[test]
    fn test_usable_requires_matching_login_url() {
        let now = Utc::now();
        let s = session(now + Duration::hours(1));
        assert!(s.is_usable_for("https://example.awsapps.com/start", now));
        assert!(!s.is_usable_for("https://other.awsapps.com/start", now));
    }

    #[test]
    fn test_serde_uses_camel_case_keys() {
        let now = Utc::now();
        let json = serde_json::to_string(&session(now)).unwrap();
        assert!(json.contains("\"clientId\""));
        assert!(json.contains("\"verificationUriComplete\""));
        assert!(json.contains("\"loginUrl\""));
    }
}
