//! The OAuth2 device-authorization flow.
//!
//! Three steps against the identity provider: register an OAuth client,
//! start a device authorization (which yields the URL the human opens in a
//! browser), then poll the token endpoint until the login completes.
//!
//! State machine: Unregistered → Registered → DeviceAuthorized → Polling →
//! Issued, with any non-pending remote error aborting the flow.

use crate::client::{DeviceAuthorization, IdentityClient, RegisteredClient};
use crate::{BrokerError, Result};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use std::time::Duration as StdDuration;
use tracing::info;

/// Fixed client name sent to the register-client operation.
const CLIENT_NAME: &str = "ssobroker";
/// Fixed client type; the device grant uses a public client.
const CLIENT_TYPE: &str = "public";

/// How long an issued access token is trusted: the provider hands out 8-hour
/// tokens, and a 5-minute margin keeps us from presenting one that expires
/// mid-operation.
pub fn access_token_lifetime() -> Duration {
    Duration::hours(8) - Duration::minutes(5)
}

/// A source of "now", injectable so expiry stamping is testable.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Retry behavior of the token poll loop.
///
/// The default matches the provider's device-grant contract: retry every
/// three seconds, forever - the human on the other end decides how long the
/// browser login takes. `max_attempts` exists for embedders and tests that
/// cannot afford an unbounded wait.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Sleep between `AuthorizationPending` responses.
    pub interval: StdDuration,
    /// Give up after this many pending responses, if set.
    pub max_attempts: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            interval: StdDuration::from_secs(3),
            max_attempts: None,
        }
    }
}

/// An access token together with the expiry this broker assigned to it.
#[derive(Debug, Clone)]
pub struct IssuedAccess {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

/// Drives register → authorize-device → poll against an [`IdentityClient`].
pub struct DeviceAuthorizationFlow {
    client: Arc<dyn IdentityClient>,
    clock: Arc<dyn Clock>,
    policy: RetryPolicy,
}

impl DeviceAuthorizationFlow {
    pub fn new(client: Arc<dyn IdentityClient>, clock: Arc<dyn Clock>) -> Self {
        Self {
            client,
            clock,
            policy: RetryPolicy::default(),
        }
    }

    /// Overrides the poll retry policy.
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Registers the broker's OAuth client. Failure is fatal - without a
    /// registration nothing else can proceed.
    pub async fn register(&self) -> Result<RegisteredClient> {
        info!("registering OAuth client");
        self.client.register_client(CLIENT_NAME, CLIENT_TYPE).await
    }

    /// Starts a device authorization for `login_url`.
    ///
    /// The returned verification URL must be surfaced to the user before
    /// [`poll`](Self::poll) is called; the broker logs it and the caller
    /// hands it to the browser opener.
    pub async fn authorize_device(
        &self,
        client_id: &str,
        client_secret: &str,
        login_url: &str,
    ) -> Result<DeviceAuthorization> {
        let authorization = self
            .client
            .start_device_authorization(client_id, client_secret, login_url)
            .await?;
        info!(
            url = %authorization.verification_uri_complete,
            "please verify the login request in your browser"
        );
        Ok(authorization)
    }

    /// Polls the token endpoint until the user completes the browser login.
    ///
    /// `AuthorizationPending` sleeps [`RetryPolicy::interval`] and retries;
    /// any other remote error aborts the flow. On success the expiry is
    /// stamped as now + 8h − 5min.
    pub async fn poll(
        &self,
        client_id: &str,
        client_secret: &str,
        device_code: &str,
    ) -> Result<IssuedAccess> {
        let mut attempts: u32 = 0;
        loop {
            match self
                .client
                .create_token(client_id, client_secret, device_code)
                .await
            {
                Ok(token) => {
                    return Ok(IssuedAccess {
                        access_token: token.access_token,
                        expires_at: self.clock.now() + access_token_lifetime(),
                    });
                }
                Err(BrokerError::AuthorizationPending) => {
                    attempts += 1;
                    if let Some(max) = self.policy.max_attempts {
                        if attempts >= max {
                            return Err(BrokerError::remote(
                                "create-token",
                                format!("authorization not completed after {max} attempts"),
                            ));
                        }
                    }
                    info!("still waiting for authorization...");
                    tokio::time::sleep(self.policy.interval).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::mock::MockIdentityClient;

    struct FixedClock(DateTime<Utc>);

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    fn fixed_now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2021-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_retries_through_pending_responses() {
        let client = Arc::new(MockIdentityClient::new().with_token_script(vec![
            Err(BrokerError::AuthorizationPending),
            Err(BrokerError::AuthorizationPending),
            Ok("issued-token".to_string()),
        ]));
        let flow = DeviceAuthorizationFlow::new(client.clone(), Arc::new(SystemClock));

        let start = tokio::time::Instant::now();
        let issued = flow.poll("id", "secret", "code").await.unwrap();

        assert_eq!(issued.access_token, "issued-token");
        assert_eq!(client.create_token_calls(), 3);
        // Exactly two sleep cycles of the default 3s interval.
        assert_eq!(start.elapsed(), StdDuration::from_secs(6));
    }

    #[tokio::test]
    async fn test_poll_aborts_on_remote_rejection() {
        let client = Arc::new(MockIdentityClient::new().with_token_script(vec![Err(
            BrokerError::remote("create-token", "AccessDeniedException"),
        )]));
        let flow = DeviceAuthorizationFlow::new(client.clone(), Arc::new(SystemClock));

        let err = flow.poll("id", "secret", "code").await.unwrap_err();
        assert!(matches!(err, BrokerError::Remote { .. }));
        assert_eq!(client.create_token_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_honors_max_attempts() {
        let client = Arc::new(MockIdentityClient::new().with_token_script(vec![
            Err(BrokerError::AuthorizationPending),
            Err(BrokerError::AuthorizationPending),
            Err(BrokerError::AuthorizationPending),
        ]));
        let flow = DeviceAuthorizationFlow::new(client, Arc::new(SystemClock)).with_policy(
            RetryPolicy {
                interval: StdDuration::from_millis(10),
                max_attempts: Some(2),
            },
        );

        assert!(flow.poll("id", "secret", "code").await.is_err());
    }

    #[tokio::test]
    async fn test_poll_stamps_expiry_from_clock() {
        let client = Arc::new(MockIdentityClient::new());
        let flow =
            DeviceAuthorizationFlow::new(client, Arc::new(FixedClock(fixed_now())));

        let issued = flow.poll("id", "secret", "code").await.unwrap();
        assert_eq!(
            issued.expires_at,
            fixed_now() + Duration::hours(8) - Duration::minutes(5)
        );
    }

    #[tokio::test]
    async fn test_register_uses_fixed_client_identity() {
        let client = Arc::new(MockIdentityClient::new());
        let flow = DeviceAuthorizationFlow::new(client.clone(), Arc::new(SystemClock));

        let registered = flow.register().await.unwrap();
        assert_eq!(registered.client_id, "mock-client-id");
        assert_eq!(client.register_calls(), 1);
    }
}
