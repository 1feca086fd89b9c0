//! The remote identity API.
//!
//! This module defines the narrow capability interface the broker needs from
//! the identity provider - the three OIDC device-grant operations plus the
//! three account/role/credential lookups - along with the wire types they
//! exchange. The real implementation talks to AWS SSO / SSO-OIDC; the mock
//! implementation scripts responses for tests.

mod aws;
pub mod mock;

pub use aws::AwsIdentityClient;

use crate::Result;
use async_trait::async_trait;

/// Output of the register-client operation.
#[derive(Debug, Clone)]
pub struct RegisteredClient {
    pub client_id: String,
    pub client_secret: String,
    /// When the registration expires (epoch seconds).
    pub client_secret_expires_at: i64,
}

/// Output of the start-device-authorization operation.
#[derive(Debug, Clone)]
pub struct DeviceAuthorization {
    pub device_code: String,
    /// Browser URL with the user code already embedded.
    pub verification_uri_complete: String,
}

/// Output of a successful create-token call.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub access_token: String,
}

/// One account the user may assume a role in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountInfo {
    pub account_id: String,
    pub account_name: String,
}

/// One role available within an account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleInfo {
    pub role_name: String,
}

/// Short-lived credentials for an assumed role.
#[derive(Debug, Clone)]
pub struct RoleCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: String,
    /// When the credentials expire (epoch milliseconds, as returned by the
    /// provider).
    pub expiration: i64,
}

/// The six remote operations the broker depends on.
///
/// Implementations must be `Send + Sync` so one client can be shared across
/// the session manager and the identity selector.
///
/// # Error contract
///
/// - `create_token` returns
///   [`BrokerError::AuthorizationPending`](crate::BrokerError::AuthorizationPending)
///   while the user has not finished the browser login; callers retry on it.
/// - `list_accounts` and `list_account_roles` return
///   [`BrokerError::Unauthorized`](crate::BrokerError::Unauthorized) when the
///   access token is rejected, so callers can discard the cached session and
///   log in again.
/// - Everything else surfaces as
///   [`BrokerError::Remote`](crate::BrokerError::Remote) and is fatal.
#[async_trait]
pub trait IdentityClient: Send + Sync {
    /// Registers a public OAuth client with the provider.
    async fn register_client(&self, client_name: &str, client_type: &str)
        -> Result<RegisteredClient>;

    /// Starts a device authorization against `start_url`.
    async fn start_device_authorization(
        &self,
        client_id: &str,
        client_secret: &str,
        start_url: &str,
    ) -> Result<DeviceAuthorization>;

    /// Attempts to exchange the device code for an access token.
    async fn create_token(
        &self,
        client_id: &str,
        client_secret: &str,
        device_code: &str,
    ) -> Result<IssuedToken>;

    /// Lists the accounts visible to `access_token`, in provider order.
    async fn list_accounts(&self, access_token: &str) -> Result<Vec<AccountInfo>>;

    /// Lists the roles `access_token` may assume in `account_id`.
    async fn list_account_roles(
        &self,
        access_token: &str,
        account_id: &str,
    ) -> Result<Vec<RoleInfo>>;

    /// Fetches short-lived credentials for one account/role pair.
    async fn get_role_credentials(
        &self,
        access_token: &str,
        account_id: &str,
        role_name: &str,
    ) -> Result<RoleCredentials>;
}
