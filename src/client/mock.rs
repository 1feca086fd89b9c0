//! Scripted identity client for testing.
//!
//! A complete in-memory [`IdentityClient`] with response scripting, error
//! injection, and per-operation call counters, for testing code that drives
//! the broker without a real identity provider.

use crate::client::{
    AccountInfo, DeviceAuthorization, IdentityClient, IssuedToken, RegisteredClient,
    RoleCredentials, RoleInfo,
};
use crate::{BrokerError, Result};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Scripted test double for the remote identity API.
///
/// Every operation succeeds with the configured fixture data unless an error
/// has been injected. `create_token` pops responses off a script queue so the
/// pending-pending-issued sequence of a real device grant can be replayed;
/// an empty queue issues the default token.
///
/// # Example
///
/// ```
/// use ssobroker::client::mock::MockIdentityClient;
/// use ssobroker::client::IdentityClient;
/// use ssobroker::BrokerError;
///
/// #[tokio::main]
/// async fn main() {
///     let client = MockIdentityClient::new()
///         .with_token_script(vec![Err(BrokerError::AuthorizationPending), Ok("tok".into())]);
///
///     assert!(client.create_token("id", "secret", "code").await.is_err());
///     assert!(client.create_token("id", "secret", "code").await.is_ok());
///     assert_eq!(client.create_token_calls(), 2);
/// }
/// ```
pub struct MockIdentityClient {
    accounts: Vec<AccountInfo>,
    roles: HashMap<String, Vec<RoleInfo>>,

    token_script: Mutex<VecDeque<std::result::Result<String, BrokerError>>>,

    /// Error to return from `list_accounts()` (taken on first use).
    pub list_accounts_error: Mutex<Option<BrokerError>>,
    /// Error to return from `register_client()` (taken on first use).
    pub register_error: Mutex<Option<BrokerError>>,
    /// Error to return from `start_device_authorization()` (taken on first use).
    pub device_authorization_error: Mutex<Option<BrokerError>>,

    register_calls: AtomicUsize,
    device_authorization_calls: AtomicUsize,
    create_token_calls: AtomicUsize,
    list_accounts_calls: AtomicUsize,
    list_account_roles_calls: AtomicUsize,
    get_role_credentials_calls: AtomicUsize,
}

impl MockIdentityClient {
    /// Creates a mock with empty account/role fixtures.
    pub fn new() -> Self {
        Self {
            accounts: Vec::new(),
            roles: HashMap::new(),
            token_script: Mutex::new(VecDeque::new()),
            list_accounts_error: Mutex::new(None),
            register_error: Mutex::new(None),
            device_authorization_error: Mutex::new(None),
            register_calls: AtomicUsize::new(0),
            device_authorization_calls: AtomicUsize::new(0),
            create_token_calls: AtomicUsize::new(0),
            list_accounts_calls: AtomicUsize::new(0),
            list_account_roles_calls: AtomicUsize::new(0),
            get_role_credentials_calls: AtomicUsize::new(0),
        }
    }

    /// Pre-populates the account list returned by `list_accounts`.
    pub fn with_accounts(mut self, accounts: Vec<(&str, &str)>) -> Self {
        self.accounts = accounts
            .into_iter()
            .map(|(id, name)| AccountInfo {
                account_id: id.to_string(),
                account_name: name.to_string(),
            })
            .collect();
        self
    }

    /// Pre-populates the roles returned for `account_id`.
    pub fn with_roles(mut self, account_id: &str, roles: Vec<&str>) -> Self {
        self.roles.insert(
            account_id.to_string(),
            roles
                .into_iter()
                .map(|name| RoleInfo {
                    role_name: name.to_string(),
                })
                .collect(),
        );
        self
    }

    /// Scripts the responses `create_token` pops, oldest first. `Ok` entries
    /// carry the access token to issue.
    pub fn with_token_script(
        self,
        script: Vec<std::result::Result<String, BrokerError>>,
    ) -> Self {
        *self.token_script.lock().unwrap() = script.into();
        self
    }

    pub fn register_calls(&self) -> usize {
        self.register_calls.load(Ordering::SeqCst)
    }

    pub fn device_authorization_calls(&self) -> usize {
        self.device_authorization_calls.load(Ordering::SeqCst)
    }

    pub fn create_token_calls(&self) -> usize {
        self.create_token_calls.load(Ordering::SeqCst)
    }

    pub fn list_accounts_calls(&self) -> usize {
        self.list_accounts_calls.load(Ordering::SeqCst)
    }

    pub fn list_account_roles_calls(&self) -> usize {
        self.list_account_roles_calls.load(Ordering::SeqCst)
    }

    pub fn get_role_credentials_calls(&self) -> usize {
        self.get_role_credentials_calls.load(Ordering::SeqCst)
    }

    /// Total remote calls across all six operations.
    pub fn total_calls(&self) -> usize {
        self.register_calls()
            + self.device_authorization_calls()
            + self.create_token_calls()
            + self.list_accounts_calls()
            + self.list_account_roles_calls()
            + self.get_role_credentials_calls()
    }
}

impl Default for MockIdentityClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentityClient for MockIdentityClient {
    async fn register_client(
        &self,
        _client_name: &str,
        _client_type: &str,
    ) -> Result<RegisteredClient> {
        self.register_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.register_error.lock().unwrap().take() {
            return Err(err);
        }
        Ok(RegisteredClient {
            client_id: "mock-client-id".to_string(),
            client_secret: "mock-client-secret".to_string(),
            client_secret_expires_at: 4_102_444_800, // far future
        })
    }

    async fn start_device_authorization(
        &self,
        _client_id: &str,
        _client_secret: &str,
        start_url: &str,
    ) -> Result<DeviceAuthorization> {
        self.device_authorization_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.device_authorization_error.lock().unwrap().take() {
            return Err(err);
        }
        Ok(DeviceAuthorization {
            device_code: "mock-device-code".to_string(),
            verification_uri_complete: format!("{start_url}/verify?code=MOCK"),
        })
    }

    async fn create_token(
        &self,
        _client_id: &str,
        _client_secret: &str,
        _device_code: &str,
    ) -> Result<IssuedToken> {
        self.create_token_calls.fetch_add(1, Ordering::SeqCst);
        match self.token_script.lock().unwrap().pop_front() {
            Some(Ok(access_token)) => Ok(IssuedToken { access_token }),
            Some(Err(err)) => Err(err),
            None => Ok(IssuedToken {
                access_token: "mock-access-token".to_string(),
            }),
        }
    }

    async fn list_accounts(&self, _access_token: &str) -> Result<Vec<AccountInfo>> {
        self.list_accounts_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.list_accounts_error.lock().unwrap().take() {
            return Err(err);
        }
        Ok(self.accounts.clone())
    }

    async fn list_account_roles(
        &self,
        _access_token: &str,
        account_id: &str,
    ) -> Result<Vec<RoleInfo>> {
        self.list_account_roles_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.roles.get(account_id).cloned().unwrap_or_default())
    }

    async fn get_role_credentials(
        &self,
        _access_token: &str,
        account_id: &str,
        role_name: &str,
    ) -> Result<RoleCredentials> {
        self.get_role_credentials_calls.fetch_add(1, Ordering::SeqCst);
        Ok(RoleCredentials {
            access_key_id: format!("AKIA{account_id}"),
            secret_access_key: format!("secret-{role_name}"),
            session_token: "mock-session-token".to_string(),
            expiration: 4_102_444_800_000,
        })
    }
}
