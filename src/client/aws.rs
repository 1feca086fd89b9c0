//! AWS SSO / SSO-OIDC implementation of the identity client.
//!
//! Uses the official AWS SDK with anonymous credentials - the whole point of
//! the broker is that no credentials exist yet. Only the region needs to be
//! known up front.

use crate::client::{
    AccountInfo, DeviceAuthorization, IdentityClient, IssuedToken, RegisteredClient,
    RoleCredentials, RoleInfo,
};
use crate::{BrokerError, Result};
use async_trait::async_trait;
use aws_sdk_ssooidc::error::DisplayErrorContext;

/// Identity client backed by the AWS SSO and SSO-OIDC services.
pub struct AwsIdentityClient {
    oidc: aws_sdk_ssooidc::Client,
    sso: aws_sdk_sso::Client,
}

const GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:device_code";

impl AwsIdentityClient {
    /// Builds SDK clients for `region` with anonymous credentials.
    pub async fn new(region: impl Into<String>) -> Self {
        let config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(region.into()))
            .no_credentials()
            .load()
            .await;

        Self {
            oidc: aws_sdk_ssooidc::Client::new(&config),
            sso: aws_sdk_sso::Client::new(&config),
        }
    }
}

fn missing(operation: &'static str, field: &str) -> BrokerError {
    BrokerError::remote(operation, format!("response missing {field}"))
}

#[async_trait]
impl IdentityClient for AwsIdentityClient {
    async fn register_client(
        &self,
        client_name: &str,
        client_type: &str,
    ) -> Result<RegisteredClient> {
        let out = self
            .oidc
            .register_client()
            .client_name(client_name)
            .client_type(client_type)
            .send()
            .await
            .map_err(|e| {
                BrokerError::remote("register-client", DisplayErrorContext(&e).to_string())
            })?;

        Ok(RegisteredClient {
            client_id: out
                .client_id
                .ok_or_else(|| missing("register-client", "client id"))?,
            client_secret: out
                .client_secret
                .ok_or_else(|| missing("register-client", "client secret"))?,
            client_secret_expires_at: out.client_secret_expires_at,
        })
    }

    async fn start_device_authorization(
        &self,
        client_id: &str,
        client_secret: &str,
        start_url: &str,
    ) -> Result<DeviceAuthorization> {
        let out = self
            .oidc
            .start_device_authorization()
            .client_id(client_id)
            .client_secret(client_secret)
            .start_url(start_url)
            .send()
            .await
            .map_err(|e| {
                BrokerError::remote("start-device-authorization", DisplayErrorContext(&e).to_string())
            })?;

        Ok(DeviceAuthorization {
            device_code: out
                .device_code
                .ok_or_else(|| missing("start-device-authorization", "device code"))?,
            verification_uri_complete: out
                .verification_uri_complete
                .ok_or_else(|| missing("start-device-authorization", "verification URI"))?,
        })
    }

    async fn create_token(
        &self,
        client_id: &str,
        client_secret: &str,
        device_code: &str,
    ) -> Result<IssuedToken> {
        match self
            .oidc
            .create_token()
            .client_id(client_id)
            .client_secret(client_secret)
            .device_code(device_code)
            .grant_type(GRANT_TYPE)
            .send()
            .await
        {
            Ok(out) => Ok(IssuedToken {
                access_token: out
                    .access_token
                    .ok_or_else(|| missing("create-token", "access token"))?,
            }),
            Err(err) => {
                let service = err.into_service_error();
                if service.is_authorization_pending_exception() {
                    return Err(BrokerError::AuthorizationPending);
                }
                Err(BrokerError::remote(
                    "create-token",
                    DisplayErrorContext(&service).to_string(),
                ))
            }
        }
    }

    async fn list_accounts(&self, access_token: &str) -> Result<Vec<AccountInfo>> {
        let mut accounts = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let mut request = self.sso.list_accounts().access_token(access_token);
            if let Some(token) = next_token {
                request = request.next_token(token);
            }

            let out = request.send().await.map_err(|err| {
                let service = err.into_service_error();
                if service.is_unauthorized_exception() {
                    BrokerError::Unauthorized(DisplayErrorContext(&service).to_string())
                } else {
                    BrokerError::remote("list-accounts", DisplayErrorContext(&service).to_string())
                }
            })?;

            for account in out.account_list.unwrap_or_default() {
                let (Some(account_id), Some(account_name)) =
                    (account.account_id, account.account_name)
                else {
                    continue;
                };
                accounts.push(AccountInfo {
                    account_id,
                    account_name,
                });
            }

            next_token = out.next_token;
            if next_token.is_none() {
                break;
            }
        }

        Ok(accounts)
    }

    async fn list_account_roles(
        &self,
        access_token: &str,
        account_id: &str,
    ) -> Result<Vec<RoleInfo>> {
        let mut roles = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let mut request = self
                .sso
                .list_account_roles()
                .access_token(access_token)
                .account_id(account_id);
            if let Some(token) = next_token {
                request = request.next_token(token);
            }

            let out = request.send().await.map_err(|err| {
                let service = err.into_service_error();
                if service.is_unauthorized_exception() {
                    BrokerError::Unauthorized(DisplayErrorContext(&service).to_string())
                } else {
                    BrokerError::remote(
                        "list-account-roles",
                        DisplayErrorContext(&service).to_string(),
                    )
                }
            })?;

            for role in out.role_list.unwrap_or_default() {
                if let Some(role_name) = role.role_name {
                    roles.push(RoleInfo { role_name });
                }
            }

            next_token = out.next_token;
            if next_token.is_none() {
                break;
            }
        }

        Ok(roles)
    }

    async fn get_role_credentials(
        &self,
        access_token: &str,
        account_id: &str,
        role_name: &str,
    ) -> Result<RoleCredentials> {
        let out = self
            .sso
            .get_role_credentials()
            .access_token(access_token)
            .account_id(account_id)
            .role_name(role_name)
            .send()
            .await
            .map_err(|err| {
                let service = err.into_service_error();
                if service.is_unauthorized_exception() {
                    BrokerError::Unauthorized(DisplayErrorContext(&service).to_string())
                } else {
                    BrokerError::remote(
                        "get-role-credentials",
                        DisplayErrorContext(&service).to_string(),
                    )
                }
            })?;

        let creds = out
            .role_credentials
            .ok_or_else(|| missing("get-role-credentials", "credentials"))?;

        Ok(RoleCredentials {
            access_key_id: creds
                .access_key_id
                .ok_or_else(|| missing("get-role-credentials", "access key id"))?,
            secret_access_key: creds
                .secret_access_key
                .ok_or_else(|| missing("get-role-credentials", "secret access key"))?,
            session_token: creds
                .session_token
                .ok_or_else(|| missing("get-role-credentials", "session token"))?,
            expiration: creds.expiration,
        })
    }
}
