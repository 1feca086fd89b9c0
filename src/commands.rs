//! The broker's top-level actions.
//!
//! One function per CLI command, composed from the session manager, the
//! identity selector and the credential stores. This is also where the
//! discard-and-retry recovery for a rejected cached token lives: it has to
//! rerun selection as well, so it cannot sit inside the session manager.

use crate::client::{AccountInfo, IdentityClient, RoleCredentials};
use crate::config::AppConfig;
use crate::manager::SessionManager;
use crate::select::{IdentitySelector, Prompt};
use crate::store::{CredentialProfile, CredentialProcessOutput, CredentialsStore};
use crate::usage::{LastUsage, UsageCache};
use crate::{BrokerError, Result, Session};
use chrono::DateTime;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Wires the components together for one invocation.
pub struct App {
    pub manager: SessionManager,
    pub selector: IdentitySelector,
    pub client: Arc<dyn IdentityClient>,
    pub store: CredentialsStore,
    pub usage: UsageCache,
    /// Region written into every credentials profile.
    pub region: String,
}

impl App {
    /// Interactive login: pick an account and role, persist the resulting
    /// credentials, remember the pick for `refresh`.
    pub async fn login(&self, login_url: &str, profile: &str, prompt: &dyn Prompt) -> Result<()> {
        let (session, accounts) = self.accounts_with_recovery(login_url).await?;

        let account = self.selector.select_account(&accounts, prompt)?;
        let roles = self.selector.list_roles(&session, account).await?;
        let role = self.selector.select_role(&roles, prompt)?;

        let credentials = self
            .client
            .get_role_credentials(&session.access_token, &account.account_id, &role.role_name)
            .await?;

        self.store
            .write_profile(profile, &self.keys_profile(&credentials))?;
        self.usage
            .save(&LastUsage {
                account_id: account.account_id.clone(),
                account_name: account.account_name.clone(),
                role_name: role.role_name.clone(),
            })
            .await?;

        info!(
            account = %account.account_name,
            role = %role.role_name,
            "credentials retrieved"
        );
        log_expiry(&credentials);
        Ok(())
    }

    /// Non-interactive assumption of a specific account/role pair.
    ///
    /// With `persist` the credentials themselves are written; otherwise the
    /// profile delegates to `ssobroker assume -q ...` via
    /// `credential_process` and the credentials are printed to stdout in the
    /// credential-process JSON shape.
    pub async fn assume(
        &self,
        login_url: &str,
        profile: &str,
        account_id: &str,
        role_name: &str,
        persist: bool,
    ) -> Result<()> {
        let credentials = self
            .role_credentials_with_recovery(login_url, account_id, role_name)
            .await?;

        if persist {
            self.store
                .write_profile(profile, &self.keys_profile(&credentials))?;
            info!(account = account_id, role = role_name, "credentials retrieved");
            log_expiry(&credentials);
        } else {
            let exe = std::env::current_exe()?;
            self.store.write_profile(
                profile,
                &CredentialProfile::Process {
                    command: format!(
                        "{} assume -q -a {} -n {}",
                        exe.display(),
                        account_id,
                        role_name
                    ),
                    region: self.region.clone(),
                },
            )?;

            let output = CredentialProcessOutput::from_credentials(&credentials);
            println!("{}", serde_json::to_string(&output)?);
        }

        Ok(())
    }

    /// Renews credentials for the last used account/role without prompting;
    /// falls back to the interactive login when nothing was recorded yet.
    pub async fn refresh(&self, login_url: &str, profile: &str, prompt: &dyn Prompt) -> Result<()> {
        let Some(last) = self.usage.load().await? else {
            info!("nothing to refresh yet");
            return self.login(login_url, profile, prompt).await;
        };

        info!(
            account = %last.account_name,
            role = %last.role_name,
            "refreshing credentials for the last used account and role"
        );

        let credentials = self
            .role_credentials_with_recovery(login_url, &last.account_id, &last.role_name)
            .await?;
        self.store
            .write_profile(profile, &self.keys_profile(&credentials))?;

        log_expiry(&credentials);
        Ok(())
    }

    /// Obtains a session and lists its accounts, discarding the cache and
    /// retrying exactly once when the provider rejects the cached token.
    async fn accounts_with_recovery(
        &self,
        login_url: &str,
    ) -> Result<(Session, Vec<AccountInfo>)> {
        let session = self.manager.obtain_session(login_url).await?;
        match self.selector.list_accounts(&session).await {
            Ok(accounts) => Ok((session, accounts)),
            Err(BrokerError::Unauthorized(message)) => {
                warn!(%message, "cached access token was rejected, logging in from scratch");
                self.manager.invalidate().await?;
                let session = self.manager.obtain_session(login_url).await?;
                let accounts = self.selector.list_accounts(&session).await?;
                Ok((session, accounts))
            }
            Err(e) => Err(e),
        }
    }

    /// Same retry-once recovery for the direct credential fetch.
    async fn role_credentials_with_recovery(
        &self,
        login_url: &str,
        account_id: &str,
        role_name: &str,
    ) -> Result<RoleCredentials> {
        let session = self.manager.obtain_session(login_url).await?;
        match self
            .client
            .get_role_credentials(&session.access_token, account_id, role_name)
            .await
        {
            Ok(credentials) => Ok(credentials),
            Err(BrokerError::Unauthorized(message)) => {
                warn!(%message, "cached access token was rejected, logging in from scratch");
                self.manager.invalidate().await?;
                let session = self.manager.obtain_session(login_url).await?;
                self.client
                    .get_role_credentials(&session.access_token, account_id, role_name)
                    .await
            }
            Err(e) => Err(e),
        }
    }

    fn keys_profile(&self, credentials: &RoleCredentials) -> CredentialProfile {
        CredentialProfile::Keys {
            access_key_id: credentials.access_key_id.clone(),
            secret_access_key: credentials.secret_access_key.clone(),
            session_token: credentials.session_token.clone(),
            region: self.region.clone(),
        }
    }
}

/// `config generate`: prompt for everything, overwrite the config file.
pub fn generate_config(config_file: &Path, prompt: &dyn Prompt) -> Result<()> {
    AppConfig::default().prompt_values(prompt)?.save(config_file)
}

/// `config edit`: prompt with the current values as defaults.
pub fn edit_config(config_file: &Path, prompt: &dyn Prompt) -> Result<()> {
    let current = AppConfig::load(config_file)?.unwrap_or_default();
    current.prompt_values(prompt)?.save(config_file)
}

fn log_expiry(credentials: &RoleCredentials) {
    if let Some(expires) = DateTime::from_timestamp_millis(credentials.expiration) {
        info!("credentials expire at {}", expires.to_rfc3339());
    }
}
