//! Session orchestration.
//!
//! [`SessionManager`] is the component everything else calls: it decides
//! whether the cached session can be reused, and when it cannot, runs the
//! lock-guarded device-authorization flow and updates the cache.

use crate::browser::UrlOpener;
use crate::cache::TokenCache;
use crate::client::DeviceAuthorization;
use crate::flow::{Clock, DeviceAuthorizationFlow};
use crate::lock::AuthorizationLock;
use crate::{Result, Session};
use std::sync::Arc;
use tracing::{debug, info};

/// Produces a valid, non-expired [`Session`] for a login URL.
///
/// Decision table for `obtain_session(U)`:
///
/// | cached session          | action                                        |
/// |-------------------------|-----------------------------------------------|
/// | none, or `loginUrl != U`| full register → authorize → poll, save        |
/// | expired, `loginUrl == U`| reuse client id/secret, authorize → poll, save|
/// | valid, `loginUrl == U`  | return as-is, no remote calls                 |
///
/// Both flow-running branches fail fast with
/// [`FlowInProgress`](crate::BrokerError::FlowInProgress) when another
/// process holds the authorization lock.
pub struct SessionManager {
    cache: TokenCache,
    lock: AuthorizationLock,
    flow: DeviceAuthorizationFlow,
    opener: Arc<dyn UrlOpener>,
    clock: Arc<dyn Clock>,
}

impl SessionManager {
    pub fn new(
        cache: TokenCache,
        lock: AuthorizationLock,
        flow: DeviceAuthorizationFlow,
        opener: Arc<dyn UrlOpener>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            cache,
            lock,
            flow,
            opener,
            clock,
        }
    }

    /// Returns a session whose access token is valid for `login_url`,
    /// running the device-authorization flow if the cache cannot serve it.
    pub async fn obtain_session(&self, login_url: &str) -> Result<Session> {
        let now = self.clock.now();
        match self.cache.load().await? {
            Some(session) if session.is_usable_for(login_url, now) => {
                debug!("reusing cached session");
                Ok(session)
            }
            Some(session) if session.login_url == login_url => {
                info!("access token expired, retrieving a new one");
                self.renew(session).await
            }
            Some(_) => {
                info!("cached session belongs to a different login URL, registering a new client");
                self.full_login(login_url).await
            }
            None => self.full_login(login_url).await,
        }
    }

    /// Discards the cached session. The caller's recovery path for a token
    /// the provider no longer accepts.
    pub async fn invalidate(&self) -> Result<()> {
        self.cache.clear().await
    }

    /// Clears the authorization lock regardless of holder (`--force`).
    pub fn force_release_lock(&self) {
        self.lock.release();
    }

    async fn full_login(&self, login_url: &str) -> Result<Session> {
        let _guard = self.lock.acquire()?;

        let registered = self.flow.register().await?;
        let authorization = self
            .authorize_and_open(&registered.client_id, &registered.client_secret, login_url)
            .await?;
        let issued = self
            .flow
            .poll(
                &registered.client_id,
                &registered.client_secret,
                &authorization.device_code,
            )
            .await?;

        let session = Session {
            client_id: registered.client_id,
            client_secret: registered.client_secret,
            client_secret_expires_at: registered.client_secret_expires_at,
            device_code: authorization.device_code,
            verification_uri_complete: authorization.verification_uri_complete,
            access_token: issued.access_token,
            access_token_expires_at: issued.expires_at,
            login_url: login_url.to_string(),
        };
        self.cache.save(&session).await?;
        Ok(session)
    }

    /// Renews an expired session in place: the client registration is kept,
    /// only a new device authorization and token are obtained.
    async fn renew(&self, mut session: Session) -> Result<Session> {
        let _guard = self.lock.acquire()?;

        let authorization = self
            .authorize_and_open(&session.client_id, &session.client_secret, &session.login_url)
            .await?;
        let issued = self
            .flow
            .poll(
                &session.client_id,
                &session.client_secret,
                &authorization.device_code,
            )
            .await?;

        session.device_code = authorization.device_code;
        session.verification_uri_complete = authorization.verification_uri_complete;
        session.access_token = issued.access_token;
        session.access_token_expires_at = issued.expires_at;
        self.cache.save(&session).await?;
        Ok(session)
    }

    async fn authorize_and_open(
        &self,
        client_id: &str,
        client_secret: &str,
        login_url: &str,
    ) -> Result<DeviceAuthorization> {
        let authorization = self
            .flow
            .authorize_device(client_id, client_secret, login_url)
            .await?;
        self.opener.open(&authorization.verification_uri_complete);
        Ok(authorization)
    }
}
