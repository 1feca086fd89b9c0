//! ssobroker - exchange an SSO browser login for short-lived AWS credentials.
//!
//! The broker drives the OAuth2 Device Authorization Grant against AWS IAM
//! Identity Center: it registers an OAuth client, sends the user to a
//! browser login, polls for the resulting access token, and trades that
//! token for role credentials which land in the standard multi-profile
//! credentials file.
//!
//! # Features
//!
//! - **Session Caching**: one browser login per eight hours, keyed by the
//!   SSO start URL
//! - **Cross-Process Safety**: a time-bound lock keeps concurrent
//!   invocations from racing through two browser logins at once
//! - **Deterministic Selection**: accounts sorted by name, fuzzy search and
//!   `#<n>` direct addressing in the pickers
//! - **Surgical Credential Writes**: one profile is replaced, every other
//!   section of the credentials file is left byte-identical
//! - **Testable Seams**: the remote API, the clock, the browser opener and
//!   the prompt are all narrow traits with scripted test doubles
//!
//! # Quick Start
//!
//! ```no_run
//! use ssobroker::browser::SystemBrowser;
//! use ssobroker::cache::TokenCache;
//! use ssobroker::client::AwsIdentityClient;
//! use ssobroker::flow::{Clock, DeviceAuthorizationFlow, SystemClock};
//! use ssobroker::lock::AuthorizationLock;
//! use ssobroker::manager::SessionManager;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> ssobroker::Result<()> {
//!     let client = Arc::new(AwsIdentityClient::new("eu-central-1").await);
//!     let clock: Arc<dyn Clock> = Arc::new(SystemClock);
//!
//!     let manager = SessionManager::new(
//!         TokenCache::new("/home/me/.aws/sso/cache/access-token.json"),
//!         AuthorizationLock::new("/tmp/ssobroker.lock"),
//!         DeviceAuthorizationFlow::new(client.clone(), clock.clone()),
//!         Arc::new(SystemBrowser::new(false)),
//!         clock,
//!     );
//!
//!     let session = manager
//!         .obtain_session("https://my-login.awsapps.com/start")
//!         .await?;
//!     println!("access token valid until {}", session.access_token_expires_at);
//!
//!     Ok(())
//! }
//! ```

pub mod browser;
pub mod cache;
pub mod client;
pub mod commands;
pub mod config;
pub mod error;
pub mod flow;
pub mod lock;
pub mod manager;
pub mod prompt;
pub mod select;
pub mod session;
pub mod store;
pub mod usage;

pub use error::{BrokerError, Result};
pub use manager::SessionManager;
pub use session::Session;
