//! CLI entry point.

use clap::{Parser, Subcommand};
use ssobroker::browser::SystemBrowser;
use ssobroker::cache::TokenCache;
use ssobroker::client::AwsIdentityClient;
use ssobroker::commands::{self, App};
use ssobroker::config::{AppConfig, Paths};
use ssobroker::flow::{Clock, DeviceAuthorizationFlow, SystemClock};
use ssobroker::lock::AuthorizationLock;
use ssobroker::manager::SessionManager;
use ssobroker::prompt::TerminalPrompt;
use ssobroker::select::IdentitySelector;
use ssobroker::store::CredentialsStore;
use ssobroker::usage::UsageCache;
use ssobroker::Result;
use std::sync::Arc;
use tracing::error;
use tracing_subscriber::EnvFilter;

const DEFAULT_REGION: &str = "eu-central-1";

/// Retrieve short-lived AWS credentials via SSO and the OIDC device grant.
#[derive(Debug, Parser)]
#[command(name = "ssobroker", version, about)]
struct Cli {
    /// SSO start URL, e.g. https://my-login.awsapps.com/start#/
    /// (falls back to the config file)
    #[arg(short = 'u', long, global = true)]
    start_url: Option<String>,

    /// AWS region the SSO endpoints live in (falls back to the config file)
    #[arg(short, long, global = true)]
    region: Option<String>,

    /// Credentials profile to write
    #[arg(short, long, global = true, default_value = "default")]
    profile: String,

    /// Clear a stuck authorization lock before starting
    #[arg(long, global = true)]
    force: bool,

    /// Never open a browser; only log the verification URL
    #[arg(long, global = true)]
    headless: bool,

    /// Verbose logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Interactively select an account and role (the default command)
    Login,
    /// Assume a specific account and role without prompting
    Assume {
        /// Account id to assume into
        #[arg(short = 'a', long)]
        account_id: String,
        /// Role name to assume
        #[arg(short = 'n', long)]
        role_name: String,
        /// Write the credentials themselves instead of a credential_process entry
        #[arg(long)]
        persist: bool,
        /// Log nothing but errors; used by credential_process invocations
        #[arg(short, long)]
        quiet: bool,
    },
    /// Renew credentials for the last used account and role
    Refresh,
    /// Manage the config file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, Subcommand)]
enum ConfigAction {
    /// Generate the config file, prompting for every value
    Generate,
    /// Edit the config file, prompting with current values as defaults
    Edit,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let quiet = matches!(cli.command, Some(Command::Assume { quiet: true, .. }));
    let default_filter = if quiet {
        "error"
    } else if cli.debug {
        "debug"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with_target(false)
        .init();

    if let Err(e) = run(cli).await {
        error!("{e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let paths = Paths::resolve()?;
    let prompt = TerminalPrompt;

    if let Some(Command::Config { action }) = &cli.command {
        return match action {
            ConfigAction::Generate => commands::generate_config(&paths.config_file, &prompt),
            ConfigAction::Edit => commands::edit_config(&paths.config_file, &prompt),
        };
    }

    let config = AppConfig::load(&paths.config_file)?.unwrap_or_default();
    let start_url = cli
        .start_url
        .or_else(|| non_empty(config.start_url))
        .ok_or_else(|| {
            anyhow::anyhow!(
                "no SSO start URL configured - pass --start-url or run `ssobroker config generate`"
            )
        })?;
    let region = cli
        .region
        .or_else(|| non_empty(config.region))
        .unwrap_or_else(|| DEFAULT_REGION.to_string());

    let client = Arc::new(AwsIdentityClient::new(region.clone()).await);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let manager = SessionManager::new(
        TokenCache::new(&paths.token_cache),
        AuthorizationLock::new(&paths.lock_file),
        DeviceAuthorizationFlow::new(client.clone(), clock.clone()),
        Arc::new(SystemBrowser::new(cli.headless)),
        clock,
    );

    if cli.force {
        manager.force_release_lock();
    }

    let app = App {
        manager,
        selector: IdentitySelector::new(client.clone()),
        client,
        store: CredentialsStore::new(&paths.credentials_file),
        usage: UsageCache::new(&paths.last_usage),
        region,
    };

    match cli.command {
        None | Some(Command::Login) => app.login(&start_url, &cli.profile, &prompt).await,
        Some(Command::Assume {
            account_id,
            role_name,
            persist,
            quiet: _,
        }) => {
            app.assume(&start_url, &cli.profile, &account_id, &role_name, persist)
                .await
        }
        Some(Command::Refresh) => app.refresh(&start_url, &cli.profile, &prompt).await,
        // Handled before the components were built.
        Some(Command::Config { .. }) => Ok(()),
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}
