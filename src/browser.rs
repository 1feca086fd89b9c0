//! Best-effort browser launching for the verification URL.

use tracing::{info, warn};

/// Opens a URL for the user. Best-effort by contract: implementations log
/// failures instead of returning them, since the URL is always printed and
/// the user can open it by hand.
pub trait UrlOpener: Send + Sync {
    fn open(&self, url: &str);
}

/// Opens URLs with the system default browser.
///
/// Honors the `BROWSER` environment variable when set; in headless mode the
/// URL is only logged.
pub struct SystemBrowser {
    enabled: bool,
}

impl SystemBrowser {
    pub fn new(headless: bool) -> Self {
        Self { enabled: !headless }
    }
}

impl UrlOpener for SystemBrowser {
    fn open(&self, url: &str) {
        if !self.enabled {
            info!("headless mode - open the verification URL manually");
            return;
        }

        let result = match std::env::var("BROWSER") {
            Ok(cmd) if !cmd.is_empty() => open::with(url, cmd),
            _ => open::that(url),
        };

        if let Err(e) = result {
            warn!(error = %e, "could not open browser - open the verification URL manually");
        }
    }
}

/// Opener that does nothing. Used by tests and non-interactive callers.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoBrowser;

impl UrlOpener for NoBrowser {
    fn open(&self, _url: &str) {}
}
