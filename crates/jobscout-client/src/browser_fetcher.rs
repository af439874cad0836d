use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use jobscout_core::error::AppError;
use jobscout_core::traits::Fetcher;

use crate::fetcher::FetcherConfig;

/// Fetches pages through headless Chromium and returns the DOM after
/// scripts have run.
///
/// One Chromium process is shared by all clones. Each [`Fetcher::fetch`]
/// opens its own tab and closes it on every exit path.
#[derive(Clone)]
pub struct BrowserFetcher {
    browser: Arc<Browser>,
    timeout: Duration,
}

/// Chromium flags for an unattended headless session.
const HEADLESS_FLAGS: &[&str] = &[
    "--headless=new",
    "--disable-gpu",
    "--disable-dev-shm-usage",
    "--disable-extensions",
    "--disable-blink-features=AutomationControlled",
    "--no-first-run",
    "--mute-audio",
];

/// Checked in order when `CHROME_BIN` is unset. The snap path points at the
/// real binary behind the snap wrapper, which drops headless flags.
const CHROME_CANDIDATES: &[&str] = &[
    "/snap/chromium/current/usr/lib/chromium-browser/chrome",
    "/usr/bin/google-chrome-stable",
    "/usr/bin/google-chrome",
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
];

fn chrome_binary() -> Option<PathBuf> {
    std::env::var_os("CHROME_BIN")
        .map(PathBuf::from)
        .into_iter()
        .chain(CHROME_CANDIDATES.iter().map(PathBuf::from))
        .find(|candidate| candidate.is_file())
}

impl BrowserFetcher {
    /// Launches headless Chromium with the configured timeout, User-Agent
    /// and proxy.
    ///
    /// Uses `CHROME_BIN` or a well-known install path, falling back to
    /// `chromiumoxide`'s own lookup.
    pub async fn launch(config: &FetcherConfig) -> Result<Self, AppError> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .disable_default_args()
            .args(HEADLESS_FLAGS.iter().copied())
            .arg(format!("--user-agent={}", config.user_agent));

        if let Some(bin) = chrome_binary() {
            tracing::debug!(binary = %bin.display(), "Launching Chromium");
            builder = builder.chrome_executable(bin);
        }
        if let Some(proxy_url) = &config.proxy_url {
            builder = builder.arg(format!("--proxy-server={proxy_url}"));
        }

        let browser_config = builder
            .build()
            .map_err(|e| AppError::ConfigError(format!("invalid browser settings: {e}")))?;
        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| AppError::Generic(format!("cannot start Chromium: {e}")))?;

        // Drives the DevTools connection; pages hang if this stops.
        tokio::spawn(async move {
            while let Some(message) = handler.next().await {
                if let Err(e) = message {
                    tracing::warn!(error = %e, "Chromium DevTools connection lost");
                    break;
                }
            }
        });

        Ok(Self {
            browser: Arc::new(browser),
            timeout: config.timeout,
        })
    }

    async fn rendered_html(page: &Page) -> Result<String, AppError> {
        page.find_element("body")
            .await
            .map_err(|e| AppError::ParseError(format!("rendered page has no body: {e}")))?;
        page.content()
            .await
            .map_err(|e| AppError::HttpError(format!("cannot read rendered page: {e}")))
    }
}

impl Fetcher for BrowserFetcher {
    async fn fetch(&self, url: &str) -> Result<String, AppError> {
        let page = tokio::time::timeout(self.timeout, self.browser.new_page(url))
            .await
            .map_err(|_| AppError::Timeout(self.timeout.as_secs()))?
            .map_err(|e| AppError::HttpError(format!("Failed to navigate to {url}: {e}")))?;

        let html = match tokio::time::timeout(self.timeout, Self::rendered_html(&page)).await {
            Ok(result) => result,
            Err(_) => Err(AppError::Timeout(self.timeout.as_secs())),
        };

        if let Err(e) = page.close().await {
            tracing::debug!(%url, error = %e, "Failed to close browser tab");
        }
        html
    }
}
