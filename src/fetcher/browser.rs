//! Headless Chromium page rendering.
//!
//! Every call launches its own browser with a throwaway profile directory and
//! tears it down before returning, so no cookies, storage or memory survive
//! from one request to the next.

use async_trait::async_trait;
use chrono::Utc;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::NavigateParams;
use chromiumoxide::page::Page;
use futures_util::StreamExt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tracing::{debug, instrument, warn};
use url::Url;

use crate::fetcher::{PageFetcher, errors::FetchError, types::RenderedPage};

const LAUNCH_TIMEOUT: Duration = Duration::from_secs(20);
const READY_POLL_INTERVAL: Duration = Duration::from_millis(100);
/// Upper bound on a graceful close plus reap before the process is killed.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// True once the navigated document has finished its initial parse
/// (DOMContentLoaded), without waiting for subresources.
const DOM_READY_PROBE: &str =
    "document.location.href !== 'about:blank' && document.readyState !== 'loading'";

#[derive(Debug, Clone)]
pub struct BrowserFetcher {
    executable: Option<PathBuf>,
    navigation_timeout: Duration,
}

impl BrowserFetcher {
    pub fn new(executable: Option<PathBuf>, navigation_timeout: Duration) -> Self {
        Self {
            executable,
            navigation_timeout,
        }
    }
}

#[async_trait]
impl PageFetcher for BrowserFetcher {
    #[instrument(skip_all, fields(url = %url))]
    async fn fetch_html(&self, url: &Url) -> Result<RenderedPage, FetchError> {
        let session = timeout(
            LAUNCH_TIMEOUT,
            BrowserSession::launch(self.executable.as_deref()),
        )
        .await
        .map_err(|_| FetchError::BrowserLaunch("launch timed out".to_string()))??;

        let outcome = timeout(self.navigation_timeout, session.render(url)).await;
        session.close().await;

        match outcome {
            Ok(result) => result,
            Err(_) => Err(FetchError::NavigationTimeout(
                self.navigation_timeout.as_millis() as u64,
            )),
        }
    }
}

/// One launched browser plus the task pumping its DevTools events.
///
/// `close` is the orderly shutdown, bounded by `CLOSE_TIMEOUT` and falling
/// back to killing the process. If the owning future is dropped first
/// (caller cancelled), `Drop` aborts the event task and chromiumoxide kills
/// the child process, and the profile directory is removed with `_profile`.
struct BrowserSession {
    browser: Browser,
    events: JoinHandle<()>,
    _profile: TempDir,
}

impl BrowserSession {
    async fn launch(executable: Option<&Path>) -> Result<Self, FetchError> {
        let profile = TempDir::new().map_err(|e| FetchError::BrowserLaunch(e.to_string()))?;

        let mut builder = BrowserConfig::builder()
            .user_data_dir(profile.path())
            .no_sandbox()
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--mute-audio");
        if let Some(path) = executable {
            builder = builder.chrome_executable(path);
        }
        let config = builder.build().map_err(FetchError::BrowserLaunch)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| FetchError::BrowserLaunch(e.to_string()))?;

        let events = tokio::spawn(async move {
            // a single bad event must not stop the pump, or close() never hears back
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("browser handler event error: {e}");
                    continue;
                }
            }
        });

        Ok(Self {
            browser,
            events,
            _profile: profile,
        })
    }

    async fn render(&self, url: &Url) -> Result<RenderedPage, FetchError> {
        let page = self.browser.new_page("about:blank").await?;

        let navigation = page
            .execute(NavigateParams::new(url.as_str()))
            .await
            .map_err(|e| FetchError::Navigation(e.to_string()))?;
        if let Some(error_text) = navigation.result.error_text.as_ref() {
            return Err(FetchError::Navigation(error_text.clone()));
        }

        wait_for_dom_ready(&page).await;

        let html = page.content().await?;
        let url_final = page
            .url()
            .await?
            .and_then(|current| Url::parse(&current).ok())
            .unwrap_or_else(|| url.clone());

        Ok(RenderedPage {
            url_final,
            html,
            fetched_at: Utc::now(),
        })
    }

    async fn close(mut self) {
        let browser = &mut self.browser;
        let graceful = async {
            browser.close().await.map_err(|e| e.to_string())?;
            browser.wait().await.map_err(|e| e.to_string())?;
            Ok::<(), String>(())
        };
        if let Err(reason) = within_close_limit(graceful, CLOSE_TIMEOUT).await {
            warn!(%reason, "browser did not shut down cleanly, killing it");
            if let Some(Err(e)) = self.browser.kill().await {
                warn!(error = %e, "failed to kill browser process");
            }
        }
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        self.events.abort();
    }
}

/// Runs a graceful shutdown under `limit`. An error means the caller has to
/// fall back to killing the process.
async fn within_close_limit<F>(graceful: F, limit: Duration) -> Result<(), String>
where
    F: Future<Output = Result<(), String>>,
{
    match timeout(limit, graceful).await {
        Ok(result) => result,
        Err(_) => Err(format!(
            "browser did not exit within {}ms",
            limit.as_millis()
        )),
    }
}

async fn wait_for_dom_ready(page: &Page) {
    loop {
        let ready = page
            .evaluate(DOM_READY_PROBE)
            .await
            .ok()
            .and_then(|result| result.into_value::<bool>().ok())
            .unwrap_or(false);
        if ready {
            return;
        }
        sleep(READY_POLL_INTERVAL).await;
    }
}
