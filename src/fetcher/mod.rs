pub mod browser;
pub mod client;
pub mod errors;
pub mod pipeline;
pub mod ssrf;
pub mod types;

pub use browser::BrowserFetcher;
pub use client::HttpFetcher;
pub use errors::FetchError;
pub use types::{PageResponse, RenderedPage};

use async_trait::async_trait;
use std::str::FromStr;
use url::Url;

/// Acquires the rendered HTML of one page.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_html(&self, url: &Url) -> Result<RenderedPage, FetchError>;
}

/// Which `PageFetcher` the service runs with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchBackend {
    /// Headless Chromium, one disposable browser per call.
    Browser,
    /// Plain HTTP GET; no script execution.
    Http,
}

impl FromStr for FetchBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "browser" => Ok(Self::Browser),
            "http" => Ok(Self::Http),
            other => Err(format!("unknown fetch backend '{other}' (expected browser or http)")),
        }
    }
}
