pub mod model;
pub mod reader;

#[cfg(test)]
mod tests;

pub use model::{ExtractionResult, Headings, MAX_CONTENT_LENGTH, normalize_whitespace};

use std::sync::Arc;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::fetcher::{FetchError, PageFetcher, ssrf};

/// Text Extractor: fetches one URL and reduces it to an `ExtractionResult`.
///
/// Never fails; every error is folded into `ExtractionResult::error`.
#[derive(Clone)]
pub struct Extractor {
    fetcher: Arc<dyn PageFetcher>,
    allow_private_hosts: bool,
}

impl Extractor {
    pub fn new(fetcher: Arc<dyn PageFetcher>, allow_private_hosts: bool) -> Self {
        Self {
            fetcher,
            allow_private_hosts,
        }
    }

    #[instrument(skip_all, fields(url = %url))]
    pub async fn extract(&self, url: &str) -> ExtractionResult {
        match self.fetch(url).await {
            Ok(html) => {
                let result = reader::reduce(&html, url);
                debug!(content_len = result.content.len(), "extracted page");
                result
            }
            Err(e) => {
                warn!(error = %e, retriable = e.should_retry(), "extraction failed");
                ExtractionResult::failed(e)
            }
        }
    }

    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let parsed = Url::parse(url)?;
        if !self.allow_private_hosts {
            ssrf::check_url(&parsed).await?;
        }
        let page = self.fetcher.fetch_html(&parsed).await?;
        Ok(page.html)
    }
}
