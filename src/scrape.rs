use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::cache::ContentCache;
use crate::extractor::{ExtractionResult, Extractor};

/// Source of page content for the chat handler.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Scraper: Send + Sync {
    /// Never fails: problems are reported through `ExtractionResult::error`.
    async fn scrape(&self, url: &str) -> ExtractionResult;
}

/// Cache-first scraping: a hit returns immediately, a miss extracts and
/// writes the successful result back.
#[derive(Clone)]
pub struct ScrapeOrchestrator {
    cache: ContentCache,
    extractor: Extractor,
}

impl ScrapeOrchestrator {
    pub fn new(cache: ContentCache, extractor: Extractor) -> Self {
        Self { cache, extractor }
    }
}

#[async_trait]
impl Scraper for ScrapeOrchestrator {
    #[instrument(skip_all, fields(url = %url))]
    async fn scrape(&self, url: &str) -> ExtractionResult {
        if let Some(cached) = self.cache.get(url).await {
            return cached;
        }

        let result = self.extractor.extract(url).await;
        if result.succeeded() {
            // put() logs and swallows its own failures
            self.cache.put(url, &result).await;
        } else {
            debug!("not caching failed extraction");
        }
        result
    }
}
