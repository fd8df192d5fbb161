use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::{
    cache::ContentCache,
    chat::{CompletionClient, OpenAiCompatClient},
    config::Config,
    extractor::Extractor,
    fetcher::{BrowserFetcher, FetchBackend, HttpFetcher, PageFetcher},
    middleware::rate_limit::RateLimit,
    scrape::{ScrapeOrchestrator, Scraper},
    store::{KvStore, MemoryStore},
};

/// Completion calls include model latency, so they get a longer bound than page fetches.
const COMPLETION_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Clone)]
pub struct AppState {
    pub scraper: Arc<dyn Scraper>,
    pub completion: Arc<dyn CompletionClient>,
    pub store: Arc<dyn KvStore>,
    pub rate_limit: RateLimit,
    pub store_timeout: Duration,
}

impl AppState {
    /// Wires the production dependencies described by `config`.
    pub async fn from_config(config: &Config) -> anyhow::Result<Self> {
        let store = connect_store(config).await?;

        let fetcher: Arc<dyn PageFetcher> = match config.fetch_backend() {
            FetchBackend::Browser => Arc::new(BrowserFetcher::new(
                config.chrome_executable().cloned(),
                config.navigation_timeout(),
            )),
            FetchBackend::Http => Arc::new(HttpFetcher::new(config.navigation_timeout())?),
        };
        info!(backend = ?config.fetch_backend(), "page fetcher ready");

        let scraper = ScrapeOrchestrator::new(
            ContentCache::new(store.clone(), config.store_timeout()),
            Extractor::new(fetcher, config.allow_private_hosts()),
        );

        let completion = OpenAiCompatClient::new(
            config.completion_base_url(),
            config.completion_api_key().map(str::to_string),
            config.completion_model(),
            COMPLETION_TIMEOUT,
        )?;
        if config.completion_api_key().is_none() {
            warn!("COMPLETION_API_KEY not set, completion requests will be unauthenticated");
        }

        Ok(Self::new(
            Arc::new(scraper),
            Arc::new(completion),
            store,
            config,
        ))
    }

    /// Assembles state from already-built parts; the rate limiter shares `store`.
    pub fn new(
        scraper: Arc<dyn Scraper>,
        completion: Arc<dyn CompletionClient>,
        store: Arc<dyn KvStore>,
        config: &Config,
    ) -> Self {
        let rate_limit = RateLimit::new(
            store.clone(),
            config.rate_limit_max_requests(),
            config.rate_limit_window(),
            config.store_timeout(),
        );
        Self {
            scraper,
            completion,
            store,
            rate_limit,
            store_timeout: config.store_timeout(),
        }
    }
}

#[cfg(feature = "redis-backend")]
async fn connect_store(config: &Config) -> anyhow::Result<Arc<dyn KvStore>> {
    match config.redis_url() {
        Some(url) => {
            let store = crate::store::RedisStore::connect(url).await?;
            info!("using redis store");
            Ok(Arc::new(store))
        }
        None => {
            warn!("REDIS_URL not set, using in-process store (single instance only)");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

#[cfg(not(feature = "redis-backend"))]
async fn connect_store(config: &Config) -> anyhow::Result<Arc<dyn KvStore>> {
    if config.redis_url().is_some() {
        anyhow::bail!(
            "REDIS_URL is set but this build lacks the `redis-backend` feature; \
             refusing to fall back to a per-process store"
        );
    }
    warn!("REDIS_URL not set, using in-process store (single instance only)");
    Ok(Arc::new(MemoryStore::new()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_without_redis_url() {
        assert!(connect_store(&Config::default()).await.is_ok());
    }

    #[cfg(not(feature = "redis-backend"))]
    #[tokio::test]
    async fn test_redis_url_without_backend_is_fatal() {
        let config = Config::default().with_redis_url("redis://cache:6379");
        let err = connect_store(&config).await.err().unwrap();
        assert!(err.to_string().contains("redis-backend"));
    }
}
