#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use chrono::Utc;
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};
use std::time::Duration;
use url::Url;

use pagechat::{
    app_state::AppState,
    cache::ContentCache,
    chat::{ChatMessage, CompletionClient, CompletionError},
    config::Config,
    extractor::Extractor,
    fetcher::{FetchError, PageFetcher, RenderedPage},
    router::build_router,
    scrape::ScrapeOrchestrator,
    store::MemoryStore,
};

/// Serves the same HTML for every URL and counts calls.
pub struct StubFetcher {
    html: String,
    calls: AtomicUsize,
    requested: Mutex<Vec<String>>,
}

impl StubFetcher {
    pub fn new(html: &str) -> Self {
        Self {
            html: html.to_string(),
            calls: AtomicUsize::new(0),
            requested: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageFetcher for StubFetcher {
    async fn fetch_html(&self, url: &Url) -> Result<RenderedPage, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requested.lock().unwrap().push(url.to_string());
        Ok(RenderedPage {
            url_final: url.clone(),
            html: self.html.clone(),
            fetched_at: Utc::now(),
        })
    }
}

/// Records every conversation and replies with a fixed answer, or fails.
pub struct StubCompletion {
    reply: Option<String>,
    seen: Mutex<Vec<Vec<ChatMessage>>>,
}

impl StubCompletion {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Some(reply.to_string()),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            reply: None,
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn conversations(&self) -> Vec<Vec<ChatMessage>> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionClient for StubCompletion {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, CompletionError> {
        self.seen.lock().unwrap().push(messages.to_vec());
        self.reply
            .clone()
            .ok_or_else(|| CompletionError::Request("upstream exploded at 10.1.2.3".to_string()))
    }
}

pub struct TestApp {
    pub router: Router,
    pub fetcher: Arc<StubFetcher>,
    pub completion: Arc<StubCompletion>,
    pub store: MemoryStore,
}

/// Full router over an in-memory store, stub fetcher and stub completion backend.
pub fn test_app(html: &str, completion: StubCompletion) -> TestApp {
    let store = MemoryStore::new();
    let fetcher = Arc::new(StubFetcher::new(html));
    let completion = Arc::new(completion);
    let config = Config::default();

    let scraper = ScrapeOrchestrator::new(
        ContentCache::new(Arc::new(store.clone()), Duration::from_secs(1)),
        Extractor::new(fetcher.clone(), true),
    );
    let state = AppState::new(
        Arc::new(scraper),
        completion.clone(),
        Arc::new(store.clone()),
        &config,
    );

    TestApp {
        router: build_router(state),
        fetcher,
        completion,
        store,
    }
}
