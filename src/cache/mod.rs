//! Content Cache: extraction results keyed by URL, with schema checks on
//! both the read and write paths.
//!
//! Reads treat anything that does not match the stored schema as corrupt:
//! the entry is deleted and the caller sees a miss. Writes are best-effort;
//! an invalid or oversize result is skipped and logged, never surfaced.

use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::extractor::ExtractionResult;
use crate::store::{KvStore, with_timeout};

pub const CACHE_KEY_PREFIX: &str = "ws:";
pub const MAX_KEY_URL_CHARS: usize = 200;
pub const CACHE_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);
pub const MAX_ENTRY_BYTES: usize = 1_000_000;

/// Store key for `url`. URLs sharing their first 200 characters share a key.
pub fn cache_key(url: &str) -> String {
    let prefix: String = url.chars().take(MAX_KEY_URL_CHARS).collect();
    format!("{CACHE_KEY_PREFIX}{prefix}")
}

#[derive(Debug, Clone, PartialEq)]
pub enum Validation {
    Valid(ExtractionResult),
    Invalid(String),
}

/// Checks a decoded value against the cached-result schema: string `url`,
/// `title` and `content`, object `headings` with string `h1`/`h2`, and
/// `error` that is null or a string.
pub fn validate(value: &Value) -> Validation {
    let Some(obj) = value.as_object() else {
        return Validation::Invalid("not an object".to_string());
    };

    for field in ["url", "title", "content"] {
        if !obj.get(field).is_some_and(Value::is_string) {
            return Validation::Invalid(format!("`{field}` must be a string"));
        }
    }

    let Some(headings) = obj.get("headings").and_then(Value::as_object) else {
        return Validation::Invalid("`headings` must be an object".to_string());
    };
    for field in ["h1", "h2"] {
        if !headings.get(field).is_some_and(Value::is_string) {
            return Validation::Invalid(format!("`headings.{field}` must be a string"));
        }
    }

    match obj.get("error") {
        Some(Value::Null | Value::String(_)) => {}
        _ => return Validation::Invalid("`error` must be null or a string".to_string()),
    }

    match serde_json::from_value(value.clone()) {
        Ok(result) => Validation::Valid(result),
        Err(e) => Validation::Invalid(e.to_string()),
    }
}

/// Parses and validates a raw stored payload.
pub fn decode(raw: &str) -> Validation {
    match serde_json::from_str::<Value>(raw) {
        Ok(value) => validate(&value),
        Err(e) => Validation::Invalid(format!("malformed json: {e}")),
    }
}

#[derive(Clone)]
pub struct ContentCache {
    store: Arc<dyn KvStore>,
    op_timeout: Duration,
}

impl ContentCache {
    pub fn new(store: Arc<dyn KvStore>, op_timeout: Duration) -> Self {
        Self { store, op_timeout }
    }

    #[instrument(skip_all, fields(url = %url))]
    pub async fn get(&self, url: &str) -> Option<ExtractionResult> {
        let key = cache_key(url);

        let raw = match with_timeout(self.op_timeout, self.store.get(&key)).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!("cache miss");
                return None;
            }
            Err(e) => {
                warn!(error = %e, "cache read failed");
                return None;
            }
        };

        match decode(&raw) {
            Validation::Valid(result) => {
                match result
                    .cached_at
                    .and_then(|at| Utc::now().timestamp_millis().checked_sub(at))
                {
                    Some(age_ms) => info!(age_minutes = age_ms / 60_000, "cache hit"),
                    None => info!("cache hit"),
                }
                Some(result)
            }
            Validation::Invalid(reason) => {
                warn!(%reason, "evicting corrupt cache entry");
                if let Err(e) = with_timeout(self.op_timeout, self.store.del(&key)).await {
                    warn!(error = %e, "failed to evict corrupt cache entry");
                }
                None
            }
        }
    }

    /// Stamps `cached_at` and stores `result` for the cache TTL. Never fails the caller.
    #[instrument(skip_all, fields(url = %url))]
    pub async fn put(&self, url: &str, result: &ExtractionResult) {
        let mut entry = result.clone();
        entry.cached_at = Some(Utc::now().timestamp_millis());

        let serialized = match serde_json::to_value(&entry) {
            Ok(value) => match validate(&value) {
                Validation::Valid(_) => value.to_string(),
                Validation::Invalid(reason) => {
                    warn!(%reason, "refusing to cache invalid content");
                    return;
                }
            },
            Err(e) => {
                warn!(error = %e, "failed to serialize content for cache");
                return;
            }
        };

        self.store_serialized(url, &serialized).await;
    }

    async fn store_serialized(&self, url: &str, serialized: &str) {
        if serialized.len() > MAX_ENTRY_BYTES {
            warn!(
                size = serialized.len(),
                max = MAX_ENTRY_BYTES,
                "content exceeds cache entry limit, not caching"
            );
            return;
        }

        let key = cache_key(url);
        match with_timeout(self.op_timeout, self.store.set_ex(&key, serialized, CACHE_TTL)).await {
            Ok(()) => debug!(size = serialized.len(), "content cached"),
            Err(e) => warn!(error = %e, "cache write failed"),
        }
    }
}
