//! Shared key-value store used by the content cache and the rate limiter.
//!
//! `MemoryStore` keeps everything in-process and is only consistent within a
//! single instance; `RedisStore` (feature `redis-backend`) is shared across
//! instances.

pub mod memory;
#[cfg(feature = "redis-backend")]
pub mod redis;

pub use memory::MemoryStore;
#[cfg(feature = "redis-backend")]
pub use self::redis::RedisStore;

use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store backend error: {0}")]
    Backend(String),

    #[error("store operation timed out after {0:?}")]
    Timeout(Duration),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Outcome of one sliding-window increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowState {
    pub allowed: bool,
    pub remaining: u64,
    /// Unix milliseconds at which the current sub-window ends.
    pub reset_at_ms: i64,
}

#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()>;

    async fn del(&self, key: &str) -> StoreResult<()>;

    /// Counts one request against `key` unless the weighted count over the
    /// last `window` already reached `limit`. Check and increment happen as a
    /// single atomic step.
    async fn sliding_window(
        &self,
        key: &str,
        limit: u64,
        window: Duration,
        now_ms: i64,
    ) -> StoreResult<WindowState>;

    async fn ping(&self) -> StoreResult<()>;
}

/// Bounds a store call so an outage cannot hold a request indefinitely.
pub async fn with_timeout<T>(
    limit: Duration,
    op: impl Future<Output = StoreResult<T>>,
) -> StoreResult<T> {
    tokio::time::timeout(limit, op)
        .await
        .map_err(|_| StoreError::Timeout(limit))?
}

/// Weighted sliding-window arithmetic shared by the store backends.
///
/// The window is split into fixed sub-windows of length `window`; the count
/// from the previous sub-window is weighted by how much of it still overlaps
/// the sliding interval ending at `now_ms`.
pub(crate) fn weighted_previous(previous: u64, window_ms: i64, now_ms: i64) -> u64 {
    let elapsed = now_ms.rem_euclid(window_ms) as f64 / window_ms as f64;
    (previous as f64 * (1.0 - elapsed)).floor() as u64
}

pub(crate) fn window_index(window_ms: i64, now_ms: i64) -> i64 {
    now_ms.div_euclid(window_ms)
}
