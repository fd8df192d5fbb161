use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::store::{
    KvStore, StoreResult, WindowState, weighted_previous, window_index,
};

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Instant,
}

#[derive(Debug, Clone, Copy)]
struct WindowCounter {
    window_ms: i64,
    index: i64,
    current: u64,
    previous: u64,
}

impl WindowCounter {
    /// A counter two or more sub-windows old contributes nothing to any future decision.
    fn is_stale(&self, now_ms: i64) -> bool {
        window_index(self.window_ms, now_ms) - self.index > 1
    }
}

/// Writes (or window increments) between full sweeps of the respective map.
const SWEEP_EVERY: u64 = 1024;

/// In-process store backed by `DashMap`.
///
/// Expired entries are dropped on read and by a sweep every `SWEEP_EVERY`
/// writes; stale window counters are swept the same way, so rotating
/// identities cannot grow the map without bound.
#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Arc<DashMap<String, Entry>>,
    windows: Arc<DashMap<String, WindowCounter>>,
    writes: Arc<AtomicU64>,
    increments: Arc<AtomicU64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of live rate-limit counters.
    pub fn window_count(&self) -> usize {
        self.windows.len()
    }

    fn sweep_entries(&self) {
        let now = Instant::now();
        self.entries.retain(|_, entry| entry.expires_at > now);
    }

    fn sweep_windows(&self, now_ms: i64) {
        self.windows.retain(|_, counter| !counter.is_stale(now_ms));
    }
}

fn sweep_due(counter: &AtomicU64) -> bool {
    (counter.fetch_add(1, Ordering::Relaxed) + 1) % SWEEP_EVERY == 0
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let now = Instant::now();
        let value = self
            .entries
            .get(key)
            .filter(|entry| entry.expires_at > now)
            .map(|entry| entry.value.clone());
        if value.is_none() {
            self.entries.remove_if(key, |_, entry| entry.expires_at <= now);
        }
        Ok(value)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()> {
        if sweep_due(&self.writes) {
            self.sweep_entries();
        }
        self.entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn del(&self, key: &str) -> StoreResult<()> {
        self.entries.remove(key);
        Ok(())
    }

    async fn sliding_window(
        &self,
        key: &str,
        limit: u64,
        window: Duration,
        now_ms: i64,
    ) -> StoreResult<WindowState> {
        let window_ms = (window.as_millis() as i64).max(1);
        let index = window_index(window_ms, now_ms);

        // must run before the entry guard below is taken
        if sweep_due(&self.increments) {
            self.sweep_windows(now_ms);
        }

        // The entry guard holds the shard lock for the whole check-and-increment.
        let mut counter = self
            .windows
            .entry(key.to_string())
            .or_insert(WindowCounter {
                window_ms,
                index,
                current: 0,
                previous: 0,
            });

        if counter.index != index {
            let previous = if counter.index == index - 1 {
                counter.current
            } else {
                0
            };
            *counter = WindowCounter {
                window_ms,
                index,
                current: 0,
                previous,
            };
        }

        let previous = weighted_previous(counter.previous, window_ms, now_ms);
        let reset_at_ms = (index + 1) * window_ms;

        if previous + counter.current >= limit {
            return Ok(WindowState {
                allowed: false,
                remaining: 0,
                reset_at_ms,
            });
        }

        counter.current += 1;
        Ok(WindowState {
            allowed: true,
            remaining: limit.saturating_sub(previous + counter.current),
            reset_at_ms,
        })
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}
