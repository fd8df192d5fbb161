use async_trait::async_trait;
use redis::{AsyncCommands, Client, Script, aio::ConnectionManager};
use std::sync::LazyLock;
use std::time::Duration;

use crate::store::{KvStore, StoreError, StoreResult, WindowState, window_index};

/// Weighted sliding window over two fixed sub-window counters, evaluated
/// server-side so concurrent instances see a single atomic check-and-increment.
///
/// KEYS[1] current sub-window counter, KEYS[2] previous sub-window counter.
/// ARGV[1] limit, ARGV[2] now (ms), ARGV[3] window (ms).
/// Returns {allowed, remaining}.
const SLIDING_WINDOW_LUA: &str = r#"
local limit = tonumber(ARGV[1])
local now = tonumber(ARGV[2])
local window = tonumber(ARGV[3])

local previous = tonumber(redis.call("GET", KEYS[2]) or "0")
local current = tonumber(redis.call("GET", KEYS[1]) or "0")
local elapsed = (now % window) / window
previous = math.floor((1 - elapsed) * previous)

if previous + current >= limit then
  return {0, 0}
end

local updated = redis.call("INCR", KEYS[1])
if updated == 1 then
  redis.call("PEXPIRE", KEYS[1], window * 2 + 1000)
end
return {1, limit - (updated + previous)}
"#;

static SLIDING_WINDOW: LazyLock<Script> = LazyLock::new(|| Script::new(SLIDING_WINDOW_LUA));

impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        Self::Backend(err.to_string())
    }
}

/// Redis-backed store shared by every service instance.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    pub async fn connect(url: &str) -> StoreResult<Self> {
        let client = Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl KvStore for RedisStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.set_ex(key, value, ttl.as_secs().max(1)).await?;
        Ok(())
    }

    async fn del(&self, key: &str) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.del(key).await?;
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
        let current_key = format!("{key}:{index}");
        let previous_key = format!("{key}:{}", index - 1);

        let mut conn = self.conn.clone();
        let (allowed, remaining): (i64, i64) = SLIDING_WINDOW
            .key(current_key)
            .key(previous_key)
            .arg(limit)
            .arg(now_ms)
            .arg(window_ms)
            .invoke_async(&mut conn)
            .await?;

        Ok(WindowState {
            allowed: allowed == 1,
            remaining: remaining.max(0) as u64,
            reset_at_ms: (index + 1) * window_ms,
        })
    }

    async fn ping(&self) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        if pong == "PONG" {
            Ok(())
        } else {
            Err(StoreError::Backend(format!("unexpected PING reply: {pong}")))
        }
    }
}
