//! Runtime configuration.
//!
//! Every setting comes from an environment variable with a development
//! default, so `Config::from_env()` works on a bare checkout. Numeric and
//! boolean values are validated up front; a bad value stops startup with a
//! `ConfigError` instead of surfacing later as odd runtime behavior.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::fetcher::FetchBackend;

pub const ENV_BIND_ADDR: &str = "BIND_ADDR";
pub const ENV_REDIS_URL: &str = "REDIS_URL";
pub const ENV_COMPLETION_BASE_URL: &str = "COMPLETION_BASE_URL";
pub const ENV_COMPLETION_API_KEY: &str = "COMPLETION_API_KEY";
pub const ENV_COMPLETION_MODEL: &str = "COMPLETION_MODEL";
pub const ENV_FETCH_BACKEND: &str = "FETCH_BACKEND";
pub const ENV_CHROME_EXECUTABLE_PATH: &str = "CHROME_EXECUTABLE_PATH";
pub const ENV_NAVIGATION_TIMEOUT_MS: &str = "NAVIGATION_TIMEOUT_MS";
pub const ENV_STORE_TIMEOUT_MS: &str = "STORE_TIMEOUT_MS";
pub const ENV_RATE_LIMIT_MAX_REQUESTS: &str = "RATE_LIMIT_MAX_REQUESTS";
pub const ENV_RATE_LIMIT_WINDOW_SECS: &str = "RATE_LIMIT_WINDOW_SECS";
pub const ENV_ALLOW_PRIVATE_HOSTS: &str = "ALLOW_PRIVATE_HOSTS";

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";
const DEFAULT_COMPLETION_BASE_URL: &str = "https://api.groq.com/openai/v1";
const DEFAULT_COMPLETION_MODEL: &str = "llama-3.1-8b-instant";
const DEFAULT_NAVIGATION_TIMEOUT_MS: u64 = 30_000;
const DEFAULT_STORE_TIMEOUT_MS: u64 = 2_000;
const DEFAULT_RATE_LIMIT_MAX_REQUESTS: u64 = 10;
const DEFAULT_RATE_LIMIT_WINDOW_SECS: u64 = 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    bind_addr: String,
    redis_url: Option<String>,
    completion_base_url: String,
    completion_api_key: Option<String>,
    completion_model: String,
    fetch_backend: FetchBackend,
    chrome_executable: Option<PathBuf>,
    navigation_timeout: Duration,
    store_timeout: Duration,
    rate_limit_max_requests: u64,
    rate_limit_window: Duration,
    allow_private_hosts: bool,
}

impl Default for Config {
    /// Development defaults (mirrors `from_env` with no env overrides).
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            redis_url: None,
            completion_base_url: DEFAULT_COMPLETION_BASE_URL.to_string(),
            completion_api_key: None,
            completion_model: DEFAULT_COMPLETION_MODEL.to_string(),
            fetch_backend: FetchBackend::Browser,
            chrome_executable: None,
            navigation_timeout: Duration::from_millis(DEFAULT_NAVIGATION_TIMEOUT_MS),
            store_timeout: Duration::from_millis(DEFAULT_STORE_TIMEOUT_MS),
            rate_limit_max_requests: DEFAULT_RATE_LIMIT_MAX_REQUESTS,
            rate_limit_window: Duration::from_secs(DEFAULT_RATE_LIMIT_WINDOW_SECS),
            allow_private_hosts: false,
        }
    }
}

impl Config {
    /// Load from environment variables, falling back to development defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let fetch_backend = match optional(ENV_FETCH_BACKEND) {
            Some(raw) => raw
                .parse::<FetchBackend>()
                .map_err(|reason| ConfigError::InvalidValue {
                    field: ENV_FETCH_BACKEND,
                    reason,
                })?,
            None => FetchBackend::Browser,
        };

        let navigation_ms = parse_or(ENV_NAVIGATION_TIMEOUT_MS, DEFAULT_NAVIGATION_TIMEOUT_MS)?;
        let store_ms = parse_or(ENV_STORE_TIMEOUT_MS, DEFAULT_STORE_TIMEOUT_MS)?;
        let max_requests = parse_or(ENV_RATE_LIMIT_MAX_REQUESTS, DEFAULT_RATE_LIMIT_MAX_REQUESTS)?;
        let window_secs = parse_or(ENV_RATE_LIMIT_WINDOW_SECS, DEFAULT_RATE_LIMIT_WINDOW_SECS)?;

        for (field, value) in [
            (ENV_NAVIGATION_TIMEOUT_MS, navigation_ms),
            (ENV_STORE_TIMEOUT_MS, store_ms),
            (ENV_RATE_LIMIT_MAX_REQUESTS, max_requests),
            (ENV_RATE_LIMIT_WINDOW_SECS, window_secs),
        ] {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    field,
                    reason: "must be greater than zero".to_string(),
                });
            }
        }

        Ok(Self {
            bind_addr: optional(ENV_BIND_ADDR).unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            redis_url: optional(ENV_REDIS_URL),
            completion_base_url: optional(ENV_COMPLETION_BASE_URL)
                .unwrap_or_else(|| DEFAULT_COMPLETION_BASE_URL.to_string()),
            completion_api_key: optional(ENV_COMPLETION_API_KEY),
            completion_model: optional(ENV_COMPLETION_MODEL)
                .unwrap_or_else(|| DEFAULT_COMPLETION_MODEL.to_string()),
            fetch_backend,
            chrome_executable: optional(ENV_CHROME_EXECUTABLE_PATH).map(PathBuf::from),
            navigation_timeout: Duration::from_millis(navigation_ms),
            store_timeout: Duration::from_millis(store_ms),
            rate_limit_max_requests: max_requests,
            rate_limit_window: Duration::from_secs(window_secs),
            allow_private_hosts: parse_or(ENV_ALLOW_PRIVATE_HOSTS, false)?,
        })
    }

    /// TCP bind address (host:port) for the HTTP server.
    pub fn bind_addr(&self) -> &str {
        &self.bind_addr
    }
    /// Shared store URL; `None` selects the in-process store.
    pub fn redis_url(&self) -> Option<&str> {
        self.redis_url.as_deref()
    }
    pub fn completion_base_url(&self) -> &str {
        &self.completion_base_url
    }
    pub fn completion_api_key(&self) -> Option<&str> {
        self.completion_api_key.as_deref()
    }
    pub fn completion_model(&self) -> &str {
        &self.completion_model
    }
    pub fn fetch_backend(&self) -> FetchBackend {
        self.fetch_backend
    }
    pub fn chrome_executable(&self) -> Option<&PathBuf> {
        self.chrome_executable.as_ref()
    }
    pub fn navigation_timeout(&self) -> Duration {
        self.navigation_timeout
    }
    /// Upper bound on any single store round trip.
    pub fn store_timeout(&self) -> Duration {
        self.store_timeout
    }
    pub fn rate_limit_max_requests(&self) -> u64 {
        self.rate_limit_max_requests
    }
    pub fn rate_limit_window(&self) -> Duration {
        self.rate_limit_window
    }
    pub fn allow_private_hosts(&self) -> bool {
        self.allow_private_hosts
    }

    pub fn with_redis_url(mut self, url: impl Into<String>) -> Self {
        self.redis_url = Some(url.into());
        self
    }
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_or<T>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match optional(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidValue {
                field: key,
                reason: format!("{raw:?}: {e}"),
            }),
        None => Ok(default),
    }
}

/// Errors that can occur while building a configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value for '{field}': {reason}")]
    InvalidValue { field: &'static str, reason: String },
}
