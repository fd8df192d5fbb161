use axum::{
    Json,
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tracing::{debug, warn};

use crate::chat::dtos::ErrorResponse;
use crate::store::{KvStore, with_timeout};

/// Identity used when no proxy header or peer address is available.
pub const FALLBACK_IDENTITY: &str = "127.0.0.1";

const KEY_PREFIX: &str = "ratelimit:";

pub const X_RATELIMIT_LIMIT: &str = "x-ratelimit-limit";
pub const X_RATELIMIT_REMAINING: &str = "x-ratelimit-remaining";
pub const X_RATELIMIT_RESET: &str = "x-ratelimit-reset";

/// Result of one admission decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admission {
    pub allowed: bool,
    pub limit: u64,
    pub remaining: u64,
    /// Unix milliseconds.
    pub reset_at_ms: i64,
}

/// Sliding-window limiter whose counters live in the shared store.
#[derive(Clone)]
pub struct RateLimit {
    store: Arc<dyn KvStore>,
    max_requests: u64,
    window: Duration,
    op_timeout: Duration,
}

impl RateLimit {
    pub fn new(
        store: Arc<dyn KvStore>,
        max_requests: u64,
        window: Duration,
        op_timeout: Duration,
    ) -> Self {
        Self {
            store,
            max_requests,
            window,
            op_timeout,
        }
    }

    pub async fn admit(&self, identity: &str) -> Admission {
        self.admit_at(identity, Utc::now().timestamp_millis()).await
    }

    /// Admission at an explicit instant. A store failure admits the request.
    pub async fn admit_at(&self, identity: &str, now_ms: i64) -> Admission {
        let key = format!("{KEY_PREFIX}{identity}");
        let op = self
            .store
            .sliding_window(&key, self.max_requests, self.window, now_ms);

        match with_timeout(self.op_timeout, op).await {
            Ok(state) => Admission {
                allowed: state.allowed,
                limit: self.max_requests,
                remaining: state.remaining,
                reset_at_ms: state.reset_at_ms,
            },
            Err(e) => {
                warn!(error = %e, %identity, "rate limit store unavailable, admitting request");
                Admission {
                    allowed: true,
                    limit: self.max_requests,
                    remaining: self.max_requests,
                    reset_at_ms: now_ms + self.window.as_millis() as i64,
                }
            }
        }
    }
}

/// Client identity: first `X-Forwarded-For` hop, then `X-Real-IP`, then the
/// peer address, then `FALLBACK_IDENTITY`.
pub fn client_identity(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    let real_ip = headers
        .get("x-real-ip")
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    if let Some(ip) = forwarded.or(real_ip) {
        return ip.to_string();
    }
    if let Some(addr) = peer {
        return addr.ip().to_string();
    }
    debug!("no client identity available, using fallback bucket");
    FALLBACK_IDENTITY.to_string()
}

fn set_headers(headers: &mut HeaderMap, admission: &Admission) {
    headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(admission.limit));
    headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(admission.remaining));
    headers.insert(X_RATELIMIT_RESET, HeaderValue::from(admission.reset_at_ms));
}

/// Request Gate: runs before any handler so rejected requests do no downstream work.
pub async fn rate_limit_middleware(
    State(rate_limit): State<RateLimit>,
    req: Request,
    next: Next,
) -> Response {
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let identity = client_identity(req.headers(), peer);
    let admission = rate_limit.admit(&identity).await;

    let mut response = if admission.allowed {
        next.run(req).await
    } else {
        warn!(%identity, "rate limit exceeded");
        (
            StatusCode::TOO_MANY_REQUESTS,
            Json(ErrorResponse {
                error: "Too many requests".to_string(),
            }),
        )
            .into_response()
    };

    set_headers(response.headers_mut(), &admission);
    response
}
