use reqwest::StatusCode;
use thiserror::Error;

use crate::fetcher::ssrf::SsrfError;

/// Everything that can stop a page from reaching the DOM reducer.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("blocked: {0}")]
    Blocked(#[from] SsrfError),

    // static HTTP backend
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("connect timeout")]
    ConnectTimeout,

    #[error("request timeout")]
    RequestTimeout,

    #[error("too many redirects")]
    RedirectLoop,

    #[error("upstream returned HTTP {status}")]
    Http { status: StatusCode, retriable: bool },

    #[error("body too large ({0} bytes)")]
    BodyTooLarge(u64),

    #[error("unsupported content-type: {0}")]
    UnsupportedContentType(String),

    #[error("could not decode body as {0}")]
    Charset(String),

    #[error("io error: {0}")]
    Io(String),

    // headless browser backend
    #[error("browser launch failed: {0}")]
    BrowserLaunch(String),

    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error("navigation timeout after {0}ms")]
    NavigationTimeout(u64),

    #[error("content retrieval failed: {0}")]
    ContentRetrieval(String),

    #[error("unknown: {0}")]
    Unknown(String),
}

impl FetchError {
    /// Whether the same URL could plausibly succeed on a later attempt.
    pub fn should_retry(&self) -> bool {
        match self {
            Self::Http { retriable, .. } => *retriable,
            Self::InvalidUrl(_)
            | Self::Blocked(_)
            | Self::BodyTooLarge(_)
            | Self::UnsupportedContentType(_)
            | Self::Charset(_) => false,
            _ => true,
        }
    }

    pub fn from_reqwest_error(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return if err.is_connect() {
                Self::ConnectTimeout
            } else {
                Self::RequestTimeout
            };
        }
        if err.is_redirect() {
            return Self::RedirectLoop;
        }
        if let Some(status) = err.status() {
            return Self::Http {
                status,
                retriable: status.is_server_error(),
            };
        }
        if err.is_connect() || err.is_request() {
            return Self::Connect(err.to_string());
        }
        Self::Unknown(err.to_string())
    }
}

impl From<chromiumoxide::error::CdpError> for FetchError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        Self::ContentRetrieval(err.to_string())
    }
}
