use bytes::Bytes;
use chrono::{DateTime, Utc};
use encoding_rs::Encoding;
use reqwest::{StatusCode, header::HeaderMap};
use url::Url;

/// A page as delivered by the static HTTP fetcher.
#[derive(Debug)]
pub struct PageResponse {
    pub url_final: Url,
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body_raw: Bytes,
    pub body_utf8: String,
    pub encoding: &'static Encoding,
    pub fetched_at: DateTime<Utc>,
}

/// HTML ready for DOM reduction, whichever backend produced it.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub url_final: Url,
    pub html: String,
    pub fetched_at: DateTime<Utc>,
}

impl From<PageResponse> for RenderedPage {
    fn from(resp: PageResponse) -> Self {
        Self {
            url_final: resp.url_final,
            html: resp.body_utf8,
            fetched_at: resp.fetched_at,
        }
    }
}
