use crate::fetcher::{errors::FetchError, types::PageResponse};
use bytes::Bytes;
use chrono::Utc;
use encoding_rs::Encoding;
use regex::Regex;
use reqwest::{StatusCode, header::HeaderMap};
use std::sync::LazyLock;
use url::Url;

/// How far into the body we look for a `<meta>` charset declaration.
const META_SNIFF_BYTES: usize = 4096;

static HEADER_CHARSET: LazyLock<Regex> =
    LazyLock::new(|| {
        Regex::new(r#"(?i)charset\s*=\s*["']?([^"'\s;]+)"#).expect("Failed to compile charset regex")
    });

static META_CHARSET: LazyLock<Regex> =
    LazyLock::new(|| {
        Regex::new(r#"(?i)<meta\s+[^>]*?charset\s*=\s*["']?([^"'\s/>]+)"#)
            .expect("Failed to compile meta charset regex")
    });

pub fn process_response(
    url_final: Url,
    status: StatusCode,
    headers: HeaderMap,
    body_bytes: Bytes,
    content_type: &str,
) -> Result<PageResponse, FetchError> {
    let encoding = detect_encoding(content_type, &body_bytes);
    let body_utf8 = decode(&body_bytes, encoding)?;

    Ok(PageResponse {
        url_final,
        status,
        headers,
        body_raw: body_bytes,
        body_utf8,
        encoding,
        fetched_at: Utc::now(),
    })
}

/// Content-Type header first, then a `<meta>` declaration, then byte heuristics.
fn detect_encoding(content_type: &str, body_bytes: &[u8]) -> &'static Encoding {
    let head = &body_bytes[..body_bytes.len().min(META_SNIFF_BYTES)];
    let head_str = String::from_utf8_lossy(head);

    let declared = label_from(&HEADER_CHARSET, content_type)
        .or_else(|| label_from(&META_CHARSET, &head_str));
    if let Some(encoding) = declared {
        return encoding;
    }

    let mut detector = chardetng::EncodingDetector::new();
    detector.feed(head, body_bytes.len() <= META_SNIFF_BYTES);
    detector.guess(None, true)
}

fn label_from(pattern: &Regex, haystack: &str) -> Option<&'static Encoding> {
    let label = pattern.captures(haystack)?.get(1)?.as_str();
    Encoding::for_label(label.trim().as_bytes())
}

fn decode(body_bytes: &[u8], encoding: &'static Encoding) -> Result<String, FetchError> {
    match encoding.decode(body_bytes) {
        (_, used, true) => Err(FetchError::Charset(used.name().to_string())),
        (decoded, _, false) => Ok(decoded.into_owned()),
    }
}
