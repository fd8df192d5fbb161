use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::sync::LazyLock;

/// Upper bound on `ExtractionResult::content`, in characters.
pub const MAX_CONTENT_LENGTH: usize = 40_000;

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("Failed to compile whitespace regex"));

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Headings {
    pub h1: String,
    pub h2: String,
}

/// One URL's reduced content, as returned to callers and stored in the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    pub url: String,
    pub title: String,
    pub headings: Headings,
    pub content: String,
    /// `None` (or empty) when extraction succeeded.
    pub error: Option<String>,
    /// Unix milliseconds; only set once the result has been written to the cache.
    #[serde(
        default,
        deserialize_with = "lenient_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub cached_at: Option<i64>,
}

impl ExtractionResult {
    /// Builds a successful result, normalizing and bounding `content`.
    pub fn new(url: impl Into<String>, title: &str, h1: &str, h2: &str, body: &str) -> Self {
        let title = normalize_whitespace(title);
        let headings = Headings {
            h1: normalize_whitespace(h1),
            h2: normalize_whitespace(h2),
        };
        let joined = [title.as_str(), &headings.h1, &headings.h2, body].join(" ");

        Self {
            url: url.into(),
            title,
            headings,
            content: truncate_chars(&normalize_whitespace(&joined), MAX_CONTENT_LENGTH),
            error: None,
            cached_at: None,
        }
    }

    /// A degenerate result: every text field empty, `error` describing what went wrong.
    pub fn failed(error: impl ToString) -> Self {
        let mut error = error.to_string();
        if error.is_empty() {
            error.push_str("extraction failed");
        }
        Self {
            url: String::new(),
            title: String::new(),
            headings: Headings::default(),
            content: String::new(),
            error: Some(error),
            cached_at: None,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.error.as_deref().is_none_or(str::is_empty)
    }
}

/// `cachedAt` is informational only: floats and numeric strings are accepted,
/// anything else reads as absent.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let millis = match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().and_then(float_millis)),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok().and_then(float_millis),
        _ => None,
    };
    Ok(millis)
}

fn float_millis(value: f64) -> Option<i64> {
    (value.is_finite() && value.abs() < i64::MAX as f64).then_some(value as i64)
}

/// Collapses every whitespace run (including newlines and tabs) to one space
/// and trims both ends.
pub fn normalize_whitespace(text: &str) -> String {
    WHITESPACE_RUN.replace_all(text, " ").trim().to_string()
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => text[..cut].trim_end().to_string(),
        None => text.to_string(),
    }
}
