use chrono::Utc;
use std::fs;
use std::sync::Arc;
use url::Url;

use crate::extractor::{Extractor, MAX_CONTENT_LENGTH, reader::reduce};
use crate::fetcher::{FetchError, MockPageFetcher, RenderedPage};

fn fixture(name: &str) -> String {
    fs::read_to_string(format!("src/extractor/tests/fixtures/{name}"))
        .expect("Failed to read test fixture")
}

fn assert_normalized(content: &str) {
    assert!(content.chars().count() <= MAX_CONTENT_LENGTH);
    assert!(!content.contains('\n'));
    assert!(!content.contains('\t'));
    assert!(!content.contains("  "));
}

fn rendered(html: &str, url: &Url) -> RenderedPage {
    RenderedPage {
        url_final: url.clone(),
        html: html.to_string(),
        fetched_at: Utc::now(),
    }
}

#[test]
fn test_reduce_article() {
    let result = reduce(&fixture("article.html"), "https://example.com/article");

    assert_eq!(result.title, "Sample Article | News Site");
    assert_eq!(result.headings.h1, "Sample Article");
    assert_eq!(result.headings.h2, "Background");
    assert!(result.content.contains("first paragraph"));
    assert!(
        result
            .content
            .contains("second paragraph, with a tab and a line break.")
    );
    assert!(result.content.contains("related story"));

    for noise in ["Trending", "Copyright", "enable JavaScript", "analytics", "font-family"] {
        assert!(!result.content.contains(noise), "found {noise}");
    }
    assert_normalized(&result.content);
}

#[test]
fn test_reduce_blog_falls_back_to_article() {
    let result = reduce(&fixture("blog.html"), "https://blog.example.com/post");

    assert!(result.title.contains("How to Build Better Software"));
    assert_eq!(result.headings.h2, "Key Principles Conclusion");
    assert!(result.content.contains("Keep functions small"));
    assert!(!result.content.contains("newsletter"));
    assert_normalized(&result.content);
}

#[test]
fn test_reduce_plain_body() {
    let result = reduce(&fixture("no_landmarks.html"), "https://example.com/plain");

    assert_eq!(
        result.content,
        "Plain page Plain body text without any landmark elements."
    );
}

#[test]
fn test_reduce_malformed_html() {
    let html = "<html><head><title>Broken</title><body><p>Unclosed tags<div>More content";
    let result = reduce(html, "https://example.com/broken");

    assert_eq!(result.title, "Broken");
    assert!(result.content.contains("Unclosed tags"));
    assert_normalized(&result.content);
}

#[test]
fn test_reduce_oversized_page_is_truncated() {
    let html = format!(
        "<html><body><main>{}</main></body></html>",
        "<p>lorem ipsum dolor</p>\n".repeat(5_000)
    );
    let result = reduce(&html, "https://example.com/huge");

    assert_eq!(result.content.chars().count(), MAX_CONTENT_LENGTH);
    assert_normalized(&result.content);
}

#[tokio::test]
async fn test_extract_uses_fetched_html() {
    let mut fetcher = MockPageFetcher::new();
    fetcher
        .expect_fetch_html()
        .times(1)
        .returning(|url| Ok(rendered("<title>Fetched</title><p>Body</p>", url)));

    let extractor = Extractor::new(Arc::new(fetcher), true);
    let result = extractor.extract("https://example.com/a").await;

    assert!(result.succeeded());
    assert_eq!(result.url, "https://example.com/a");
    assert_eq!(result.content, "Fetched Body Body");
}

#[tokio::test]
async fn test_extract_captures_fetch_failure() {
    let mut fetcher = MockPageFetcher::new();
    fetcher
        .expect_fetch_html()
        .times(1)
        .returning(|_| Err(FetchError::NavigationTimeout(30_000)));

    let extractor = Extractor::new(Arc::new(fetcher), true);
    let result = extractor.extract("https://example.com/slow").await;

    assert!(!result.succeeded());
    assert!(result.url.is_empty());
    assert!(result.content.is_empty());
    assert!(result.title.is_empty());
    assert_eq!(result.error.as_deref(), Some("navigation timeout after 30000ms"));
}

#[tokio::test]
async fn test_extract_invalid_url_never_fetches() {
    let mut fetcher = MockPageFetcher::new();
    fetcher.expect_fetch_html().never();

    let extractor = Extractor::new(Arc::new(fetcher), true);
    let result = extractor.extract("not a url").await;

    assert!(!result.succeeded());
    assert!(result.error.unwrap().starts_with("invalid url"));
}

#[tokio::test]
async fn test_extract_blocks_private_hosts() {
    let mut fetcher = MockPageFetcher::new();
    fetcher.expect_fetch_html().never();

    let extractor = Extractor::new(Arc::new(fetcher), false);
    let result = extractor.extract("http://127.0.0.1:6379/").await;

    assert!(!result.succeeded());
    assert!(result.error.unwrap().contains("127.0.0.1"));
}

#[cfg(feature = "fuzz")]
mod fuzz {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn test_reduce_never_panics(html in ".*") {
            let _ = reduce(&html, "https://example.com");
        }

        #[test]
        fn test_content_always_normalized(
            words in proptest::collection::vec("[a-z]{1,12}[ \t\n]{0,4}", 0..400),
        ) {
            let html = format!("<html><body><main>{}</main><p>{}</p></body></html>", words.concat(), words.concat());
            let result = reduce(&html, "https://example.com");
            prop_assert!(result.content.chars().count() <= MAX_CONTENT_LENGTH);
            prop_assert!(!result.content.contains('\n'));
            prop_assert!(!result.content.contains('\t'));
            prop_assert!(!result.content.contains("  "));
        }
    }
}
