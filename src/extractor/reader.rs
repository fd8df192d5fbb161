use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;

use crate::extractor::model::ExtractionResult;

/// Elements that rarely carry answer-relevant text.
const NOISE: &str = "script, style, noscript, iframe, nav, footer, header, aside";

/// Main-content candidates, in order of preference.
const MAIN_CONTENT: [&str; 3] = ["main", "article", "body"];

static NOISE_SELECTOR: LazyLock<Selector> = LazyLock::new(|| parse_selector(NOISE));
static TITLE_SELECTOR: LazyLock<Selector> = LazyLock::new(|| parse_selector("title"));
static H1_SELECTOR: LazyLock<Selector> = LazyLock::new(|| parse_selector("h1"));
static H2_SELECTOR: LazyLock<Selector> = LazyLock::new(|| parse_selector("h2"));
static P_SELECTOR: LazyLock<Selector> = LazyLock::new(|| parse_selector("p"));

fn parse_selector(selectors: &str) -> Selector {
    Selector::parse(selectors).expect("static selector must parse")
}

/// Reduces a rendered HTML document to an `ExtractionResult` for `url`.
pub fn reduce(html: &str, url: &str) -> ExtractionResult {
    let mut document = Html::parse_document(html);
    strip_noise(&mut document);

    let title = document
        .select(&TITLE_SELECTOR)
        .next()
        .map(element_text)
        .unwrap_or_default();
    let h1 = joined_text(&document, &H1_SELECTOR);
    let h2 = joined_text(&document, &H2_SELECTOR);
    let main = main_content(&document);
    let paragraphs = joined_text(&document, &P_SELECTOR);

    ExtractionResult::new(url, &title, &h1, &h2, &format!("{main} {paragraphs}"))
}

fn strip_noise(document: &mut Html) {
    let ids: Vec<_> = document.select(&NOISE_SELECTOR).map(|el| el.id()).collect();
    for id in ids {
        if let Some(mut node) = document.tree.get_mut(id) {
            node.detach();
        }
    }
}

fn main_content(document: &Html) -> String {
    for candidate in MAIN_CONTENT {
        let text: String = document
            .select(&parse_selector(candidate))
            .map(element_text)
            .collect();
        if !text.trim().is_empty() {
            return text;
        }
    }
    String::new()
}

fn joined_text(document: &Html, selector: &Selector) -> String {
    document
        .select(selector)
        .map(element_text)
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect()
}
