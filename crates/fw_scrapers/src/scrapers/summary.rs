//! Excerpts taken from an article page when the listing had none.

use async_trait::async_trait;
use fw_core::types::truncate_chars;
use fw_core::MAX_SUMMARY_CHARS;
use lazy_static::lazy_static;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use super::utils::{element_text, fetch_text, first_success};

const CONTENT_SELECTORS: &[&str] = &[
    "article p",
    ".article-content p",
    ".entry-content p",
    ".post-content p",
    ".content p",
    "main p",
];

const NON_CONTENT: &[&str] = &["script", "style", "nav", "header", "footer", "aside"];

const MIN_PARAGRAPH_CHARS: usize = 50;
const MIN_SUMMARY_CHARS: usize = 100;
const MAX_PARAGRAPHS: usize = 3;

lazy_static! {
    static ref CONTENT: Vec<Selector> = CONTENT_SELECTORS
        .iter()
        .filter_map(|s| Selector::parse(s).ok())
        .collect();
}

#[async_trait]
pub trait SummaryExtractor: Send + Sync {
    /// Returns a short excerpt of the page at `url`, or `None` on any failure.
    async fn extract_summary(&self, url: &str) -> Option<String>;
}

/// Fetches the article page over HTTP and runs [`extract_summary_from_html`].
pub struct PageSummaryExtractor {
    client: Client,
}

impl PageSummaryExtractor {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SummaryExtractor for PageSummaryExtractor {
    async fn extract_summary(&self, url: &str) -> Option<String> {
        match fetch_text(&self.client, url).await {
            Ok(html) => extract_summary_from_html(&html),
            Err(e) => {
                debug!("summary fetch failed for {}: {}", url, e);
                None
            }
        }
    }
}

pub fn extract_summary_from_html(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    first_success(CONTENT.iter().map(|selector| {
        let document = &document;
        move || {
            let combined = document
                .select(selector)
                .filter(|p| !inside_non_content(*p))
                .map(element_text)
                .filter(|p| p.chars().count() > MIN_PARAGRAPH_CHARS)
                .take(MAX_PARAGRAPHS)
                .collect::<Vec<_>>()
                .join(" ");
            (combined.chars().count() > MIN_SUMMARY_CHARS)
                .then(|| truncate_chars(&combined, MAX_SUMMARY_CHARS))
        }
    }))
}

fn inside_non_content(element: ElementRef<'_>) -> bool {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .any(|ancestor| NON_CONTENT.contains(&ancestor.value().name()))
}
