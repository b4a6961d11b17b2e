//! Candidate extraction from HTML listing pages.
//!
//! Sites share no markup, so each configured container selector is an
//! independent strategy. The first one producing a usable candidate wins.

use std::collections::HashSet;

use fw_core::types::truncate_chars;
use fw_core::{RawCandidate, SourceId, MAX_SUMMARY_CHARS};
use lazy_static::lazy_static;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;
use url::Url;

use super::utils::{element_text, first_success, resolve_url};

lazy_static! {
    static ref HEADING: Selector = Selector::parse("h1, h2, h3, h4").unwrap();
    static ref ANCHOR: Selector = Selector::parse("a[href]").unwrap();
    static ref PARAGRAPH: Selector = Selector::parse("p").unwrap();
    static ref TIME: Selector = Selector::parse("time").unwrap();
    static ref DATE_TEXT: Selector =
        Selector::parse(".date, .published, .post-date, .article-date").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListingRules {
    /// Titles shorter than this many characters are dropped.
    pub min_title_chars: usize,
    /// Paragraphs must be longer than this to count towards the summary.
    pub min_paragraph_chars: usize,
    /// Scanning stops once this many candidates are collected.
    pub max_items: usize,
}

impl Default for ListingRules {
    fn default() -> Self {
        Self {
            min_title_chars: 10,
            min_paragraph_chars: 40,
            max_items: 20,
        }
    }
}

pub struct ListingExtractor<'a> {
    source: &'a SourceId,
    base: &'a Url,
    rules: ListingRules,
}

impl<'a> ListingExtractor<'a> {
    pub fn new(source: &'a SourceId, base: &'a Url, rules: ListingRules) -> Self {
        Self { source, base, rules }
    }

    /// Returns `None` when no selector produced a candidate.
    pub fn extract(&self, html: &str, selectors: &[String]) -> Option<Vec<RawCandidate>> {
        let document = Html::parse_document(html);
        let document = &document;
        first_success(
            selectors
                .iter()
                .map(|selector| move || self.extract_with(document, selector)),
        )
    }

    fn extract_with(&self, document: &Html, selector: &str) -> Option<Vec<RawCandidate>> {
        let parsed = match Selector::parse(selector) {
            Ok(parsed) => parsed,
            Err(e) => {
                debug!("[{}] skipping invalid selector {:?}: {}", self.source, selector, e);
                return None;
            }
        };

        let mut seen = HashSet::new();
        let mut candidates = Vec::new();
        for container in document.select(&parsed) {
            if candidates.len() >= self.rules.max_items {
                break;
            }
            if let Some(candidate) = self.candidate_from(container) {
                if seen.insert(candidate.url.clone()) {
                    candidates.push(candidate);
                }
            }
        }

        debug!(
            "[{}] selector {:?} yielded {} candidates",
            self.source,
            selector,
            candidates.len()
        );
        (!candidates.is_empty()).then_some(candidates)
    }

    fn candidate_from(&self, container: ElementRef<'_>) -> Option<RawCandidate> {
        let is_anchor = container.value().name() == "a";
        let anchor = if is_anchor {
            Some(container)
        } else {
            container.select(&ANCHOR).next()
        }?;

        let url = resolve_url(self.base, anchor.value().attr("href")?)?;
        // links back to the front page are navigation, not articles
        if Url::parse(&url).ok()?.path() == "/" {
            return None;
        }

        let title = self.title_for(container, anchor, is_anchor)?;
        let summary = self.summary_for(container);
        let date = date_for(container);

        RawCandidate::new(self.source, &title, &url, summary.as_deref(), date.as_deref())
    }

    fn title_for(
        &self,
        container: ElementRef<'_>,
        anchor: ElementRef<'_>,
        is_anchor: bool,
    ) -> Option<String> {
        let heading = || container.select(&HEADING).next().map(element_text);
        let anchor_text = || Some(element_text(anchor));
        let enclosing_heading = || {
            if !is_anchor {
                return None;
            }
            container
                .ancestors()
                .filter_map(ElementRef::wrap)
                .find(|e| is_article_block(*e))
                .and_then(|block| block.select(&HEADING).next())
                .map(element_text)
        };

        let strategies: [&dyn Fn() -> Option<String>; 3] =
            [&heading, &anchor_text, &enclosing_heading];
        strategies
            .iter()
            .filter_map(|strategy| strategy())
            .find(|title| title.chars().count() >= self.rules.min_title_chars)
    }

    fn summary_for(&self, container: ElementRef<'_>) -> Option<String> {
        let text = container
            .select(&PARAGRAPH)
            .map(element_text)
            .filter(|p| p.chars().count() > self.rules.min_paragraph_chars)
            .collect::<Vec<_>>()
            .join(" ");
        (!text.is_empty()).then(|| truncate_chars(&text, MAX_SUMMARY_CHARS))
    }
}

fn is_article_block(element: ElementRef<'_>) -> bool {
    let value = element.value();
    matches!(value.name(), "article" | "div") || value.classes().any(|c| c == "article")
}

fn date_for(container: ElementRef<'_>) -> Option<String> {
    if let Some(time) = container.select(&TIME).next() {
        if let Some(datetime) = time.value().attr("datetime") {
            return Some(datetime.to_string());
        }
        let text = element_text(time);
        if !text.is_empty() {
            return Some(text);
        }
    }
    container
        .select(&DATE_TEXT)
        .next()
        .map(element_text)
        .filter(|text| !text.is_empty())
}
