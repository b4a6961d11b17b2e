//! RSS 2.0 feed parsing.

use std::collections::HashSet;

use fw_core::types::{collapse_whitespace, truncate_chars};
use fw_core::{Error, RawCandidate, Result, SourceId, MAX_SUMMARY_CHARS};
use scraper::Html;
use url::Url;

use super::utils::resolve_url;

/// Parses a feed document into candidates, in feed order.
///
/// Items without a title or link are skipped; a document that is not RSS is an error.
pub fn parse_feed(xml: &[u8], base: &Url, source: &SourceId) -> Result<Vec<RawCandidate>> {
    let channel = rss::Channel::read_from(xml)
        .map_err(|e| Error::Feed(format!("[{}] {}", source, e)))?;

    let mut seen = HashSet::new();
    let candidates = channel
        .items()
        .iter()
        .filter_map(|item| {
            let url = resolve_url(base, item.link()?)?;
            let summary = item
                .description()
                .map(strip_markup)
                .map(|text| truncate_chars(&text, MAX_SUMMARY_CHARS));
            RawCandidate::new(source, item.title()?, &url, summary.as_deref(), item.pub_date())
        })
        .filter(|candidate| seen.insert(candidate.url.clone()))
        .collect();

    Ok(candidates)
}

/// Plain text of an HTML fragment, entities decoded and whitespace collapsed.
pub fn strip_markup(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    collapse_whitespace(&fragment.root_element().text().collect::<String>())
}
