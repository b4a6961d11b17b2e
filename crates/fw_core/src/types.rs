use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Text shown when neither the listing nor the article page yields a summary.
pub const SUMMARY_PLACEHOLDER: &str = "No summary available.";

/// Upper bound on the length of an article summary, in characters.
pub const MAX_SUMMARY_CHARS: usize = 400;

/// Short tag identifying a configured source, e.g. `fwi`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceId(pub String);

impl SourceId {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Static description of a source as seen by the aggregation pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceMetadata {
    pub id: SourceId,
    /// Display name used in `Article::source`.
    pub name: String,
    /// Records from this source bypass keyword filtering.
    pub always_include: bool,
    /// Candidates without a listing summary may be enriched from the article page.
    pub fetch_summaries: bool,
}

impl SourceMetadata {
    pub fn new(tag: &str, name: &str) -> Self {
        Self {
            id: SourceId::new(tag),
            name: name.to_string(),
            always_include: false,
            fetch_summaries: false,
        }
    }

    pub fn always_include(mut self, value: bool) -> Self {
        self.always_include = value;
        self
    }

    pub fn fetch_summaries(mut self, value: bool) -> Self {
        self.fetch_summaries = value;
        self
    }
}

/// An extracted, unfiltered record straight out of a source adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCandidate {
    pub title: String,
    pub url: String,
    pub raw_summary: Option<String>,
    pub raw_date: Option<String>,
    pub source: SourceId,
}

impl RawCandidate {
    /// Builds a candidate from adapter output, collapsing whitespace.
    ///
    /// Returns `None` when the title or url is empty after cleaning. Empty
    /// summaries and dates become `None`.
    pub fn new(
        source: &SourceId,
        title: &str,
        url: &str,
        raw_summary: Option<&str>,
        raw_date: Option<&str>,
    ) -> Option<Self> {
        let title = collapse_whitespace(title);
        let url = url.trim().to_string();
        if title.is_empty() || url.is_empty() {
            return None;
        }

        let non_empty = |s: Option<&str>| {
            s.map(collapse_whitespace).filter(|s| !s.is_empty())
        };

        Some(Self {
            title,
            url,
            raw_summary: non_empty(raw_summary),
            raw_date: non_empty(raw_date),
            source: source.clone(),
        })
    }
}

/// How a calendar date was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateConfidence {
    /// Derived from the source's own date expression.
    Exact,
    /// The source gave no usable date; the request day was substituted.
    Inferred,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: String,
    pub title: String,
    pub url: String,
    pub source: String,
    pub date: NaiveDate,
    pub date_confidence: DateConfidence,
    pub summary: String,
    pub matched_keywords: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub success: bool,
    pub count: usize,
    pub articles: Vec<Article>,
}

impl SearchResponse {
    pub fn new(articles: Vec<Article>) -> Self {
        Self {
            success: true,
            count: articles.len(),
            articles,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: Option<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
            message,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
}

impl HealthResponse {
    pub fn ok() -> Self {
        Self {
            status: "OK".to_string(),
            timestamp: Utc::now(),
        }
    }
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Cuts `text` to at most `max` characters, on a char boundary.
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].trim_end().to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_candidate_cleaning() {
        let source = SourceId::new("fwi");
        let candidate = RawCandidate::new(
            &source,
            "  Bluetongue\n   spreads  ",
            " https://example.com/a ",
            Some("   "),
            Some("2 days ago"),
        )
        .unwrap();
        assert_eq!(candidate.title, "Bluetongue spreads");
        assert_eq!(candidate.url, "https://example.com/a");
        assert_eq!(candidate.raw_summary, None);
        assert_eq!(candidate.raw_date.as_deref(), Some("2 days ago"));

        assert!(RawCandidate::new(&source, "  ", "https://example.com", None, None).is_none());
        assert!(RawCandidate::new(&source, "Title", "", None, None).is_none());
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("abcdef", 3), "abc");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("ééééé", 2), "éé");
        assert_eq!(truncate_chars("ab cd", 3), "ab");
    }

    #[test]
    fn test_article_serializes_camel_case() {
        let article = Article {
            id: "fwi-0".to_string(),
            title: "Bluetongue zone extended".to_string(),
            url: "https://example.com/bt".to_string(),
            source: "Farmers Weekly".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            date_confidence: DateConfidence::Exact,
            summary: SUMMARY_PLACEHOLDER.to_string(),
            matched_keywords: vec!["bluetongue".to_string()],
        };
        let json = serde_json::to_value(&article).unwrap();
        assert_eq!(json["date"], "2024-01-15");
        assert_eq!(json["dateConfidence"], "exact");
        assert_eq!(json["matchedKeywords"][0], "bluetongue");
    }

    #[test]
    fn test_error_response_omits_empty_message() {
        let json =
            serde_json::to_value(ErrorResponse::new("Webhook URL is required", None)).unwrap();
        assert_eq!(json["success"], false);
        assert!(json.get("message").is_none());
    }
}
