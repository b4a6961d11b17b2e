//! Source catalogue: which sites are scraped and how.

use std::collections::HashSet;
use std::path::Path;

use fw_core::{Error, Result, SourceMetadata};
use serde::{Deserialize, Serialize};
use url::Url;

const DEFAULT_MAX_ITEMS: usize = 20;

fn default_max_items() -> usize {
    DEFAULT_MAX_ITEMS
}

/// Configuration of one source adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceConfig {
    /// Short tag used as the article id prefix.
    pub tag: String,
    pub name: String,
    /// Relative links on the listing or feed are resolved against this.
    pub base_url: String,
    pub listing_url: String,
    /// Tried before the listing when present.
    #[serde(default)]
    pub feed_url: Option<String>,
    /// Container selectors for the listing page, tried in order.
    #[serde(default)]
    pub selectors: Vec<String>,
    #[serde(default)]
    pub always_include: bool,
    #[serde(default = "default_max_items")]
    pub max_items: usize,
    #[serde(default)]
    pub fetch_summaries: bool,
}

impl SourceConfig {
    pub fn new(
        tag: &str,
        name: &str,
        base_url: &str,
        listing_url: &str,
        selectors: &[&str],
    ) -> Self {
        Self {
            tag: tag.to_string(),
            name: name.to_string(),
            base_url: base_url.to_string(),
            listing_url: listing_url.to_string(),
            feed_url: None,
            selectors: selectors.iter().map(|s| s.to_string()).collect(),
            always_include: false,
            max_items: DEFAULT_MAX_ITEMS,
            fetch_summaries: false,
        }
    }

    pub fn with_feed(mut self, feed_url: &str) -> Self {
        self.feed_url = Some(feed_url.to_string());
        self
    }

    pub fn with_summaries(mut self) -> Self {
        self.fetch_summaries = true;
        self
    }

    pub fn metadata(&self) -> SourceMetadata {
        SourceMetadata::new(&self.tag, &self.name)
            .always_include(self.always_include)
            .fetch_summaries(self.fetch_summaries)
    }

    pub fn base(&self) -> Result<Url> {
        Url::parse(&self.base_url).map_err(|e| {
            Error::Config(format!("{}: invalid base URL {}: {}", self.tag, self.base_url, e))
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.tag.trim().is_empty() {
            return Err(Error::Config("source tag must not be empty".to_string()));
        }
        if self.name.trim().is_empty() {
            return Err(Error::Config(format!("{}: name must not be empty", self.tag)));
        }
        let base = self.base()?;
        base.join(&self.listing_url)
            .map_err(|e| Error::Config(format!("{}: invalid listing URL: {}", self.tag, e)))?;
        if let Some(feed) = &self.feed_url {
            base.join(feed)
                .map_err(|e| Error::Config(format!("{}: invalid feed URL: {}", self.tag, e)))?;
        }
        if self.feed_url.is_none() && self.selectors.is_empty() {
            return Err(Error::Config(format!(
                "{}: needs a feed URL or at least one listing selector",
                self.tag
            )));
        }
        if self.max_items == 0 {
            return Err(Error::Config(format!("{}: maxItems must be positive", self.tag)));
        }
        Ok(())
    }
}

/// The livestock news sites scraped when no catalogue file is given.
pub fn builtin_sources() -> Vec<SourceConfig> {
    vec![
        SourceConfig::new(
            "fwi",
            "Farmers Weekly",
            "https://www.fwi.co.uk",
            "https://www.fwi.co.uk/livestock",
            &["article", ".listing-item", "a[href*=\"/livestock/\"]"],
        )
        .with_summaries(),
        SourceConfig::new(
            "wlj",
            "Western Livestock Journal",
            "https://www.wlj.net",
            "https://www.wlj.net/",
            &["article", ".post", ".story", "a[href*=\"/article\"]"],
        )
        .with_summaries(),
        SourceConfig::new(
            "sf",
            "The Scottish Farmer",
            "https://www.thescottishfarmer.co.uk",
            "https://www.thescottishfarmer.co.uk/news/",
            &["article", ".mar-article-item", "a[href*=\"/news/\"]"],
        )
        .with_feed("https://www.thescottishfarmer.co.uk/news/rss/")
        .with_summaries(),
    ]
}

/// Checks every entry and rejects duplicate tags.
pub fn validate_sources(sources: &[SourceConfig]) -> Result<()> {
    let mut tags = HashSet::new();
    for source in sources {
        source.validate()?;
        if !tags.insert(source.tag.as_str()) {
            return Err(Error::Config(format!("duplicate source tag: {}", source.tag)));
        }
    }
    Ok(())
}

/// Reads a JSON array of [`SourceConfig`] from `path`.
pub fn load_sources(path: &Path) -> Result<Vec<SourceConfig>> {
    let raw = std::fs::read_to_string(path)?;
    let sources: Vec<SourceConfig> = serde_json::from_str(&raw)?;
    validate_sources(&sources)?;
    Ok(sources)
}
