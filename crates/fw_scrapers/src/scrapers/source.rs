use std::time::Duration;

use async_trait::async_trait;
use fw_core::{Error, RawCandidate, Result, SourceMetadata};
use reqwest::Client;
use tokio::time::timeout;
use url::Url;

use super::feed::parse_feed;
use super::listing::{ListingExtractor, ListingRules};
use super::utils::{fetch_bytes, fetch_text};
use super::Scraper;
use crate::config::SourceConfig;
use crate::logging::Logger;

/// Feed budget when the caller sets none.
pub const DEFAULT_FEED_TIMEOUT: Duration = Duration::from_secs(5);

/// Adapter for one configured site: feed first when it has one, listing page otherwise.
pub struct SourceScraper {
    config: SourceConfig,
    metadata: SourceMetadata,
    base: Url,
    listing_url: String,
    feed_url: Option<String>,
    rules: ListingRules,
    /// A slow feed must leave time for the listing fallback.
    feed_timeout: Duration,
    client: Client,
    log: Logger,
}

impl SourceScraper {
    pub fn new(config: SourceConfig, client: Client) -> Result<Self> {
        config.validate()?;
        let base = config.base()?;
        let listing_url = base.join(&config.listing_url)?.to_string();
        let feed_url = config
            .feed_url
            .as_deref()
            .map(|feed| base.join(feed).map(|u| u.to_string()))
            .transpose()?;
        let rules = ListingRules {
            max_items: config.max_items,
            ..ListingRules::default()
        };

        Ok(Self {
            metadata: config.metadata(),
            log: Logger::new().with_prefix(format!("[{}]", config.tag)),
            config,
            base,
            listing_url,
            feed_url,
            rules,
            feed_timeout: DEFAULT_FEED_TIMEOUT,
            client,
        })
    }

    pub fn with_feed_timeout(mut self, feed_timeout: Duration) -> Self {
        self.feed_timeout = feed_timeout;
        self
    }

    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    async fn fetch_feed(&self, feed_url: &str) -> Result<Vec<RawCandidate>> {
        let body = fetch_bytes(&self.client, feed_url).await?;
        parse_feed(&body, &self.base, &self.metadata.id)
    }

    async fn fetch_listing(&self) -> Result<Vec<RawCandidate>> {
        let html = fetch_text(&self.client, &self.listing_url).await?;
        ListingExtractor::new(&self.metadata.id, &self.base, self.rules)
            .extract(&html, &self.config.selectors)
            .ok_or_else(|| {
                Error::Scraping(format!("no listing selector matched on {}", self.listing_url))
            })
    }
}

#[async_trait]
impl Scraper for SourceScraper {
    fn source_metadata(&self) -> &SourceMetadata {
        &self.metadata
    }

    async fn fetch_candidates(&self) -> Result<Vec<RawCandidate>> {
        if let Some(feed_url) = &self.feed_url {
            match timeout(self.feed_timeout, self.fetch_feed(feed_url)).await {
                Ok(Ok(candidates)) if !candidates.is_empty() => {
                    self.log.debug(&format!("📡 feed gave {} items", candidates.len()));
                    return Ok(candidates);
                }
                Ok(Ok(_)) => self.log.warn("feed had no items, falling back to listing page"),
                Ok(Err(e)) => {
                    self.log.warn(&format!("feed failed ({}), falling back to listing page", e))
                }
                Err(_) => self.log.warn(&format!(
                    "feed timed out after {:?}, falling back to listing page",
                    self.feed_timeout
                )),
            }
            if self.config.selectors.is_empty() {
                return Ok(Vec::new());
            }
        }
        self.fetch_listing().await
    }
}
