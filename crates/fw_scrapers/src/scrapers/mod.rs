use async_trait::async_trait;
use fw_core::{RawCandidate, Result, SourceMetadata};

pub mod feed;
pub mod listing;
pub mod source;
pub mod summary;

pub use source::SourceScraper;
pub use summary::{PageSummaryExtractor, SummaryExtractor};

/// One external source, translated into raw candidates.
#[async_trait]
pub trait Scraper: Send + Sync {
    /// Returns the static description of this source
    fn source_metadata(&self) -> &SourceMetadata;

    /// Fetches the source once and extracts every candidate it lists.
    ///
    /// Network and parse failures are returned as errors; the caller decides
    /// whether they are fatal.
    async fn fetch_candidates(&self) -> Result<Vec<RawCandidate>>;
}

/// Common utilities for scrapers
pub mod utils {
    use std::time::Duration;

    use fw_core::{Error, Result};
    use reqwest::{Client, Response};
    use scraper::ElementRef;
    use url::Url;

    pub const USER_AGENT: &str =
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (compatible; farmwire/0.1)";

    pub fn build_client(user_agent: &str, timeout: Duration) -> Result<Client> {
        Ok(Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?)
    }

    /// GETs `url`, treating non-2xx as an error.
    async fn get_ok(client: &Client, url: &str) -> Result<Response> {
        let response = client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Scraping(format!("{} returned {}", url, status)));
        }
        Ok(response)
    }

    /// Raw body, for payloads that declare their own encoding (feeds).
    pub async fn fetch_bytes(client: &Client, url: &str) -> Result<Vec<u8>> {
        Ok(get_ok(client, url).await?.bytes().await?.to_vec())
    }

    /// Body decoded with the charset from `Content-Type`, UTF-8 otherwise.
    pub async fn fetch_text(client: &Client, url: &str) -> Result<String> {
        Ok(get_ok(client, url).await?.text().await?)
    }

    /// Resolves a link found on a page of `base` into an absolute http(s) URL.
    pub fn resolve_url(base: &Url, href: &str) -> Option<String> {
        let href = href.trim();
        let lower = href.to_ascii_lowercase();
        if href.is_empty()
            || href.starts_with('#')
            || lower.starts_with("javascript:")
            || lower.starts_with("mailto:")
            || lower.starts_with("tel:")
        {
            return None;
        }

        let mut url = base.join(href).ok()?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return None;
        }
        url.set_fragment(None);
        Some(url.to_string())
    }

    /// Visible text of an element with whitespace collapsed.
    pub fn element_text(element: ElementRef<'_>) -> String {
        fw_core::types::collapse_whitespace(&element.text().collect::<String>())
    }

    /// Runs extraction strategies in order and keeps the first that yields something.
    pub fn first_success<T, I, F>(strategies: I) -> Option<T>
    where
        I: IntoIterator<Item = F>,
        F: FnOnce() -> Option<T>,
    {
        strategies.into_iter().find_map(|strategy| strategy())
    }
}
