//! Aggregation pipeline: fan out to every source, then merge, filter, dedup and sort.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use futures::future::join_all;
use futures::stream::{self, StreamExt};
use fw_core::types::truncate_chars;
use fw_core::{
    dates, matched_keywords, Article, KeywordSet, RawCandidate, Result, SourceMetadata,
    MAX_SUMMARY_CHARS, SUMMARY_PLACEHOLDER,
};
use tokio::time::{timeout, timeout_at, Instant};
use tracing::{info, warn};

use crate::config::{validate_sources, SourceConfig};
use crate::logging::Logger;
use crate::scrapers::utils::{build_client, USER_AGENT};
use crate::scrapers::{PageSummaryExtractor, Scraper, SourceScraper, SummaryExtractor};

type SharedScraper = Arc<dyn Scraper>;

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Budget for one source's listing or feed fetch.
    pub adapter_timeout: Duration,
    /// Shared deadline for all summary enrichment in one request.
    pub summary_budget: Duration,
    pub summary_concurrency: usize,
    /// Articles older than this many days before today are dropped.
    pub recency_days: u32,
    pub fetch_summaries: bool,
    pub user_agent: String,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            adapter_timeout: Duration::from_secs(10),
            summary_budget: Duration::from_secs(8),
            summary_concurrency: 4,
            recency_days: 7,
            fetch_summaries: true,
            user_agent: USER_AGENT.to_string(),
        }
    }
}

/// Candidates produced by one source in one request.
#[derive(Debug, Clone)]
pub struct SourceBatch {
    pub metadata: SourceMetadata,
    pub candidates: Vec<RawCandidate>,
}

impl SourceBatch {
    pub fn empty(metadata: SourceMetadata) -> Self {
        Self {
            metadata,
            candidates: Vec::new(),
        }
    }
}

pub struct ScraperManager {
    scrapers: Vec<SharedScraper>,
    summaries: Option<Arc<dyn SummaryExtractor>>,
    settings: PipelineSettings,
}

impl ScraperManager {
    pub fn new(settings: PipelineSettings) -> Self {
        Self {
            scrapers: Vec::new(),
            summaries: None,
            settings,
        }
    }

    /// Builds one [`SourceScraper`] per config, sharing an HTTP client.
    pub fn from_sources(sources: Vec<SourceConfig>, settings: PipelineSettings) -> Result<Self> {
        validate_sources(&sources)?;
        let client = build_client(&settings.user_agent, settings.adapter_timeout)?;

        let mut manager = Self::new(settings);
        // half the adapter budget for the feed, the rest for a listing fallback
        let feed_timeout = manager.settings.adapter_timeout / 2;
        for source in sources {
            let scraper =
                SourceScraper::new(source, client.clone())?.with_feed_timeout(feed_timeout);
            manager.add_scraper(Arc::new(scraper));
        }
        if manager.settings.fetch_summaries {
            manager.summaries = Some(Arc::new(PageSummaryExtractor::new(client)));
        }
        Ok(manager)
    }

    /// Registration order is the merge order used for deduplication.
    pub fn add_scraper(&mut self, scraper: SharedScraper) {
        self.scrapers.push(scraper);
    }

    pub fn with_summary_extractor(mut self, extractor: Arc<dyn SummaryExtractor>) -> Self {
        self.summaries = Some(extractor);
        self
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub fn sources(&self) -> Vec<SourceMetadata> {
        self.scrapers
            .iter()
            .map(|s| s.source_metadata().clone())
            .collect()
    }

    pub async fn aggregate(&self, keywords: &KeywordSet) -> Result<Vec<Article>> {
        self.aggregate_on(keywords, dates::today()).await
    }

    /// Runs the whole pipeline with `today` as the reference day.
    pub async fn aggregate_on(
        &self,
        keywords: &KeywordSet,
        today: NaiveDate,
    ) -> Result<Vec<Article>> {
        info!(
            "🦗 Searching {} sources for: {}",
            self.scrapers.len(),
            keywords.iter().collect::<Vec<_>>().join(", ")
        );
        let batches = self.collect(keywords).await;
        let articles = assemble(batches, keywords, today, self.settings.recency_days);
        info!("✨ Found {} articles", articles.len());
        Ok(articles)
    }

    /// One task per source; results come back in registration order.
    async fn collect(&self, keywords: &KeywordSet) -> Vec<SourceBatch> {
        let deadline = Instant::now() + self.settings.summary_budget;

        let handles: Vec<_> = self
            .scrapers
            .iter()
            .map(|scraper| {
                let job = SourceJob {
                    scraper: scraper.clone(),
                    summaries: self.summaries.clone(),
                    keywords: keywords.clone(),
                    adapter_timeout: self.settings.adapter_timeout,
                    summary_deadline: deadline,
                    summary_concurrency: self.settings.summary_concurrency,
                };
                tokio::spawn(job.run())
            })
            .collect();

        join_all(handles)
            .await
            .into_iter()
            .zip(&self.scrapers)
            .map(|(joined, scraper)| {
                joined.unwrap_or_else(|e| {
                    let metadata = scraper.source_metadata().clone();
                    warn!("[{}] source task failed: {}", metadata.id, e);
                    SourceBatch::empty(metadata)
                })
            })
            .collect()
    }
}

struct SourceJob {
    scraper: SharedScraper,
    summaries: Option<Arc<dyn SummaryExtractor>>,
    keywords: KeywordSet,
    adapter_timeout: Duration,
    summary_deadline: Instant,
    summary_concurrency: usize,
}

impl SourceJob {
    async fn run(self) -> SourceBatch {
        let metadata = self.scraper.source_metadata().clone();
        let log = Logger::new().with_prefix(format!("[{}]", metadata.id));

        let fetched = timeout(self.adapter_timeout, self.scraper.fetch_candidates()).await;
        let candidates = match fetched {
            Ok(Ok(candidates)) => {
                log.info(&format!("📰 {} candidates from {}", candidates.len(), metadata.name));
                candidates
            }
            Ok(Err(e)) => {
                log.warn(&format!("⚠️ skipping {}: {}", metadata.name, e));
                Vec::new()
            }
            Err(_) => {
                log.warn(&format!(
                    "⚠️ skipping {}: timed out after {:?}",
                    metadata.name, self.adapter_timeout
                ));
                Vec::new()
            }
        };

        let candidates = match &self.summaries {
            Some(extractor) if metadata.fetch_summaries => {
                enrich_summaries(
                    candidates,
                    extractor.as_ref(),
                    &self.keywords,
                    metadata.always_include,
                    self.summary_deadline,
                    self.summary_concurrency,
                )
                .await
            }
            _ => candidates,
        };

        SourceBatch {
            metadata,
            candidates,
        }
    }
}

/// Fills in missing summaries for candidates that can still make it into the result.
///
/// Only candidates whose title already matches a keyword (or whose source is
/// keyword-exempt) are fetched. Nothing is fetched once `deadline` has passed.
pub async fn enrich_summaries(
    candidates: Vec<RawCandidate>,
    extractor: &dyn SummaryExtractor,
    keywords: &KeywordSet,
    always_include: bool,
    deadline: Instant,
    concurrency: usize,
) -> Vec<RawCandidate> {
    stream::iter(candidates)
        .map(move |mut candidate| async move {
            let wanted = candidate.raw_summary.is_none()
                && (always_include || !keywords.matched_in(&candidate.title).is_empty());
            if wanted && Instant::now() < deadline {
                let fetched = timeout_at(deadline, extractor.extract_summary(&candidate.url)).await;
                if let Ok(Some(summary)) = fetched {
                    candidate.raw_summary = Some(summary);
                }
            }
            candidate
        })
        .buffered(concurrency.max(1))
        .collect()
        .await
}

/// Normalizes, filters, deduplicates and orders the merged batches.
///
/// `batches` must be in merge order; the first occurrence of a URL wins and the
/// date sort is stable with respect to that order.
pub fn assemble(
    batches: Vec<SourceBatch>,
    keywords: &KeywordSet,
    today: NaiveDate,
    recency_days: u32,
) -> Vec<Article> {
    // a window reaching past the calendar's start keeps everything
    let cutoff = chrono::Duration::try_days(i64::from(recency_days))
        .and_then(|window| today.checked_sub_signed(window))
        .unwrap_or(NaiveDate::MIN);
    let mut seen = HashSet::new();

    let mut articles: Vec<Article> = batches
        .into_iter()
        .flat_map(|batch| normalize_batch(batch, keywords, today))
        .filter(|article| seen.insert(article.url.clone()))
        .filter(|article| article.date >= cutoff)
        .collect();

    articles.sort_by(|a, b| b.date.cmp(&a.date));
    articles
}

fn normalize_batch(batch: SourceBatch, keywords: &KeywordSet, today: NaiveDate) -> Vec<Article> {
    let SourceBatch {
        metadata,
        candidates,
    } = batch;

    candidates
        .into_iter()
        .enumerate()
        .filter_map(|(ordinal, candidate)| {
            let summary = candidate
                .raw_summary
                .as_deref()
                .map(|s| truncate_chars(s, MAX_SUMMARY_CHARS))
                .unwrap_or_default();
            let matched = matched_keywords(&candidate.title, &summary, keywords);
            if matched.is_empty() && !metadata.always_include {
                return None;
            }

            let date = dates::normalize_at(candidate.raw_date.as_deref(), today);
            Some(Article {
                id: format!("{}-{}", metadata.id, ordinal),
                title: candidate.title,
                url: candidate.url,
                source: metadata.name.clone(),
                date: date.date,
                date_confidence: date.confidence,
                summary: if summary.is_empty() {
                    SUMMARY_PLACEHOLDER.to_string()
                } else {
                    summary
                },
                matched_keywords: matched,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use fw_core::{DateConfidence, Error, SourceId};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn candidate(
        tag: &str,
        title: &str,
        url: &str,
        summary: Option<&str>,
        date: Option<&str>,
    ) -> RawCandidate {
        RawCandidate::new(&SourceId::new(tag), title, url, summary, date).unwrap()
    }

    fn plain(tag: &str, title: &str, url: &str) -> RawCandidate {
        candidate(tag, title, url, None, None)
    }

    fn dated(tag: &str, title: &str, url: &str, date: &str) -> RawCandidate {
        candidate(tag, title, url, None, Some(date))
    }

    fn batch(tag: &str, candidates: Vec<RawCandidate>) -> SourceBatch {
        SourceBatch {
            metadata: SourceMetadata::new(tag, &tag.to_uppercase()),
            candidates,
        }
    }

    struct MockScraper {
        metadata: SourceMetadata,
        candidates: Vec<RawCandidate>,
        delay: Duration,
        fail: bool,
    }

    impl MockScraper {
        fn new(tag: &str, candidates: Vec<RawCandidate>) -> Self {
            Self {
                metadata: SourceMetadata::new(tag, &tag.to_uppercase()),
                candidates,
                delay: Duration::ZERO,
                fail: false,
            }
        }
    }

    #[async_trait]
    impl Scraper for MockScraper {
        fn source_metadata(&self) -> &SourceMetadata {
            &self.metadata
        }

        async fn fetch_candidates(&self) -> Result<Vec<RawCandidate>> {
            tokio::time::sleep(self.delay).await;
            if self.fail {
                return Err(Error::Scraping("connection reset".to_string()));
            }
            Ok(self.candidates.clone())
        }
    }

    struct MockExtractor {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl SummaryExtractor for MockExtractor {
        async fn extract_summary(&self, url: &str) -> Option<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Some(format!("Page summary for {}", url))
        }
    }

    #[test]
    fn test_keyword_filter_and_exemption() {
        let keywords = KeywordSet::new(["bluetongue"]);
        let today = day(2024, 3, 10);
        let mut press = batch(
            "press",
            vec![plain("press", "Minister visits dairy show", "https://p.example/1")],
        );
        press.metadata.always_include = true;

        let articles = assemble(
            vec![
                batch(
                    "a",
                    vec![
                        plain("a", "Bluetongue found in Norfolk", "https://a.example/1"),
                        candidate(
                            "a",
                            "Pig prices steady",
                            "https://a.example/2",
                            Some("Nothing relevant"),
                            None,
                        ),
                        candidate(
                            "a",
                            "Vaccine news",
                            "https://a.example/3",
                            Some("A BlueTongue jab"),
                            None,
                        ),
                    ],
                ),
                press,
            ],
            &keywords,
            today,
            7,
        );

        let ids: Vec<_> = articles.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["a-0", "a-2", "press-0"]);
        assert_eq!(articles[0].matched_keywords, vec!["bluetongue"]);
        assert_eq!(articles[0].summary, SUMMARY_PLACEHOLDER);
        assert_eq!(articles[0].date_confidence, DateConfidence::Inferred);
        assert!(articles[2].matched_keywords.is_empty());
        assert_eq!(articles[2].source, "PRESS");
    }

    #[test]
    fn test_placeholder_does_not_match_keywords() {
        let keywords = KeywordSet::new(["summary"]);
        let articles = assemble(
            vec![batch("a", vec![plain("a", "Dairy herd update", "https://a.example/1")])],
            &keywords,
            day(2024, 3, 10),
            7,
        );
        assert!(articles.is_empty());
    }

    #[test]
    fn test_dedup_keeps_first_in_merge_order() {
        let keywords = KeywordSet::new(["cattle"]);
        let url = "https://shared.example/cattle-tb";
        let articles = assemble(
            vec![
                batch("a", vec![dated("a", "Cattle TB rules change", url, "2024-03-08")]),
                batch("b", vec![dated("b", "Cattle TB rules updated", url, "2024-03-09")]),
            ],
            &keywords,
            day(2024, 3, 10),
            7,
        );
        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].id, "a-0");
        assert_eq!(articles[0].source, "A");
    }

    #[test]
    fn test_recency_boundary_is_inclusive() {
        let keywords = KeywordSet::new(["sheep"]);
        let articles = assemble(
            vec![batch(
                "a",
                vec![
                    dated("a", "Sheep scab alert", "https://a.example/1", "7 days ago"),
                    dated("a", "Sheep prices slip", "https://a.example/2", "8 days ago"),
                    dated("a", "Sheep show results", "https://a.example/3", "2024-03-03"),
                    dated("a", "Sheep dip history", "https://a.example/4", "2024-03-02"),
                ],
            )],
            &keywords,
            day(2024, 3, 10),
            7,
        );
        let ids: Vec<_> = articles.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["a-0", "a-2"]);
        assert!(articles.iter().all(|a| a.date >= day(2024, 3, 3)));
    }

    #[test]
    fn test_huge_recency_window_keeps_everything() {
        let keywords = KeywordSet::new(["sheep"]);
        let old = dated("a", "Sheep dip history", "https://a.example/1", "1999-03-02");
        let articles = assemble(vec![batch("a", vec![old])], &keywords, day(2024, 3, 10), u32::MAX);
        assert_eq!(articles.len(), 1);

        let articles = assemble(
            vec![batch("a", vec![plain("a", "Sheep sale", "https://a.example/2")])],
            &keywords,
            NaiveDate::MIN,
            7,
        );
        assert_eq!(articles.len(), 1);
    }

    #[test]
    fn test_sort_is_descending_and_stable() {
        let keywords = KeywordSet::new(["beef"]);
        let articles = assemble(
            vec![
                batch(
                    "a",
                    vec![
                        dated("a", "Beef one", "https://a.example/1", "2024-03-08"),
                        dated("a", "Beef two", "https://a.example/2", "2024-03-09"),
                    ],
                ),
                batch(
                    "b",
                    vec![
                        dated("b", "Beef three", "https://b.example/1", "2024-03-08"),
                        dated("b", "Beef four", "https://b.example/2", "2024-03-10"),
                    ],
                ),
            ],
            &keywords,
            day(2024, 3, 10),
            7,
        );
        let titles: Vec<_> = articles.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, vec!["Beef four", "Beef two", "Beef one", "Beef three"]);
        assert!(articles.windows(2).all(|w| w[0].date >= w[1].date));
    }

    #[test]
    fn test_summary_is_bounded() {
        let keywords = KeywordSet::new(["milk"]);
        let long = "milk ".repeat(200);
        let articles = assemble(
            vec![batch(
                "a",
                vec![candidate("a", "Milk price", "https://a.example/1", Some(&long), None)],
            )],
            &keywords,
            day(2024, 3, 10),
            7,
        );
        assert!(articles[0].summary.chars().count() <= MAX_SUMMARY_CHARS);
    }

    #[tokio::test]
    async fn test_failed_and_slow_sources_are_isolated() {
        let keywords = KeywordSet::new(["pig"]);
        let settings = PipelineSettings {
            adapter_timeout: Duration::from_millis(100),
            ..PipelineSettings::default()
        };
        let mut manager = ScraperManager::new(settings);

        let mut failing = MockScraper::new("fail", vec![]);
        failing.fail = true;
        let mut hanging = MockScraper::new(
            "slow",
            vec![plain("slow", "Pig late story", "https://slow.example/1")],
        );
        hanging.delay = Duration::from_secs(30);
        let healthy = MockScraper::new(
            "ok",
            vec![plain("ok", "Pig herd grows", "https://ok.example/1")],
        );

        manager.add_scraper(Arc::new(failing));
        manager.add_scraper(Arc::new(hanging));
        manager.add_scraper(Arc::new(healthy));

        let started = std::time::Instant::now();
        let articles = manager.aggregate(&keywords).await.unwrap();
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].id, "ok-0");
    }

    #[tokio::test]
    async fn test_merge_order_ignores_completion_order() {
        let keywords = KeywordSet::new(["goat"]);
        let mut manager = ScraperManager::new(PipelineSettings::default());
        let url = "https://shared.example/goats";

        let mut first = MockScraper::new("first", vec![plain("first", "Goat milk boom", url)]);
        first.delay = Duration::from_millis(200);
        let second = MockScraper::new("second", vec![plain("second", "Goat milk boom", url)]);

        manager.add_scraper(Arc::new(first));
        manager.add_scraper(Arc::new(second));

        let articles = manager.aggregate(&keywords).await.unwrap();
        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].id, "first-0");
    }

    #[tokio::test]
    async fn test_no_sources_is_empty_success() {
        let manager = ScraperManager::new(PipelineSettings::default());
        let articles = manager.aggregate(&KeywordSet::new(["cattle"])).await.unwrap();
        assert!(articles.is_empty());
    }

    #[tokio::test]
    async fn test_enrichment_only_fetches_relevant_candidates() {
        let keywords = KeywordSet::new(["lamb"]);
        let extractor = Arc::new(MockExtractor {
            calls: AtomicUsize::new(0),
        });
        let mut source = MockScraper::new(
            "a",
            vec![
                plain("a", "Lamb trade picks up", "https://a.example/1"),
                plain("a", "Tractor sales", "https://a.example/2"),
                candidate(
                    "a",
                    "Lamb exports",
                    "https://a.example/3",
                    Some("Already summarised"),
                    None,
                ),
            ],
        );
        source.metadata.fetch_summaries = true;

        let mut manager = ScraperManager::new(PipelineSettings::default())
            .with_summary_extractor(extractor.clone());
        manager.add_scraper(Arc::new(source));

        let articles = manager.aggregate(&keywords).await.unwrap();
        assert_eq!(extractor.calls.load(Ordering::SeqCst), 1);
        assert_eq!(articles.len(), 2);
        assert_eq!(articles[0].summary, "Page summary for https://a.example/1");
        assert_eq!(articles[1].summary, "Already summarised");
    }

    #[tokio::test]
    async fn test_enrichment_respects_deadline() {
        let keywords = KeywordSet::new(["lamb"]);
        let extractor = MockExtractor {
            calls: AtomicUsize::new(0),
        };
        let candidates = vec![plain("a", "Lamb trade picks up", "https://a.example/1")];
        let deadline = Instant::now() - Duration::from_millis(1);

        let enriched =
            enrich_summaries(candidates, &extractor, &keywords, false, deadline, 2).await;
        assert_eq!(extractor.calls.load(Ordering::SeqCst), 0);
        assert_eq!(enriched[0].raw_summary, None);
    }
}
