pub mod cli;
pub mod config;
pub mod logging;
pub mod manager;
pub mod scrapers;

pub use cli::{handle_command, ScraperCommands};
pub use config::{builtin_sources, load_sources, SourceConfig};
pub use manager::{assemble, PipelineSettings, ScraperManager, SourceBatch};
pub use scrapers::{Scraper, SourceScraper, SummaryExtractor};
