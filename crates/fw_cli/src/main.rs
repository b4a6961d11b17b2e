use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use fw_scrapers::logging::{init_logging, Logger};
use fw_scrapers::scrapers::utils::build_client;
use fw_scrapers::{
    builtin_sources, handle_command, load_sources, PipelineSettings, ScraperCommands,
    ScraperManager,
};
use fw_web::{create_app, AppState, WebConfig};
use tracing::info;

/// Webhook relays get a more generous budget than source fetches.
const RELAY_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct HumanDuration(Duration);

impl FromStr for HumanDuration {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let mut total_millis = 0u64;
        let mut current_number = String::new();
        let mut has_unit = false;
        let mut chars = s.chars().peekable();

        while let Some(c) = chars.next() {
            if c.is_ascii_digit() {
                current_number.push(c);
            } else if let Ok(num) = current_number.parse::<u64>() {
                let unit_millis = match c {
                    'm' if chars.peek() == Some(&'s') => {
                        chars.next();
                        1
                    }
                    's' => 1_000,
                    'm' => 60_000,
                    'h' => 3_600_000,
                    _ => return Err(format!("Invalid duration unit: {}", c)),
                };
                total_millis = num
                    .checked_mul(unit_millis)
                    .and_then(|millis| total_millis.checked_add(millis))
                    .ok_or_else(|| format!("Duration too large: {}", s))?;
                current_number.clear();
                has_unit = true;
            } else if !c.is_whitespace() {
                return Err(format!("Invalid character in duration: {}", c));
            }
        }

        // a bare number means seconds
        if !current_number.is_empty() {
            let num = current_number
                .parse::<u64>()
                .map_err(|_| "Invalid number in duration".to_string())?;
            total_millis = num
                .checked_mul(1_000)
                .and_then(|millis| total_millis.checked_add(millis))
                .ok_or_else(|| format!("Duration too large: {}", s))?;
            has_unit = true;
        }

        if !has_unit {
            return Err("Duration must include a number".to_string());
        }
        if total_millis == 0 {
            return Err("Duration must be greater than zero".to_string());
        }

        Ok(HumanDuration(Duration::from_millis(total_millis)))
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "fw",
    author,
    version,
    about = "Livestock news search across farming sites",
    long_about = None
)]
struct Cli {
    /// Address to bind the HTTP server to
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    #[arg(long, env = "PORT", default_value_t = 3001)]
    port: u16,
    /// Allowed CORS origin(s): `*` or a comma-separated list
    #[arg(long, env = "CORS_ORIGIN", default_value = "*")]
    cors_origin: String,
    /// Per-source fetch budget (e.g. 10s, 1m30s, 500ms)
    #[arg(long, default_value = "10s")]
    adapter_timeout: HumanDuration,
    /// Shared budget for article page summaries per request
    #[arg(long, default_value = "8s")]
    summary_budget: HumanDuration,
    #[arg(long, default_value_t = 4)]
    summary_concurrency: usize,
    /// Articles older than this many days are dropped
    #[arg(long, default_value_t = 7, value_parser = clap::value_parser!(u32).range(0..=3650))]
    recency_days: u32,
    /// JSON file replacing the built-in source catalogue
    #[arg(long, env = "FW_SOURCES")]
    sources: Option<PathBuf>,
    /// Never fetch article pages for summaries
    #[arg(long)]
    no_summaries: bool,
    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            adapter_timeout: self.adapter_timeout.0,
            summary_budget: self.summary_budget.0,
            summary_concurrency: self.summary_concurrency.max(1),
            recency_days: self.recency_days,
            fetch_summaries: !self.no_summaries,
            ..PipelineSettings::default()
        }
    }

    fn web_config(&self) -> WebConfig {
        WebConfig {
            cors_origin: self.cors_origin.clone(),
        }
    }
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Start the HTTP API
    Serve,
    #[command(flatten)]
    Scraper(ScraperCommands),
}

async fn serve(cli: &Cli, manager: ScraperManager, log: &Logger) -> anyhow::Result<()> {
    let http = build_client(&manager.settings().user_agent, RELAY_TIMEOUT)?;
    let app = create_app(AppState::new(manager, http), &cli.web_config());

    let addr: SocketAddr = format!("{}:{}", cli.host, cli.port)
        .parse()
        .with_context(|| format!("invalid listen address {}:{}", cli.host, cli.port))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    log.info(&format!("🚜 Server listening on http://{}", addr));

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    log.info("👋 Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let log = init_logging("info");
    let cli = Cli::parse();

    let sources = match &cli.sources {
        Some(path) => load_sources(path)
            .with_context(|| format!("loading sources from {}", path.display()))?,
        None => builtin_sources(),
    };
    let manager = ScraperManager::from_sources(sources, cli.pipeline_settings())?;
    info!(
        "🦗 Sources ready: {}",
        manager
            .sources()
            .iter()
            .map(|s| s.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );

    match &cli.command {
        Commands::Serve => serve(&cli, manager, &log).await?,
        Commands::Scraper(command) => handle_command(command.clone(), &manager).await?,
    }
    Ok(())
}
