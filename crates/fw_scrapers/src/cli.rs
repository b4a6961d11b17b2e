use clap::Subcommand;
use fw_core::{KeywordSet, Result, SearchResponse};

use crate::ScraperManager;

#[derive(Subcommand, Debug, Clone)]
pub enum ScraperCommands {
    /// Run one search across all sources and print the JSON response
    Search {
        /// Keywords to look for (case-insensitive)
        #[arg(required = true)]
        keywords: Vec<String>,
        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },
    /// List configured sources
    Sources,
}

pub async fn handle_command(command: ScraperCommands, manager: &ScraperManager) -> Result<()> {
    match command {
        ScraperCommands::Search { keywords, pretty } => {
            let keywords = KeywordSet::new(&keywords);
            if keywords.is_empty() {
                return Err(fw_core::Error::InvalidRequest(
                    "at least one non-blank keyword is required".to_string(),
                ));
            }
            let response = SearchResponse::new(manager.aggregate(&keywords).await?);
            let json = if pretty {
                serde_json::to_string_pretty(&response)?
            } else {
                serde_json::to_string(&response)?
            };
            println!("{}", json);
        }
        ScraperCommands::Sources => {
            println!("{}", render_sources(manager));
        }
    }
    Ok(())
}

fn render_sources(manager: &ScraperManager) -> String {
    manager
        .sources()
        .iter()
        .map(|meta| {
            let mut flags = Vec::new();
            if meta.always_include {
                flags.push("always included");
            }
            if meta.fetch_summaries {
                flags.push("page summaries");
            }
            if flags.is_empty() {
                format!("  {} - {}", meta.id, meta.name)
            } else {
                format!("  {} - {} ({})", meta.id, meta.name, flags.join(", "))
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
