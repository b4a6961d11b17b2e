use std::sync::Arc;

use fw_scrapers::ScraperManager;
use reqwest::Client;

#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<ScraperManager>,
    /// Outbound client for the webhook relay.
    pub http: Client,
}

impl AppState {
    pub fn new(manager: ScraperManager, http: Client) -> Self {
        Self {
            manager: Arc::new(manager),
            http,
        }
    }
}
