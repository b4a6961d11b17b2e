//! HTTP surface for the livestock news search.

use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

pub mod error;
pub mod handlers;
pub mod state;

pub use error::ApiError;
pub use state::AppState;

#[derive(Debug, Clone)]
pub struct WebConfig {
    /// `*` or a comma-separated list of allowed origins.
    pub cors_origin: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            cors_origin: "*".to_string(),
        }
    }
}

impl WebConfig {
    pub fn cors_layer(&self) -> CorsLayer {
        let cors = CorsLayer::new()
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

        if self.cors_origin.trim() == "*" {
            return cors.allow_origin(Any);
        }

        let origins: Vec<HeaderValue> = self
            .cors_origin
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!("Ignoring invalid CORS origin {:?}", origin);
                    None
                }
            })
            .collect();
        cors.allow_origin(AllowOrigin::list(origins))
    }
}

pub fn create_app(state: AppState, config: &WebConfig) -> Router {
    Router::new()
        .route("/api/search", post(handlers::search))
        .route("/api/health", get(handlers::health))
        .route("/api/zapier-proxy", post(handlers::zapier_proxy))
        .layer(TraceLayer::new_for_http())
        .layer(config.cors_layer())
        .with_state(state)
}
