use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use fw_core::{HealthResponse, KeywordSet, SearchResponse};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info, warn};

use crate::{ApiError, AppState};

/// POST /api/search
pub async fn search(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<SearchResponse>, ApiError> {
    let Json(body) = payload.map_err(|rejection| ApiError::InvalidKeywords(rejection.body_text()))?;
    let keywords = KeywordSet::from_request(&body)?;

    let articles = state.manager.aggregate(&keywords).await.map_err(|e| {
        error!("Search failed: {}", e);
        ApiError::Search(e)
    })?;
    Ok(Json(SearchResponse::new(articles)))
}

/// GET /api/health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyRequest {
    pub webhook_url: Option<String>,
    #[serde(default)]
    pub data: Value,
}

/// POST /api/zapier-proxy
///
/// Relays `data` to a webhook so browsers don't need CORS access to it.
pub async fn zapier_proxy(
    State(state): State<AppState>,
    payload: Result<Json<ProxyRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let request = payload.map(|Json(request)| request).ok();
    let (webhook_url, data) = match request {
        Some(ProxyRequest {
            webhook_url: Some(url),
            data,
        }) if !url.trim().is_empty() => (url, data),
        _ => return Err(ApiError::MissingWebhookUrl),
    };

    info!("Proxying to webhook: {}", webhook_url);
    let response = state
        .http
        .post(&webhook_url)
        .json(&data)
        .send()
        .await
        .map_err(|e| {
            warn!("Webhook relay failed: {}", e);
            ApiError::Webhook {
                message: e.to_string(),
                details: None,
            }
        })?;

    let status = response.status();
    let text = response.text().await.map_err(|e| {
        warn!("Reading webhook response failed: {}", e);
        ApiError::Webhook {
            message: e.to_string(),
            details: None,
        }
    })?;
    let body = serde_json::from_str::<Value>(&text).unwrap_or(Value::String(text));

    if !status.is_success() {
        warn!("Webhook answered {}", status);
        return Err(ApiError::Webhook {
            message: format!("Request failed with status code {}", status.as_u16()),
            details: Some(body),
        });
    }

    Ok(Json(json!({
        "success": true,
        "status": status.as_u16(),
        "data": body,
    })))
}
