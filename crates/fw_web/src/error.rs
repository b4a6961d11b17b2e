use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use fw_core::ErrorResponse;
use serde_json::{json, Value};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Keywords array is required")]
    InvalidKeywords(String),

    #[error("Failed to fetch articles")]
    Search(#[source] fw_core::Error),

    #[error("Webhook URL is required")]
    MissingWebhookUrl,

    #[error("{message}")]
    Webhook { message: String, details: Option<Value> },
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidKeywords(_) | ApiError::MissingWebhookUrl => StatusCode::BAD_REQUEST,
            ApiError::Search(_) | ApiError::Webhook { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<fw_core::Error> for ApiError {
    fn from(e: fw_core::Error) -> Self {
        match e {
            fw_core::Error::InvalidRequest(message) => ApiError::InvalidKeywords(message),
            other => ApiError::Search(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            ApiError::InvalidKeywords(message) => {
                json!(ErrorResponse::new(self.to_string(), Some(message.clone())))
            }
            ApiError::Search(source) => {
                json!(ErrorResponse::new(self.to_string(), Some(source.to_string())))
            }
            ApiError::MissingWebhookUrl => json!(ErrorResponse::new(self.to_string(), None)),
            ApiError::Webhook { message, details } => {
                let mut body = json!({ "success": false, "error": message });
                if let Some(details) = details {
                    body["details"] = details.clone();
                }
                body
            }
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_errors_map_to_status() {
        let invalid: ApiError =
            fw_core::Error::InvalidRequest("keywords must be an array".into()).into();
        assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);
        assert_eq!(invalid.to_string(), "Keywords array is required");

        let failed: ApiError = fw_core::Error::Scraping("boom".into()).into();
        assert_eq!(failed.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(failed.to_string(), "Failed to fetch articles");
    }
}
