use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("invalid observation: {0}")]
    InvalidObservation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("upstream fetch failed: {0}")]
    UpstreamFetch(String),

    #[error("persistence failure: {0}")]
    Persistence(String),

    #[error("notification failed: {0}")]
    Notification(String),
}

pub type Result<T, E = TrackerError> = std::result::Result<T, E>;

impl From<mongodb::error::Error> for TrackerError {
    fn from(e: mongodb::error::Error) -> Self {
        TrackerError::Persistence(e.to_string())
    }
}

impl From<reqwest::Error> for TrackerError {
    fn from(e: reqwest::Error) -> Self {
        TrackerError::UpstreamFetch(e.to_string())
    }
}

impl From<teloxide::RequestError> for TrackerError {
    fn from(e: teloxide::RequestError) -> Self {
        TrackerError::Notification(e.to_string())
    }
}

// The HTTP boundary only defines 500 for failures.
impl IntoResponse for TrackerError {
    fn into_response(self) -> Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": self.to_string() })),
        )
            .into_response()
    }
}
