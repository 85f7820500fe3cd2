use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;

use tracing::warn;

use crate::{
    AppState,
    controllers::body_error,
    error::Result,
    models::UNKNOWN_PRODUCT,
    services::notifier::Notice,
};

// POST /cleanup
pub async fn post_cleanup(State(state): State<AppState>) -> Result<Response> {
    let report = state.scheduler.cleanup_now().await;

    Ok(Json(json!({
        "message": "Cleanup completed successfully",
        "pricesDeleted": report.prices_deleted,
        "alertsDeleted": report.alerts_deleted,
    }))
    .into_response())
}

// POST /sweep
pub async fn post_sweep(State(state): State<AppState>) -> Result<Response> {
    let report = state.scheduler.sweep_now().await?;

    Ok(Json(json!({
        "message": "Price check completed",
        "report": report,
    }))
    .into_response())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestNotificationRequest {
    pub product_name: Option<String>,
    #[serde(default)]
    pub current_price: f64,
    #[serde(default)]
    pub url: String,
}

// POST /test-notification
pub async fn post_test_notification(
    State(state): State<AppState>,
    body: std::result::Result<Json<TestNotificationRequest>, JsonRejection>,
) -> Result<Response> {
    let Json(req) = body.map_err(body_error)?;

    let notice = Notice::Test {
        product_name: req
            .product_name
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| UNKNOWN_PRODUCT.to_string()),
        current_price: req.current_price,
        url: req.url,
    };

    // delivery problems are logged, the caller still gets success
    if let Err(e) = state.notifier.notify(&notice).await {
        warn!(error = %e, "test notification failed");
    }

    Ok(Json(json!({ "success": true })).into_response())
}
