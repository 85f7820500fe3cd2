use axum::{
    Json,
    extract::{Query, State, rejection::JsonRejection},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;

use crate::{
    AppState,
    controllers::{body_error, prices_controller::UrlQuery},
    error::{Result, TrackerError},
    services::alerts_service,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertRequest {
    #[serde(default)]
    pub url: String,
    pub target_price: Option<f64>,
    pub product_name: Option<String>,
    pub current_price: Option<f64>,
    #[serde(default)]
    pub remove: bool,
}

// POST /alerts
pub async fn post_alert(
    State(state): State<AppState>,
    body: std::result::Result<Json<AlertRequest>, JsonRejection>,
) -> Result<Response> {
    let Json(req) = body.map_err(body_error)?;

    if req.remove {
        let alert = alerts_service::remove_alert(&state, &req.url).await?;
        return Ok(Json(json!({
            "message": "Alert deactivated successfully",
            "alert": alert,
        }))
        .into_response());
    }

    let target_price = req
        .target_price
        .ok_or_else(|| TrackerError::InvalidObservation("targetPrice is required".to_string()))?;

    let alert = alerts_service::set_alert(
        &state,
        &req.url,
        target_price,
        req.product_name.as_deref(),
        req.current_price,
    )
    .await?;

    Ok(Json(alert).into_response())
}

// GET /alerts
pub async fn get_alerts(State(state): State<AppState>) -> Result<Response> {
    let alerts = alerts_service::list_active_alerts(&state).await?;
    Ok(Json(alerts).into_response())
}

// GET /alerts/url?url=
pub async fn get_alert_for_url(
    State(state): State<AppState>,
    Query(q): Query<UrlQuery>,
) -> Result<Response> {
    let alert = alerts_service::active_alert_for_url(&state, &q.url).await?;
    Ok(Json(alert).into_response())
}
