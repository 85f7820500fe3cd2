use axum::{
    Json,
    extract::{Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use crate::{
    AppState,
    controllers::body_error,
    error::Result,
    models::NewObservation,
    services::prices_service,
};

#[derive(Debug, Deserialize)]
pub struct UrlQuery {
    #[serde(default)]
    pub url: String,
}

// POST /prices
pub async fn post_price(
    State(state): State<AppState>,
    body: std::result::Result<Json<NewObservation>, JsonRejection>,
) -> Result<Response> {
    let Json(observation) = body.map_err(body_error)?;

    let result = state.ingest.ingest(observation).await?;

    Ok((StatusCode::CREATED, Json(result.observation)).into_response())
}

// GET /prices?url=
pub async fn get_prices(
    State(state): State<AppState>,
    Query(q): Query<UrlQuery>,
) -> Result<Response> {
    let prices = prices_service::price_history(&state, &q.url).await?;
    Ok(Json(prices).into_response())
}
