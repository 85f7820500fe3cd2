use crate::{
    AppState,
    error::Result,
    models::PriceObservation,
    services::repository::PRICE_HISTORY_LIMIT,
};

/// Newest-first history for a url, capped at [`PRICE_HISTORY_LIMIT`].
pub async fn price_history(state: &AppState, url: &str) -> Result<Vec<PriceObservation>> {
    let url = url.trim();
    if url.is_empty() {
        return Ok(Vec::new());
    }

    state.repo.recent_prices(url, PRICE_HISTORY_LIMIT).await
}
