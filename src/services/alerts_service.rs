use tracing::info;

use crate::{
    AppState,
    error::{Result, TrackerError},
    models::{Alert, AlertFields, UNKNOWN_PRODUCT},
};

/// Creates the active alert for `url` or updates the one already there.
pub async fn set_alert(
    state: &AppState,
    url: &str,
    target_price: f64,
    product_name: Option<&str>,
    current_price: Option<f64>,
) -> Result<Alert> {
    let url = url.trim();
    if url.is_empty() {
        return Err(TrackerError::InvalidObservation("url is required".to_string()));
    }
    if !target_price.is_finite() || target_price <= 0.0 {
        return Err(TrackerError::InvalidObservation(format!(
            "target price must be positive, got {target_price}"
        )));
    }

    let current_price = current_price
        .filter(|p| p.is_finite() && *p >= 0.0)
        .unwrap_or(0.0);

    let product_name = product_name
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(UNKNOWN_PRODUCT)
        .to_string();

    let alert = state
        .repo
        .upsert_active_alert(
            url,
            AlertFields {
                product_name,
                target_price,
                current_price,
            },
        )
        .await?;

    info!(url = %alert.url, target = alert.target_price, "alert saved");
    Ok(alert)
}

/// Soft-deletes the active alert for `url`, if any.
pub async fn remove_alert(state: &AppState, url: &str) -> Result<Option<Alert>> {
    let removed = state.repo.deactivate_alert(url.trim()).await?;

    if let Some(a) = &removed {
        info!(url = %a.url, "alert deactivated");
    }

    Ok(removed)
}

pub async fn list_active_alerts(state: &AppState) -> Result<Vec<Alert>> {
    state.repo.list_active_alerts().await
}

pub async fn active_alert_for_url(state: &AppState, url: &str) -> Result<Option<Alert>> {
    state.repo.find_active_alert(url.trim()).await
}
