//! Storage contract shared by every component.
//!
//! Two logical collections: `prices` (append-only observations) and `alerts`
//! (one active row per url, inactive rows kept until retention removes them).

use chrono::{DateTime, Utc};

use crate::{
    error::Result,
    models::{Alert, AlertFields, PriceObservation},
};

/// How many observations `GET /prices` returns at most.
pub const PRICE_HISTORY_LIMIT: usize = 100;

/// Validated observation ready to be stored.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceRecord {
    pub url: String,
    pub price: f64,
    pub product_name: String,
    pub timestamp: DateTime<Utc>,
}

// async_trait keeps the trait object safe (Arc<dyn Repository>).
#[async_trait::async_trait]
pub trait Repository: Send + Sync {
    /// Appends an observation and returns the stored row.
    async fn save_price(&self, record: PriceRecord) -> Result<PriceObservation>;

    /// Most recent observations for `url`, newest first.
    async fn recent_prices(&self, url: &str, limit: usize) -> Result<Vec<PriceObservation>>;

    async fn latest_price(&self, url: &str) -> Result<Option<PriceObservation>> {
        Ok(self.recent_prices(url, 1).await?.into_iter().next())
    }

    async fn find_active_alert(&self, url: &str) -> Result<Option<Alert>>;

    /// All active alerts, most recently updated first.
    async fn list_active_alerts(&self) -> Result<Vec<Alert>>;

    /// Creates or updates the single active alert for `url` in one atomic
    /// operation keyed on `{url, isActive: true}`.
    async fn upsert_active_alert(&self, url: &str, fields: AlertFields) -> Result<Alert>;

    /// Soft-deletes the active alert for `url`. Returns the deactivated row.
    async fn deactivate_alert(&self, url: &str) -> Result<Option<Alert>>;

    /// Stores the latest checked price on an alert. Matches only while the
    /// alert is still active; `None` once it has been deactivated.
    async fn record_check(
        &self,
        alert_id: &str,
        price: f64,
        checked_at: DateTime<Utc>,
    ) -> Result<Option<Alert>>;

    /// Bumps `notificationsSent` by one on an active alert.
    async fn record_notification(&self, alert_id: &str) -> Result<Option<Alert>>;

    /// Deletes observations with `timestamp < cutoff`. Returns the count.
    async fn delete_prices_before(&self, cutoff: DateTime<Utc>) -> Result<u64>;

    /// Deletes inactive alerts with `updatedAt < cutoff`. Returns the count.
    async fn delete_inactive_alerts_before(&self, cutoff: DateTime<Utc>) -> Result<u64>;

    async fn ping(&self) -> Result<()>;
}
