use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;

use crate::{
    clock::{self, SharedClock},
    error::{Result, TrackerError},
    models::{Alert, AlertFields, PriceObservation},
    services::repository::{PriceRecord, Repository},
};

/// Process-local store. Every operation runs under one lock, which gives
/// `upsert_active_alert` its atomicity.
#[derive(Clone)]
pub struct InMemoryRepository {
    inner: Arc<Mutex<StoreInner>>,
    clock: SharedClock,
}

#[derive(Default, Debug)]
struct StoreInner {
    /// Observations in insertion order
    prices: Vec<PriceObservation>,
    /// Active and inactive alerts
    alerts: Vec<Alert>,
}

impl Default for InMemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::with_clock(clock::system())
    }

    pub fn with_clock(clock: SharedClock) -> Self {
        Self {
            inner: Arc::new(Mutex::new(StoreInner::default())),
            clock,
        }
    }

    fn inner(&self) -> Result<MutexGuard<'_, StoreInner>> {
        self.inner
            .lock()
            .map_err(|_| TrackerError::Persistence("failed to lock the store".to_string()))
    }

    /// Every alert row, active or not. Mostly useful in tests.
    pub fn all_alerts(&self) -> Result<Vec<Alert>> {
        Ok(self.inner()?.alerts.clone())
    }

    pub fn price_count(&self) -> Result<usize> {
        Ok(self.inner()?.prices.len())
    }
}

fn active_alert_mut<'a>(inner: &'a mut StoreInner, id: &str) -> Option<&'a mut Alert> {
    inner.alerts.iter_mut().find(|a| a.is_active && a.id == id)
}

#[async_trait::async_trait]
impl Repository for InMemoryRepository {
    async fn save_price(&self, record: PriceRecord) -> Result<PriceObservation> {
        let observation = PriceObservation {
            id: ObjectId::new().to_hex(),
            url: record.url,
            price: record.price,
            product_name: record.product_name,
            timestamp: record.timestamp,
            created_at: self.clock.now(),
        };

        self.inner()?.prices.push(observation.clone());
        Ok(observation)
    }

    async fn recent_prices(&self, url: &str, limit: usize) -> Result<Vec<PriceObservation>> {
        let mut items: Vec<PriceObservation> = self
            .inner()?
            .prices
            .iter()
            .filter(|p| p.url == url)
            .cloned()
            .collect();

        items.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        items.truncate(limit);
        Ok(items)
    }

    async fn find_active_alert(&self, url: &str) -> Result<Option<Alert>> {
        Ok(self
            .inner()?
            .alerts
            .iter()
            .find(|a| a.is_active && a.url == url)
            .cloned())
    }

    async fn list_active_alerts(&self) -> Result<Vec<Alert>> {
        let mut items: Vec<Alert> = self
            .inner()?
            .alerts
            .iter()
            .filter(|a| a.is_active)
            .cloned()
            .collect();

        items.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(items)
    }

    async fn upsert_active_alert(&self, url: &str, fields: AlertFields) -> Result<Alert> {
        let now = self.clock.now();
        let mut inner = self.inner()?;

        if let Some(existing) = inner.alerts.iter_mut().find(|a| a.is_active && a.url == url) {
            existing.product_name = fields.product_name;
            existing.target_price = fields.target_price;
            existing.current_price = fields.current_price;
            existing.last_checked = now;
            existing.updated_at = now;
            return Ok(existing.clone());
        }

        let alert = Alert {
            id: ObjectId::new().to_hex(),
            url: url.to_string(),
            product_name: fields.product_name,
            target_price: fields.target_price,
            current_price: fields.current_price,
            is_active: true,
            last_checked: now,
            notifications_sent: 0,
            created_at: now,
            updated_at: now,
        };
        inner.alerts.push(alert.clone());
        Ok(alert)
    }

    async fn deactivate_alert(&self, url: &str) -> Result<Option<Alert>> {
        let now = self.clock.now();
        let mut inner = self.inner()?;

        Ok(inner
            .alerts
            .iter_mut()
            .find(|a| a.is_active && a.url == url)
            .map(|a| {
                a.is_active = false;
                a.updated_at = now;
                a.clone()
            }))
    }

    async fn record_check(
        &self,
        alert_id: &str,
        price: f64,
        checked_at: DateTime<Utc>,
    ) -> Result<Option<Alert>> {
        let mut inner = self.inner()?;
        Ok(active_alert_mut(&mut inner, alert_id).map(|alert| {
            alert.current_price = price;
            alert.last_checked = checked_at;
            alert.updated_at = checked_at;
            alert.clone()
        }))
    }

    async fn record_notification(&self, alert_id: &str) -> Result<Option<Alert>> {
        let now = self.clock.now();
        let mut inner = self.inner()?;
        Ok(active_alert_mut(&mut inner, alert_id).map(|alert| {
            alert.notifications_sent += 1;
            alert.updated_at = now;
            alert.clone()
        }))
    }

    async fn delete_prices_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let mut inner = self.inner()?;
        let before = inner.prices.len();
        inner.prices.retain(|p| p.timestamp >= cutoff);
        Ok((before - inner.prices.len()) as u64)
    }

    async fn delete_inactive_alerts_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let mut inner = self.inner()?;
        let before = inner.alerts.len();
        inner.alerts.retain(|a| a.is_active || a.updated_at >= cutoff);
        Ok((before - inner.alerts.len()) as u64)
    }

    async fn ping(&self) -> Result<()> {
        self.inner().map(|_| ())
    }
}
