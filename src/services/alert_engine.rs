use std::sync::Arc;

use futures_util::{StreamExt, stream};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::{
    clock::{self, SharedClock},
    error::{Result, TrackerError},
    models::{Alert, UNKNOWN_PRODUCT},
    services::{
        notifier::{Notice, Notifier},
        price_source::PriceSource,
        repository::Repository,
    },
};

#[derive(Debug, Clone, PartialEq)]
pub enum EvaluationResult {
    /// No active alert for the url; nothing was touched.
    NoAlert,
    /// Price refreshed on the alert, threshold not reached.
    Updated(Alert),
    /// Price at or below target; a notification went out (or was attempted).
    Triggered(Alert),
}

impl EvaluationResult {
    pub fn alert(&self) -> Option<&Alert> {
        match self {
            EvaluationResult::NoAlert => None,
            EvaluationResult::Updated(a) | EvaluationResult::Triggered(a) => Some(a),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            EvaluationResult::NoAlert => "noAlert",
            EvaluationResult::Updated(_) => "updated",
            EvaluationResult::Triggered(_) => "triggered",
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepReport {
    pub checked: usize,
    pub updated: usize,
    pub triggered: usize,
    pub failed: usize,
}

pub struct AlertEngine {
    repo: Arc<dyn Repository>,
    notifier: Arc<dyn Notifier>,
    source: Arc<dyn PriceSource>,
    clock: SharedClock,
    concurrency: usize,
}

impl AlertEngine {
    pub fn new(
        repo: Arc<dyn Repository>,
        notifier: Arc<dyn Notifier>,
        source: Arc<dyn PriceSource>,
    ) -> Self {
        Self {
            repo,
            notifier,
            source,
            clock: clock::system(),
            concurrency: 4,
        }
    }

    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_concurrency(mut self, n: usize) -> Self {
        self.concurrency = n.max(1);
        self
    }

    /// Checks one price against the active alert for `url`.
    ///
    /// The price refresh is persisted before notifying, so a failed delivery
    /// never loses it. Every evaluation at or below target notifies again;
    /// nothing remembers that this price was already reported.
    pub async fn evaluate(
        &self,
        url: &str,
        price: f64,
        product_name: Option<&str>,
    ) -> Result<EvaluationResult> {
        if url.trim().is_empty() {
            return Err(TrackerError::InvalidObservation("url is required".to_string()));
        }
        if !price.is_finite() || price <= 0.0 {
            return Err(TrackerError::InvalidObservation(format!(
                "price must be positive, got {price}"
            )));
        }

        let Some(alert) = self.repo.find_active_alert(url).await? else {
            debug!(url = %url, "no active alert");
            return Ok(EvaluationResult::NoAlert);
        };

        let Some(alert) = self
            .repo
            .record_check(&alert.id, price, self.clock.now())
            .await?
        else {
            debug!(url = %url, "alert deactivated before the check was recorded");
            return Ok(EvaluationResult::NoAlert);
        };

        if !alert.is_hit_by(price) {
            debug!(url = %url, price, target = alert.target_price, "price above target");
            return Ok(EvaluationResult::Updated(alert));
        }

        let name = product_name
            .map(str::trim)
            .filter(|n| !n.is_empty() && *n != UNKNOWN_PRODUCT)
            .unwrap_or(alert.product_name.as_str())
            .to_string();

        let notice = Notice::PriceDrop {
            product_name: name,
            current_price: price,
            target_price: alert.target_price,
            url: alert.url.clone(),
        };

        if let Err(e) = self.notifier.notify(&notice).await {
            warn!(url = %url, error = %e, "price alert notification failed");
            return Ok(EvaluationResult::Triggered(alert));
        }

        info!(url = %url, price, target = alert.target_price, "price alert sent");

        match self.repo.record_notification(&alert.id).await {
            Ok(Some(counted)) => Ok(EvaluationResult::Triggered(counted)),
            Ok(None) => Ok(EvaluationResult::Triggered(alert)),
            Err(e) => {
                error!(url = %url, error = %e, "failed to count notification");
                Ok(EvaluationResult::Triggered(alert))
            }
        }
    }

    async fn check_alert(&self, alert: Alert) -> Result<EvaluationResult> {
        let quote = self.source.fetch(&alert.url).await?;
        self.evaluate(&alert.url, quote.price, Some(&quote.product_name))
            .await
    }

    /// Re-checks every active alert. One alert failing never stops the rest.
    pub async fn evaluate_all(&self) -> Result<SweepReport> {
        info!("starting price check for all active alerts");

        let alerts = self.repo.list_active_alerts().await?;
        let mut report = SweepReport {
            checked: alerts.len(),
            ..SweepReport::default()
        };

        let outcomes: Vec<(String, Result<EvaluationResult>)> = stream::iter(alerts)
            .map(|alert| async move {
                let url = alert.url.clone();
                (url, self.check_alert(alert).await)
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        for (url, outcome) in outcomes {
            match outcome {
                Ok(EvaluationResult::Triggered(_)) => report.triggered += 1,
                Ok(EvaluationResult::Updated(_)) => report.updated += 1,
                // deactivated while the sweep was running
                Ok(EvaluationResult::NoAlert) => {}
                Err(e) => {
                    warn!(url = %url, error = %e, "price check failed");
                    report.failed += 1;
                }
            }
        }

        info!(
            checked = report.checked,
            updated = report.updated,
            triggered = report.triggered,
            failed = report.failed,
            "completed price check for all active alerts"
        );

        Ok(report)
    }
}
