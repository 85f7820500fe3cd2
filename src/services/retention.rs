use std::sync::Arc;

use chrono::Duration;
use serde::Serialize;
use tracing::{error, info};

use crate::{
    clock::{self, SharedClock},
    services::repository::Repository,
};

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupReport {
    pub prices_deleted: u64,
    pub alerts_deleted: u64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

/// Purges price history and inactive alerts older than the window.
pub struct Retention {
    repo: Arc<dyn Repository>,
    window: Duration,
    clock: SharedClock,
}

impl Retention {
    pub fn new(repo: Arc<dyn Repository>, retention_days: i64) -> Self {
        Self {
            repo,
            window: Duration::days(retention_days),
            clock: clock::system(),
        }
    }

    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    /// Both deletions always run; one failing is logged and reported without
    /// stopping the other. Active alerts are never touched.
    pub async fn run(&self) -> CleanupReport {
        let cutoff = self.clock.now() - self.window;
        let mut report = CleanupReport::default();

        let (prices, alerts) = tokio::join!(
            self.repo.delete_prices_before(cutoff),
            self.repo.delete_inactive_alerts_before(cutoff),
        );

        match prices {
            Ok(n) => {
                report.prices_deleted = n;
                info!(deleted = n, "cleaned up old price records");
            }
            Err(e) => {
                error!(error = %e, "price history cleanup failed");
                report.errors.push(e.to_string());
            }
        }

        match alerts {
            Ok(n) => {
                report.alerts_deleted = n;
                info!(deleted = n, "cleaned up old inactive alerts");
            }
            Err(e) => {
                error!(error = %e, "inactive alert cleanup failed");
                report.errors.push(e.to_string());
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        clock::{Clock, ManualClock},
        models::AlertFields,
        services::{memory_repository::InMemoryRepository, repository::PriceRecord},
    };

    fn fields() -> AlertFields {
        AlertFields {
            product_name: "Phone".to_string(),
            target_price: 1000.0,
            current_price: 1100.0,
        }
    }

    fn record(url: &str, at: chrono::DateTime<chrono::Utc>) -> PriceRecord {
        PriceRecord {
            url: url.to_string(),
            price: 1100.0,
            product_name: "Phone".to_string(),
            timestamp: at,
        }
    }

    #[tokio::test]
    async fn deletes_prices_past_the_window_only() {
        let clock = Arc::new(ManualClock::default());
        let repo = Arc::new(InMemoryRepository::with_clock(clock.clone()));
        let now = clock.now();

        repo.save_price(record("old", now - Duration::days(366))).await.unwrap();
        repo.save_price(record("recent", now - Duration::days(364))).await.unwrap();

        let report = Retention::new(repo.clone(), 365)
            .with_clock(clock.clone())
            .run()
            .await;

        assert_eq!(report.prices_deleted, 1);
        assert!(repo.recent_prices("old", 10).await.unwrap().is_empty());
        assert_eq!(repo.recent_prices("recent", 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn deletes_only_old_inactive_alerts() {
        let clock = Arc::new(ManualClock::default());
        let repo = Arc::new(InMemoryRepository::with_clock(clock.clone()));

        repo.upsert_active_alert("gone", fields()).await.unwrap();
        repo.deactivate_alert("gone").await.unwrap();
        repo.upsert_active_alert("kept-active", fields()).await.unwrap();

        clock.advance(Duration::days(366));

        repo.upsert_active_alert("fresh-inactive", fields()).await.unwrap();
        repo.deactivate_alert("fresh-inactive").await.unwrap();

        let report = Retention::new(repo.clone(), 365)
            .with_clock(clock.clone())
            .run()
            .await;

        assert_eq!(report.alerts_deleted, 1);
        let urls: Vec<String> = repo.all_alerts().unwrap().into_iter().map(|a| a.url).collect();
        assert!(urls.contains(&"kept-active".to_string()));
        assert!(urls.contains(&"fresh-inactive".to_string()));
        assert!(!urls.contains(&"gone".to_string()));
    }
}
