mod common;

use std::{sync::Arc, time::Duration};

use common::{MockNotifier, ScriptedSource};
use pricewatch::{
    models::AlertFields,
    services::{
        alert_engine::AlertEngine,
        memory_repository::InMemoryRepository,
        repository::{PriceRecord, Repository},
        retention::Retention,
        scheduler::{Duty, DutyReport, Scheduler},
    },
};

struct Fixture {
    scheduler: Scheduler,
    repo: Arc<InMemoryRepository>,
    source: Arc<ScriptedSource>,
    notifier: Arc<MockNotifier>,
}

async fn fixture(sweep_every: Duration) -> Fixture {
    let repo = Arc::new(InMemoryRepository::new());
    let source = Arc::new(ScriptedSource::with(&[("P1", 900.0)]));
    let notifier = Arc::new(MockNotifier::default());

    repo.upsert_active_alert(
        "P1",
        AlertFields {
            product_name: "Phone".to_string(),
            target_price: 1000.0,
            current_price: 1200.0,
        },
    )
    .await
    .unwrap();

    let engine = Arc::new(AlertEngine::new(repo.clone(), notifier.clone(), source.clone()));
    let retention = Arc::new(Retention::new(repo.clone(), 365));
    let scheduler = Scheduler::new(engine, retention, sweep_every, Duration::from_secs(86_400));

    Fixture {
        scheduler,
        repo,
        source,
        notifier,
    }
}

#[tokio::test]
async fn start_runs_a_sweep_immediately() {
    let f = fixture(Duration::from_secs(6 * 60 * 60)).await;

    f.scheduler.start();
    assert!(f.scheduler.is_running());
    tokio::time::sleep(Duration::from_millis(100)).await;
    f.scheduler.stop();

    assert_eq!(f.source.calls(), 1);
    let alert = f.repo.find_active_alert("P1").await.unwrap().unwrap();
    assert_eq!(alert.current_price, 900.0);
    assert_eq!(f.notifier.sent().len(), 1);
}

#[tokio::test]
async fn start_runs_a_cleanup_immediately() {
    let f = fixture(Duration::from_secs(6 * 60 * 60)).await;

    f.repo
        .save_price(PriceRecord {
            url: "P1".to_string(),
            price: 1.0,
            product_name: "Phone".to_string(),
            timestamp: chrono::Utc::now() - chrono::Duration::days(400),
        })
        .await
        .unwrap();
    assert_eq!(f.repo.price_count().unwrap(), 1);

    f.scheduler.start();
    tokio::time::sleep(Duration::from_millis(100)).await;
    f.scheduler.stop();

    assert!(f.repo.recent_prices("P1", 10).await.unwrap().is_empty());
}

#[tokio::test]
async fn sweeps_repeat_on_the_interval_until_stopped() {
    let f = fixture(Duration::from_millis(40)).await;

    f.scheduler.start();
    // a second start must not spawn a second pair of loops
    f.scheduler.start();
    tokio::time::sleep(Duration::from_millis(150)).await;
    f.scheduler.stop();
    assert!(!f.scheduler.is_running());
    tokio::time::sleep(Duration::from_millis(20)).await;

    let calls = f.source.calls();
    assert!(calls >= 2, "expected repeated sweeps, saw {calls}");

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(f.source.calls(), calls);
}

#[tokio::test]
async fn manual_cleanup_trigger_reports_deletions() {
    let f = fixture(Duration::from_secs(3600)).await;

    f.repo
        .save_price(PriceRecord {
            url: "P1".to_string(),
            price: 1.0,
            product_name: "Phone".to_string(),
            timestamp: chrono::Utc::now() - chrono::Duration::days(400),
        })
        .await
        .unwrap();

    let report = f.scheduler.trigger(Duty::Cleanup).await.unwrap();

    let DutyReport::Cleanup(report) = report else {
        panic!("cleanup trigger returned {report:?}");
    };
    assert_eq!(report.prices_deleted, 1);
    assert_eq!(report.alerts_deleted, 0);
    assert!(!f.scheduler.is_running());
}

#[tokio::test]
async fn manual_sweep_trigger_returns_the_report() {
    let f = fixture(Duration::from_secs(3600)).await;

    let report = f.scheduler.trigger(Duty::Sweep).await.unwrap();

    let DutyReport::Sweep(report) = report else {
        panic!("sweep trigger returned {report:?}");
    };
    assert_eq!(report.checked, 1);
    assert_eq!(report.triggered, 1);
}

#[tokio::test]
async fn typed_triggers_return_their_own_reports() {
    let f = fixture(Duration::from_secs(3600)).await;

    let sweep = f.scheduler.sweep_now().await.unwrap();
    assert_eq!(sweep.checked, 1);
    assert_eq!(sweep.triggered, 1);

    let cleanup = f.scheduler.cleanup_now().await;
    assert_eq!(cleanup.prices_deleted, 0);
    assert_eq!(cleanup.alerts_deleted, 0);
}
