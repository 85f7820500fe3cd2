mod common;

use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use axum::{Router, extract::State, http::StatusCode, response::Html, routing::get};
use common::{MockNotifier, ScriptedSource, harness, harness_with};
use pricewatch::{
    client::TrackerClient,
    clock::ManualClock,
    config::Settings,
    error::TrackerError,
    models::AlertFields,
    routes,
    services::{
        extractor::ItempropExtractor,
        notifier::Notice,
        price_source::{PriceSource, RemotePriceSource},
        repository::Repository,
    },
};

const PRODUCT_PAGE: &str = r#"
<html><body>
  <h1>Refurbished Phone</h1>
  <span itemprop="price">₹12,499</span>
</body></html>
"#;

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn fields(target: f64) -> AlertFields {
    AlertFields {
        product_name: "Refurbished Phone".to_string(),
        target_price: target,
        current_price: 15_000.0,
    }
}

// ---------------- remote fetch ----------------

#[derive(Clone, Default)]
struct Hits {
    ok: Arc<AtomicUsize>,
    flaky: Arc<AtomicUsize>,
    bare: Arc<AtomicUsize>,
}

fn shop(hits: Hits) -> Router {
    Router::new()
        .route(
            "/p/ok",
            get(|State(h): State<Hits>| async move {
                h.ok.fetch_add(1, Ordering::SeqCst);
                Html(PRODUCT_PAGE)
            }),
        )
        .route(
            "/p/flaky",
            get(|State(h): State<Hits>| async move {
                h.flaky.fetch_add(1, Ordering::SeqCst);
                StatusCode::BAD_GATEWAY
            }),
        )
        .route(
            "/p/bare",
            get(|State(h): State<Hits>| async move {
                h.bare.fetch_add(1, Ordering::SeqCst);
                Html("<html><body><h1>Sold out</h1></body></html>")
            }),
        )
        .with_state(hits)
}

fn remote_source() -> RemotePriceSource {
    let settings = Settings {
        fetch_timeout: Duration::from_secs(2),
        fetch_retries: 2,
        ..Settings::default()
    };

    RemotePriceSource::new(&settings, Arc::new(ItempropExtractor::new()))
        .unwrap()
        .with_backoff(Duration::from_millis(1))
}

#[tokio::test]
async fn remote_fetch_extracts_and_caches() {
    let hits = Hits::default();
    let base = serve(shop(hits.clone())).await;
    let source = remote_source();

    let url = format!("{base}/p/ok");
    let first = source.fetch(&url).await.unwrap();
    let second = source.fetch(&url).await.unwrap();

    assert_eq!(first.price, 12_499.0);
    assert_eq!(first.product_name, "Refurbished Phone");
    assert_eq!(first, second);
    assert_eq!(hits.ok.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn remote_fetch_gives_up_after_the_configured_retries() {
    let hits = Hits::default();
    let base = serve(shop(hits.clone())).await;

    let err = remote_source()
        .fetch(&format!("{base}/p/flaky"))
        .await
        .unwrap_err();

    assert!(matches!(err, TrackerError::UpstreamFetch(_)));
    assert_eq!(hits.flaky.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn page_without_price_is_not_retried() {
    let hits = Hits::default();
    let base = serve(shop(hits.clone())).await;

    let err = remote_source()
        .fetch(&format!("{base}/p/bare"))
        .await
        .unwrap_err();

    assert!(matches!(err, TrackerError::NotFound(_)));
    assert_eq!(hits.bare.load(Ordering::SeqCst), 1);
}

// ---------------- capture client ----------------

#[tokio::test]
async fn capture_page_reports_the_price_and_triggers_the_alert() {
    let h = harness();
    h.repo.upsert_active_alert("https://shop.test/p/1", fields(13_000.0)).await.unwrap();
    let base = serve(routes::app(h.state.clone())).await;

    let client = TrackerClient::new(format!("{base}/api")).unwrap();
    let stored = client
        .capture_page("https://shop.test/p/1", PRODUCT_PAGE)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(stored.price, 12_499.0);
    assert_eq!(stored.product_name, "Refurbished Phone");
    assert_eq!(
        h.notifier.sent(),
        vec![Notice::PriceDrop {
            product_name: "Refurbished Phone".to_string(),
            current_price: 12_499.0,
            target_price: 13_000.0,
            url: "https://shop.test/p/1".to_string(),
        }]
    );
}

#[tokio::test]
async fn capture_page_without_price_posts_nothing() {
    let h = harness();
    let base = serve(routes::app(h.state.clone())).await;

    let client = TrackerClient::new(format!("{base}/api")).unwrap();
    let stored = client
        .capture_page("https://shop.test/p/1", "<h1>Sold out</h1>")
        .await
        .unwrap();

    assert!(stored.is_none());
    assert_eq!(h.repo.price_count().unwrap(), 0);
}

#[tokio::test]
async fn alerts_are_served_from_cache_for_five_minutes() {
    let h = harness();
    h.repo.upsert_active_alert("A", fields(100.0)).await.unwrap();
    let base = serve(routes::app(h.state.clone())).await;

    let clock = Arc::new(ManualClock::default());
    let client = TrackerClient::with_clock(format!("{base}/api"), clock.clone()).unwrap();

    assert_eq!(client.alerts().await.unwrap().len(), 1);

    h.repo.upsert_active_alert("B", fields(100.0)).await.unwrap();
    assert_eq!(client.alerts().await.unwrap().len(), 1);

    clock.advance(chrono::Duration::minutes(5));
    assert_eq!(client.alerts().await.unwrap().len(), 2);
}

#[tokio::test]
async fn posting_a_price_drops_the_cached_history() {
    let h = harness();
    let base = serve(routes::app(h.state.clone())).await;
    let client = TrackerClient::new(format!("{base}/api")).unwrap();

    assert!(client.price_history("P1").await.unwrap().is_empty());

    client
        .post_price(&pricewatch::models::NewObservation::new("P1", 50.0, "Phone"))
        .await
        .unwrap();

    assert_eq!(client.price_history("P1").await.unwrap().len(), 1);
}

#[tokio::test]
async fn sync_refreshes_every_alert_history() {
    let h = harness();
    h.repo.upsert_active_alert("A", fields(100.0)).await.unwrap();
    h.repo.upsert_active_alert("B", fields(100.0)).await.unwrap();
    let base = serve(routes::app(h.state.clone())).await;
    let client = TrackerClient::new(format!("{base}/api")).unwrap();

    assert!(client.price_history("A").await.unwrap().is_empty());
    h.state
        .ingest
        .ingest(pricewatch::models::NewObservation::new("A", 500.0, "Phone"))
        .await
        .unwrap();

    assert_eq!(client.sync().await.unwrap(), 2);
    assert_eq!(client.price_history("A").await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_notification_succeeds_even_when_delivery_fails() {
    let h = harness_with(MockNotifier::failing(), ScriptedSource::default());
    let base = serve(routes::app(h.state.clone())).await;
    let client = TrackerClient::new(format!("{base}/api")).unwrap();

    client
        .send_test_notification("Phone", 999.0, "P1")
        .await
        .unwrap();

    assert_eq!(h.notifier.sent().len(), 1);
}

#[tokio::test]
async fn server_errors_surface_as_upstream_failures() {
    let h = harness();
    let base = serve(routes::app(h.state.clone())).await;
    let client = TrackerClient::new(format!("{base}/api")).unwrap();

    let err = client
        .post_price(&pricewatch::models::NewObservation::new("P1", 0.0, "Phone"))
        .await
        .unwrap_err();

    let TrackerError::UpstreamFetch(msg) = err else {
        panic!("unexpected error {err:?}");
    };
    assert!(msg.contains("500"));
}
