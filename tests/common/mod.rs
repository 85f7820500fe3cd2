#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use axum::response::Response;
use http_body_util::BodyExt;
use pricewatch::{
    AppState, config,
    error::{Result, TrackerError},
    services::{
        memory_repository::InMemoryRepository,
        notifier::{Notice, Notifier},
        price_source::{PriceSource, Quote},
    },
};

#[derive(Default)]
pub struct MockNotifier {
    pub sent: Mutex<Vec<Notice>>,
    pub fail: bool,
}

impl MockNotifier {
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<Notice> {
        match self.sent.lock() {
            Ok(guard) => guard.clone(),
            Err(_) => Vec::new(),
        }
    }
}

#[async_trait::async_trait]
impl Notifier for MockNotifier {
    async fn notify(&self, notice: &Notice) -> Result<()> {
        if let Ok(mut guard) = self.sent.lock() {
            guard.push(notice.clone());
        }
        if self.fail {
            return Err(TrackerError::Notification("telegram unreachable".to_string()));
        }
        Ok(())
    }
}

/// Price source answering from a fixed table; unknown urls fail upstream.
#[derive(Default)]
pub struct ScriptedSource {
    pub prices: Mutex<HashMap<String, f64>>,
    pub calls: AtomicUsize,
}

impl ScriptedSource {
    pub fn with(prices: &[(&str, f64)]) -> Self {
        Self {
            prices: Mutex::new(prices.iter().map(|(u, p)| (u.to_string(), *p)).collect()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn set(&self, url: &str, price: f64) {
        if let Ok(mut prices) = self.prices.lock() {
            prices.insert(url.to_string(), price);
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl PriceSource for ScriptedSource {
    async fn fetch(&self, url: &str) -> Result<Quote> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let price = self.prices.lock().ok().and_then(|p| p.get(url).copied());

        match price {
            Some(price) => Ok(Quote {
                price,
                product_name: "Scripted Product".to_string(),
            }),
            None => Err(TrackerError::UpstreamFetch(format!("connection reset for {url}"))),
        }
    }
}

pub struct Harness {
    pub state: AppState,
    pub repo: Arc<InMemoryRepository>,
    pub notifier: Arc<MockNotifier>,
    pub source: Arc<ScriptedSource>,
}

pub fn harness_with(notifier: MockNotifier, source: ScriptedSource) -> Harness {
    let repo = Arc::new(InMemoryRepository::new());
    let notifier = Arc::new(notifier);
    let source = Arc::new(source);

    let state = AppState::new(
        config::Settings::default(),
        repo.clone(),
        notifier.clone(),
        source.clone(),
    );

    Harness {
        state,
        repo,
        notifier,
        source,
    }
}

pub fn harness() -> Harness {
    harness_with(MockNotifier::default(), ScriptedSource::default())
}

pub async fn response_body_string(res: Response) -> String {
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8_lossy(&bytes).to_string()
}

pub async fn response_json(res: Response) -> serde_json::Value {
    let body = response_body_string(res).await;
    serde_json::from_str(&body).unwrap()
}
