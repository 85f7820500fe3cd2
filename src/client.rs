//! Capture-side client for the tracker API.
//!
//! This is what a page-observing process uses: it reports prices it saw,
//! and reads alerts and history through a [`ClientCache`] so repeated popup
//! opens within five minutes don't hit the server again.

use std::{sync::Arc, time::Duration};

use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, warn};

use crate::{
    clock::{self, SharedClock},
    error::{Result, TrackerError},
    models::{Alert, NewObservation, PriceObservation},
    services::{
        cache::ClientCache,
        extractor::{ItempropExtractor, PriceExtractor},
    },
};

const ALL_ALERTS_KEY: &str = "allAlerts";

fn history_key(url: &str) -> String {
    format!("priceHistory_{url}")
}

#[derive(Clone)]
pub struct TrackerClient {
    http: Client,
    base_url: String,
    extractor: Arc<dyn PriceExtractor>,
    alerts_cache: ClientCache<Vec<Alert>>,
    history_cache: ClientCache<Vec<PriceObservation>>,
}

impl TrackerClient {
    /// `base_url` is the API root, e.g. `http://localhost:3000/api`.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_clock(base_url, clock::system())
    }

    pub fn with_clock(base_url: impl Into<String>, clock: SharedClock) -> Result<Self> {
        let http = Client::builder().timeout(Duration::from_secs(5)).build()?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            extractor: Arc::new(ItempropExtractor::new()),
            alerts_cache: ClientCache::with_clock(clock.clone()),
            history_cache: ClientCache::with_clock(clock),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn read<T: DeserializeOwned>(res: Response) -> Result<T> {
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(TrackerError::UpstreamFetch(format!(
                "tracker answered {status}: {body}"
            )));
        }

        Ok(res.json::<T>().await?)
    }

    pub async fn post_price(&self, observation: &NewObservation) -> Result<PriceObservation> {
        let res = self
            .http
            .post(self.endpoint("/prices"))
            .json(observation)
            .send()
            .await?;

        let stored: PriceObservation = Self::read(res).await?;
        self.history_cache.invalidate(&history_key(&stored.url));
        Ok(stored)
    }

    /// Extracts the price from a page the client is looking at and reports
    /// it. Pages without a price are skipped (`Ok(None)`).
    pub async fn capture_page(&self, url: &str, html: &str) -> Result<Option<PriceObservation>> {
        let Some(price) = self.extractor.extract(html) else {
            debug!(url = %url, "no price found on page");
            return Ok(None);
        };

        let observation = NewObservation {
            url: url.to_string(),
            price: Some(price),
            product_name: Some(self.extractor.extract_product_name(html)),
            timestamp: Some(chrono::Utc::now()),
        };

        self.post_price(&observation).await.map(Some)
    }

    async fn fetch_alerts(&self) -> Result<Vec<Alert>> {
        let res = self.http.get(self.endpoint("/alerts")).send().await?;
        let alerts: Vec<Alert> = Self::read(res).await?;
        self.alerts_cache.set(ALL_ALERTS_KEY, alerts.clone());
        Ok(alerts)
    }

    async fn fetch_history(&self, url: &str) -> Result<Vec<PriceObservation>> {
        let res = self
            .http
            .get(self.endpoint("/prices"))
            .query(&[("url", url)])
            .send()
            .await?;
        let prices: Vec<PriceObservation> = Self::read(res).await?;
        self.history_cache.set(history_key(url), prices.clone());
        Ok(prices)
    }

    pub async fn alerts(&self) -> Result<Vec<Alert>> {
        if let Some(hit) = self.alerts_cache.get(ALL_ALERTS_KEY) {
            return Ok(hit);
        }
        self.fetch_alerts().await
    }

    pub async fn price_history(&self, url: &str) -> Result<Vec<PriceObservation>> {
        if let Some(hit) = self.history_cache.get(&history_key(url)) {
            return Ok(hit);
        }
        self.fetch_history(url).await
    }

    /// Refreshes the alert list and every alert's history, ignoring cached
    /// entries. Returns how many histories were refreshed.
    pub async fn sync(&self) -> Result<usize> {
        let alerts = self.fetch_alerts().await?;

        let mut refreshed = 0;
        for alert in &alerts {
            match self.fetch_history(&alert.url).await {
                Ok(_) => refreshed += 1,
                Err(e) => warn!(url = %alert.url, error = %e, "history sync failed"),
            }
        }

        Ok(refreshed)
    }

    pub async fn send_test_notification(
        &self,
        product_name: &str,
        current_price: f64,
        url: &str,
    ) -> Result<()> {
        let res = self
            .http
            .post(self.endpoint("/test-notification"))
            .json(&json!({
                "productName": product_name,
                "currentPrice": current_price,
                "url": url,
            }))
            .send()
            .await?;

        let _: serde_json::Value = Self::read(res).await?;
        Ok(())
    }
}
