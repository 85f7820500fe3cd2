//! Capture paths: where a sweep gets the current price of a url.
//!
//! The alert engine only sees [`PriceSource`]; whether the number came from a
//! client that observed the page or from a server-side fetch is decided here.

use std::{sync::Arc, time::Duration};

use reqwest::Client;
use tracing::{debug, warn};

use crate::{
    clock::{self, SharedClock},
    config::Settings,
    error::{Result, TrackerError},
    services::{cache::ClientCache, extractor::PriceExtractor, repository::Repository},
};

#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    pub price: f64,
    pub product_name: String,
}

#[async_trait::async_trait]
pub trait PriceSource: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Quote>;
}

/// Server-side fetch of the product page.
pub struct RemotePriceSource {
    http: Client,
    extractor: Arc<dyn PriceExtractor>,
    retries: u32,
    backoff: Duration,
    cache: ClientCache<Quote>,
}

impl RemotePriceSource {
    pub fn new(settings: &Settings, extractor: Arc<dyn PriceExtractor>) -> Result<Self> {
        let http = Client::builder()
            .user_agent(settings.user_agent.as_str())
            .timeout(settings.fetch_timeout)
            .build()?;

        Ok(Self {
            http,
            extractor,
            retries: settings.fetch_retries,
            backoff: Duration::from_secs(1),
            cache: ClientCache::new(),
        })
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_cache(mut self, cache: ClientCache<Quote>) -> Self {
        self.cache = cache;
        self
    }

    async fn fetch_once(&self, url: &str) -> Result<Quote> {
        let res = self.http.get(url).send().await?;

        if !res.status().is_success() {
            return Err(TrackerError::UpstreamFetch(format!(
                "{url} answered {}",
                res.status()
            )));
        }

        let body = res.text().await?;

        let price = self
            .extractor
            .extract(&body)
            .ok_or_else(|| TrackerError::NotFound(format!("no price element on {url}")))?;

        Ok(Quote {
            price,
            product_name: self.extractor.extract_product_name(&body),
        })
    }
}

#[async_trait::async_trait]
impl PriceSource for RemotePriceSource {
    async fn fetch(&self, url: &str) -> Result<Quote> {
        if let Some(hit) = self.cache.get(url) {
            debug!(url = %url, "price served from cache");
            return Ok(hit);
        }

        let mut attempt = 0;
        loop {
            match self.fetch_once(url).await {
                Ok(quote) => {
                    self.cache.set(url, quote.clone());
                    return Ok(quote);
                }
                // the page loaded fine, asking again won't help
                Err(e @ TrackerError::NotFound(_)) => return Err(e),
                Err(e) if attempt >= self.retries => return Err(e),
                Err(e) => {
                    attempt += 1;
                    warn!(url = %url, attempt, error = %e, "price fetch failed, retrying");
                    tokio::time::sleep(self.backoff * attempt).await;
                }
            }
        }
    }
}

/// Latest price a capture client pushed through ingest, if still fresh.
pub struct ObservedPriceSource {
    repo: Arc<dyn Repository>,
    max_age: chrono::Duration,
    clock: SharedClock,
}

impl ObservedPriceSource {
    pub fn new(repo: Arc<dyn Repository>, max_age: Duration) -> Self {
        Self {
            repo,
            max_age: chrono::Duration::from_std(max_age).unwrap_or(chrono::Duration::hours(1)),
            clock: clock::system(),
        }
    }

    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }
}

#[async_trait::async_trait]
impl PriceSource for ObservedPriceSource {
    async fn fetch(&self, url: &str) -> Result<Quote> {
        let latest = self.repo.latest_price(url).await?;

        match latest {
            Some(p) if self.clock.now() - p.timestamp <= self.max_age => Ok(Quote {
                price: p.price,
                product_name: p.product_name,
            }),
            _ => Err(TrackerError::NotFound(format!("no recent observation for {url}"))),
        }
    }
}

/// Client observation first, server fetch otherwise.
pub struct HybridPriceSource {
    observed: Arc<dyn PriceSource>,
    remote: Arc<dyn PriceSource>,
}

impl HybridPriceSource {
    pub fn new(observed: Arc<dyn PriceSource>, remote: Arc<dyn PriceSource>) -> Self {
        Self { observed, remote }
    }
}

#[async_trait::async_trait]
impl PriceSource for HybridPriceSource {
    async fn fetch(&self, url: &str) -> Result<Quote> {
        match self.observed.fetch(url).await {
            Ok(quote) => Ok(quote),
            Err(e) => {
                debug!(url = %url, reason = %e, "no client observation, fetching remotely");
                self.remote.fetch(url).await
            }
        }
    }
}
