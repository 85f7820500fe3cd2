use std::sync::Arc;

use tracing::{error, info};

use crate::{
    clock::{self, SharedClock},
    error::{Result, TrackerError},
    models::{NewObservation, PriceObservation},
    services::{
        alert_engine::{AlertEngine, EvaluationResult},
        repository::{PriceRecord, Repository},
    },
};

#[derive(Debug, Clone, PartialEq)]
pub struct IngestResult {
    pub observation: PriceObservation,
    pub evaluation: Option<EvaluationResult>,
    pub evaluation_error: Option<String>,
}

/// Entry point for observations from every capture path.
pub struct IngestService {
    repo: Arc<dyn Repository>,
    engine: Arc<AlertEngine>,
    clock: SharedClock,
}

fn validate(obs: &NewObservation) -> Result<f64> {
    if obs.url.trim().is_empty() {
        return Err(TrackerError::InvalidObservation("url is required".to_string()));
    }

    match obs.price {
        Some(p) if p.is_finite() && p > 0.0 => Ok(p),
        Some(p) => Err(TrackerError::InvalidObservation(format!(
            "price must be positive, got {p}"
        ))),
        None => Err(TrackerError::InvalidObservation("price is required".to_string())),
    }
}

impl IngestService {
    pub fn new(repo: Arc<dyn Repository>, engine: Arc<AlertEngine>) -> Self {
        Self {
            repo,
            engine,
            clock: clock::system(),
        }
    }

    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    /// Validates, stores, then evaluates. Once stored, an observation is never
    /// rolled back; evaluation problems come back in `evaluation_error`.
    pub async fn ingest(&self, obs: NewObservation) -> Result<IngestResult> {
        let price = validate(&obs)?;
        let product_name = obs.product_name_or_default();

        let observation = self
            .repo
            .save_price(PriceRecord {
                url: obs.url.trim().to_string(),
                price,
                product_name: product_name.clone(),
                timestamp: obs.timestamp.unwrap_or_else(|| self.clock.now()),
            })
            .await?;

        info!(url = %observation.url, price, "price observation stored");

        match self
            .engine
            .evaluate(&observation.url, price, Some(&product_name))
            .await
        {
            Ok(evaluation) => Ok(IngestResult {
                observation,
                evaluation: Some(evaluation),
                evaluation_error: None,
            }),
            Err(e) => {
                error!(url = %observation.url, error = %e, "alert evaluation failed");
                Ok(IngestResult {
                    observation,
                    evaluation: None,
                    evaluation_error: Some(e.to_string()),
                })
            }
        }
    }
}
