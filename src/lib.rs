//! Library entrypoint for pricewatch.
//!
//! Keeping everything behind a library makes the controller tests easy
//! (integration tests under `tests/` can build the app state and routers).

use std::sync::Arc;

pub mod client;
pub mod clock;
pub mod config;
pub mod error;
pub mod models;

pub mod services;

pub mod controllers;
pub mod routes;

use services::{
    alert_engine::AlertEngine,
    extractor::ItempropExtractor,
    ingest::IngestService,
    memory_repository::InMemoryRepository,
    mongo_repository::MongoRepository,
    notifier::{LogNotifier, Notifier, TelegramNotifier},
    price_source::{HybridPriceSource, ObservedPriceSource, PriceSource, RemotePriceSource},
    repository::Repository,
    retention::Retention,
    scheduler::Scheduler,
};

#[derive(Clone)]
pub struct AppState {
    pub settings: config::Settings,
    pub repo: Arc<dyn Repository>,
    pub notifier: Arc<dyn Notifier>,
    pub engine: Arc<AlertEngine>,
    pub ingest: Arc<IngestService>,
    pub scheduler: Arc<Scheduler>,
}

impl AppState {
    /// Wires the engine, ingest and scheduler around the given collaborators.
    /// The scheduler is not started.
    pub fn new(
        settings: config::Settings,
        repo: Arc<dyn Repository>,
        notifier: Arc<dyn Notifier>,
        source: Arc<dyn PriceSource>,
    ) -> Self {
        let engine = Arc::new(
            AlertEngine::new(repo.clone(), notifier.clone(), source)
                .with_concurrency(settings.sweep_concurrency),
        );
        let ingest = Arc::new(IngestService::new(repo.clone(), engine.clone()));
        let retention = Arc::new(Retention::new(repo.clone(), settings.retention_days));
        let scheduler = Arc::new(Scheduler::new(
            engine.clone(),
            retention,
            settings.sweep_interval,
            settings.cleanup_interval,
        ));

        Self {
            settings,
            repo,
            notifier,
            engine,
            ingest,
            scheduler,
        }
    }

    /// Builds production collaborators from settings.
    pub async fn from_settings(settings: config::Settings) -> error::Result<Self> {
        let repo: Arc<dyn Repository> = match settings.storage {
            config::StorageBackend::Mongo => Arc::new(
                MongoRepository::connect(&settings.mongodb_uri, &settings.mongodb_db).await?,
            ),
            config::StorageBackend::Memory => Arc::new(InMemoryRepository::new()),
        };

        let notifier: Arc<dyn Notifier> = match settings.telegram_chat_id {
            Some(chat_id) if settings.telegram_enabled() => {
                Arc::new(TelegramNotifier::new(&settings.telegram_bot_token, chat_id))
            }
            _ => {
                tracing::warn!("TELEGRAM_BOT_TOKEN / TELEGRAM_CHAT_ID missing, alerts go to the log");
                Arc::new(LogNotifier)
            }
        };

        let remote: Arc<dyn PriceSource> = Arc::new(RemotePriceSource::new(
            &settings,
            Arc::new(ItempropExtractor::new()),
        )?);

        let source: Arc<dyn PriceSource> = match settings.price_source {
            config::PriceSourceKind::Remote => remote,
            config::PriceSourceKind::Hybrid => Arc::new(HybridPriceSource::new(
                Arc::new(ObservedPriceSource::new(repo.clone(), settings.observed_max_age)),
                remote,
            )),
        };

        Ok(Self::new(settings, repo, notifier, source))
    }
}
