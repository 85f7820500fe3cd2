pub mod cache;
pub mod db_init;
pub mod extractor;
pub mod memory_repository;
pub mod mongo_repository;
pub mod notifier;
pub mod repository;

pub mod alert_engine;
pub mod ingest;
pub mod price_source;
pub mod retention;
pub mod scheduler;

pub mod alerts_service;
pub mod prices_service;
