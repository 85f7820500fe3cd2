use std::{env, str::FromStr, time::Duration};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Mongo,
    Memory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceSourceKind {
    // server-side fetch only
    Remote,
    // latest client observation first, remote fetch as fallback
    Hybrid,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub host: String,
    pub port: u16,

    pub storage: StorageBackend,
    pub mongodb_uri: String,
    pub mongodb_db: String,

    pub telegram_bot_token: String,
    pub telegram_chat_id: Option<i64>,

    pub price_source: PriceSourceKind,
    pub sweep_interval: Duration,
    pub cleanup_interval: Duration,
    pub retention_days: i64,
    pub sweep_concurrency: usize,

    pub fetch_timeout: Duration,
    pub fetch_retries: u32,
    pub observed_max_age: Duration,
    pub user_agent: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            storage: StorageBackend::Mongo,
            mongodb_uri: "mongodb://localhost:27017".to_string(),
            mongodb_db: "price-tracker".to_string(),
            telegram_bot_token: String::new(),
            telegram_chat_id: None,
            price_source: PriceSourceKind::Hybrid,
            sweep_interval: Duration::from_secs(6 * 60 * 60),
            cleanup_interval: Duration::from_secs(24 * 60 * 60),
            retention_days: 365,
            sweep_concurrency: 4,
            fetch_timeout: Duration::from_secs(5),
            fetch_retries: 2,
            observed_max_age: Duration::from_secs(60 * 60),
            user_agent: concat!("pricewatch/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl Settings {
    pub fn telegram_enabled(&self) -> bool {
        !self.telegram_bot_token.trim().is_empty() && self.telegram_chat_id.is_some()
    }
}

fn parsed<T: FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|s| s.trim().parse::<T>().ok())
}

fn secs(key: &str) -> Option<Duration> {
    parsed::<u64>(key).filter(|s| *s > 0).map(Duration::from_secs)
}

pub fn load() -> Settings {
    // Loads .env if present (no crash if missing)
    dotenvy::dotenv().ok();

    let defaults = Settings::default();

    let storage = match env::var("STORAGE_BACKEND").as_deref().map(str::trim) {
        Ok(v) if v.eq_ignore_ascii_case("memory") => StorageBackend::Memory,
        _ => StorageBackend::Mongo,
    };

    let price_source = match env::var("PRICE_SOURCE").as_deref().map(str::trim) {
        Ok(v) if v.eq_ignore_ascii_case("remote") => PriceSourceKind::Remote,
        _ => PriceSourceKind::Hybrid,
    };

    Settings {
        host: env::var("HOST").unwrap_or(defaults.host),
        port: parsed("PORT").unwrap_or(defaults.port),
        storage,
        mongodb_uri: env::var("MONGODB_URI").unwrap_or(defaults.mongodb_uri),
        mongodb_db: env::var("MONGODB_DB").unwrap_or(defaults.mongodb_db),
        telegram_bot_token: env::var("TELEGRAM_BOT_TOKEN").unwrap_or_default(),
        telegram_chat_id: parsed("TELEGRAM_CHAT_ID"),
        price_source,
        sweep_interval: secs("SWEEP_INTERVAL_SECS").unwrap_or(defaults.sweep_interval),
        cleanup_interval: secs("CLEANUP_INTERVAL_SECS").unwrap_or(defaults.cleanup_interval),
        retention_days: parsed::<i64>("RETENTION_DAYS")
            .filter(|d| *d > 0)
            .unwrap_or(defaults.retention_days),
        sweep_concurrency: parsed::<usize>("SWEEP_CONCURRENCY")
            .filter(|n| *n > 0)
            .unwrap_or(defaults.sweep_concurrency),
        fetch_timeout: secs("FETCH_TIMEOUT_SECS").unwrap_or(defaults.fetch_timeout),
        fetch_retries: parsed("FETCH_RETRIES").unwrap_or(defaults.fetch_retries),
        observed_max_age: secs("OBSERVED_MAX_AGE_SECS").unwrap_or(defaults.observed_max_age),
        user_agent: env::var("USER_AGENT").unwrap_or(defaults.user_agent),
    }
}
