use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use chrono::{DateTime, Duration, Utc};

use crate::clock::{self, SharedClock};

/// Capture-side entries go stale after five minutes.
pub const CACHE_TTL_SECS: i64 = 5 * 60;

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    cached_at: DateTime<Utc>,
}

/// Short-lived memoization for capture-path clients.
///
/// `get` never returns an entry whose age has reached the TTL; callers treat
/// `None` as "fetch again".
#[derive(Clone)]
pub struct ClientCache<V> {
    entries: Arc<Mutex<HashMap<String, CacheEntry<V>>>>,
    ttl: Duration,
    clock: SharedClock,
}

impl<V: Clone> Default for ClientCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone> ClientCache<V> {
    pub fn new() -> Self {
        Self::with_clock(clock::system())
    }

    pub fn with_clock(clock: SharedClock) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            ttl: Duration::seconds(CACHE_TTL_SECS),
            clock,
        }
    }

    pub fn get(&self, key: &str) -> Option<V> {
        let now = self.clock.now();
        let mut entries = self.entries.lock().ok()?;

        match entries.get(key) {
            Some(entry) if now - entry.cached_at < self.ttl => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn set(&self, key: impl Into<String>, value: V) {
        let entry = CacheEntry {
            value,
            cached_at: self.clock.now(),
        };

        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key.into(), entry);
        }
    }

    pub fn invalidate(&self, key: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.remove(key);
        }
    }
}
