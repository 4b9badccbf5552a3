//! Probe result cache with lazy TTL expiration.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// Default freshness window for cached probe times.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone, Copy)]
struct CacheEntry {
    elapsed_ms: f64,
    created: Instant,
}

/// Time-bounded memo of probe round-trip times keyed by (endpoint, hostname).
///
/// Expired entries are dropped on the lookup that finds them; there is no
/// background sweep.
#[derive(Debug)]
pub struct ResultCache {
    entries: Mutex<HashMap<(String, String), CacheEntry>>,
    ttl: Duration,
}

impl ResultCache {
    #[must_use]
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_TTL)
    }

    #[must_use]
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Look up a fresh entry, evicting it if it has expired.
    pub fn get(&self, endpoint: &str, hostname: &str) -> Option<f64> {
        let Ok(mut entries) = self.entries.lock() else {
            return None;
        };
        let key = (endpoint.to_string(), hostname.to_string());
        let entry = *entries.get(&key)?;

        if entry.created.elapsed() > self.ttl {
            entries.remove(&key);
            tracing::trace!("cache entry expired for {endpoint} {hostname}");
            return None;
        }
        Some(entry.elapsed_ms)
    }

    /// Store a probe time, replacing any previous entry for the pair.
    pub fn put(&self, endpoint: &str, hostname: &str, elapsed_ms: f64) {
        let Ok(mut entries) = self.entries.lock() else {
            return;
        };
        entries.insert(
            (endpoint.to_string(), hostname.to_string()),
            CacheEntry {
                elapsed_ms,
                created: Instant::now(),
            },
        );
    }

    /// Number of stored entries, including ones not yet found expired.
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new()
    }
}
