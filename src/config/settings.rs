//! Tunable parameters of a test run.

use crate::dns::cache::DEFAULT_TTL;
use crate::dns::probe::DEFAULT_TIMEOUT;
use crate::dns::ranking::DEFAULT_TOP_N;
use crate::dns::scheduler::{DEFAULT_BATCH_DELAY, DEFAULT_CONCURRENCY};
use crate::dns::tester::DEFAULT_MAX_RETRIES;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Settings shared by the prober, tester and scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TestSettings {
    /// Per-probe deadline
    pub timeout: Duration,
    /// Servers tested at once
    pub concurrency: usize,
    /// Extra attempts after a timed-out probe
    pub max_retries: u32,
    /// Pause between batches
    pub batch_delay: Duration,
    /// Freshness window of cached probe times
    pub cache_ttl: Duration,
    /// Number of recommended servers
    pub top_n: usize,
}

impl Default for TestSettings {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            concurrency: DEFAULT_CONCURRENCY,
            max_retries: DEFAULT_MAX_RETRIES,
            batch_delay: DEFAULT_BATCH_DELAY,
            cache_ttl: DEFAULT_TTL,
            top_n: DEFAULT_TOP_N,
        }
    }
}

impl TestSettings {
    /// Check the settings are usable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for a zero timeout, concurrency or top-N.
    pub fn validate(&self) -> Result<()> {
        if self.timeout.is_zero() {
            return Err(Error::config("timeout must be greater than zero"));
        }
        if self.concurrency == 0 {
            return Err(Error::config("concurrency must be at least 1"));
        }
        if self.top_n == 0 {
            return Err(Error::config("top must be at least 1"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let s = TestSettings::default();
        assert_eq!(s.timeout, Duration::from_secs(5));
        assert_eq!(s.concurrency, 5);
        assert_eq!(s.max_retries, 1);
        assert_eq!(s.batch_delay, Duration::from_millis(100));
        assert_eq!(s.cache_ttl, Duration::from_secs(300));
        assert_eq!(s.top_n, 3);
        assert!(s.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero() {
        let zero_timeout = TestSettings {
            timeout: Duration::ZERO,
            ..TestSettings::default()
        };
        assert!(zero_timeout.validate().is_err());

        let zero_top = TestSettings {
            top_n: 0,
            ..TestSettings::default()
        };
        assert!(zero_top.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let s: TestSettings = serde_json::from_str(r#"{"concurrency": 8}"#).unwrap();
        assert_eq!(s.concurrency, 8);
        assert_eq!(s.max_retries, 1);
    }
}
