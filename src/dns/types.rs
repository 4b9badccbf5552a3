//! DNS types and data structures.
//!
//! This module provides the core types used for DoH server configuration,
//! per-probe outcomes and per-server aggregate statistics.

use crate::error::{ErrorKind, ProbeError};
use serde::{Deserialize, Serialize};
use url::Url;

/// HTTP method a DoH server prefers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum HttpMethod {
    /// Query carried in the URL
    Get,
    /// Binary query carried in the request body
    #[default]
    Post,
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Get => write!(f, "get"),
            Self::Post => write!(f, "post"),
        }
    }
}

/// How a GET request encodes the question.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum GetFormat {
    /// `?name=<host>&type=A` (Google / Cloudflare JSON API style)
    #[default]
    Json,
    /// `?dns=<base64url wire message>` (RFC 8484)
    Wire,
}

/// DoH server configuration.
///
/// Read-only input for the duration of a test run. A server without a
/// URL is kept in the list and reported as unavailable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    /// Display name (e.g., "Cloudflare", "Quad9")
    pub name: String,
    /// DoH endpoint URL
    #[serde(default)]
    pub url: Option<String>,
    /// Plain DNS addresses of the provider
    #[serde(default)]
    pub ips: Vec<String>,
    /// Preferred HTTP method
    #[serde(rename = "type", default)]
    pub method: HttpMethod,
    /// Query encoding used for GET requests
    #[serde(default)]
    pub format: GetFormat,
    /// Whether the response status may be inspected
    #[serde(default)]
    pub allow_cors: bool,
}

impl ServerConfig {
    /// Create a new server configuration using POST in opaque mode.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let server = ServerConfig::new("Cloudflare", Some("https://cloudflare-dns.com/dns-query"));
    /// ```
    pub fn new(name: impl Into<String>, url: Option<&str>) -> Self {
        Self {
            name: name.into(),
            url: url.map(str::to_string),
            ips: Vec::new(),
            method: HttpMethod::Post,
            format: GetFormat::Json,
            allow_cors: false,
        }
    }

    #[must_use]
    pub fn with_method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    #[must_use]
    pub fn with_format(mut self, format: GetFormat) -> Self {
        self.format = format;
        self
    }

    #[must_use]
    pub fn with_cors(mut self, allow_cors: bool) -> Self {
        self.allow_cors = allow_cors;
        self
    }

    #[must_use]
    pub fn with_ips<I, S>(mut self, ips: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ips = ips.into_iter().map(Into::into).collect();
        self
    }

    /// Parse the endpoint URL.
    ///
    /// Returns `None` when the URL is missing, unparsable, or not http(s);
    /// such a server is untestable.
    #[must_use]
    pub fn endpoint(&self) -> Option<Url> {
        let raw = self.url.as_deref()?.trim();
        let url = Url::parse(raw).ok()?;
        matches!(url.scheme(), "http" | "https").then_some(url)
    }
}

/// Outcome of probing one hostname against one server.
///
/// Never mutated after creation; a retry produces a new outcome that
/// replaces the earlier one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProbeOutcome {
    /// Hostname that was queried
    pub hostname: String,
    /// Round-trip time in milliseconds (success only)
    pub elapsed_ms: Option<f64>,
    /// Whether the probe completed
    pub success: bool,
    /// Failure classification
    pub error: Option<ErrorKind>,
    /// Failure detail
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Set when this outcome came from a retry
    #[serde(default)]
    pub retried: bool,
    /// Set when the time was served from the result cache
    #[serde(default)]
    pub cached: bool,
}

impl ProbeOutcome {
    /// Create a successful outcome.
    pub fn success(hostname: impl Into<String>, elapsed_ms: f64) -> Self {
        Self {
            hostname: hostname.into(),
            elapsed_ms: Some(elapsed_ms),
            success: true,
            error: None,
            detail: None,
            retried: false,
            cached: false,
        }
    }

    /// Create a failed outcome from a probe error.
    pub fn failure(hostname: impl Into<String>, error: &ProbeError) -> Self {
        Self {
            hostname: hostname.into(),
            elapsed_ms: None,
            success: false,
            error: Some(error.kind),
            detail: Some(error.detail.clone()),
            retried: false,
            cached: false,
        }
    }

    /// Outcome for a server that has no usable endpoint.
    pub fn unavailable(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            elapsed_ms: None,
            success: false,
            error: Some(ErrorKind::Unavailable),
            detail: Some("Unavailable".to_string()),
            retried: false,
            cached: false,
        }
    }

    /// Outcome served from the result cache.
    pub fn from_cache(hostname: impl Into<String>, elapsed_ms: f64) -> Self {
        Self {
            cached: true,
            ..Self::success(hostname, elapsed_ms)
        }
    }

    #[must_use]
    pub fn with_retried(mut self, retried: bool) -> Self {
        self.retried = retried;
        self
    }

    /// Check if the outcome indicates a timeout.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        !self.success && self.error == Some(ErrorKind::Timeout)
    }
}

/// Per-server aggregate over all probed hostnames.
///
/// Timing statistics cover successful probes only and are all `None`
/// when nothing succeeded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServerStats {
    pub name: String,
    pub url: Option<String>,
    pub ips: Vec<String>,
    pub method: HttpMethod,
    pub allow_cors: bool,
    pub min: Option<f64>,
    pub median: Option<f64>,
    pub avg: Option<f64>,
    pub max: Option<f64>,
    /// Fraction (0.0..=1.0) of hostnames that succeeded
    pub success_rate: f64,
    /// One outcome per hostname, in hostname-list order
    pub outcomes: Vec<ProbeOutcome>,
    /// Set on placeholder results for servers whose test failed outright
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ServerStats {
    /// Aggregate finished outcomes for a server.
    #[must_use]
    pub fn from_outcomes(server: &ServerConfig, outcomes: Vec<ProbeOutcome>) -> Self {
        let mut times: Vec<f64> = outcomes
            .iter()
            .filter(|o| o.success)
            .filter_map(|o| o.elapsed_ms)
            .filter(|t| t.is_finite())
            .collect();

        let success_rate = if outcomes.is_empty() {
            0.0
        } else {
            times.len() as f64 / outcomes.len() as f64
        };

        let (min, median, avg, max) = if times.is_empty() {
            (None, None, None, None)
        } else {
            times.sort_by(f64::total_cmp);
            let sum: f64 = times.iter().sum();
            (
                times.first().copied(),
                Some(median_of_sorted(&times)),
                Some(sum / times.len() as f64),
                times.last().copied(),
            )
        };

        Self {
            min,
            median,
            avg,
            max,
            success_rate,
            outcomes,
            error: None,
            ..Self::empty(server)
        }
    }

    /// Result for a server with no usable endpoint: every hostname unavailable.
    #[must_use]
    pub fn unavailable(server: &ServerConfig, hostnames: &[String]) -> Self {
        let outcomes = hostnames.iter().map(ProbeOutcome::unavailable).collect();
        Self {
            outcomes,
            ..Self::empty(server)
        }
    }

    /// Placeholder for a server whose test failed outright.
    #[must_use]
    pub fn failed(server: &ServerConfig, message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::empty(server)
        }
    }

    fn empty(server: &ServerConfig) -> Self {
        Self {
            name: server.name.clone(),
            url: server.url.clone(),
            ips: server.ips.clone(),
            method: server.method,
            allow_cors: server.allow_cors,
            min: None,
            median: None,
            avg: None,
            max: None,
            success_rate: 0.0,
            outcomes: Vec::new(),
            error: None,
        }
    }

    /// Number of successful probes.
    #[must_use]
    pub fn success_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.success).count()
    }

    /// Check if the server produced any timing at all.
    #[must_use]
    pub fn has_timing(&self) -> bool {
        self.avg.is_some()
    }
}

/// Median of an ascending slice; averages the two middle values for even lengths.
fn median_of_sorted(sorted: &[f64]) -> f64 {
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}
