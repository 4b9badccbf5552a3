//! Timed DoH probes.
//!
//! A probe sends one DNS query to a DoH endpoint and measures the time until
//! the response headers arrive. Response bodies are never read: this measures
//! transport latency, not answer correctness.
//!
//! Servers that do not allow status inspection are probed in opaque mode,
//! where any completed exchange counts as success regardless of the HTTP
//! status. That means "completed", not "resolved", and is a known accuracy
//! limitation of opaque probing.

#![allow(clippy::missing_errors_doc)]

use crate::config::validate_hostname;
use crate::dns::cache::ResultCache;
use crate::dns::query;
use crate::dns::types::{GetFormat, HttpMethod, ServerConfig};
use crate::error::{ErrorKind, ProbeError, Result};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, CACHE_CONTROL, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use url::Url;

/// Default per-probe deadline.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Media type for binary DNS messages (RFC 8484).
pub const DNS_MESSAGE: &str = "application/dns-message";

/// Media type for the JSON DoH API.
pub const DNS_JSON: &str = "application/dns-json";

const USER_AGENT: &str = concat!("dohspeed/", env!("CARGO_PKG_VERSION"));

/// Where and how to send a probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeTarget {
    pub endpoint: Url,
    pub method: HttpMethod,
    pub format: GetFormat,
    pub allow_cors: bool,
}

impl ProbeTarget {
    /// Build a target from a server entry; `None` if it has no usable URL.
    #[must_use]
    pub fn from_server(server: &ServerConfig) -> Option<Self> {
        Some(Self {
            endpoint: server.endpoint()?,
            method: server.method,
            format: server.format,
            allow_cors: server.allow_cors,
        })
    }

    /// Key under which results for this endpoint are cached.
    #[must_use]
    pub fn cache_key(&self) -> &str {
        self.endpoint.as_str()
    }
}

/// Something that can time a single DoH exchange.
///
/// Implementations carry no retry logic; that belongs to the caller.
#[async_trait]
pub trait Prober: Send + Sync {
    /// Probe `hostname` against `target`, returning elapsed milliseconds.
    ///
    /// Must fail with [`ErrorKind::Cancelled`] promptly once `cancel` fires.
    async fn probe(
        &self,
        target: &ProbeTarget,
        hostname: &str,
        cancel: &CancellationToken,
    ) -> std::result::Result<f64, ProbeError>;
}

/// HTTP prober backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpProber {
    client: Client,
    timeout: Duration,
    cache: Option<Arc<ResultCache>>,
}

impl HttpProber {
    /// Create a prober with the default 5 second deadline.
    pub fn new() -> Result<Self> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    /// Create a prober with a custom per-probe deadline.
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            client,
            timeout,
            cache: None,
        })
    }

    /// Record successful probe times into `cache`.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<ResultCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    fn build_request(
        &self,
        target: &ProbeTarget,
        hostname: &str,
    ) -> std::result::Result<RequestBuilder, ProbeError> {
        let hostname = validate_hostname(hostname)
            .map_err(|e| ProbeError::new(ErrorKind::Validation, e.to_string()))?;

        let request = match target.method {
            HttpMethod::Get => {
                let url = get_url(target, &hostname);
                let accept = match target.format {
                    GetFormat::Json => DNS_JSON,
                    GetFormat::Wire => DNS_MESSAGE,
                };
                let request = self.client.get(url);
                if target.allow_cors {
                    request.header(ACCEPT, accept)
                } else {
                    request
                }
            }
            HttpMethod::Post => {
                let request = self
                    .client
                    .post(target.endpoint.clone())
                    .header(CONTENT_TYPE, DNS_MESSAGE)
                    .body(query::encode(&hostname));
                if target.allow_cors {
                    request.header(ACCEPT, DNS_MESSAGE)
                } else {
                    request
                }
            }
        };

        Ok(request.header(CACHE_CONTROL, "no-store"))
    }
}

/// Build the GET URL for a query, including a cache-busting parameter.
#[must_use]
pub fn get_url(target: &ProbeTarget, hostname: &str) -> Url {
    let mut url = target.endpoint.clone();
    let nocache = chrono::Utc::now().timestamp_millis().to_string();
    {
        let mut pairs = url.query_pairs_mut();
        match target.format {
            GetFormat::Json => {
                pairs
                    .append_pair("name", hostname)
                    .append_pair("type", "A")
                    .append_pair("cd", "true");
            }
            GetFormat::Wire => {
                pairs.append_pair("dns", &query::to_base64url(&query::encode(hostname)));
            }
        }
        pairs.append_pair("nocache", &nocache);
    }
    url
}

impl HttpProber {
    /// Send `request` and time it, racing the deadline and `cancel`.
    async fn exchange(
        &self,
        target: &ProbeTarget,
        request: RequestBuilder,
        cancel: &CancellationToken,
    ) -> std::result::Result<f64, ProbeError> {
        let start = Instant::now();
        let response = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(ProbeError::cancelled()),
            res = tokio::time::timeout(self.timeout, request.send()) => match res {
                Err(_) => return Err(ProbeError::timeout(self.timeout)),
                Ok(Err(e)) if e.is_timeout() => return Err(ProbeError::timeout(self.timeout)),
                Ok(Err(e)) => return Err(ProbeError::network(e.to_string())),
                Ok(Ok(response)) => response,
            },
        };
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

        let status = response.status();
        if target.allow_cors && !status.is_success() {
            return Err(ProbeError::network(format!("HTTP error! status: {status}")));
        }
        drop(response);

        tracing::debug!("{} {}: {elapsed_ms:.1} ms (status {status})", target.method, target.endpoint);
        Ok(elapsed_ms)
    }
}

#[async_trait]
impl Prober for HttpProber {
    async fn probe(
        &self,
        target: &ProbeTarget,
        hostname: &str,
        cancel: &CancellationToken,
    ) -> std::result::Result<f64, ProbeError> {
        let request = self.build_request(target, hostname)?;

        let span = tracing::debug_span!(
            "doh_request",
            endpoint = %target.endpoint,
            hostname,
            elapsed_ms = tracing::field::Empty,
            error = tracing::field::Empty,
        );
        let result = self
            .exchange(target, request, cancel)
            .instrument(span.clone())
            .await;

        match &result {
            Ok(elapsed_ms) => {
                span.record("elapsed_ms", *elapsed_ms);
                if let Some(cache) = &self.cache {
                    cache.put(target.cache_key(), hostname, *elapsed_ms);
                }
            }
            Err(e) => {
                span.record("error", e.kind.as_str());
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(method: HttpMethod, format: GetFormat) -> ProbeTarget {
        ProbeTarget {
            endpoint: Url::parse("https://dns.example/dns-query").unwrap(),
            method,
            format,
            allow_cors: true,
        }
    }

    #[test]
    fn test_target_from_server() {
        let server = ServerConfig::new("X", Some("https://dns.example/dns-query"))
            .with_method(HttpMethod::Get)
            .with_cors(true);
        let t = ProbeTarget::from_server(&server).unwrap();
        assert_eq!(t.method, HttpMethod::Get);
        assert!(t.allow_cors);
        assert_eq!(t.cache_key(), "https://dns.example/dns-query");

        assert!(ProbeTarget::from_server(&ServerConfig::new("None", None)).is_none());
    }

    #[test]
    fn test_get_url_json_style() {
        let url = get_url(&target(HttpMethod::Get, GetFormat::Json), "example.com");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs[0], ("name".into(), "example.com".into()));
        assert_eq!(pairs[1], ("type".into(), "A".into()));
        assert_eq!(pairs[2], ("cd".into(), "true".into()));
        assert_eq!(pairs[3].0, "nocache");
        assert!(pairs[3].1.parse::<i64>().is_ok());
    }

    #[test]
    fn test_get_url_wire_style() {
        let url = get_url(&target(HttpMethod::Get, GetFormat::Wire), "example.com");
        let dns = url
            .query_pairs()
            .find(|(k, _)| k == "dns")
            .map(|(_, v)| v.into_owned())
            .unwrap();
        use base64::Engine;
        let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(dns)
            .unwrap();
        assert_eq!(&bytes[2..], &query::encode_with_id(0, "example.com")[2..]);
    }

    #[test]
    fn test_get_url_keeps_existing_query() {
        let mut t = target(HttpMethod::Get, GetFormat::Json);
        t.endpoint = Url::parse("https://dns.example/resolve?edns_client_subnet=0.0.0.0/0").unwrap();
        let url = get_url(&t, "example.com");
        assert!(url.query().unwrap().starts_with("edns_client_subnet="));
    }

    #[tokio::test]
    async fn test_invalid_hostname_never_sent() {
        let prober = HttpProber::new().unwrap();
        let err = prober
            .probe(
                &target(HttpMethod::Post, GetFormat::Json),
                "no_dots",
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_cancelled_before_send() {
        let prober = HttpProber::new().unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = prober
            .probe(&target(HttpMethod::Post, GetFormat::Json), "example.com", &cancel)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Cancelled);
    }
}
