//! Input validation for hostnames and server entries.

use crate::dns::types::ServerConfig;
use crate::error::{Error, Result};

/// Minimum hostname length in characters.
pub const MIN_HOSTNAME_LEN: usize = 1;

/// Maximum hostname length in characters.
pub const MAX_HOSTNAME_LEN: usize = 253;

/// Maximum length of a single DNS label.
pub const MAX_LABEL_LEN: usize = 63;

/// Validate a hostname and return its lowercase form.
///
/// Accepts 1–253 characters from `[A-Za-z0-9.-]` with at least two
/// dot-separated labels. A single trailing dot is allowed.
///
/// # Errors
///
/// Returns [`Error::Validation`] describing the first rule broken.
///
/// # Example
///
/// ```ignore
/// assert_eq!(validate_hostname("Example.COM")?, "example.com");
/// ```
pub fn validate_hostname(hostname: &str) -> Result<String> {
    let hostname = hostname.trim();
    let name = hostname.strip_suffix('.').unwrap_or(hostname);

    if name.len() < MIN_HOSTNAME_LEN || name.len() > MAX_HOSTNAME_LEN {
        return Err(Error::validation("Hostname length out of bounds"));
    }

    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
    {
        return Err(Error::validation("Hostname contains invalid characters"));
    }

    let labels: Vec<&str> = name.split('.').collect();
    if labels.len() < 2 {
        return Err(Error::validation("Invalid hostname format"));
    }
    if labels
        .iter()
        .any(|l| l.is_empty() || l.len() > MAX_LABEL_LEN)
    {
        return Err(Error::validation("Hostname has an empty or oversized label"));
    }

    Ok(name.to_ascii_lowercase())
}

/// Check that a DoH endpoint is an http(s) URL.
///
/// # Errors
///
/// Returns [`Error::Validation`] if the URL is unparsable or uses another scheme.
pub fn validate_server_url(url: &str) -> Result<url::Url> {
    let parsed = url::Url::parse(url.trim())
        .map_err(|e| Error::validation(format!("Invalid URL {url}: {e}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(Error::validation(format!(
            "Please provide a valid HTTP/HTTPS URL (got {other})"
        ))),
    }
}

/// Strip characters that are unsafe to embed in markup.
#[must_use]
pub fn sanitize(value: &str) -> String {
    value
        .chars()
        .filter(|c| !matches!(c, '<' | '>' | '"' | '\'' | '`' | '&'))
        .collect()
}

/// Apply [`sanitize`] to the name, URL and addresses of a server entry.
///
/// A URL that is empty after stripping is dropped, which leaves the
/// server marked unavailable.
#[must_use]
pub fn sanitize_server(server: ServerConfig) -> ServerConfig {
    let url = server
        .url
        .as_deref()
        .map(sanitize)
        .filter(|u| !u.trim().is_empty());
    ServerConfig {
        name: sanitize(&server.name),
        url,
        ips: server.ips.iter().map(String::as_str).map(sanitize).collect(),
        ..server
    }
}
