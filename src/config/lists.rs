//! Server and hostname list containers.

use crate::config::validation::validate_hostname;
use crate::dns::types::ServerConfig;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// DoH server list container.
///
/// Represents a collection of servers, typically loaded from a JSON file
/// of the form `{"list": [...]}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerList {
    #[serde(rename = "list")]
    pub servers: Vec<ServerConfig>,
}

impl ServerList {
    #[must_use]
    pub fn new() -> Self {
        Self { servers: vec![] }
    }

    #[must_use]
    pub fn from_servers(servers: Vec<ServerConfig>) -> Self {
        Self { servers }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.servers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }

    /// Servers that cannot be probed because they lack a usable URL.
    pub fn untestable(&self) -> impl Iterator<Item = &ServerConfig> {
        self.servers.iter().filter(|s| s.endpoint().is_none())
    }
}

impl Default for ServerList {
    fn default() -> Self {
        Self::new()
    }
}

/// Ordered, duplicate-free list of validated hostnames.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct HostnameList {
    hostnames: Vec<String>,
}

impl HostnameList {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a list, validating every entry and dropping duplicates.
    ///
    /// # Errors
    ///
    /// Returns a validation error naming the first invalid hostname.
    pub fn from_hostnames<I, S>(hostnames: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut list = Self::new();
        for host in hostnames {
            let host = host.as_ref();
            let valid = validate_hostname(host)
                .map_err(|e| Error::validation(format!("{host}: {e}")))?;
            if !list.contains(&valid) {
                list.hostnames.push(valid);
            }
        }
        Ok(list)
    }

    /// Add a hostname; returns the normalized form.
    ///
    /// # Errors
    ///
    /// Returns a validation error for malformed or already present hostnames.
    pub fn add(&mut self, hostname: &str) -> Result<String> {
        let valid = validate_hostname(hostname)?;
        if self.contains(&valid) {
            return Err(Error::validation(format!("Hostname already exists: {valid}")));
        }
        self.hostnames.push(valid.clone());
        Ok(valid)
    }

    /// Remove a hostname; returns whether it was present.
    pub fn remove(&mut self, hostname: &str) -> bool {
        let needle = hostname.trim().to_ascii_lowercase();
        let before = self.hostnames.len();
        self.hostnames.retain(|h| *h != needle);
        self.hostnames.len() != before
    }

    #[must_use]
    pub fn contains(&self, hostname: &str) -> bool {
        self.hostnames.iter().any(|h| h == hostname)
    }

    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        &self.hostnames
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.hostnames.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hostnames.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_list() {
        let list = ServerList::new();
        assert!(list.is_empty());

        let list = ServerList::from_servers(vec![
            ServerConfig::new("A", Some("https://a.example/dns-query")),
            ServerConfig::new("B", None),
        ]);
        assert_eq!(list.len(), 2);
        let untestable: Vec<_> = list.untestable().map(|s| s.name.as_str()).collect();
        assert_eq!(untestable, vec!["B"]);
    }

    #[test]
    fn test_server_list_json_shape() {
        let json = r#"{"list": [{"name": "A", "url": null, "ips": []}]}"#;
        let list: ServerList = serde_json::from_str(json).unwrap();
        assert_eq!(list.servers[0].name, "A");
        assert!(list.servers[0].url.is_none());
    }

    #[test]
    fn test_hostname_add_remove() {
        let mut list = HostnameList::new();
        assert_eq!(list.add("Example.com").unwrap(), "example.com");
        assert!(list.add("example.com").is_err());
        assert!(list.add("nodot").is_err());
        assert_eq!(list.len(), 1);

        assert!(list.remove("EXAMPLE.com"));
        assert!(!list.remove("example.com"));
        assert!(list.is_empty());
    }

    #[test]
    fn test_from_hostnames_dedups() {
        let list = HostnameList::from_hostnames(["a.com", "A.com", "b.org"]).unwrap();
        assert_eq!(list.as_slice(), ["a.com", "b.org"]);
        assert!(HostnameList::from_hostnames(["ok.com", "bad"]).is_err());
    }
}
