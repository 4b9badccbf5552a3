//! Server and hostname list loader.
//!
//! This module provides functionality to load DoH server lists and
//! hostname batteries from JSON files, command-line arguments, the user
//! config directory, or the built-in defaults.

use crate::config::defaults::{default_hostnames, default_servers};
use crate::config::lists::{HostnameList, ServerList};
use crate::config::validation::{sanitize, sanitize_server, validate_server_url};
use crate::dns::types::ServerConfig;
use crate::error::{Error, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// File name of the server list inside the config directory.
pub const SERVERS_FILE: &str = "servers.json";

/// File name of the hostname list inside the config directory.
pub const HOSTNAMES_FILE: &str = "hostnames.json";

/// Server and hostname list loader.
///
/// Provides various methods to load and merge lists from different
/// sources.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load a server list from a JSON file.
    ///
    /// Names, URLs and addresses are passed through [`sanitize_server`].
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let list = ConfigLoader::load_servers_from_file("servers.json")?;
    /// for server in &list.servers {
    ///     println!("{}: {:?}", server.name, server.url);
    /// }
    /// ```
    pub fn load_servers_from_file<P: AsRef<Path>>(path: P) -> Result<ServerList> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let list: ServerList = serde_json::from_str(&content)?;
        Ok(ServerList {
            servers: list.servers.into_iter().map(sanitize_server).collect(),
        })
    }

    /// Load a hostname list from a JSON file of the form `{"hostnames": [...]}`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if any
    /// hostname is invalid.
    pub fn load_hostnames_from_file<P: AsRef<Path>>(path: P) -> Result<HostnameList> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let raw: HostnameList = serde_json::from_str(&content)?;
        HostnameList::from_hostnames(raw.as_slice())
    }

    /// Get the config directory path.
    #[must_use]
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("dohspeed")
    }

    /// Load the server list from the config directory, or the built-in list.
    ///
    /// # Errors
    ///
    /// Returns an error only if a config file exists but cannot be parsed.
    pub fn load_servers() -> Result<ServerList> {
        let path = Self::config_dir().join(SERVERS_FILE);
        if path.exists() {
            tracing::debug!("Loading servers from {}", path.display());
            return Self::load_servers_from_file(path);
        }
        tracing::debug!("No {} found, using built-in servers", SERVERS_FILE);
        Ok(ServerList::from_servers(default_servers()))
    }

    /// Load the hostname list from the config directory, or the built-in list.
    ///
    /// # Errors
    ///
    /// Returns an error only if a config file exists but is invalid.
    pub fn load_hostnames() -> Result<HostnameList> {
        let path = Self::config_dir().join(HOSTNAMES_FILE);
        if path.exists() {
            tracing::debug!("Loading hostnames from {}", path.display());
            return Self::load_hostnames_from_file(path);
        }
        HostnameList::from_hostnames(default_hostnames())
    }

    /// Merge multiple server lists into one.
    ///
    /// Keeps the first occurrence of each endpoint URL (or of each name, for
    /// servers without a URL) and preserves list order.
    #[must_use]
    pub fn merge(lists: Vec<ServerList>) -> ServerList {
        let mut seen = HashSet::new();
        let servers = lists
            .into_iter()
            .flat_map(|l| l.servers)
            .filter(|s| {
                let key = s
                    .url
                    .as_deref()
                    .map(|u| u.trim().trim_end_matches('/').to_ascii_lowercase())
                    .unwrap_or_else(|| format!("name:{}", s.name));
                seen.insert(key)
            })
            .collect();
        ServerList { servers }
    }

    /// Create a server list from command-line arguments.
    ///
    /// # Arguments
    ///
    /// * `args` - Strings in format `URL#Name`; the name defaults to the URL host
    ///
    /// # Errors
    ///
    /// Returns an error if any URL is not a valid http(s) URL.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let args = vec!["https://dns.google/dns-query#Google".to_string()];
    /// let list = ConfigLoader::servers_from_args(args)?;
    /// ```
    pub fn servers_from_args(args: Vec<String>) -> Result<ServerList> {
        let mut servers = Vec::new();
        for arg in args {
            let (url, name) = match arg.split_once('#') {
                Some((url, name)) => (url.trim(), Some(name.trim())),
                None => (arg.trim(), None),
            };

            let parsed =
                validate_server_url(url).map_err(|e| Error::parse(format!("{arg}: {e}")))?;
            let name = name
                .filter(|n| !n.is_empty())
                .map(sanitize)
                .or_else(|| parsed.host_str().map(str::to_string))
                .unwrap_or_else(|| url.to_string());

            servers.push(ServerConfig::new(name, Some(parsed.as_str())));
        }
        Ok(ServerList { servers })
    }

    /// Write a server list to a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn save_servers<P: AsRef<Path>>(path: P, list: &ServerList) -> Result<()> {
        let json = serde_json::to_string_pretty(list)?;
        std::fs::write(path.as_ref(), json)?;
        Ok(())
    }
}
