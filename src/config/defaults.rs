//! Built-in server and hostname lists used when no list file is found.

use crate::dns::types::{GetFormat, HttpMethod, ServerConfig};

/// Well-known public DoH providers.
#[must_use]
pub fn default_servers() -> Vec<ServerConfig> {
    vec![
        ServerConfig::new("Cloudflare", Some("https://cloudflare-dns.com/dns-query"))
            .with_ips(["1.1.1.1", "1.0.0.1"])
            .with_cors(true),
        ServerConfig::new("Google", Some("https://dns.google/resolve"))
            .with_ips(["8.8.8.8", "8.8.4.4"])
            .with_method(HttpMethod::Get)
            .with_cors(true),
        ServerConfig::new("Quad9", Some("https://dns.quad9.net/dns-query"))
            .with_ips(["9.9.9.9", "149.112.112.112"]),
        ServerConfig::new("Quad9 Unsecured", Some("https://dns10.quad9.net/dns-query"))
            .with_ips(["9.9.9.10", "149.112.112.10"]),
        ServerConfig::new("AdGuard", Some("https://dns.adguard-dns.com/dns-query"))
            .with_ips(["94.140.14.14", "94.140.15.15"])
            .with_method(HttpMethod::Get)
            .with_format(GetFormat::Wire),
        ServerConfig::new("AdGuard Unfiltered", Some("https://unfiltered.adguard-dns.com/dns-query"))
            .with_ips(["94.140.14.140", "94.140.14.141"]),
        ServerConfig::new("OpenDNS", Some("https://doh.opendns.com/dns-query"))
            .with_ips(["208.67.222.222", "208.67.220.220"]),
        ServerConfig::new("Mullvad", Some("https://dns.mullvad.net/dns-query"))
            .with_ips(["194.242.2.2"]),
        ServerConfig::new("ControlD", Some("https://freedns.controld.com/p0"))
            .with_ips(["76.76.2.0", "76.76.10.0"]),
        ServerConfig::new("NextDNS", Some("https://dns.nextdns.io"))
            .with_ips(["45.90.28.0", "45.90.30.0"]),
    ]
}

/// Popular hostnames probed by default.
#[must_use]
pub fn default_hostnames() -> Vec<String> {
    [
        "google.com",
        "youtube.com",
        "facebook.com",
        "wikipedia.org",
        "amazon.com",
        "github.com",
        "reddit.com",
        "microsoft.com",
        "apple.com",
        "cloudflare.com",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}
