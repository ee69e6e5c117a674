//! Typed settings, loaded from a JSON file and created with documented
//! defaults if the file doesn't exist yet — the same `#[serde(default = ...)]`
//! per-field shape this codebase's `RuntimeConfig` uses for its TOML config,
//! adapted to JSON since this pipeline has no TOML-specific needs.

use std::path::Path;

use serde::{Deserialize, Serialize};

fn default_udp_port() -> u16 {
    514
}

fn default_tcp_port() -> u16 {
    6514
}

fn default_use_tcp() -> bool {
    false
}

fn default_ip_address() -> String {
    String::new()
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectorSettings {
    #[serde(default = "default_udp_port")]
    pub udp_port: u16,

    #[serde(default = "default_tcp_port")]
    pub tcp_port: u16,

    #[serde(default = "default_use_tcp")]
    pub use_tcp: bool,

    /// Bind address; empty string means "any" (`0.0.0.0`).
    #[serde(default = "default_ip_address")]
    pub ip_address: String,
}

impl Default for CollectorSettings {
    fn default() -> Self {
        CollectorSettings {
            udp_port: default_udp_port(),
            tcp_port: default_tcp_port(),
            use_tcp: default_use_tcp(),
            ip_address: default_ip_address(),
        }
    }
}

impl CollectorSettings {
    pub fn bind_address(&self) -> std::net::Ipv4Addr {
        if self.ip_address.is_empty() {
            std::net::Ipv4Addr::UNSPECIFIED
        } else {
            self.ip_address.parse().unwrap_or(std::net::Ipv4Addr::UNSPECIFIED)
        }
    }
}

/// Load settings from `path`, writing out the defaults (pretty-printed JSON)
/// if the file does not exist yet.
pub fn load_or_create(path: &Path) -> anyhow::Result<CollectorSettings> {
    if !path.exists() {
        let defaults = CollectorSettings::default();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, serde_json::to_string_pretty(&defaults)?)?;
        return Ok(defaults);
    }
    let contents = std::fs::read_to_string(path)?;
    let settings = serde_json::from_str(&contents)?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_defaults_when_missing() {
        let dir = std::env::temp_dir().join(format!("ingest-core-test-{:?}", std::thread::current().id()));
        let _ = std::fs::remove_dir_all(&dir);
        let path = dir.join("settings.json");

        let first = load_or_create(&path).unwrap();
        assert_eq!(first.udp_port, 514);
        assert!(path.exists());

        let second = load_or_create(&path).unwrap();
        assert_eq!(first, second);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let value: CollectorSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(value, CollectorSettings::default());
    }
}
