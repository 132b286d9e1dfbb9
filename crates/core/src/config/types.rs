use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub auto_search: AutoSearchConfig,
    /// Optional indexer-manager import source.
    #[serde(default)]
    pub discovery: Option<DiscoveryConfig>,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    "0.0.0.0".parse().unwrap()
}

fn default_port() -> u16 {
    8080
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("ludarr.db")
}

/// Reconciliation loop configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MonitorConfig {
    /// Seconds between reconciliation cycles.
    #[serde(default = "default_reconcile_interval")]
    pub reconcile_interval_secs: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            reconcile_interval_secs: default_reconcile_interval(),
        }
    }
}

fn default_reconcile_interval() -> u64 {
    60
}

/// Auto-search configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AutoSearchConfig {
    /// Enable the periodic wanted-games sweep.
    #[serde(default)]
    pub enabled: bool,
    /// Seconds between sweeps.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
    /// Per-user cooldown for manually triggered auto-searches.
    #[serde(default = "default_cooldown")]
    pub user_cooldown_secs: u64,
}

impl Default for AutoSearchConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            sweep_interval_secs: default_sweep_interval(),
            user_cooldown_secs: default_cooldown(),
        }
    }
}

fn default_sweep_interval() -> u64 {
    900
}

fn default_cooldown() -> u64 {
    300
}

/// Indexer-manager import configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DiscoveryConfig {
    /// Manager base URL (e.g. "http://localhost:9696").
    pub url: String,
    pub api_key: String,
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub monitor: MonitorConfig,
    pub auto_search: AutoSearchConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discovery: Option<SanitizedDiscoveryConfig>,
}

/// Sanitized discovery config (API key hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedDiscoveryConfig {
    pub url: String,
    pub api_key_configured: bool,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            database: config.database.clone(),
            monitor: config.monitor.clone(),
            auto_search: config.auto_search.clone(),
            discovery: config.discovery.as_ref().map(|d| SanitizedDiscoveryConfig {
                url: d.url.clone(),
                api_key_configured: !d.api_key.is_empty(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host.to_string(), "0.0.0.0");
        assert_eq!(config.database.path.to_str().unwrap(), "ludarr.db");
        assert_eq!(config.monitor.reconcile_interval_secs, 60);
        assert!(!config.auto_search.enabled);
        assert!(config.discovery.is_none());
    }

    #[test]
    fn test_deserialize_full_config() {
        let toml = r#"
[server]
host = "127.0.0.1"
port = 9000

[database]
path = "/data/ludarr.sqlite"

[monitor]
reconcile_interval_secs = 30

[auto_search]
enabled = true
sweep_interval_secs = 600
user_cooldown_secs = 120

[discovery]
url = "http://localhost:9696"
api_key = "secret"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.database.path.to_str().unwrap(), "/data/ludarr.sqlite");
        assert_eq!(config.monitor.reconcile_interval_secs, 30);
        assert!(config.auto_search.enabled);
        assert_eq!(config.auto_search.sweep_interval_secs, 600);
        let discovery = config.discovery.unwrap();
        assert_eq!(discovery.url, "http://localhost:9696");
    }

    #[test]
    fn test_sanitized_config_hides_api_key() {
        let config = Config {
            discovery: Some(DiscoveryConfig {
                url: "http://localhost:9696".to_string(),
                api_key: "secret".to_string(),
            }),
            ..Default::default()
        };
        let sanitized = SanitizedConfig::from(&config);
        let discovery = sanitized.discovery.unwrap();
        assert!(discovery.api_key_configured);

        let json = serde_json::to_string(&SanitizedConfig::from(&config)).unwrap();
        assert!(!json.contains("secret"));
    }
}
