use url::Url;

use super::{Config, ConfigError};

/// Validate cross-field constraints the type system cannot express.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.monitor.reconcile_interval_secs == 0 {
        return Err(ConfigError::Invalid(
            "monitor.reconcile_interval_secs must be greater than zero".to_string(),
        ));
    }

    if config.auto_search.enabled && config.auto_search.sweep_interval_secs == 0 {
        return Err(ConfigError::Invalid(
            "auto_search.sweep_interval_secs must be greater than zero".to_string(),
        ));
    }

    if let Some(ref discovery) = config.discovery {
        let url = Url::parse(&discovery.url)
            .map_err(|e| ConfigError::Invalid(format!("discovery.url: {}", e)))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::Invalid(format!(
                "discovery.url must be http or https, got {}",
                url.scheme()
            )));
        }
        if discovery.api_key.is_empty() {
            return Err(ConfigError::Invalid(
                "discovery.api_key must not be empty".to_string(),
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DiscoveryConfig;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_zero_reconcile_interval_rejected() {
        let mut config = Config::default();
        config.monitor.reconcile_interval_secs = 0;
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_zero_sweep_interval_only_matters_when_enabled() {
        let mut config = Config::default();
        config.auto_search.sweep_interval_secs = 0;
        assert!(validate_config(&config).is_ok());

        config.auto_search.enabled = true;
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_discovery_url_validation() {
        let mut config = Config::default();
        config.discovery = Some(DiscoveryConfig {
            url: "ftp://manager".to_string(),
            api_key: "k".to_string(),
        });
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::Invalid(_))
        ));

        config.discovery = Some(DiscoveryConfig {
            url: "http://localhost:9696".to_string(),
            api_key: String::new(),
        });
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::Invalid(_))
        ));

        config.discovery = Some(DiscoveryConfig {
            url: "http://localhost:9696".to_string(),
            api_key: "k".to_string(),
        });
        assert!(validate_config(&config).is_ok());
    }
}
