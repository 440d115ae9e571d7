//! Configuration loading from environment.

use std::env;
use std::time::Duration;

use fx_cache::CacheConfig;
use fx_client::DEFAULT_API_URL;

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub api_url: String,
    pub cache: CacheConfig,
    pub timeout: Duration,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let api_url = lookup("FX_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let ttl_secs: i64 = lookup("FX_CACHE_TTL_SECS")
            .map(|v| v.parse::<i64>())
            .transpose()
            .map_err(|e| anyhow::anyhow!("FX_CACHE_TTL_SECS must be an integer: {}", e))?
            .unwrap_or(0);

        let timeout_ms: u64 = lookup("FX_TIMEOUT_MS")
            .unwrap_or_else(|| "5000".to_string())
            .parse::<u64>()
            .map_err(|e| anyhow::anyhow!("FX_TIMEOUT_MS must be a number of milliseconds: {}", e))?;

        Ok(Self {
            api_url,
            cache: CacheConfig::from_ttl_secs(ttl_secs),
            timeout: Duration::from_millis(timeout_ms),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.cache, CacheConfig::default());
        assert_eq!(config.timeout, Duration::from_millis(5000));
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("FX_API_URL", "http://localhost:8080"),
            ("FX_CACHE_TTL_SECS", "60"),
            ("FX_TIMEOUT_MS", "250"),
        ]))
        .unwrap();
        assert_eq!(config.api_url, "http://localhost:8080");
        assert_eq!(config.cache.ttl, Duration::from_secs(60));
        assert_eq!(config.timeout, Duration::from_millis(250));
    }

    #[test]
    fn test_negative_ttl_falls_back_to_default() {
        let config = Config::from_lookup(lookup(&[("FX_CACHE_TTL_SECS", "-5")])).unwrap();
        assert_eq!(config.cache, CacheConfig::default());
    }

    #[test]
    fn test_invalid_numbers_are_rejected() {
        assert!(Config::from_lookup(lookup(&[("FX_CACHE_TTL_SECS", "soon")])).is_err());
        assert!(Config::from_lookup(lookup(&[("FX_TIMEOUT_MS", "-1")])).is_err());
    }
}
