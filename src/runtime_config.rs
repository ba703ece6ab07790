// =============================================================================
// Dashboard Configuration: JSON file + environment overrides
// =============================================================================
//
// Every tunable lives here: where the server binds, how long fetched data
// stays cached, and how the Yahoo client talks to the provider.
//
// Persistence uses an atomic tmp + rename pattern. All fields carry serde
// defaults so that older config files keep loading after new fields appear.
// =============================================================================

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::types::Period;

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_bind_addr() -> String {
    "0.0.0.0:8501".to_string()
}

fn default_cache_ttl_secs() -> u64 {
    300
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_yahoo_base_url() -> String {
    "https://query1.finance.yahoo.com".to_string()
}

fn default_yahoo_cookie_url() -> String {
    "https://fc.yahoo.com".to_string()
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/124.0 Safari/537.36"
        .to_string()
}

fn default_live_refresh_secs() -> u64 {
    60
}

// =============================================================================
// DashboardConfig
// =============================================================================

/// Top-level configuration for the dashboard server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// Socket address the HTTP server binds to.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// How long a fetched (ticker, period) chart stays cached. Zero disables
    /// the cache.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Per-request timeout for provider calls.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Base URL of the Yahoo Finance query host.
    #[serde(default = "default_yahoo_base_url")]
    pub yahoo_base_url: String,

    /// Page visited to obtain the session cookie for the crumb handshake.
    #[serde(default = "default_yahoo_cookie_url")]
    pub yahoo_cookie_url: String,

    /// User-Agent sent to the provider, which rejects bare client UAs.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Period used when a request does not specify one.
    #[serde(default)]
    pub default_period: Period,

    /// Push interval for the live WebSocket feed.
    #[serde(default = "default_live_refresh_secs")]
    pub live_refresh_secs: u64,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            cache_ttl_secs: default_cache_ttl_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            yahoo_base_url: default_yahoo_base_url(),
            yahoo_cookie_url: default_yahoo_cookie_url(),
            user_agent: default_user_agent(),
            default_period: Period::default(),
            live_refresh_secs: default_live_refresh_secs(),
        }
    }
}

impl DashboardConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// If the file does not exist, returns an error so the caller can fall
    /// back to defaults with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read dashboard config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse dashboard config from {}", path.display()))?;

        info!(
            path = %path.display(),
            bind_addr = %config.bind_addr,
            cache_ttl_secs = config.cache_ttl_secs,
            "dashboard config loaded"
        );

        Ok(config.validated())
    }

    /// Persist the current configuration to `path` using an atomic write
    /// (write to `.tmp`, then rename).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content = serde_json::to_string_pretty(self)
            .context("failed to serialise dashboard config to JSON")?;

        let tmp_path = path.with_extension("json.tmp");

        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp config to {}", tmp_path.display()))?;

        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp config to {}", path.display()))?;

        info!(path = %path.display(), "dashboard config saved (atomic)");
        Ok(())
    }

    /// Apply `STOCKDASH_*` environment overrides through a lookup function.
    ///
    /// Unparseable numeric values are ignored with a warning.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup("STOCKDASH_BIND_ADDR").filter(|s| !s.trim().is_empty()) {
            self.bind_addr = addr.trim().to_string();
        }
        if let Some(raw) = lookup("STOCKDASH_CACHE_TTL_SECS") {
            match raw.trim().parse::<u64>() {
                Ok(ttl) => self.cache_ttl_secs = ttl,
                Err(e) => warn!(value = %raw, error = %e, "ignoring invalid STOCKDASH_CACHE_TTL_SECS"),
            }
        }
        if let Some(url) = lookup("STOCKDASH_YAHOO_BASE_URL").filter(|s| !s.trim().is_empty()) {
            self.yahoo_base_url = url.trim().trim_end_matches('/').to_string();
        }
        *self = std::mem::take(self).validated();
    }

    /// Replace zero timeouts / intervals with defaults.
    fn validated(mut self) -> Self {
        if self.request_timeout_secs == 0 {
            warn!("request_timeout_secs must be positive, using default");
            self.request_timeout_secs = default_request_timeout_secs();
        }
        if self.live_refresh_secs == 0 {
            warn!("live_refresh_secs must be positive, using default");
            self.live_refresh_secs = default_live_refresh_secs();
        }
        self
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k: &str| map.get(k).cloned()
    }

    #[test]
    fn default_config_has_expected_values() {
        let cfg = DashboardConfig::default();
        assert_eq!(cfg.bind_addr, "0.0.0.0:8501");
        assert_eq!(cfg.cache_ttl_secs, 300);
        assert_eq!(cfg.request_timeout_secs, 10);
        assert_eq!(cfg.default_period, Period::OneYear);
        assert_eq!(cfg.live_refresh_secs, 60);
        assert!(cfg.yahoo_base_url.starts_with("https://"));
        assert_eq!(cfg.yahoo_cookie_url, "https://fc.yahoo.com");
    }

    #[test]
    fn deserialise_partial_json_fills_defaults() {
        let json = r#"{ "cache_ttl_secs": 30, "default_period": "3mo" }"#;
        let cfg: DashboardConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.cache_ttl_secs, 30);
        assert_eq!(cfg.default_period, Period::ThreeMonths);
        assert_eq!(cfg.bind_addr, "0.0.0.0:8501");
    }

    #[test]
    fn env_overrides_replace_fields() {
        let mut cfg = DashboardConfig::default();
        cfg.apply_env_overrides(env_from(&[
            ("STOCKDASH_BIND_ADDR", "127.0.0.1:9000"),
            ("STOCKDASH_CACHE_TTL_SECS", "0"),
            ("STOCKDASH_YAHOO_BASE_URL", "http://localhost:1234/"),
        ]));
        assert_eq!(cfg.bind_addr, "127.0.0.1:9000");
        assert_eq!(cfg.cache_ttl_secs, 0);
        assert_eq!(cfg.yahoo_base_url, "http://localhost:1234");
    }

    #[test]
    fn invalid_env_ttl_is_ignored() {
        let mut cfg = DashboardConfig::default();
        cfg.apply_env_overrides(env_from(&[("STOCKDASH_CACHE_TTL_SECS", "soon")]));
        assert_eq!(cfg.cache_ttl_secs, 300);
    }

    #[test]
    fn zero_intervals_fall_back_to_defaults() {
        let json = r#"{ "request_timeout_secs": 0, "live_refresh_secs": 0 }"#;
        let cfg: DashboardConfig = serde_json::from_str(json).unwrap();
        let cfg = cfg.validated();
        assert_eq!(cfg.request_timeout_secs, 10);
        assert_eq!(cfg.live_refresh_secs, 60);
    }

    #[test]
    fn save_then_load_from_disk() {
        let path = std::env::temp_dir().join(format!(
            "stockdash_config_{}.json",
            std::process::id()
        ));
        let mut cfg = DashboardConfig::default();
        cfg.cache_ttl_secs = 42;
        cfg.save(&path).unwrap();

        let loaded = DashboardConfig::load(&path).unwrap();
        assert_eq!(loaded.cache_ttl_secs, 42);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn load_missing_file_errors() {
        assert!(DashboardConfig::load("/nonexistent/stockdash.json").is_err());
    }
}
