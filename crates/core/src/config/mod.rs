//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (SP1SH_SW_*)
//! 2. TOML config file (if SP1SH_SW_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (SP1SH_SW_*)
/// 2. TOML config file (if SP1SH_SW_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Origin the worker serves. Requests to any other origin pass through.
    ///
    /// Set via SP1SH_SW_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Version suffix shared by all four partition names.
    ///
    /// Changing it evicts every partition of the previous version on the
    /// next activation.
    #[serde(default = "default_cache_version")]
    pub cache_version: String,

    /// Path to SQLite cache database.
    ///
    /// Set via SP1SH_SW_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Keep partitions in memory instead of SQLite.
    #[serde(default)]
    pub in_memory: bool,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via SP1SH_SW_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to fetch per request.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via SP1SH_SW_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Routes precached on install.
    #[serde(default = "default_precache_manifest")]
    pub precache_manifest: Vec<String>,

    /// Page served when a navigation fails both network and cache.
    #[serde(default = "default_offline_route")]
    pub offline_route: String,

    /// Path prefixes served cache-first.
    #[serde(default = "default_static_prefixes")]
    pub static_prefixes: Vec<String>,

    /// Entries with a date header older than this are swept by the janitor.
    #[serde(default = "default_max_entry_age_days")]
    pub max_entry_age_days: i64,

    /// Whether to register the periodic janitor.
    #[serde(default = "default_true")]
    pub janitor_enabled: bool,

    /// Seconds between janitor sweeps.
    #[serde(default = "default_janitor_interval_secs")]
    pub janitor_interval_secs: u64,
}

fn default_origin() -> String {
    "http://localhost:3000".into()
}

fn default_cache_version() -> String {
    "v1.0.0".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./sp1sh-sw-cache.sqlite")
}

fn default_user_agent() -> String {
    "sp1sh-sw/0.1".into()
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_precache_manifest() -> Vec<String> {
    [
        "/",
        "/offline",
        "/favicon.ico",
        "/site.webmanifest",
        "/scripts/disk-usage-report",
        "/categories/emergency",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_offline_route() -> String {
    "/offline".into()
}

fn default_static_prefixes() -> Vec<String> {
    vec!["/fonts/".into(), "/optimized/".into()]
}

fn default_max_entry_age_days() -> i64 {
    30
}

fn default_true() -> bool {
    true
}

fn default_janitor_interval_secs() -> u64 {
    24 * 60 * 60
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            origin: default_origin(),
            cache_version: default_cache_version(),
            db_path: default_db_path(),
            in_memory: false,
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
            precache_manifest: default_precache_manifest(),
            offline_route: default_offline_route(),
            static_prefixes: default_static_prefixes(),
            max_entry_age_days: default_max_entry_age_days(),
            janitor_enabled: true,
            janitor_interval_secs: default_janitor_interval_secs(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Janitor period as Duration.
    pub fn janitor_interval(&self) -> Duration {
        Duration::from_secs(self.janitor_interval_secs)
    }

    /// Maximum entry age as a chrono Duration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` when the day count does not fit a
    /// chrono Duration.
    pub fn max_entry_age(&self) -> Result<chrono::Duration, ConfigError> {
        chrono::Duration::try_days(self.max_entry_age_days).ok_or_else(|| ConfigError::Invalid {
            field: "max_entry_age_days".into(),
            reason: format!("{} days is out of range", self.max_entry_age_days),
        })
    }

    /// Parsed origin.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if the origin is not an http(s) URL.
    pub fn origin_url(&self) -> Result<url::Url, ConfigError> {
        let url = url::Url::parse(&self.origin)
            .map_err(|e| ConfigError::Invalid { field: "origin".into(), reason: e.to_string() })?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(ConfigError::Invalid { field: "origin".into(), reason: format!("unsupported scheme {other}") }),
        }
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `SP1SH_SW_`
    /// 2. TOML file from `SP1SH_SW_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("SP1SH_SW_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("SP1SH_SW_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.origin, "http://localhost:3000");
        assert_eq!(config.cache_version, "v1.0.0");
        assert_eq!(config.db_path, PathBuf::from("./sp1sh-sw-cache.sqlite"));
        assert_eq!(config.user_agent, "sp1sh-sw/0.1");
        assert_eq!(config.max_bytes, 5_242_880);
        assert_eq!(config.timeout_ms, 20_000);
        assert_eq!(config.offline_route, "/offline");
        assert_eq!(config.static_prefixes, vec!["/fonts/".to_string(), "/optimized/".to_string()]);
        assert_eq!(config.max_entry_age_days, 30);
        assert!(config.janitor_enabled);
        assert!(!config.in_memory);
    }

    #[test]
    fn test_default_manifest_contains_offline_page() {
        let config = AppConfig::default();
        assert_eq!(config.precache_manifest.len(), 6);
        assert!(config.precache_manifest.contains(&config.offline_route));
        assert!(config.precache_manifest.contains(&"/site.webmanifest".to_string()));
    }

    #[test]
    fn test_durations() {
        let config = AppConfig::default();
        assert_eq!(config.timeout(), Duration::from_millis(20_000));
        assert_eq!(config.janitor_interval(), Duration::from_secs(86_400));
        assert_eq!(config.max_entry_age().unwrap(), chrono::Duration::days(30));
    }

    #[test]
    fn test_max_entry_age_out_of_range_is_error() {
        let config = AppConfig { max_entry_age_days: i64::MAX / 2, ..Default::default() };
        assert!(matches!(config.max_entry_age(), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_origin_url() {
        let config = AppConfig { origin: "https://sp1sh.dev".into(), ..Default::default() };
        assert_eq!(config.origin_url().unwrap().host_str(), Some("sp1sh.dev"));
    }

    #[test]
    fn test_origin_url_rejects_other_schemes() {
        let config = AppConfig { origin: "ftp://sp1sh.dev".into(), ..Default::default() };
        assert!(matches!(config.origin_url(), Err(ConfigError::Invalid { field, .. }) if field == "origin"));
    }
}
