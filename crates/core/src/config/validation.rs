//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

/// One hundred years.
pub(crate) const MAX_ENTRY_AGE_DAYS: i64 = 36_500;

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `user_agent` is empty
    /// - `cache_version` is empty or contains whitespace
    /// - `origin` is not an http(s) URL
    /// - a manifest route, the offline route or a static prefix is not an absolute path
    /// - `max_entry_age_days` is outside 1..=36500 or `janitor_interval_secs` below 60
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_bytes == 0 {
            return Err(invalid("max_bytes", "must be greater than 0"));
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(invalid("max_bytes", "must not exceed 50MB"));
        }

        if self.timeout_ms < 100 {
            return Err(invalid("timeout_ms", "must be at least 100ms"));
        }
        if self.timeout_ms > 300_000 {
            return Err(invalid("timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        if self.cache_version.is_empty() || self.cache_version.chars().any(char::is_whitespace) {
            return Err(invalid("cache_version", "must be non-empty without whitespace"));
        }

        self.origin_url()?;

        if let Some(route) = self.precache_manifest.iter().find(|r| !r.starts_with('/')) {
            return Err(invalid("precache_manifest", format!("route {route:?} must start with '/'")));
        }

        if !self.offline_route.starts_with('/') {
            return Err(invalid("offline_route", "must start with '/'"));
        }

        if let Some(prefix) = self
            .static_prefixes
            .iter()
            .find(|p| !p.starts_with('/') || !p.ends_with('/') || p.len() < 2)
        {
            return Err(invalid("static_prefixes", format!("prefix {prefix:?} must look like /name/")));
        }

        if !(1..=MAX_ENTRY_AGE_DAYS).contains(&self.max_entry_age_days) {
            return Err(invalid("max_entry_age_days", format!("must be between 1 and {MAX_ENTRY_AGE_DAYS}")));
        }

        if self.janitor_interval_secs < 60 {
            return Err(invalid("janitor_interval_secs", "must be at least 60"));
        }

        if !self.precache_manifest.contains(&self.offline_route) {
            tracing::warn!(
                offline_route = %self.offline_route,
                "offline route is not precached; failed navigations will get a generic page"
            );
        }

        Ok(())
    }
}
