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

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `site_name` is empty or contains whitespace
    /// - `cache_version` is 0
    /// - `origin` is not an http(s) URL with a host
    /// - `timeout_ms` is set below 100ms or above 5 minutes
    /// - `user_agent` is empty
    /// - `max_redirects` exceeds 20
    /// - an asset prefix is not root-relative
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.site_name.is_empty() || self.site_name.chars().any(char::is_whitespace) {
            return Err(ConfigError::Invalid {
                field: "site_name".into(),
                reason: "must be non-empty and contain no whitespace".into(),
            });
        }

        if self.cache_version == 0 {
            return Err(ConfigError::Invalid { field: "cache_version".into(), reason: "must be at least 1".into() });
        }

        match url::Url::parse(&self.origin) {
            Ok(origin) if matches!(origin.scheme(), "http" | "https") && origin.host_str().is_some() => {}
            Ok(origin) => {
                return Err(ConfigError::Invalid {
                    field: "origin".into(),
                    reason: format!("unsupported origin: {origin}"),
                });
            }
            Err(e) => return Err(ConfigError::Invalid { field: "origin".into(), reason: e.to_string() }),
        }

        if let Some(timeout_ms) = self.timeout_ms {
            if timeout_ms < 100 {
                return Err(ConfigError::Invalid { field: "timeout_ms".into(), reason: "must be at least 100ms".into() });
            }
            if timeout_ms > 300_000 {
                return Err(ConfigError::Invalid {
                    field: "timeout_ms".into(),
                    reason: "must not exceed 5 minutes (300000ms)".into(),
                });
            }
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        if self.max_redirects > 20 {
            return Err(ConfigError::Invalid { field: "max_redirects".into(), reason: "must not exceed 20".into() });
        }

        if let Some(prefix) = self.asset_prefixes.iter().find(|p| !p.starts_with('/')) {
            return Err(ConfigError::Invalid {
                field: "asset_prefixes".into(),
                reason: format!("{prefix:?} must start with '/'"),
            });
        }

        if self.asset_prefixes.is_empty() {
            tracing::warn!("asset_prefixes is empty; only destination types will route to cache-first");
        }

        Ok(())
    }
}
