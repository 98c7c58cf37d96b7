//! Configuration validation rules.
//!
//! This module provides validation logic for `WorkerConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::WorkerConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

impl WorkerConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `version` or `cache_prefix` is empty or contains whitespace
    /// - `origin` is not an absolute http(s) URL
    /// - `offline_fallback` or `app_root` is not an absolute path
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `fetch_timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `user_agent` or `notification_tag` is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [("version", &self.version), ("cache_prefix", &self.cache_prefix)] {
            if value.is_empty() {
                return Err(ConfigError::Invalid { field: field.into(), reason: "must not be empty".into() });
            }
            if value.chars().any(char::is_whitespace) {
                return Err(ConfigError::Invalid { field: field.into(), reason: "must not contain whitespace".into() });
            }
        }

        match url::Url::parse(&self.origin) {
            Ok(origin) if matches!(origin.scheme(), "http" | "https") => {}
            Ok(origin) => {
                return Err(ConfigError::Invalid {
                    field: "origin".into(),
                    reason: format!("unsupported scheme: {}", origin.scheme()),
                });
            }
            Err(e) => return Err(ConfigError::Invalid { field: "origin".into(), reason: e.to_string() }),
        }

        for (field, value) in [("offline_fallback", &self.offline_fallback), ("app_root", &self.app_root)] {
            if !value.starts_with('/') {
                return Err(ConfigError::Invalid { field: field.into(), reason: "must be an absolute path".into() });
            }
        }

        if self.max_bytes == 0 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must be greater than 0".into() });
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must not exceed 50MB".into() });
        }

        if self.fetch_timeout_ms < 100 {
            return Err(ConfigError::Invalid {
                field: "fetch_timeout_ms".into(),
                reason: "must be at least 100ms".into(),
            });
        }
        if self.fetch_timeout_ms > 300_000 {
            return Err(ConfigError::Invalid {
                field: "fetch_timeout_ms".into(),
                reason: "must not exceed 5 minutes (300000ms)".into(),
            });
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        if self.notification_tag.is_empty() {
            return Err(ConfigError::Invalid { field: "notification_tag".into(), reason: "must not be empty".into() });
        }

        if self.manifest.is_empty() {
            tracing::warn!(version = %self.version, "manifest is empty; install will create an empty generation");
        }

        if !self.manifest.iter().any(|entry| entry == &self.offline_fallback) {
            tracing::warn!(
                offline_fallback = %self.offline_fallback,
                "offline fallback is not in the manifest; offline navigations will fail until it is cached"
            );
        }

        Ok(())
    }
}
