//! Worker configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (SWCACHE_*)
//! 2. TOML config file (if SWCACHE_CONFIG_FILE set)
//! 3. Built-in defaults
//!
//! Only the host binary loads configuration from the environment. The worker
//! itself receives every value, the version tag included, explicitly.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Worker configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (SWCACHE_*)
/// 2. TOML config file (if SWCACHE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Version tag of the current deploy. Changing it starts a new generation.
    ///
    /// Set via SWCACHE_VERSION environment variable.
    #[serde(default = "default_version")]
    pub version: String,

    /// Prefix shared by every generation this worker owns.
    ///
    /// Set via SWCACHE_CACHE_PREFIX environment variable.
    #[serde(default = "default_cache_prefix")]
    pub cache_prefix: String,

    /// Origin the application is served from; relative URLs resolve against it.
    ///
    /// Set via SWCACHE_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// URLs to precache at install time, local paths or absolute URLs.
    ///
    /// Set via SWCACHE_MANIFEST environment variable or the `manifest` array in TOML.
    #[serde(default = "default_manifest")]
    pub manifest: Vec<String>,

    /// Document served when a navigation cannot reach the network.
    ///
    /// Set via SWCACHE_OFFLINE_FALLBACK environment variable.
    #[serde(default = "default_offline_fallback")]
    pub offline_fallback: String,

    /// Window opened when a notification is activated and no window is open.
    ///
    /// Set via SWCACHE_APP_ROOT environment variable.
    #[serde(default = "default_app_root")]
    pub app_root: String,

    /// Path to SQLite generation store.
    ///
    /// Set via SWCACHE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via SWCACHE_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Network timeout in milliseconds, applied to navigations and assets alike.
    ///
    /// Set via SWCACHE_FETCH_TIMEOUT_MS environment variable.
    #[serde(default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,

    /// Maximum bytes to read per response.
    ///
    /// Set via SWCACHE_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Move straight to activation after install instead of waiting for the host.
    ///
    /// Set via SWCACHE_SKIP_WAITING environment variable.
    #[serde(default = "default_true")]
    pub skip_waiting: bool,

    /// Request headers that take part in the cache key.
    ///
    /// Set via SWCACHE_VARY_HEADERS environment variable.
    #[serde(default)]
    pub vary_headers: Vec<String>,

    /// Dedup tag shared by every notification.
    ///
    /// Set via SWCACHE_NOTIFICATION_TAG environment variable.
    #[serde(default = "default_notification_tag")]
    pub notification_tag: String,

    /// Icon shown with notifications.
    ///
    /// Set via SWCACHE_NOTIFICATION_ICON environment variable.
    #[serde(default = "default_notification_icon")]
    pub notification_icon: String,

    /// Badge shown with notifications.
    ///
    /// Set via SWCACHE_NOTIFICATION_BADGE environment variable.
    #[serde(default = "default_notification_badge")]
    pub notification_badge: String,
}

fn default_version() -> String {
    "v1".into()
}

fn default_cache_prefix() -> String {
    "chakki-cache".into()
}

fn default_origin() -> String {
    "http://localhost:8080".into()
}

fn default_manifest() -> Vec<String> {
    vec!["/".into(), "/index.html".into(), "/manifest.json".into()]
}

fn default_offline_fallback() -> String {
    "/index.html".into()
}

fn default_app_root() -> String {
    "/".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./swcache.sqlite")
}

fn default_user_agent() -> String {
    "swcache/0.1".into()
}

fn default_fetch_timeout_ms() -> u64 {
    10_000
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_true() -> bool {
    true
}

fn default_notification_tag() -> String {
    "chakki-notification".into()
}

fn default_notification_icon() -> String {
    "/icons/icon-192x192.png".into()
}

fn default_notification_badge() -> String {
    "/icons/icon-72x72.png".into()
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            cache_prefix: default_cache_prefix(),
            origin: default_origin(),
            manifest: default_manifest(),
            offline_fallback: default_offline_fallback(),
            app_root: default_app_root(),
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            fetch_timeout_ms: default_fetch_timeout_ms(),
            max_bytes: default_max_bytes(),
            skip_waiting: true,
            vary_headers: Vec::new(),
            notification_tag: default_notification_tag(),
            notification_icon: default_notification_icon(),
            notification_badge: default_notification_badge(),
        }
    }
}

impl WorkerConfig {
    /// Fetch timeout as Duration for use with reqwest/tokio.
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    /// Name of the generation this version owns: `{cache_prefix}-{version}`.
    pub fn cache_name(&self) -> String {
        format!("{}-{}", self.cache_prefix, self.version)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `SWCACHE_`
    /// 2. TOML file from `SWCACHE_CONFIG_FILE` (if set)
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

        if let Ok(config_path) = std::env::var("SWCACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("SWCACHE_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
