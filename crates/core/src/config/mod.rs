//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (SWCACHE_*)
//! 2. TOML config file (if SWCACHE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

pub mod manifest;
mod validation;

pub use manifest::PrecacheManifest;
pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (SWCACHE_*)
/// 2. TOML config file (if SWCACHE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Site name, the first segment of the cache name.
    ///
    /// Set via SWCACHE_SITE_NAME environment variable.
    #[serde(default = "default_site_name")]
    pub site_name: String,

    /// Deployed cache version. Bumping it starts a new generation.
    ///
    /// Set via SWCACHE_CACHE_VERSION environment variable.
    #[serde(default = "default_cache_version")]
    pub cache_version: u32,

    /// Origin the worker is installed for. Requests to any other origin
    /// pass through untouched.
    ///
    /// Set via SWCACHE_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Path to the SQLite cache database.
    ///
    /// Set via SWCACHE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for network fetches.
    ///
    /// Set via SWCACHE_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Network timeout in milliseconds. Unset means fetches never time out.
    ///
    /// Set via SWCACHE_TIMEOUT_MS environment variable.
    #[serde(default)]
    pub timeout_ms: Option<u64>,

    /// Maximum number of redirects followed per fetch.
    ///
    /// Set via SWCACHE_MAX_REDIRECTS environment variable.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,

    /// Path fragments that mark the static asset namespace.
    ///
    /// Set via SWCACHE_ASSET_PREFIXES environment variable.
    #[serde(default = "default_asset_prefixes")]
    pub asset_prefixes: Vec<String>,

    /// Optional TOML precache manifest. The built-in manifest is used when unset.
    ///
    /// Set via SWCACHE_MANIFEST_PATH environment variable.
    #[serde(default)]
    pub manifest_path: Option<PathBuf>,

    /// Run install and activate at startup.
    ///
    /// Set via SWCACHE_AUTO_ACTIVATE environment variable.
    #[serde(default = "default_true")]
    pub auto_activate: bool,
}

fn default_site_name() -> String {
    "greeting".into()
}

fn default_cache_version() -> u32 {
    1
}

fn default_origin() -> String {
    "http://localhost:8080".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./swcache.sqlite")
}

fn default_user_agent() -> String {
    "swcache/0.1".into()
}

fn default_max_redirects() -> usize {
    5
}

fn default_asset_prefixes() -> Vec<String> {
    vec!["/assets/".into()]
}

fn default_true() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            site_name: default_site_name(),
            cache_version: default_cache_version(),
            origin: default_origin(),
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            timeout_ms: None,
            max_redirects: default_max_redirects(),
            asset_prefixes: default_asset_prefixes(),
            manifest_path: None,
            auto_activate: true,
        }
    }
}

impl AppConfig {
    /// Name of the current generation: `<site_name>-cache-v<cache_version>`.
    pub fn cache_name(&self) -> String {
        format!("{}-cache-v{}", self.site_name, self.cache_version)
    }

    /// Timeout as Duration for use with reqwest, if one is configured.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
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

    /// Load the precache manifest named by `manifest_path`, or the built-in one.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the manifest file cannot be read or holds
    /// a path that is not root-relative.
    pub fn load_manifest(&self) -> Result<PrecacheManifest, ConfigError> {
        match &self.manifest_path {
            Some(path) => PrecacheManifest::from_toml_file(path),
            None => Ok(PrecacheManifest::default()),
        }
    }
}
