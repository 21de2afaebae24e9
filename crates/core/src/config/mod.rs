//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (CACHESNAP_*)
//! 2. TOML config file (if CACHESNAP_CONFIG_FILE set)
//! 3. Built-in defaults
//!
//! Only the binary loads configuration; the collector itself receives plain
//! option structs.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Deserializer, Serialize};

mod validation;

pub use validation::ConfigError;

/// Which remote-control surface reads the page's caches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Surface {
    /// The CacheStorage DevTools protocol domain.
    #[default]
    Devtools,
    /// A script evaluated inside the page walking `window.caches`.
    Script,
}

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (CACHESNAP_*)
/// 2. TOML config file (if CACHESNAP_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Page whose cache storage is collected.
    ///
    /// Set via CACHESNAP_TARGET_URL environment variable.
    #[serde(default = "default_target_url")]
    pub target_url: String,

    /// Where the snapshot JSON is written.
    ///
    /// Set via CACHESNAP_OUTPUT_PATH environment variable.
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,

    /// Remote-control surface used for collection.
    ///
    /// Set via CACHESNAP_SURFACE environment variable (`devtools` or `script`).
    #[serde(default)]
    pub surface: Surface,

    /// Entries requested per call when paging through a cache.
    ///
    /// Set via CACHESNAP_PAGE_SIZE environment variable.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// Only keep entries whose URL contains this substring, ignoring case.
    /// Only keep entries whose URL contains this substring.
    ///
    /// Set via CACHESNAP_PATH_FILTER environment variable.
    #[serde(default, deserialize_with = "lenient_string")]
    pub path_filter: Option<String>,

    /// Drop entries whose URL is not on the target page's origin.
    ///
    /// Set via CACHESNAP_SAME_ORIGIN_ONLY environment variable.
    #[serde(default)]
    pub same_origin_only: bool,

    /// Read every cached body to report exact sizes (devtools surface only).
    ///
    /// Set via CACHESNAP_MEASURE_BODIES environment variable.
    #[serde(default)]
    pub measure_bodies: bool,

    /// Time given to the page after navigation to populate its caches.
    ///
    /// Set via CACHESNAP_SETTLE_MS environment variable.
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,

    /// Deadline for the whole collection in milliseconds.
    ///
    /// Set via CACHESNAP_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Launch the browser without a window.
    ///
    /// Set via CACHESNAP_HEADLESS environment variable.
    #[serde(default = "default_true")]
    pub headless: bool,

    /// Chrome/Chromium binary to launch instead of the detected one.
    ///
    /// Set via CACHESNAP_CHROME_EXECUTABLE environment variable.
    #[serde(default)]
    pub chrome_executable: Option<PathBuf>,

    /// Attach to a running browser instead of launching one.
    ///
    /// Either a `ws://` DevTools URL or the `http://host:port` debugging
    /// endpoint. Set via CACHESNAP_DEBUGGER_URL environment variable.
    #[serde(default)]
    pub debugger_url: Option<String>,
}

fn default_target_url() -> String {
    "https://ui.perfetto.dev".into()
}

fn default_output_path() -> PathBuf {
    PathBuf::from("cache_storage.json")
}

fn default_page_size() -> usize {
    100
}

fn default_settle_ms() -> u64 {
    2_000
}

fn default_timeout_ms() -> u64 {
    60_000
}

fn default_true() -> bool {
    true
}

/// Accept any scalar as text. Figment types environment values, so
/// `CACHESNAP_PATH_FILTER=2024` arrives as a number.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<serde_json::Value>::deserialize(deserializer)?.map(|value| match value {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    }))
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            target_url: default_target_url(),
            output_path: default_output_path(),
            surface: Surface::default(),
            page_size: default_page_size(),
            path_filter: None,
            same_origin_only: false,
            measure_bodies: false,
            settle_ms: default_settle_ms(),
            timeout_ms: default_timeout_ms(),
            headless: true,
            chrome_executable: None,
            debugger_url: None,
        }
    }
}

impl AppConfig {
    /// Collection deadline as Duration for use with tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `CACHESNAP_`
    /// 2. TOML file from `CACHESNAP_CONFIG_FILE` (if set)
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

        if let Ok(config_path) = std::env::var("CACHESNAP_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("CACHESNAP_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        Self::from_figment(figment)
    }

    /// Extract and validate a configuration from an assembled figment.
    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> Figment {
        Figment::from(Serialized::defaults(AppConfig::default()))
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.target_url, "https://ui.perfetto.dev");
        assert_eq!(config.output_path, PathBuf::from("cache_storage.json"));
        assert_eq!(config.surface, Surface::Devtools);
        assert_eq!(config.page_size, 100);
        assert_eq!(config.settle_ms, 2_000);
        assert_eq!(config.timeout_ms, 60_000);
        assert!(config.headless);
        assert!(!config.same_origin_only);
        assert!(!config.measure_bodies);
        assert!(config.path_filter.is_none());
        assert!(config.chrome_executable.is_none());
        assert!(config.debugger_url.is_none());
    }

    #[test]
    fn test_durations() {
        let config = AppConfig::default();
        assert_eq!(config.timeout(), Duration::from_millis(60_000));
        assert_eq!(config.settle(), Duration::from_millis(2_000));
    }

    #[test]
    fn test_toml_overrides_defaults() {
        let toml = r#"
            target_url = "https://example.com/app"
            surface = "script"
            page_size = 25
            same_origin_only = true
        "#;

        let config = AppConfig::from_figment(defaults().merge(Toml::string(toml))).unwrap();
        assert_eq!(config.target_url, "https://example.com/app");
        assert_eq!(config.surface, Surface::Script);
        assert_eq!(config.page_size, 25);
        assert!(config.same_origin_only);
        assert_eq!(config.timeout_ms, 60_000);
    }

    #[test]
    fn test_unknown_surface_fails_to_load() {
        let result = AppConfig::from_figment(defaults().merge(Toml::string("surface = \"extension\"")));
        assert!(matches!(result, Err(ConfigError::LoadFailed(_))));
    }

    #[test]
    fn test_numeric_path_filter_is_text() {
        let config = AppConfig::from_figment(defaults().merge(Serialized::default("path_filter", 2024))).unwrap();
        assert_eq!(config.path_filter.as_deref(), Some("2024"));

        let config = AppConfig::from_figment(defaults().merge(Toml::string("path_filter = 1.5"))).unwrap();
        assert_eq!(config.path_filter.as_deref(), Some("1.5"));
    }

    #[test]
    fn test_path_filter_string_and_absent() {
        let config = AppConfig::from_figment(defaults().merge(Toml::string("path_filter = \"/v1/\""))).unwrap();
        assert_eq!(config.path_filter.as_deref(), Some("/v1/"));

        let config = AppConfig::from_figment(defaults()).unwrap();
        assert!(config.path_filter.is_none());
    }

    #[test]
    fn test_invalid_value_fails_validation() {
        let result = AppConfig::from_figment(defaults().merge(Toml::string("page_size = 0")));
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "page_size"));
    }
}
