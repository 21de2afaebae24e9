//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::{AppConfig, Surface};
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `target_url` or `output_path` is empty
    /// - `page_size` is 0 or exceeds 1000
    /// - `settle_ms` exceeds 1 minute
    /// - `timeout_ms` is less than 100ms or exceeds 10 minutes
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.target_url.trim().is_empty() {
            return Err(ConfigError::Invalid { field: "target_url".into(), reason: "must not be empty".into() });
        }

        if self.output_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid { field: "output_path".into(), reason: "must not be empty".into() });
        }

        if self.page_size == 0 {
            return Err(ConfigError::Invalid { field: "page_size".into(), reason: "must be greater than 0".into() });
        }
        if self.page_size > 1000 {
            return Err(ConfigError::Invalid { field: "page_size".into(), reason: "must not exceed 1000".into() });
        }

        if self.settle_ms > 60_000 {
            return Err(ConfigError::Invalid {
                field: "settle_ms".into(),
                reason: "must not exceed 1 minute (60000ms)".into(),
            });
        }

        if self.timeout_ms < 100 {
            return Err(ConfigError::Invalid { field: "timeout_ms".into(), reason: "must be at least 100ms".into() });
        }
        if self.timeout_ms > 600_000 {
            return Err(ConfigError::Invalid {
                field: "timeout_ms".into(),
                reason: "must not exceed 10 minutes (600000ms)".into(),
            });
        }

        if self.measure_bodies && self.surface == Surface::Script {
            tracing::warn!("measure_bodies only applies to the devtools surface; script sizes are always measured");
        }

        if self.debugger_url.is_some() && self.chrome_executable.is_some() {
            tracing::warn!("Both debugger_url and chrome_executable are set; attaching takes precedence");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_validate_default_config() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_empty_target_url() {
        let config = AppConfig { target_url: "  ".into(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "target_url"));
    }

    #[test]
    fn test_validate_empty_output_path() {
        let config = AppConfig { output_path: PathBuf::new(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "output_path"));
    }

    #[test]
    fn test_validate_page_size_zero() {
        let config = AppConfig { page_size: 0, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "page_size"));
    }

    #[test]
    fn test_validate_page_size_exceeds_limit() {
        let config = AppConfig { page_size: 1001, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "page_size"));
    }

    #[test]
    fn test_validate_settle_exceeds_limit() {
        let config = AppConfig { settle_ms: 60_001, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "settle_ms"));
    }

    #[test]
    fn test_validate_timeout_too_small() {
        let config = AppConfig { timeout_ms: 50, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "timeout_ms"));
    }

    #[test]
    fn test_validate_timeout_exceeds_limit() {
        let config = AppConfig { timeout_ms: 600_001, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "timeout_ms"));
    }

    #[test]
    fn test_validate_edge_case_values() {
        let config = AppConfig { page_size: 1, settle_ms: 0, timeout_ms: 100, ..Default::default() };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_max_values() {
        let config = AppConfig { page_size: 1000, settle_ms: 60_000, timeout_ms: 600_000, ..Default::default() };
        assert!(config.validate().is_ok());
    }
}
