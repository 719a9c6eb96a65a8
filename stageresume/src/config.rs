//! Retry configuration.

use crate::document::PipelineVersion;
use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Output format of the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

/// Settings of the retry core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Executions older than this many days cannot be retried.
    pub max_execution_age_days: u32,
    /// Layout assumed for documents without a `version` key.
    pub default_pipeline_version: PipelineVersion,
    /// Retry every selected stage rather than only the failed ones.
    pub run_all_stages_by_default: bool,
    /// Log output format.
    pub log_format: LogFormat,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_execution_age_days: 30,
            default_pipeline_version: PipelineVersion::V0,
            run_all_stages_by_default: true,
            log_format: LogFormat::Text,
        }
    }
}

impl RetryConfig {
    /// Sets the maximum execution age.
    #[must_use]
    pub fn with_max_execution_age_days(mut self, days: u32) -> Self {
        self.max_execution_age_days = days;
        self
    }

    /// Sets the default document layout.
    #[must_use]
    pub fn with_default_pipeline_version(mut self, version: PipelineVersion) -> Self {
        self.default_pipeline_version = version;
        self
    }

    /// Sets whether all selected stages are retried by default.
    #[must_use]
    pub fn with_run_all_stages_by_default(mut self, run_all: bool) -> Self {
        self.run_all_stages_by_default = run_all;
        self
    }

    /// Sets the log format.
    #[must_use]
    pub fn with_log_format(mut self, format: LogFormat) -> Self {
        self.log_format = format;
        self
    }

    /// Parses and validates YAML text.
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = if content.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(content)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Loads and validates a YAML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Checks value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_execution_age_days == 0 {
            return Err(ConfigError::Invalid(
                "max_execution_age_days must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = RetryConfig::default();
        assert_eq!(config.max_execution_age_days, 30);
        assert_eq!(config.default_pipeline_version, PipelineVersion::V0);
        assert!(config.run_all_stages_by_default);
        assert_eq!(config.log_format, LogFormat::Text);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = RetryConfig::from_yaml_str("max_execution_age_days: 7\nlog_format: json\n").unwrap();
        assert_eq!(
            config,
            RetryConfig::default()
                .with_max_execution_age_days(7)
                .with_log_format(LogFormat::Json)
        );
    }

    #[test]
    fn test_blank_yaml_is_default() {
        assert_eq!(RetryConfig::from_yaml_str("").unwrap(), RetryConfig::default());
    }

    #[test]
    fn test_zero_age_is_invalid() {
        let err = RetryConfig::from_yaml_str("max_execution_age_days: 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_unparseable_yaml() {
        let err = RetryConfig::from_yaml_str("max_execution_age_days: [").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "default_pipeline_version: v1\nrun_all_stages_by_default: false").unwrap();

        let config = RetryConfig::load(file.path()).unwrap();
        assert_eq!(config.default_pipeline_version, PipelineVersion::V1);
        assert!(!config.run_all_stages_by_default);
    }

    #[test]
    fn test_load_missing_file() {
        let err = RetryConfig::load(Path::new("/nonexistent/stageresume.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
