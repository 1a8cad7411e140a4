use anyhow::{anyhow, Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::aggregator::AnalysisOptions;
use crate::cache::CachePolicy;
use crate::report::ReportFormat;
use crate::resolver::CollisionPolicy;
use crate::validation::InputValidator;

/// Message store location relative to the home directory
const DEFAULT_MESSAGE_STORE: &str = "Library/Messages/chat.db";
/// Contacts store location relative to the home directory
const DEFAULT_CONTACTS_STORE: &str = "Library/Application Support/AddressBook/AddressBook-v22.abcddb";

/// Application configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Source stores
    pub sources: SourcesConfig,
    /// Output locations and report format
    pub output: OutputConfig,
    /// Log level, sink and format
    pub logging: LoggingConfig,
    /// Aggregation parameters
    pub analysis: AnalysisConfig,
    /// Identity resolution rules
    pub resolution: ResolutionConfig,
    /// Pipeline behaviour
    pub pipeline: PipelineConfig,
}

/// Paths of the two read-only source stores. Empty means the platform default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourcesConfig {
    pub message_store: String,
    pub contacts_store: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory for the intermediate CSV files
    pub data_dir: String,
    /// Directory for the aggregate tables
    pub report_dir: String,
    pub report_format: ReportFormat,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file_path: Option<String>,
    pub format: String, // "json" or "text"
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    pub bucket_days: u32,
    pub time_of_day_minutes: u32,
    pub top_n: usize,
    pub target_group: Option<String>,
    pub target_contact: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionConfig {
    pub collision_policy: CollisionPolicy,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub cache_policy: CachePolicy,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            data_dir: "./ImessageAnalysisData".to_string(),
            report_dir: "./ImessageAnalysisData/reports".to_string(),
            report_format: ReportFormat::Csv,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file_path: None,
            format: "text".to_string(),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        let options = AnalysisOptions::default();
        Self {
            bucket_days: options.bucket_days,
            time_of_day_minutes: options.time_of_day_minutes,
            top_n: options.top_n,
            target_group: None,
            target_contact: None,
        }
    }
}

fn home_relative(relative: &str) -> PathBuf {
    std::env::var_os("HOME")
        .map_or_else(|| PathBuf::from("."), PathBuf::from)
        .join(relative)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl AppConfig {
    /// Load configuration from multiple sources with precedence
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Like [`AppConfig::load`], with an extra config file layered above the
    /// default files and below the environment
    pub fn load_from(extra_file: Option<&Path>) -> Result<Self> {
        let defaults = Config::try_from(&Self::default())
            .map_err(|e| anyhow!("Failed to serialize default configuration: {e}"))?;

        let mut builder = Config::builder()
            .add_source(defaults)
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(File::with_name("config").required(false));

        if let Some(path) = extra_file {
            builder = builder.add_source(File::from(path).required(true));
        }

        let config = builder
            .add_source(
                Environment::with_prefix("IMSG_ANALYSIS")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to load configuration")?;

        let app_config: Self = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        app_config.validate()?;

        Ok(app_config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(anyhow!(
                "Invalid log level: {}. Must be one of: {:?}",
                self.logging.level,
                valid_levels
            ));
        }

        let valid_formats = ["text", "json"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            return Err(anyhow!(
                "Invalid log format: {}. Must be one of: {:?}",
                self.logging.format,
                valid_formats
            ));
        }

        InputValidator::validate_output_dir(Path::new(&self.output.data_dir))?;
        InputValidator::validate_output_dir(Path::new(&self.output.report_dir))?;

        InputValidator::validate_bucket_days(self.analysis.bucket_days)?;
        InputValidator::validate_time_of_day_minutes(self.analysis.time_of_day_minutes)?;
        InputValidator::validate_top_n(self.analysis.top_n)?;
        if let Some(group) = &self.analysis.target_group {
            InputValidator::validate_target_name(group)?;
        }
        if let Some(contact) = &self.analysis.target_contact {
            InputValidator::validate_target_name(contact)?;
        }

        Ok(())
    }

    /// Message store path from `IMESSAGE_DB_PATH`, the config, or the default location
    #[must_use]
    pub fn message_store_path(&self) -> PathBuf {
        non_empty(std::env::var("IMESSAGE_DB_PATH").ok())
            .or_else(|| non_empty(Some(self.sources.message_store.clone())))
            .map_or_else(|| home_relative(DEFAULT_MESSAGE_STORE), PathBuf::from)
    }

    /// Contacts store path from `CONTACTS_DB_PATH`, the config, or the default location
    #[must_use]
    pub fn contacts_store_path(&self) -> PathBuf {
        non_empty(std::env::var("CONTACTS_DB_PATH").ok())
            .or_else(|| non_empty(Some(self.sources.contacts_store.clone())))
            .map_or_else(|| home_relative(DEFAULT_CONTACTS_STORE), PathBuf::from)
    }

    /// Get log level from environment or config
    #[must_use]
    pub fn log_level(&self) -> String {
        std::env::var("RUST_LOG").unwrap_or_else(|_| self.logging.level.clone())
    }

    /// Aggregation options with empty target names treated as absent
    #[must_use]
    pub fn analysis_options(&self) -> AnalysisOptions {
        AnalysisOptions {
            bucket_days: self.analysis.bucket_days,
            time_of_day_minutes: self.analysis.time_of_day_minutes,
            top_n: self.analysis.top_n,
            target_group: non_empty(self.analysis.target_group.clone()),
            target_contact: non_empty(self.analysis.target_contact.clone()),
        }
    }

    /// Effective configuration as YAML
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Failed to render configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.analysis.bucket_days, 10);
        assert_eq!(config.analysis.time_of_day_minutes, 20);
        assert_eq!(config.analysis.top_n, 30);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_config_validation() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_config() {
        let mut config = AppConfig::default();
        config.analysis.time_of_day_minutes = 7;
        assert!(config.validate().is_err());
    }
}
