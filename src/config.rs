/// Service configuration loaded from a TOML file.
///
/// Every section is optional; missing values fall back to the defaults
/// below. `STATS_API_BASE_URL` (read after `.env` is loaded) overrides the
/// configured API base URL so deployments can point at a different backend
/// without editing the file.

use crate::labels::VariableLabels;
use crate::logging::LogLevel;
use crate::model::{StatsError, TOTAL_POPULATION};
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Environment variable that overrides `[api] base_url`.
pub const BASE_URL_ENV: &str = "STATS_API_BASE_URL";

const DEFAULT_BASE_URL: &str = "https://datacommons.org";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct StatsConfig {
    pub api: ApiConfig,
    pub per_capita: PerCapitaConfig,
    pub logging: LoggingConfig,
    /// Label overrides layered over the built-in table.
    pub labels: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct PerCapitaConfig {
    /// Denominator used when a variable has no explicit one.
    pub population_variable: String,
    /// Per-capita results are expressed per `scaling` people.
    pub scaling: f64,
    /// Per-variable denominators, e.g. `Count_Death = "Count_Person"`.
    pub denominators: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
    pub timestamps: bool,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            per_capita: PerCapitaConfig::default(),
            logging: LoggingConfig::default(),
            labels: HashMap::new(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl Default for PerCapitaConfig {
    fn default() -> Self {
        Self {
            population_variable: TOTAL_POPULATION.to_string(),
            scaling: 1.0,
            denominators: HashMap::new(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            timestamps: false,
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl StatsConfig {
    /// Parses and validates a TOML document. Does not consult the
    /// environment.
    pub fn from_toml_str(contents: &str) -> Result<Self, StatsError> {
        let config: StatsConfig = toml::from_str(contents)
            .map_err(|e| StatsError::ConfigError(format!("invalid config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Applies environment overrides on top of the file values.
    pub fn apply_env_overrides(mut self) -> Result<Self, StatsError> {
        if let Ok(url) = env::var(BASE_URL_ENV) {
            if !url.trim().is_empty() {
                self.api.base_url = url;
            }
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), StatsError> {
        if self.api.base_url.trim().is_empty() {
            return Err(StatsError::ConfigError("api.base_url must not be empty".into()));
        }
        if self.api.timeout_secs == 0 {
            return Err(StatsError::ConfigError("api.timeout_secs must be positive".into()));
        }
        if !(self.per_capita.scaling.is_finite() && self.per_capita.scaling > 0.0) {
            return Err(StatsError::ConfigError(format!(
                "per_capita.scaling must be a positive number, got {}",
                self.per_capita.scaling
            )));
        }
        if self.per_capita.population_variable.trim().is_empty() {
            return Err(StatsError::ConfigError(
                "per_capita.population_variable must not be empty".into(),
            ));
        }
        self.log_level()?;
        Ok(())
    }

    pub fn log_level(&self) -> Result<LogLevel, StatsError> {
        self.logging.level.parse()
    }

    /// The built-in label table with this config's overrides applied.
    pub fn variable_labels(&self) -> VariableLabels {
        VariableLabels::default().with_overrides(&self.labels)
    }
}

/// Loads `.env`, reads the config file and applies environment overrides.
pub fn load_config(path: &Path) -> Result<StatsConfig, StatsError> {
    dotenv::dotenv().ok();
    let contents = fs::read_to_string(path).map_err(|e| {
        StatsError::ConfigError(format!("failed to read {}: {}", path.display(), e))
    })?;
    StatsConfig::from_toml_str(&contents)?.apply_env_overrides()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_yields_defaults() {
        let config = StatsConfig::from_toml_str("").expect("empty config is valid");
        assert_eq!(config, StatsConfig::default());
        assert_eq!(config.per_capita.population_variable, "Count_Person");
        assert_eq!(config.api.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_full_document_parses() {
        let config = StatsConfig::from_toml_str(
            r#"
            [api]
            base_url = "http://localhost:8080"
            timeout_secs = 5

            [per_capita]
            population_variable = "Count_Household"
            scaling = 1000.0

            [per_capita.denominators]
            Count_Death = "Count_Person"

            [logging]
            level = "debug"
            file = "stats.log"
            timestamps = true

            [labels]
            Count_Death = "Deaths"
            "#,
        )
        .expect("valid config");

        assert_eq!(config.api.base_url, "http://localhost:8080");
        assert_eq!(config.api.timeout_secs, 5);
        assert_eq!(config.per_capita.scaling, 1000.0);
        assert_eq!(config.per_capita.denominators["Count_Death"], "Count_Person");
        assert_eq!(config.log_level(), Ok(LogLevel::Debug));
        assert_eq!(config.logging.file.as_deref(), Some("stats.log"));
        assert_eq!(config.variable_labels().label_for("Count_Death"), "Deaths");
        assert_eq!(config.variable_labels().label_for("Count_Person"), "Total");
    }

    #[test]
    fn test_zero_scaling_is_rejected() {
        let err = StatsConfig::from_toml_str("[per_capita]\nscaling = 0.0").unwrap_err();
        assert!(matches!(err, StatsError::ConfigError(_)), "got {:?}", err);
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        assert!(StatsConfig::from_toml_str("[api]\ntimeout_secs = 0").is_err());
    }

    #[test]
    fn test_unknown_log_level_is_rejected() {
        assert!(StatsConfig::from_toml_str("[logging]\nlevel = \"chatty\"").is_err());
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = load_config(Path::new("/nonexistent/stats.toml")).unwrap_err();
        assert!(matches!(err, StatsError::ConfigError(_)));
    }
}
