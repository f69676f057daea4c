//! COVID-19 total case and death prediction
//!
//! Converts user-entered live and cumulative metrics into the stationary
//! feature space the fitted regressors were trained on, runs the model and
//! formats the result.

pub mod data;
pub mod features;
pub mod model;
pub mod predict;
pub mod transform;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::features::{CaseFeatures, DeathFeatures};
use crate::model::ModelKind;
use crate::transform::{BaselineTable, LogOffsetTable};

/// Quantity a pipeline estimates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionTarget {
    TotalCases,
    TotalDeaths,
}

impl PredictionTarget {
    pub fn label(&self) -> &'static str {
        match self {
            PredictionTarget::TotalCases => "Predicted Total Imputed Cases",
            PredictionTarget::TotalDeaths => "Predicted Total Deaths",
        }
    }
}

impl fmt::Display for PredictionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PredictionTarget::TotalCases => write!(f, "total cases"),
            PredictionTarget::TotalDeaths => write!(f, "total deaths"),
        }
    }
}

/// Model output for one request
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub target: PredictionTarget,
    pub value: f64,
}

impl PredictionResult {
    /// Decimal places shown to the user
    pub const PRECISION: usize = 3;

    pub fn new(target: PredictionTarget, value: f64) -> Self {
        PredictionResult { target, value }
    }

    /// Value with a sign column: a space for non-negative values, `-` otherwise
    pub fn formatted_value(&self) -> String {
        if self.value.is_sign_negative() {
            format!("{:.*}", Self::PRECISION, self.value)
        } else {
            format!(" {:.*}", Self::PRECISION, self.value)
        }
    }
}

impl fmt::Display for PredictionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.target.label(), self.formatted_value())
    }
}

/// Application-wide errors
#[derive(Debug, Error)]
pub enum CovidError {
    #[error("{field} must be at least {min}, got {value}")]
    BelowMinimum { field: String, value: f64, min: f64 },

    #[error("{field} must be at most {max}, got {value}")]
    AboveMaximum { field: String, value: f64, max: f64 },

    #[error("{field} must be a whole number, got {value}")]
    NotInteger { field: String, value: f64 },

    #[error("{field} must be a finite number, got {value}")]
    NonFinite { field: String, value: f64 },

    #[error("Unknown feature: {0}")]
    UnknownFeature(String),

    #[error("Feature missing from input vector: {0}")]
    MissingFeature(String),

    #[error("Log transform undefined for {feature}: {value} + {offset} is not positive")]
    LogDomain {
        feature: String,
        value: f64,
        offset: f64,
    },

    #[error("Model artifact not found at {}", .0.display())]
    ModelNotFound(PathBuf),

    #[error("Model error: {0}")]
    Model(String),

    #[error("Feature mismatch: model expects {expected}, got {found}")]
    FeatureMismatch { expected: String, found: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Parse error: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, CovidError>;

/// Application configuration loaded from config.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub case: PipelineConfig,
    pub death: PipelineConfig,
    pub data: DataConfig,
}

/// Reference tables and model artifact for one pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub baseline: BaselineTable,
    #[serde(default)]
    pub log_offsets: LogOffsetTable,
    pub model: ModelConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub kind: ModelKind,
    pub path: PathBuf,
    /// Hidden layer widths, only read for `mlp` artifacts
    #[serde(default)]
    pub hidden_dims: Vec<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    pub dataset_path: PathBuf,
}

impl PipelineConfig {
    pub fn case_default() -> Self {
        PipelineConfig {
            baseline: CaseFeatures::default_baseline(),
            log_offsets: LogOffsetTable::default(),
            model: ModelConfig {
                kind: ModelKind::XGBoost,
                path: PathBuf::from("assets/model/xgb_model_total_imputed_cases.json"),
                hidden_dims: Vec::new(),
            },
        }
    }

    pub fn death_default() -> Self {
        PipelineConfig {
            baseline: DeathFeatures::default_baseline(),
            log_offsets: DeathFeatures::default_log_offsets(),
            model: ModelConfig {
                kind: ModelKind::XGBoost,
                path: PathBuf::from("assets/model/xgb_model_total_deaths.json"),
                hidden_dims: Vec::new(),
            },
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            case: PipelineConfig::case_default(),
            death: PipelineConfig::death_default(),
            data: DataConfig {
                dataset_path: PathBuf::from("assets/data/preprocessed_data_updated.csv"),
            },
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CovidError::Config(format!("Failed to read config file {}: {}", path, e))
        })?;
        toml::from_str(&content)
            .map_err(|e| CovidError::Config(format!("Failed to parse config: {}", e)))
    }

    pub fn save(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| CovidError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prediction_display_matches_sign_column() {
        let pred = PredictionResult::new(PredictionTarget::TotalCases, 1234.56789);
        assert_eq!(pred.to_string(), "Predicted Total Imputed Cases:  1234.568");

        let pred = PredictionResult::new(PredictionTarget::TotalDeaths, -2.5);
        assert_eq!(pred.to_string(), "Predicted Total Deaths: -2.500");
    }

    #[test]
    fn test_config_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let path = path.to_str().unwrap();

        let config = Config::default();
        config.save(path).unwrap();
        let loaded = Config::load(path).unwrap();

        assert_eq!(loaded.case.baseline, config.case.baseline);
        assert_eq!(loaded.death.log_offsets, config.death.log_offsets);
        assert_eq!(loaded.death.model.path, config.death.model.path);
        assert_eq!(loaded.case.model.kind, ModelKind::XGBoost);
    }

    #[test]
    fn test_pipelines_configure_independently() {
        let mut config = Config::default();
        config.case.baseline.insert("totalTests", 1.0);

        assert_eq!(config.case.baseline.get("totalTests"), Some(1.0));
        assert_eq!(config.death.baseline.get("totalTests"), None);
        assert_eq!(
            config.death.baseline.get("stringency_index"),
            Some(13.89)
        );
    }

    #[test]
    fn test_load_missing_config() {
        let result = Config::load("/nonexistent/config.toml");
        assert!(matches!(result, Err(CovidError::Config(_))));
    }
}
