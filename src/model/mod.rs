//! Fitted regressors
//!
//! Two artifact formats:
//! - XGBoost JSON tree ensembles (the format the shipped models use)
//! - burn MLP records

pub mod mlp;
pub mod provider;
pub mod xgboost;

pub use mlp::{MlpConfig, MlpRegressor};
pub use provider::ModelProvider;
pub use xgboost::TreeEnsemble;

use burn::backend::NdArray;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::features::FeatureVector;
use crate::{ModelConfig, Result};

/// Backend used for burn inference
pub type InferenceBackend = NdArray<f32>;

/// An opaque fitted model: ordered feature vector in, scalar out
pub trait Regressor: Send + Sync {
    fn predict(&self, features: &FeatureVector) -> Result<f64>;
}

/// Serialized model format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelKind {
    #[serde(rename = "xgboost")]
    XGBoost,
    #[serde(rename = "mlp")]
    Mlp,
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelKind::XGBoost => write!(f, "xgboost"),
            ModelKind::Mlp => write!(f, "mlp"),
        }
    }
}

/// Deserialize the artifact described by `config`
pub fn load_regressor(config: &ModelConfig, input_dim: usize) -> Result<Box<dyn Regressor>> {
    match config.kind {
        ModelKind::XGBoost => {
            let model = TreeEnsemble::load(&config.path)?;
            log::debug!(
                "{} trees over {} features",
                model.num_trees(),
                model.num_features()
            );
            Ok(Box::new(model))
        }
        ModelKind::Mlp => {
            let mlp_config = MlpConfig {
                input_dim,
                hidden_dims: config.hidden_dims.clone(),
            };
            let model =
                MlpRegressor::<InferenceBackend>::load(Default::default(), &config.path, &mlp_config)?;
            Ok(Box::new(model))
        }
    }
}

/// Path of the file the artifact is read from
pub fn artifact_path(config: &ModelConfig) -> std::path::PathBuf {
    match config.kind {
        ModelKind::XGBoost => config.path.clone(),
        ModelKind::Mlp => mlp::record_path(&config.path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CovidError;
    use std::path::PathBuf;

    #[test]
    fn test_load_missing_artifacts() {
        for kind in [ModelKind::XGBoost, ModelKind::Mlp] {
            let config = ModelConfig {
                kind,
                path: PathBuf::from("/nonexistent/model"),
                hidden_dims: vec![4],
            };
            let result = load_regressor(&config, 14);
            assert!(matches!(result, Err(CovidError::ModelNotFound(_))), "{}", kind);
        }
    }

    #[test]
    fn test_artifact_path() {
        let config = ModelConfig {
            kind: ModelKind::Mlp,
            path: PathBuf::from("assets/model/deaths"),
            hidden_dims: vec![],
        };
        assert_eq!(artifact_path(&config), PathBuf::from("assets/model/deaths.mpk"));
    }
}
