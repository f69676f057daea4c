//! Lazily loaded, process-lifetime model cache

use std::sync::OnceLock;

use crate::features::FeatureVector;
use crate::model::{load_regressor, Regressor};
use crate::{CovidError, ModelConfig, Result};

/// Owns one fitted regressor, loading it on first use
///
/// A successful load is cached for the provider's lifetime and never
/// replaced. A failed load is reported and not cached, so a later call
/// retries once the artifact is in place.
pub struct ModelProvider {
    config: Option<ModelConfig>,
    input_dim: usize,
    model: OnceLock<Box<dyn Regressor>>,
}

impl ModelProvider {
    /// Provider reading the artifact described by `config`
    pub fn new(config: ModelConfig, input_dim: usize) -> Self {
        ModelProvider {
            config: Some(config),
            input_dim,
            model: OnceLock::new(),
        }
    }

    /// Provider around an already constructed model
    pub fn preloaded(model: Box<dyn Regressor>, input_dim: usize) -> Self {
        let cell = OnceLock::new();
        let _ = cell.set(model);
        ModelProvider {
            config: None,
            input_dim,
            model: cell,
        }
    }

    pub fn config(&self) -> Option<&ModelConfig> {
        self.config.as_ref()
    }

    pub fn is_loaded(&self) -> bool {
        self.model.get().is_some()
    }

    /// The cached model, loading it if this is the first use
    pub fn get(&self) -> Result<&dyn Regressor> {
        if let Some(model) = self.model.get() {
            return Ok(model.as_ref());
        }

        let config = self
            .config
            .as_ref()
            .ok_or_else(|| CovidError::Model("No model configured".to_string()))?;

        log::info!(
            "Loading {} model from {}",
            config.kind,
            config.path.display()
        );
        let loaded = load_regressor(config, self.input_dim)?;
        log::info!("Model loaded");

        // a concurrent first use may have won; its model is kept
        Ok(self.model.get_or_init(|| loaded).as_ref())
    }

    pub fn predict(&self, features: &FeatureVector) -> Result<f64> {
        self.get()?.predict(features)
    }
}
