//! Preprocessing and inference for one prediction target

use serde::Serialize;
use std::fmt;
use std::marker::PhantomData;

use crate::features::{CaseFeatures, DeathFeatures, FeatureRecord, FeatureVector};
use crate::model::ModelProvider;
use crate::transform::{apply_log, difference, BaselineTable, LogOffsetTable};
use crate::{CovidError, PipelineConfig, PredictionResult, PredictionTarget, Result};

/// Total imputed cases: differencing only
pub type CasePipeline = Pipeline<CaseFeatures>;

/// Total deaths: differencing, then the offset log transform
pub type DeathPipeline = Pipeline<DeathFeatures>;

/// Raw record → differenced → log-transformed → model → scalar
pub struct Pipeline<F: FeatureRecord> {
    baseline: BaselineTable,
    log_offsets: LogOffsetTable,
    provider: ModelProvider,
    _record: PhantomData<fn() -> F>,
}

impl<F: FeatureRecord> Pipeline<F> {
    /// Create a pipeline, rejecting log offsets for columns the record lacks
    pub fn new(
        baseline: BaselineTable,
        log_offsets: LogOffsetTable,
        provider: ModelProvider,
    ) -> Result<Self> {
        if let Some((name, _)) = log_offsets.iter().find(|(name, _)| F::spec(name).is_none()) {
            return Err(CovidError::UnknownFeature(name.to_string()));
        }
        for (name, _) in baseline.iter().filter(|(name, _)| F::spec(name).is_none()) {
            log::debug!("{} baseline {} matches no input column", F::TARGET, name);
        }

        Ok(Pipeline {
            baseline,
            log_offsets,
            provider,
            _record: PhantomData,
        })
    }

    /// Create a pipeline whose model is loaded lazily from the configured artifact
    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        let provider = ModelProvider::new(config.model.clone(), F::FIELDS.len());
        Self::new(config.baseline.clone(), config.log_offsets.clone(), provider)
    }

    pub fn target(&self) -> PredictionTarget {
        F::TARGET
    }

    pub fn baseline(&self) -> &BaselineTable {
        &self.baseline
    }

    pub fn log_offsets(&self) -> &LogOffsetTable {
        &self.log_offsets
    }

    pub fn provider(&self) -> &ModelProvider {
        &self.provider
    }

    /// Map a record into the model's feature space
    ///
    /// Out-of-range, non-integer and non-finite fields are rejected before
    /// the record is lowered.
    pub fn preprocess(&self, features: &F) -> Result<FeatureVector> {
        features.validate()?;
        let raw = features.to_feature_vector();
        let differenced = difference(&raw, &self.baseline);
        let transformed = apply_log(&differenced, &self.log_offsets)?;
        log::debug!("{} features: {:?}", F::TARGET, transformed.values());
        Ok(transformed)
    }

    /// Predict a single request
    pub fn predict(&self, features: &F) -> Result<PredictionResult> {
        let vector = self.preprocess(features)?;
        let value = self.provider.predict(&vector)?;
        Ok(PredictionResult::new(F::TARGET, value))
    }

    /// Predict, turning any failure into a reportable message
    pub fn run(&self, features: &F) -> PredictionOutcome {
        match self.predict(features) {
            Ok(result) => PredictionOutcome::Success(result),
            Err(e) => {
                log::warn!("{} prediction failed: {}", F::TARGET, e);
                PredictionOutcome::Failure(format!("An error occurred: {}", e))
            }
        }
    }
}

/// What the user sees after pressing predict
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum PredictionOutcome {
    Success(PredictionResult),
    Failure(String),
}

impl PredictionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, PredictionOutcome::Success(_))
    }

    pub fn result(&self) -> Option<&PredictionResult> {
        match self {
            PredictionOutcome::Success(result) => Some(result),
            PredictionOutcome::Failure(_) => None,
        }
    }
}

impl fmt::Display for PredictionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PredictionOutcome::Success(result) => write!(f, "{}", result),
            PredictionOutcome::Failure(message) => write!(f, "{}", message),
        }
    }
}
