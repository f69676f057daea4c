//! Prediction pipelines
//!
//! Turn validated input records into formatted model predictions.

pub mod inference;

pub use inference::{CasePipeline, DeathPipeline, Pipeline, PredictionOutcome};
