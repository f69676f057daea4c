//! MLP regressor stored as a burn record
//!
//! Architecture: Input(n) → [Linear → ReLU] × hidden → Linear(1)

use burn::module::Module;
use burn::nn::{Linear, LinearConfig};
use burn::record::{FullPrecisionSettings, Recorder};
use burn::tensor::activation::relu;
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::features::FeatureVector;
use crate::model::Regressor;
use crate::{CovidError, Result};

/// Configuration for the MLP regressor
#[derive(Debug, Clone)]
pub struct MlpConfig {
    /// Input dimension (model feature count)
    pub input_dim: usize,
    /// Hidden layer widths (e.g., [64, 32] for two layers)
    pub hidden_dims: Vec<usize>,
}

/// A single hidden layer block: Linear → ReLU
#[derive(Module, Debug)]
pub struct HiddenBlock<B: Backend> {
    linear: Linear<B>,
}

impl<B: Backend> HiddenBlock<B> {
    pub fn new(device: &B::Device, in_dim: usize, out_dim: usize) -> Self {
        HiddenBlock {
            linear: LinearConfig::new(in_dim, out_dim).init(device),
        }
    }

    pub fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        relu(self.linear.forward(x))
    }

    fn dims(&self) -> [usize; 2] {
        self.linear.weight.val().dims()
    }
}

/// Feed-forward network with a scalar regression head
#[derive(Module, Debug)]
pub struct MlpNet<B: Backend> {
    hidden: Vec<HiddenBlock<B>>,
    head: Linear<B>,
}

impl<B: Backend> MlpNet<B> {
    pub fn new(device: &B::Device, config: &MlpConfig) -> Self {
        let mut hidden = Vec::with_capacity(config.hidden_dims.len());
        let mut in_dim = config.input_dim;
        for &out_dim in &config.hidden_dims {
            hidden.push(HiddenBlock::new(device, in_dim, out_dim));
            in_dim = out_dim;
        }

        MlpNet {
            hidden,
            head: LinearConfig::new(in_dim, 1).init(device),
        }
    }

    /// Forward pass
    ///
    /// # Arguments
    /// * `x` - Features [batch, input_dim]
    ///
    /// # Returns
    /// Predictions [batch, 1]
    pub fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = self
            .hidden
            .iter()
            .fold(x, |x, block| block.forward(x));
        self.head.forward(x)
    }

    /// Check that loaded weights have the configured layer widths
    fn check_shapes(&self, config: &MlpConfig) -> Result<()> {
        let mut expected = Vec::with_capacity(config.hidden_dims.len() + 1);
        let mut in_dim = config.input_dim;
        for &out_dim in &config.hidden_dims {
            expected.push([in_dim, out_dim]);
            in_dim = out_dim;
        }
        expected.push([in_dim, 1]);

        let mut found: Vec<[usize; 2]> = self.hidden.iter().map(HiddenBlock::dims).collect();
        found.push(self.head.weight.val().dims());

        if expected != found {
            return Err(CovidError::FeatureMismatch {
                expected: format!("layer shapes {:?}", expected),
                found: format!("layer shapes {:?}", found),
            });
        }
        Ok(())
    }

    /// Save model to file
    pub fn save(&self, path: &Path) -> Result<()>
    where
        B::FloatElem: serde::Serialize + serde::de::DeserializeOwned,
        B::IntElem: serde::Serialize + serde::de::DeserializeOwned,
    {
        let recorder = burn::record::NamedMpkFileRecorder::<FullPrecisionSettings>::new();
        recorder
            .record(self.clone().into_record(), path.to_path_buf())
            .map_err(|e| CovidError::Io(std::io::Error::other(e.to_string())))
    }

    /// Load model from file
    pub fn load(device: &B::Device, path: &Path, config: &MlpConfig) -> Result<Self>
    where
        B::FloatElem: serde::Serialize + serde::de::DeserializeOwned,
        B::IntElem: serde::Serialize + serde::de::DeserializeOwned,
    {
        let file = record_path(path);
        if !file.exists() {
            return Err(CovidError::ModelNotFound(file));
        }

        let recorder = burn::record::NamedMpkFileRecorder::<FullPrecisionSettings>::new();
        let record = recorder
            .load(path.to_path_buf(), device)
            .map_err(|e| CovidError::Model(format!("Failed to read {}: {}", file.display(), e)))?;

        let model = Self::new(device, config).load_record(record);
        model.check_shapes(config)?;
        Ok(model)
    }
}

/// File burn writes for a record path (it appends `.mpk`)
pub fn record_path(path: &Path) -> PathBuf {
    path.with_extension("mpk")
}

/// [`MlpNet`] behind the [`Regressor`] interface
///
/// burn modules are `Send` but not `Sync`, so the network sits behind a mutex.
pub struct MlpRegressor<B: Backend> {
    model: Mutex<MlpNet<B>>,
    device: B::Device,
    input_dim: usize,
}

impl<B: Backend> MlpRegressor<B> {
    pub fn new(model: MlpNet<B>, device: B::Device, input_dim: usize) -> Self {
        MlpRegressor {
            model: Mutex::new(model),
            device,
            input_dim,
        }
    }

    pub fn load(device: B::Device, path: &Path, config: &MlpConfig) -> Result<Self>
    where
        B::FloatElem: serde::Serialize + serde::de::DeserializeOwned,
        B::IntElem: serde::Serialize + serde::de::DeserializeOwned,
    {
        let model = MlpNet::load(&device, path, config)?;
        Ok(Self::new(model, device, config.input_dim))
    }
}

impl<B: Backend> Regressor for MlpRegressor<B> {
    fn predict(&self, features: &FeatureVector) -> Result<f64> {
        if features.len() != self.input_dim {
            return Err(CovidError::FeatureMismatch {
                expected: format!("{} features", self.input_dim),
                found: format!("{} features", features.len()),
            });
        }

        let input = Tensor::<B, 1>::from_floats(features.to_f32_vec().as_slice(), &self.device)
            .reshape([1, self.input_dim]);

        let output = {
            let model = self
                .model
                .lock()
                .map_err(|_| CovidError::Model("Model lock poisoned".to_string()))?;
            model.forward(input)
        };

        let values = output
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| CovidError::Model(format!("Failed to read model output: {:?}", e)))?;
        let value = values
            .first()
            .copied()
            .ok_or_else(|| CovidError::Model("Model produced no output".to_string()))?;

        if !value.is_finite() {
            return Err(CovidError::Model(format!(
                "Model produced a non-finite value: {}",
                value
            )));
        }
        Ok(value as f64)
    }
}
