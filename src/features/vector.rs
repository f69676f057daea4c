//! Ordered feature vector handed to the regressors

use serde::Serialize;

use crate::{CovidError, Result};

/// One prediction request: feature values in trained column order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureVector {
    columns: Vec<String>,
    values: Vec<f64>,
}

impl FeatureVector {
    /// Build from parallel column and value lists
    pub fn new(columns: &[&str], values: Vec<f64>) -> Result<Self> {
        if columns.len() != values.len() {
            return Err(CovidError::FeatureMismatch {
                expected: format!("{} values", columns.len()),
                found: format!("{} values", values.len()),
            });
        }
        Ok(FeatureVector {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            values,
        })
    }

    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, f64)>) -> Self {
        let (columns, values) = pairs
            .into_iter()
            .map(|(name, value)| (name.to_string(), value))
            .unzip();
        FeatureVector { columns, values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub(crate) fn values_mut(&mut self) -> &mut [f64] {
        &mut self.values
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn get(&self, name: &str) -> Result<f64> {
        self.position(name)
            .map(|i| self.values[i])
            .ok_or_else(|| CovidError::MissingFeature(name.to_string()))
    }

    pub fn set(&mut self, name: &str, value: f64) -> Result<()> {
        let i = self
            .position(name)
            .ok_or_else(|| CovidError::MissingFeature(name.to_string()))?;
        self.values[i] = value;
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().copied())
    }

    /// Values narrowed to f32, the precision tree splits and burn tensors use
    pub fn to_f32_vec(&self) -> Vec<f32> {
        self.values.iter().map(|v| *v as f32).collect()
    }
}
