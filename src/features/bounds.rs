//! Input contracts for model features

use serde::de::DeserializeOwned;

use crate::features::FeatureVector;
use crate::{CovidError, PredictionTarget, Result};

/// Domain of a single user-entered feature
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSpec {
    /// Column name the model was trained with
    pub name: &'static str,
    pub min: f64,
    pub max: Option<f64>,
    /// Counts, calendar fields and other whole-number inputs
    pub integer: bool,
    /// Value used when the user leaves the field alone
    pub default: f64,
    pub help: &'static str,
}

impl FieldSpec {
    /// Field whose default sits at its minimum
    pub const fn new(
        name: &'static str,
        min: f64,
        max: Option<f64>,
        integer: bool,
        help: &'static str,
    ) -> Self {
        FieldSpec {
            name,
            min,
            max,
            integer,
            default: min,
            help,
        }
    }

    /// Reject values outside the field's domain
    pub fn check(&self, value: f64) -> Result<()> {
        if !value.is_finite() {
            return Err(CovidError::NonFinite {
                field: self.name.to_string(),
                value,
            });
        }
        if value < self.min {
            return Err(CovidError::BelowMinimum {
                field: self.name.to_string(),
                value,
                min: self.min,
            });
        }
        if let Some(max) = self.max {
            if value > max {
                return Err(CovidError::AboveMaximum {
                    field: self.name.to_string(),
                    value,
                    max,
                });
            }
        }
        if self.integer && value.fract() != 0.0 {
            return Err(CovidError::NotInteger {
                field: self.name.to_string(),
                value,
            });
        }
        Ok(())
    }
}

/// A fixed, ordered set of model inputs
///
/// Implementors list their fields in the exact column order the regressor
/// was fitted with; `to_vec` must follow the same order.
pub trait FeatureRecord: Default + Clone + DeserializeOwned + Send + Sync {
    /// Quantity the record's model predicts
    const TARGET: PredictionTarget;

    /// Field contracts in trained column order
    const FIELDS: &'static [FieldSpec];

    /// Values in trained column order
    fn to_vec(&self) -> Vec<f64>;

    fn field_mut(&mut self, name: &str) -> Option<&mut f64>;

    fn spec(name: &str) -> Option<&'static FieldSpec> {
        Self::FIELDS.iter().find(|f| f.name == name)
    }

    fn columns() -> Vec<&'static str> {
        Self::FIELDS.iter().map(|f| f.name).collect()
    }

    /// Set a field by column name, checking its bounds
    fn set(&mut self, name: &str, value: f64) -> Result<()> {
        let spec = Self::spec(name).ok_or_else(|| CovidError::UnknownFeature(name.to_string()))?;
        spec.check(value)?;
        let slot = self
            .field_mut(name)
            .ok_or_else(|| CovidError::UnknownFeature(name.to_string()))?;
        *slot = value;
        Ok(())
    }

    /// Check every field against its bounds
    fn validate(&self) -> Result<()> {
        Self::FIELDS
            .iter()
            .zip(self.to_vec())
            .try_for_each(|(spec, value)| spec.check(value))
    }

    /// Parse a JSON object keyed by column name; absent fields keep their defaults
    fn from_json(json: &str) -> Result<Self> {
        let record: Self = serde_json::from_str(json)?;
        record.validate()?;
        Ok(record)
    }

    fn to_feature_vector(&self) -> FeatureVector {
        FeatureVector::from_pairs(Self::FIELDS.iter().map(|f| f.name).zip(self.to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MONTH: FieldSpec = FieldSpec::new("month", 1.0, Some(12.0), true, "");
    const RATE: FieldSpec = FieldSpec::new("positive_rate", 0.0, None, false, "");

    #[test]
    fn test_check_bounds() {
        assert!(MONTH.check(1.0).is_ok());
        assert!(MONTH.check(12.0).is_ok());
        assert!(matches!(
            MONTH.check(0.0),
            Err(CovidError::BelowMinimum { .. })
        ));
        assert!(matches!(
            MONTH.check(13.0),
            Err(CovidError::AboveMaximum { .. })
        ));
    }

    #[test]
    fn test_check_integer_and_finite() {
        assert!(matches!(MONTH.check(2.5), Err(CovidError::NotInteger { .. })));
        assert!(RATE.check(0.125).is_ok());
        assert!(RATE.check(1e9).is_ok());
        assert!(matches!(
            RATE.check(f64::NAN),
            Err(CovidError::NonFinite { .. })
        ));
    }

    #[test]
    fn test_default_is_minimum() {
        assert_eq!(MONTH.default, 1.0);
        assert_eq!(RATE.default, 0.0);
    }
}
