//! Offset natural-log transform

use crate::features::FeatureVector;
use crate::transform::LogOffsetTable;
use crate::{CovidError, Result};

/// `ln(value + offset)`, defined only for a positive argument
pub fn log_offset(feature: &str, value: f64, offset: f64) -> Result<f64> {
    let arg = value + offset;
    if !arg.is_finite() || arg <= 0.0 {
        return Err(CovidError::LogDomain {
            feature: feature.to_string(),
            value,
            offset,
        });
    }
    Ok(arg.ln())
}

/// Replace every feature named in `offsets` with its offset log.
///
/// Runs after differencing, so a feature that also has a baseline is
/// transformed from its differenced value.
pub fn apply_log(features: &FeatureVector, offsets: &LogOffsetTable) -> Result<FeatureVector> {
    let mut out = features.clone();

    for (name, offset) in offsets.iter() {
        let value = features.get(name)?;
        out.set(name, log_offset(name, value, offset)?)?;
    }

    Ok(out)
}
