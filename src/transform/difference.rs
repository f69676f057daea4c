//! Differencing against frozen reference values
//!
//! Cumulative counters drift over time; subtracting the last known value
//! recentres them on the state the model was fitted against.

use crate::features::FeatureVector;
use crate::transform::BaselineTable;

/// Subtract the baseline from every feature present in both `features` and
/// `baseline`. Other features pass through unchanged and baseline entries
/// with no matching feature are ignored.
pub fn difference(features: &FeatureVector, baseline: &BaselineTable) -> FeatureVector {
    let mut out = features.clone();

    for (name, reference) in baseline.iter() {
        match features.position(name) {
            Some(i) => out.values_mut()[i] -= reference,
            None => log::debug!("Baseline entry {} has no matching feature", name),
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FeatureVector {
        FeatureVector::from_pairs([
            ("fullyVaccinated", 9400000.0),
            ("new_deaths_smoothed", 3.5),
            ("totalTests", 4166833.0),
            ("month", 5.0),
        ])
    }

    #[test]
    fn test_subtracts_intersection_only() {
        let baseline: BaselineTable = [
            ("fullyVaccinated", 9327654.0),
            ("totalTests", 4166833.0),
            ("partiallyVaccinated", 4663827.0),
        ]
        .into_iter()
        .collect();

        let input = sample();
        let out = difference(&input, &baseline);

        assert_eq!(out.get("fullyVaccinated").unwrap(), 9400000.0 - 9327654.0);
        assert_eq!(out.get("totalTests").unwrap(), 0.0);
        assert_eq!(out.get("new_deaths_smoothed").unwrap(), 3.5);
        assert_eq!(out.get("month").unwrap(), 5.0);
        // baseline-only names are not added
        assert!(!out.contains("partiallyVaccinated"));
        assert_eq!(out.columns(), input.columns());
    }

    #[test]
    fn test_empty_baseline_is_identity() {
        let input = sample();
        let out = difference(&input, &BaselineTable::new());
        assert_eq!(out, input);
    }

    #[test]
    fn test_input_and_table_untouched() {
        let baseline: BaselineTable = [("month", 1.0)].into_iter().collect();
        let before = baseline.clone();
        let input = sample();

        let _ = difference(&input, &baseline);

        assert_eq!(baseline, before);
        assert_eq!(input, sample());
    }
}
