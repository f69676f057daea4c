//! Inputs to the total imputed cases model

use serde::{Deserialize, Serialize};

use crate::features::{FeatureRecord, FieldSpec};
use crate::transform::BaselineTable;
use crate::PredictionTarget;

/// Last known cumulative values as of 21 April 2024
const FULLY_VACCINATED: f64 = 9327654.0;
const PARTIALLY_VACCINATED: f64 = 4663827.0;
const TOTAL_TESTS: f64 = 4166833.0;
const TOTAL_VACCINATIONS: f64 = 9982068.0;

/// One request to the total imputed cases model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CaseFeatures {
    #[serde(rename = "fullyVaccinated")]
    pub fully_vaccinated: f64,
    pub new_deaths_smoothed: f64,
    pub new_people_vaccinated_smoothed: f64,
    pub new_vaccinations_smoothed: f64,
    #[serde(rename = "partiallyVaccinated")]
    pub partially_vaccinated: f64,
    pub stringency_index: f64,
    #[serde(rename = "test24hours")]
    pub test_24_hours: f64,
    #[serde(rename = "totalTests")]
    pub total_tests: f64,
    #[serde(rename = "totalVaccinations")]
    pub total_vaccinations: f64,
    #[serde(rename = "vaccinated24hours")]
    pub vaccinated_24_hours: f64,
    /// 10 day rainfall (mm)
    pub rfh: f64,
    /// Rainfall 1-month rolling long term average (mm)
    pub r3h: f64,
    pub month: f64,
    pub day_of_week: f64,
}

impl CaseFeatures {
    /// Dimension of feature vector
    pub const DIM: usize = 14;

    /// Cumulative features differenced before inference
    pub fn default_baseline() -> BaselineTable {
        [
            ("fullyVaccinated", FULLY_VACCINATED),
            ("partiallyVaccinated", PARTIALLY_VACCINATED),
            ("totalTests", TOTAL_TESTS),
            ("totalVaccinations", TOTAL_VACCINATIONS),
        ]
        .into_iter()
        .collect()
    }
}

impl Default for CaseFeatures {
    fn default() -> Self {
        CaseFeatures {
            fully_vaccinated: FULLY_VACCINATED,
            new_deaths_smoothed: 0.0,
            new_people_vaccinated_smoothed: 0.0,
            new_vaccinations_smoothed: 0.0,
            partially_vaccinated: PARTIALLY_VACCINATED,
            stringency_index: 0.0,
            test_24_hours: 0.0,
            total_tests: TOTAL_TESTS,
            total_vaccinations: TOTAL_VACCINATIONS,
            vaccinated_24_hours: 0.0,
            rfh: 0.0,
            r3h: 0.0,
            month: 1.0,
            day_of_week: 0.0,
        }
    }
}

impl FeatureRecord for CaseFeatures {
    const TARGET: PredictionTarget = PredictionTarget::TotalCases;

    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::new(
            "fullyVaccinated",
            FULLY_VACCINATED,
            None,
            true,
            "Number of individuals who have completed the full vaccination regimen",
        ),
        FieldSpec::new(
            "new_deaths_smoothed",
            0.0,
            None,
            false,
            "New deaths attributed to COVID-19 (7-day smoothed)",
        ),
        FieldSpec::new(
            "new_people_vaccinated_smoothed",
            0.0,
            None,
            false,
            "Daily number of people receiving their first vaccine dose (7-day smoothed)",
        ),
        FieldSpec::new(
            "new_vaccinations_smoothed",
            0.0,
            None,
            false,
            "New vaccination doses administered (7-day smoothed)",
        ),
        FieldSpec::new(
            "partiallyVaccinated",
            PARTIALLY_VACCINATED,
            None,
            true,
            "Number of individuals with at least one dose but an incomplete regimen",
        ),
        FieldSpec::new(
            "stringency_index",
            0.0,
            Some(100.0),
            false,
            "Government response composite measure, 0 to 100 (100 = strictest)",
        ),
        FieldSpec::new(
            "test24hours",
            0.0,
            None,
            false,
            "Number of tests conducted in the last 24 hours",
        ),
        FieldSpec::new(
            "totalTests",
            TOTAL_TESTS,
            None,
            true,
            "Total number of tests for COVID-19",
        ),
        FieldSpec::new(
            "totalVaccinations",
            TOTAL_VACCINATIONS,
            None,
            true,
            "Total number of vaccination doses administered",
        ),
        FieldSpec::new(
            "vaccinated24hours",
            0.0,
            None,
            false,
            "Number of people vaccinated within a 24-hour period",
        ),
        FieldSpec::new("rfh", 0.0, None, false, "10 day rainfall in mm"),
        FieldSpec::new(
            "r3h",
            0.0,
            None,
            false,
            "Rainfall 1-month rolling aggregation long term average in mm",
        ),
        FieldSpec::new(
            "month",
            1.0,
            Some(12.0),
            true,
            "Month of the year, January = 1",
        ),
        FieldSpec::new(
            "day_of_week",
            0.0,
            Some(6.0),
            true,
            "Day of the week, Monday = 0",
        ),
    ];

    fn to_vec(&self) -> Vec<f64> {
        vec![
            self.fully_vaccinated,
            self.new_deaths_smoothed,
            self.new_people_vaccinated_smoothed,
            self.new_vaccinations_smoothed,
            self.partially_vaccinated,
            self.stringency_index,
            self.test_24_hours,
            self.total_tests,
            self.total_vaccinations,
            self.vaccinated_24_hours,
            self.rfh,
            self.r3h,
            self.month,
            self.day_of_week,
        ]
    }

    fn field_mut(&mut self, name: &str) -> Option<&mut f64> {
        let slot = match name {
            "fullyVaccinated" => &mut self.fully_vaccinated,
            "new_deaths_smoothed" => &mut self.new_deaths_smoothed,
            "new_people_vaccinated_smoothed" => &mut self.new_people_vaccinated_smoothed,
            "new_vaccinations_smoothed" => &mut self.new_vaccinations_smoothed,
            "partiallyVaccinated" => &mut self.partially_vaccinated,
            "stringency_index" => &mut self.stringency_index,
            "test24hours" => &mut self.test_24_hours,
            "totalTests" => &mut self.total_tests,
            "totalVaccinations" => &mut self.total_vaccinations,
            "vaccinated24hours" => &mut self.vaccinated_24_hours,
            "rfh" => &mut self.rfh,
            "r3h" => &mut self.r3h,
            "month" => &mut self.month,
            "day_of_week" => &mut self.day_of_week,
            _ => return None,
        };
        Some(slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CovidError;

    #[test]
    fn test_column_order() {
        assert_eq!(CaseFeatures::FIELDS.len(), CaseFeatures::DIM);
        assert_eq!(
            CaseFeatures::columns(),
            vec![
                "fullyVaccinated",
                "new_deaths_smoothed",
                "new_people_vaccinated_smoothed",
                "new_vaccinations_smoothed",
                "partiallyVaccinated",
                "stringency_index",
                "test24hours",
                "totalTests",
                "totalVaccinations",
                "vaccinated24hours",
                "rfh",
                "r3h",
                "month",
                "day_of_week",
            ]
        );
    }

    #[test]
    fn test_defaults_match_field_specs() {
        let features = CaseFeatures::default();
        let defaults: Vec<f64> = CaseFeatures::FIELDS.iter().map(|f| f.default).collect();
        assert_eq!(features.to_vec(), defaults);
        assert!(features.validate().is_ok());
    }

    #[test]
    fn test_every_column_is_settable() {
        let mut features = CaseFeatures::default();
        for spec in CaseFeatures::FIELDS {
            assert!(features.field_mut(spec.name).is_some(), "{}", spec.name);
        }
        assert!(features.field_mut("positive_rate").is_none());
    }

    #[test]
    fn test_set_checks_bounds() {
        let mut features = CaseFeatures::default();

        features.set("stringency_index", 42.5).unwrap();
        assert_eq!(features.stringency_index, 42.5);

        assert!(matches!(
            features.set("totalTests", 100.0),
            Err(CovidError::BelowMinimum { .. })
        ));
        assert!(matches!(
            features.set("day_of_week", 7.0),
            Err(CovidError::AboveMaximum { .. })
        ));
        assert!(matches!(
            features.set("imputed_active_cases", 1.0),
            Err(CovidError::UnknownFeature(_))
        ));
        // rejected values leave the record untouched
        assert_eq!(features.total_tests, TOTAL_TESTS);
    }

    #[test]
    fn test_from_json() {
        let features =
            CaseFeatures::from_json(r#"{"fullyVaccinated": 9400000, "month": 4, "rfh": 12.5}"#)
                .unwrap();

        assert_eq!(features.fully_vaccinated, 9400000.0);
        assert_eq!(features.month, 4.0);
        assert_eq!(features.rfh, 12.5);
        assert_eq!(features.total_tests, TOTAL_TESTS);
    }

    #[test]
    fn test_from_json_rejects_unknown_and_out_of_range() {
        assert!(CaseFeatures::from_json(r#"{"positive_rate": 0.1}"#).is_err());
        assert!(matches!(
            CaseFeatures::from_json(r#"{"month": 0}"#),
            Err(CovidError::BelowMinimum { .. })
        ));
    }

    #[test]
    fn test_feature_vector_follows_order() {
        let mut features = CaseFeatures::default();
        features.set("r3h", 0.75).unwrap();

        let vector = features.to_feature_vector();
        assert_eq!(vector.len(), CaseFeatures::DIM);
        assert_eq!(vector.columns()[11], "r3h");
        assert_eq!(vector.values()[11], 0.75);
    }

    #[test]
    fn test_default_baseline() {
        let baseline = CaseFeatures::default_baseline();
        assert_eq!(baseline.len(), 4);
        for (name, _) in baseline.iter() {
            assert!(CaseFeatures::spec(name).is_some(), "{}", name);
        }
    }
}
