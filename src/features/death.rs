//! Inputs to the total deaths model

use serde::{Deserialize, Serialize};

use crate::features::{FeatureRecord, FieldSpec};
use crate::transform::{BaselineTable, LogOffsetTable};
use crate::PredictionTarget;

const FULLY_VACCINATED: f64 = 9327654.0;
const PARTIALLY_VACCINATED: f64 = 4663827.0;
const TOTAL_VACCINATIONS: f64 = 9982068.0;
const STRINGENCY_INDEX: f64 = 13.89;
const TESTS_PER_THOUSAND_OFFSET: f64 = 180.0;

/// One request to the total deaths model
///
/// Column order differs from [`CaseFeatures`](crate::features::CaseFeatures):
/// `day_of_week` precedes `month`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DeathFeatures {
    pub imputed_active_cases: f64,
    #[serde(rename = "fullyVaccinated")]
    pub fully_vaccinated: f64,
    pub new_vaccinations_smoothed: f64,
    #[serde(rename = "partiallyVaccinated")]
    pub partially_vaccinated: f64,
    pub stringency_index: f64,
    #[serde(rename = "test24hours")]
    pub test_24_hours: f64,
    #[serde(rename = "totalVaccinations")]
    pub total_vaccinations: f64,
    pub total_tests_per_thousand: f64,
    #[serde(rename = "vaccinated24hours")]
    pub vaccinated_24_hours: f64,
    pub positive_rate: f64,
    pub rfh: f64,
    pub r3h: f64,
    pub day_of_week: f64,
    pub month: f64,
}

impl DeathFeatures {
    pub const DIM: usize = 14;

    pub fn default_baseline() -> BaselineTable {
        [
            ("fullyVaccinated", FULLY_VACCINATED),
            ("partiallyVaccinated", PARTIALLY_VACCINATED),
            ("stringency_index", STRINGENCY_INDEX),
            ("totalVaccinations", TOTAL_VACCINATIONS),
        ]
        .into_iter()
        .collect()
    }

    pub fn default_log_offsets() -> LogOffsetTable {
        [("total_tests_per_thousand", TESTS_PER_THOUSAND_OFFSET)]
            .into_iter()
            .collect()
    }
}

impl Default for DeathFeatures {
    fn default() -> Self {
        DeathFeatures {
            imputed_active_cases: 0.0,
            fully_vaccinated: FULLY_VACCINATED,
            new_vaccinations_smoothed: 0.0,
            partially_vaccinated: PARTIALLY_VACCINATED,
            stringency_index: 0.0,
            test_24_hours: 0.0,
            total_vaccinations: TOTAL_VACCINATIONS,
            total_tests_per_thousand: 0.0,
            vaccinated_24_hours: 0.0,
            positive_rate: 0.0,
            rfh: 0.0,
            r3h: 0.0,
            day_of_week: 0.0,
            month: 1.0,
        }
    }
}

impl FeatureRecord for DeathFeatures {
    const TARGET: PredictionTarget = PredictionTarget::TotalDeaths;

    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::new(
            "imputed_active_cases",
            0.0,
            None,
            false,
            "Estimate of the number of active COVID-19 cases at a given time",
        ),
        FieldSpec::new(
            "fullyVaccinated",
            FULLY_VACCINATED,
            None,
            true,
            "Number of individuals who have completed the full vaccination regimen",
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
            true,
            "Number of tests conducted in the last 24 hours",
        ),
        FieldSpec::new(
            "totalVaccinations",
            TOTAL_VACCINATIONS,
            None,
            true,
            "Total number of vaccination doses administered",
        ),
        FieldSpec::new(
            "total_tests_per_thousand",
            0.0,
            None,
            false,
            "Total tests for COVID-19 per thousand people",
        ),
        FieldSpec::new(
            "vaccinated24hours",
            0.0,
            None,
            true,
            "Number of people vaccinated within a 24-hour period",
        ),
        FieldSpec::new(
            "positive_rate",
            0.0,
            None,
            false,
            "Share of tests that are positive, rolling 7-day average",
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
            "day_of_week",
            0.0,
            Some(6.0),
            true,
            "Day of the week, Monday = 0",
        ),
        FieldSpec::new(
            "month",
            1.0,
            Some(12.0),
            true,
            "Month of the year, January = 1",
        ),
    ];

    fn to_vec(&self) -> Vec<f64> {
        vec![
            self.imputed_active_cases,
            self.fully_vaccinated,
            self.new_vaccinations_smoothed,
            self.partially_vaccinated,
            self.stringency_index,
            self.test_24_hours,
            self.total_vaccinations,
            self.total_tests_per_thousand,
            self.vaccinated_24_hours,
            self.positive_rate,
            self.rfh,
            self.r3h,
            self.day_of_week,
            self.month,
        ]
    }

    fn field_mut(&mut self, name: &str) -> Option<&mut f64> {
        let slot = match name {
            "imputed_active_cases" => &mut self.imputed_active_cases,
            "fullyVaccinated" => &mut self.fully_vaccinated,
            "new_vaccinations_smoothed" => &mut self.new_vaccinations_smoothed,
            "partiallyVaccinated" => &mut self.partially_vaccinated,
            "stringency_index" => &mut self.stringency_index,
            "test24hours" => &mut self.test_24_hours,
            "totalVaccinations" => &mut self.total_vaccinations,
            "total_tests_per_thousand" => &mut self.total_tests_per_thousand,
            "vaccinated24hours" => &mut self.vaccinated_24_hours,
            "positive_rate" => &mut self.positive_rate,
            "rfh" => &mut self.rfh,
            "r3h" => &mut self.r3h,
            "day_of_week" => &mut self.day_of_week,
            "month" => &mut self.month,
            _ => return None,
        };
        Some(slot)
    }
}
