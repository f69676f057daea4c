//! Headline figures for the overview panel

use serde::Serialize;
use std::fmt;

use crate::data::CovidDataset;

/// Cumulative maxima over the selected date range
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct HeadlineMetrics {
    pub total_cases: Option<f64>,
    pub total_deaths: Option<f64>,
    pub total_tests: Option<f64>,
    pub total_vaccinations: Option<f64>,
    pub total_recoveries: Option<f64>,
}

impl HeadlineMetrics {
    pub fn from_dataset(data: &CovidDataset) -> Self {
        HeadlineMetrics {
            total_cases: data.max("imputed_total_cases"),
            total_deaths: data.max("imputed_total_deaths"),
            total_tests: data.max("totalTests"),
            total_vaccinations: data.max("totalVaccinations"),
            total_recoveries: data.max("imputed_total_recoveries"),
        }
    }

    /// (label, short form, exact form) per metric
    pub fn rows(&self) -> Vec<(&'static str, String, String)> {
        let row = |label, value: Option<f64>, short: fn(f64) -> String| match value {
            Some(v) => (label, short(v), intcomma(v)),
            None => (label, "n/a".to_string(), "n/a".to_string()),
        };
        vec![
            row("Total Cases", self.total_cases, millions),
            row("Total Deaths", self.total_deaths, thousands),
            row("Total Tests", self.total_tests, millions),
            row("Total Vaccinations", self.total_vaccinations, millions),
            row("Total Recoveries", self.total_recoveries, thousands),
        ]
    }
}

impl fmt::Display for HeadlineMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (label, short, exact) in self.rows() {
            writeln!(f, "  {:<20}{:>10}  ({})", label, short, exact)?;
        }
        Ok(())
    }
}

/// `12345678.0` → `"12.3 M"`
pub fn millions(value: f64) -> String {
    format!("{:.1} M", value / 1e6)
}

/// `4567.0` → `"4.6 K"`
pub fn thousands(value: f64) -> String {
    format!("{:.1} K", value / 1e3)
}

/// Whole part with thousands separators, `12345678.9` → `"12,345,678"`
pub fn intcomma(value: f64) -> String {
    let whole = value.trunc();
    let digits = format!("{:.0}", whole.abs());

    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if whole < 0.0 {
        out.push('-');
    }
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::dataset::tests::SAMPLE;

    #[test]
    fn test_formatting() {
        assert_eq!(millions(12_345_678.0), "12.3 M");
        assert_eq!(thousands(4_567.0), "4.6 K");
        assert_eq!(intcomma(12_345_678.9), "12,345,678");
        assert_eq!(intcomma(999.0), "999");
        assert_eq!(intcomma(1_000.0), "1,000");
        assert_eq!(intcomma(-1_234_567.0), "-1,234,567");
        assert_eq!(intcomma(0.0), "0");
    }

    #[test]
    fn test_headline_from_dataset() {
        let data = CovidDataset::from_reader(SAMPLE.as_bytes()).unwrap();
        let metrics = HeadlineMetrics::from_dataset(&data);

        assert_eq!(metrics.total_cases, Some(300.0));
        assert_eq!(metrics.total_deaths, Some(8.0));
        assert_eq!(metrics.total_tests, Some(2500.0));
        assert_eq!(metrics.total_vaccinations, Some(30.0));
        assert_eq!(metrics.total_recoveries, Some(250.0));

        let rows = metrics.rows();
        assert_eq!(rows[1], ("Total Deaths", "0.0 K".to_string(), "8".to_string()));
    }

    #[test]
    fn test_missing_columns() {
        let data = CovidDataset::from_reader("date,totalTests\n2021-01-01,5000000\n".as_bytes())
            .unwrap();
        let metrics = HeadlineMetrics::from_dataset(&data);

        assert_eq!(metrics.total_cases, None);
        assert_eq!(metrics.rows()[2].1, "5.0 M");
        assert_eq!(metrics.rows()[0].1, "n/a");
    }
}
