//! Historical COVID-19 metrics loaded from the preprocessed CSV

use chrono::{NaiveDate, NaiveDateTime};
use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::path::Path;

use crate::{CovidError, Result};

/// Header pandas writes for an unnamed index column
const INDEX_HEADER: &str = "Unnamed: 0";

/// One dated row of metrics
#[derive(Debug, Clone, PartialEq)]
pub struct DailyRecord {
    pub date: NaiveDate,
    /// Raw date cell, written back unchanged on export
    pub date_raw: String,
    /// One value per metric column; blank cells are `None`
    pub values: Vec<Option<f64>>,
}

/// Dated metrics table
#[derive(Debug, Clone, PartialEq)]
pub struct CovidDataset {
    date_header: String,
    columns: Vec<String>,
    records: Vec<DailyRecord>,
}

impl CovidDataset {
    pub fn load(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path).map_err(|e| {
            CovidError::Io(std::io::Error::new(
                e.kind(),
                format!("{}: {}", path.display(), e),
            ))
        })?;
        let dataset = Self::from_reader(file)?;
        log::info!(
            "Loaded {} rows x {} columns from {}",
            dataset.len(),
            dataset.columns.len(),
            path.display()
        );
        Ok(dataset)
    }

    /// Parse CSV whose first column is the date
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv = csv::Reader::from_reader(reader);
        let headers = csv.headers()?.clone();

        let mut header_iter = headers.iter();
        let date_header = header_iter
            .next()
            .ok_or_else(|| CovidError::Parse("CSV has no columns".to_string()))?
            .to_string();
        if !date_header.is_empty() && date_header != INDEX_HEADER && date_header != "date" {
            log::warn!("Treating first column {:?} as the date", date_header);
        }
        let columns: Vec<String> = header_iter.map(str::to_string).collect();

        let mut records = Vec::new();
        for (line, row) in csv.records().enumerate() {
            let row = row?;
            let date_raw = row.get(0).unwrap_or_default().to_string();
            let date = parse_date(&date_raw).ok_or_else(|| {
                CovidError::Parse(format!("Row {}: invalid date {:?}", line + 1, date_raw))
            })?;

            let values = (1..=columns.len())
                .map(|i| parse_cell(row.get(i).unwrap_or_default()))
                .collect();

            records.push(DailyRecord {
                date,
                date_raw,
                values,
            });
        }

        Ok(CovidDataset {
            date_header,
            columns,
            records,
        })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn records(&self) -> &[DailyRecord] {
        &self.records
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    /// Earliest and latest dates
    pub fn date_span(&self) -> Option<(NaiveDate, NaiveDate)> {
        let min = self.records.iter().map(|r| r.date).min()?;
        let max = self.records.iter().map(|r| r.date).max()?;
        Some((min, max))
    }

    /// Rows dated within `start..=end`
    pub fn filter_range(&self, start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(CovidError::Parse(
                "Start date cannot be greater than end date".to_string(),
            ));
        }

        let filtered = self.retain(|date| date >= start && date <= end);
        if filtered.is_empty() {
            log::warn!("No data found between {} and {}", start, end);
        }
        Ok(filtered)
    }

    /// Rows within optional bounds; an omitted bound leaves that side open
    ///
    /// Only two explicit bounds can be out of order. A lone start after the
    /// last row, or a lone end before the first, selects nothing.
    pub fn select(&self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Result<Self> {
        if let (Some(start), Some(end)) = (from, to) {
            return self.filter_range(start, end);
        }

        let filtered = self.retain(|date| {
            !from.is_some_and(|start| date < start) && !to.is_some_and(|end| date > end)
        });
        if filtered.is_empty() && !self.is_empty() {
            log::warn!("No data found for the selected date range");
        }
        Ok(filtered)
    }

    fn retain(&self, keep: impl Fn(NaiveDate) -> bool) -> Self {
        CovidDataset {
            date_header: self.date_header.clone(),
            columns: self.columns.clone(),
            records: self
                .records
                .iter()
                .filter(|r| keep(r.date))
                .cloned()
                .collect(),
        }
    }

    /// Present values of one column
    pub fn values(&self, column: &str) -> Option<impl Iterator<Item = f64> + '_> {
        let i = self.column_index(column)?;
        Some(self.records.iter().filter_map(move |r| r.values[i]))
    }

    /// Largest value of a column, `None` if the column is absent or empty
    pub fn max(&self, column: &str) -> Option<f64> {
        self.values(column)?.reduce(f64::max)
    }

    /// Per-date sums of a column in date order
    pub fn series(&self, column: &str) -> Result<Vec<(NaiveDate, f64)>> {
        let i = self
            .column_index(column)
            .ok_or_else(|| CovidError::UnknownFeature(column.to_string()))?;

        let mut by_date: BTreeMap<NaiveDate, f64> = BTreeMap::new();
        for record in &self.records {
            if let Some(value) = record.values[i] {
                *by_date.entry(record.date).or_insert(0.0) += value;
            }
        }
        Ok(by_date.into_iter().collect())
    }

    /// Write the table back out with its original header
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv = csv::Writer::from_writer(writer);

        let mut header = Vec::with_capacity(self.columns.len() + 1);
        header.push(self.date_header.as_str());
        header.extend(self.columns.iter().map(String::as_str));
        csv.write_record(&header)?;

        for record in &self.records {
            let mut row = Vec::with_capacity(self.columns.len() + 1);
            row.push(record.date_raw.clone());
            row.extend(
                record
                    .values
                    .iter()
                    .map(|v| v.map(|v| v.to_string()).unwrap_or_default()),
            );
            csv.write_record(&row)?;
        }

        csv.flush()?;
        Ok(())
    }
}

/// `YYYY-MM-DD`, optionally followed by a time of day
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
}

fn parse_cell(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    raw.parse().ok().filter(|v: &f64| !v.is_nan())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const SAMPLE: &str = "\
,imputed_total_cases,imputed_total_deaths,totalTests,totalVaccinations,imputed_total_recoveries
2021-01-01,100,5,1000,,90
2021-01-02,150,6,1500,10,120
2021-01-02,10,1,100,0,5
2021-01-03 00:00:00,300,8,2500,30,250
";

    fn sample() -> CovidDataset {
        CovidDataset::from_reader(SAMPLE.as_bytes()).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse() {
        let data = sample();
        assert_eq!(data.len(), 4);
        assert_eq!(data.columns().len(), 5);
        assert_eq!(data.records()[3].date, date(2021, 1, 3));
        // blank cell is missing, not zero
        assert_eq!(data.records()[0].values[3], None);
        assert_eq!(data.date_span(), Some((date(2021, 1, 1), date(2021, 1, 3))));
    }

    #[test]
    fn test_bad_date() {
        let csv = "date,x\nnot-a-date,1\n";
        assert!(matches!(
            CovidDataset::from_reader(csv.as_bytes()),
            Err(CovidError::Parse(_))
        ));
    }

    #[test]
    fn test_filter_range() {
        let data = sample();

        let filtered = data.filter_range(date(2021, 1, 2), date(2021, 1, 3)).unwrap();
        assert_eq!(filtered.len(), 3);

        let empty = data.filter_range(date(2022, 1, 1), date(2022, 2, 1)).unwrap();
        assert!(empty.is_empty());
        assert_eq!(empty.max("totalTests"), None);

        assert!(data.filter_range(date(2021, 1, 3), date(2021, 1, 1)).is_err());
    }

    #[test]
    fn test_select_open_ended() {
        let data = sample();

        assert_eq!(data.select(None, None).unwrap(), data);
        assert_eq!(data.select(Some(date(2021, 1, 2)), None).unwrap().len(), 3);
        assert_eq!(data.select(None, Some(date(2021, 1, 1))).unwrap().len(), 1);

        // a lone bound past the data is an empty selection, not a reversed range
        assert!(data.select(Some(date(2022, 6, 1)), None).unwrap().is_empty());
        assert!(data.select(None, Some(date(2020, 1, 1))).unwrap().is_empty());

        assert!(data
            .select(Some(date(2021, 1, 3)), Some(date(2021, 1, 1)))
            .is_err());
        assert_eq!(
            data.select(Some(date(2021, 1, 1)), Some(date(2021, 1, 2)))
                .unwrap()
                .len(),
            3
        );
    }

    #[test]
    fn test_max_and_series() {
        let data = sample();
        assert_eq!(data.max("imputed_total_cases"), Some(300.0));
        assert_eq!(data.max("unknown"), None);

        let series = data.series("imputed_total_cases").unwrap();
        assert_eq!(
            series,
            vec![
                (date(2021, 1, 1), 100.0),
                (date(2021, 1, 2), 160.0),
                (date(2021, 1, 3), 300.0),
            ]
        );

        let vaccinations = data.series("totalVaccinations").unwrap();
        assert_eq!(vaccinations.len(), 2);
        assert!(data.series("reproduction_rate").is_err());
    }

    #[test]
    fn test_write_csv_keeps_header_and_cells() {
        let data = sample();
        let mut out = Vec::new();
        data.write_csv(&mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next().unwrap(), SAMPLE.lines().next().unwrap());
        assert_eq!(lines.next().unwrap(), "2021-01-01,100,5,1000,,90");

        let reread = CovidDataset::from_reader(text.as_bytes()).unwrap();
        assert_eq!(reread, data);
    }
}
