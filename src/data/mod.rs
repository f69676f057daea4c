//! Historical data
//!
//! Loading, date filtering, summary figures and CSV export for the
//! preprocessed metrics table.

pub mod dataset;
pub mod overview;

pub use dataset::CovidDataset;
pub use overview::HeadlineMetrics;
