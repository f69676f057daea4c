//! Stationarity transforms
//!
//! Reference tables and the transforms that map raw inputs into the
//! feature space the regressors were fitted on.

pub mod baseline;
pub mod difference;
pub mod logarithm;

pub use baseline::{BaselineTable, LogOffsetTable};
pub use difference::difference;
pub use logarithm::{apply_log, log_offset};
