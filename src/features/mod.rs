//! Model input records
//!
//! Typed, ordered inputs for each model and the flat vector they lower into.

pub mod bounds;
pub mod case;
pub mod death;
pub mod vector;

pub use bounds::{FeatureRecord, FieldSpec};
pub use case::CaseFeatures;
pub use death::DeathFeatures;
pub use vector::FeatureVector;
