pub mod application;
pub mod numeric;
pub mod prediction;

pub use application::{validate_schema, ApplicationRecord, FieldName, SchemaError, FEATURE_FIELDS};
pub use prediction::{RiskLevel, RiskPrediction};
