//! Online scoring: feature derivation, the risk policy and the cached
//! production model.

pub mod features;
pub mod policy;
pub mod service;

pub use features::{credit_to_income, feature_names, feature_vector};
pub use policy::{round_probability, score_records};
pub use service::{ModelDecoder, ScoringError, ScoringService};
