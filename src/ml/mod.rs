pub mod classifier;
pub mod evaluation;
pub mod split;

pub use classifier::{Classifier, GbdtClassifier, ModelError, TrainingParams};
pub use split::{stratified_split, Split, SplitError};
