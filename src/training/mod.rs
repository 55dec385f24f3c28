pub mod bootstrap;
pub mod pipeline;
pub mod promotion;
pub mod rebalance;
pub mod trainer;

pub use bootstrap::{register_initial_model, BootstrapOutcome};
pub use pipeline::{RetrainOutcome, RetrainPipeline};
pub use promotion::{current_champion, should_promote, Champion};
pub use rebalance::rebalance;
pub use trainer::{train_and_evaluate, TrainedModel, TrainingError, TrainingPlan, DECISION_THRESHOLD};
