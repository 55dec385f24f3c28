use thiserror::Error;

use crate::ml::evaluation::{f1_score, threshold_predictions};
use crate::ml::{stratified_split, Classifier, GbdtClassifier, ModelError, SplitError, TrainingParams};
use crate::models::ApplicationRecord;
use crate::scoring::features::{feature_names, feature_vector};

/// Cut used to turn evaluation probabilities into hard labels.
pub const DECISION_THRESHOLD: f64 = 0.25;

#[derive(Debug, Error)]
pub enum TrainingError {
    #[error("record {sk_id_curr} has no valid 0/1 TARGET")]
    Unlabeled { sk_id_curr: i64 },

    #[error(transparent)]
    Split(#[from] SplitError),

    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Split and model settings for one training run.
#[derive(Debug, Clone)]
pub struct TrainingPlan {
    pub params: TrainingParams,
    pub test_fraction: f64,
    pub split_seed: u64,
}

pub struct TrainedModel {
    pub classifier: GbdtClassifier,
    pub f1: f64,
    pub train_rows: usize,
    pub test_rows: usize,
}

/// Stratified split, fit on the training part, F1 at the decision
/// threshold on the held-out part. CPU bound; call off the async runtime.
pub fn train_and_evaluate(
    records: &[ApplicationRecord],
    plan: &TrainingPlan,
) -> Result<TrainedModel, TrainingError> {
    let labels = records
        .iter()
        .map(|r| {
            r.label()
                .ok_or(TrainingError::Unlabeled { sk_id_curr: r.sk_id_curr })
        })
        .collect::<Result<Vec<u8>, _>>()?;
    let rows: Vec<Vec<f64>> = records.iter().map(feature_vector).collect();

    let split = stratified_split(&labels, plan.test_fraction, plan.split_seed)?;
    let pick = |idx: &[usize]| -> (Vec<Vec<f64>>, Vec<u8>) {
        idx.iter().map(|&i| (rows[i].clone(), labels[i])).unzip()
    };
    let (x_train, y_train) = pick(&split.train);
    let (x_test, y_test) = pick(&split.test);

    tracing::info!(
        train_rows = x_train.len(),
        test_rows = x_test.len(),
        max_depth = plan.params.max_depth,
        iterations = plan.params.iterations,
        "Training gradient-boosted classifier"
    );
    let classifier = GbdtClassifier::fit(&plan.params, feature_names(), &x_train, &y_train)?;

    let probabilities = classifier.predict_proba(&x_test);
    let predicted = threshold_predictions(&probabilities, DECISION_THRESHOLD);
    let f1 = f1_score(&y_test, &predicted);
    tracing::info!(f1, "Model evaluated");

    Ok(TrainedModel {
        classifier,
        f1,
        train_rows: x_train.len(),
        test_rows: x_test.len(),
    })
}
