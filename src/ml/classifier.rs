use gbdt::config::Config;
use gbdt::decision_tree::{Data, DataVec, ValueType};
use gbdt::gradient_boost::GBDT;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const ARTIFACT_FORMAT: &str = "gbdt-v1";

/// Binary classifier exposing positive-class probabilities.
pub trait Classifier: Send + Sync {
    fn predict_proba(&self, rows: &[Vec<f64>]) -> Vec<f64>;
}

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model artifact is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("unsupported model artifact format {0:?}")]
    Format(String),

    #[error("model expects features {expected:?}, schema provides {actual:?}")]
    FeatureMismatch {
        expected: Vec<String>,
        actual: Vec<String>,
    },

    #[error("cannot train on an empty dataset")]
    EmptyTrainingSet,
}

/// Boosting hyperparameters. Defaults are the production settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingParams {
    pub learning_rate: f32,
    pub max_depth: u32,
    pub min_leaf_size: usize,
    pub subsample: f64,
    pub colsample: f64,
    pub iterations: usize,
}

impl Default for TrainingParams {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            max_depth: 7,
            min_leaf_size: 25,
            subsample: 0.9,
            colsample: 0.6,
            iterations: 100,
        }
    }
}

impl TrainingParams {
    fn to_config(&self, feature_size: usize) -> Config {
        let mut cfg = Config::new();
        cfg.set_feature_size(feature_size);
        cfg.set_max_depth(self.max_depth);
        cfg.set_iterations(self.iterations);
        cfg.set_shrinkage(self.learning_rate);
        cfg.set_min_leaf_size(self.min_leaf_size);
        cfg.set_data_sample_ratio(self.subsample);
        cfg.set_feature_sample_ratio(self.colsample);
        // Log-likelihood loss expects labels in {-1, 1}.
        cfg.set_loss("LogLikelyhood");
        cfg
    }
}

/// Gradient-boosted tree ensemble plus the feature layout it was trained on.
#[derive(Serialize, Deserialize)]
pub struct GbdtClassifier {
    format: String,
    feature_names: Vec<String>,
    model: GBDT,
}

impl GbdtClassifier {
    /// Fit on `rows` with binary `labels` (0 or 1).
    pub fn fit(
        params: &TrainingParams,
        feature_names: Vec<String>,
        rows: &[Vec<f64>],
        labels: &[u8],
    ) -> Result<Self, ModelError> {
        if rows.is_empty() {
            return Err(ModelError::EmptyTrainingSet);
        }

        let mut data: DataVec = rows
            .iter()
            .zip(labels)
            .map(|(row, &label)| {
                let label = if label == 1 { 1.0 } else { -1.0 };
                Data::new_training_data(to_values(row), 1.0, label, None)
            })
            .collect();

        let mut model = GBDT::new(&params.to_config(feature_names.len()));
        model.fit(&mut data);

        Ok(Self {
            format: ARTIFACT_FORMAT.to_string(),
            feature_names,
            model,
        })
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, ModelError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decode an artifact and check it was trained on `expected_features`.
    pub fn from_bytes(bytes: &[u8], expected_features: &[String]) -> Result<Self, ModelError> {
        let classifier: Self = serde_json::from_slice(bytes)?;
        if classifier.format != ARTIFACT_FORMAT {
            return Err(ModelError::Format(classifier.format));
        }
        if classifier.feature_names != expected_features {
            return Err(ModelError::FeatureMismatch {
                expected: classifier.feature_names,
                actual: expected_features.to_vec(),
            });
        }
        Ok(classifier)
    }
}

impl Classifier for GbdtClassifier {
    fn predict_proba(&self, rows: &[Vec<f64>]) -> Vec<f64> {
        if rows.is_empty() {
            return Vec::new();
        }
        let data: DataVec = rows
            .iter()
            .map(|row| Data::new_test_data(to_values(row), None))
            .collect();

        self.model
            .predict(&data)
            .into_iter()
            .map(|p| f64::from(p).clamp(0.0, 1.0))
            .collect()
    }
}

fn to_values(row: &[f64]) -> Vec<ValueType> {
    row.iter().map(|&v| v as ValueType).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toy_dataset() -> (Vec<Vec<f64>>, Vec<u8>) {
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for i in 0..200 {
            let positive = i % 4 == 0;
            let signal = if positive { 10.0 } else { 0.0 };
            rows.push(vec![signal + (i % 7) as f64 * 0.1, (i % 3) as f64]);
            labels.push(u8::from(positive));
        }
        (rows, labels)
    }

    fn small_params() -> TrainingParams {
        TrainingParams {
            min_leaf_size: 5,
            iterations: 20,
            subsample: 1.0,
            colsample: 1.0,
            ..TrainingParams::default()
        }
    }

    fn names() -> Vec<String> {
        vec!["a".into(), "b".into()]
    }

    #[test]
    fn test_default_params() {
        let params = TrainingParams::default();
        assert_eq!(params.max_depth, 7);
        assert_eq!(params.min_leaf_size, 25);
        assert_eq!(params.iterations, 100);
    }

    #[test]
    fn test_fit_separates_classes() {
        let (rows, labels) = toy_dataset();
        let model = GbdtClassifier::fit(&small_params(), names(), &rows, &labels).unwrap();

        let probas = model.predict_proba(&[vec![10.0, 1.0], vec![0.0, 1.0]]);
        assert_eq!(probas.len(), 2);
        assert!(probas.iter().all(|p| (0.0..=1.0).contains(p)));
        assert!(probas[0] > probas[1]);
    }

    #[test]
    fn test_artifact_roundtrip_checks_features() {
        let (rows, labels) = toy_dataset();
        let model = GbdtClassifier::fit(&small_params(), names(), &rows, &labels).unwrap();
        let bytes = model.to_bytes().unwrap();

        let loaded = GbdtClassifier::from_bytes(&bytes, &names()).unwrap();
        let probe = vec![vec![10.0, 2.0]];
        assert_eq!(loaded.predict_proba(&probe), model.predict_proba(&probe));

        let other = vec!["a".to_string(), "c".to_string()];
        assert!(matches!(
            GbdtClassifier::from_bytes(&bytes, &other),
            Err(ModelError::FeatureMismatch { .. })
        ));
    }

    #[test]
    fn test_empty_training_set() {
        let res = GbdtClassifier::fit(&small_params(), names(), &[], &[]);
        assert!(matches!(res, Err(ModelError::EmptyTrainingSet)));
    }
}
