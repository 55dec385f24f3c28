mod common;

use std::path::Path;
use std::sync::Arc;

use tempfile::TempDir;

use fraud_risk::config::RetrainConfig;
use fraud_risk::dataset::{read_csv_file, FileDatasetStore};
use fraud_risk::ml::TrainingParams;
use fraud_risk::registry::{InMemoryRegistry, ModelRegistry, NewModelVersion, F1_METRIC};
use fraud_risk::training::{register_initial_model, RetrainPipeline};

const MODEL: &str = "fraud_detector";
const ALIAS: &str = "prod";

fn test_config(dir: &Path) -> RetrainConfig {
    RetrainConfig {
        training_data_path: dir.join("training/df_training_current.csv"),
        seed_data_path: dir.join("seed.csv"),
        params: TrainingParams {
            min_leaf_size: 2,
            iterations: 10,
            ..TrainingParams::default()
        },
        ..RetrainConfig::default()
    }
}

/// 100-row seed (25 positive) and a 60-row month (10 positive) that
/// rebalances to 40 rows.
fn write_inputs(dir: &Path) -> std::path::PathBuf {
    common::write_csv(&dir.join("seed.csv"), &common::labeled_batch(1, 25, 75));
    let month = dir.join("2024_01.csv");
    common::write_csv(&month, &common::labeled_batch(1_000, 10, 50));
    month
}

async fn register_champion(registry: &InMemoryRegistry, f1: f64) -> u64 {
    let v = registry
        .register_version(NewModelVersion {
            model_name: MODEL.into(),
            run_name: "champion".into(),
            params: vec![],
            metrics: vec![(F1_METRIC.into(), f1)],
            artifact: vec![],
        })
        .await
        .unwrap();
    registry.set_alias(MODEL, ALIAS, v.version).await.unwrap();
    v.version
}

fn pipeline(registry: &Arc<InMemoryRegistry>, config: &RetrainConfig) -> RetrainPipeline {
    let store = Arc::new(FileDatasetStore::new(config.training_data_path.clone()));
    RetrainPipeline::new(registry.clone(), store, config.clone())
}

// ---- retraining ----

#[tokio::test]
async fn test_first_run_falls_back_to_seed_and_promotes() {
    let dir = TempDir::new().unwrap();
    let month = write_inputs(dir.path());
    let config = test_config(dir.path());
    let registry = Arc::new(InMemoryRegistry::new());

    let outcome = pipeline(&registry, &config).run(&month).await.unwrap();

    assert!(outcome.promoted);
    assert_eq!(outcome.champion_f1, None);
    assert_eq!(outcome.dataset_rows, 100 + 40);

    let prod = registry.version_by_alias(MODEL, ALIAS).await.unwrap().unwrap();
    assert_eq!(prod.version, outcome.version);
    assert_eq!(
        registry.run_metric(&prod.run_id, F1_METRIC).await.unwrap(),
        Some(outcome.f1)
    );

    let params = registry.run_params(&prod.run_id).await.unwrap();
    assert!(params.contains(&("month_file".into(), "2024_01.csv".into())));
    assert!(params.contains(&("threshold".into(), "0.25".into())));
    assert!(params.contains(&("max_depth".into(), "7".into())));

    let persisted = read_csv_file(&config.training_data_path).await.unwrap();
    assert_eq!(persisted.len(), 140);
}

#[tokio::test]
async fn test_second_run_grows_persisted_dataset() {
    let dir = TempDir::new().unwrap();
    let month = write_inputs(dir.path());
    let config = test_config(dir.path());
    let registry = Arc::new(InMemoryRegistry::new());
    let retrain = pipeline(&registry, &config);

    retrain.run(&month).await.unwrap();
    let outcome = retrain.run(&month).await.unwrap();

    assert_eq!(outcome.dataset_rows, 140 + 40);
    assert_eq!(registry.version_count(MODEL).await, 2);
    let persisted = read_csv_file(&config.training_data_path).await.unwrap();
    assert_eq!(persisted.len(), 180);
}

#[tokio::test]
async fn test_weaker_challenger_is_registered_but_not_promoted() {
    let dir = TempDir::new().unwrap();
    let month = write_inputs(dir.path());
    let config = test_config(dir.path());
    let registry = Arc::new(InMemoryRegistry::new());
    // F1 never exceeds 1.0, so nothing can beat this champion.
    let champion = register_champion(&registry, 1.0).await;

    let outcome = pipeline(&registry, &config).run(&month).await.unwrap();

    assert!(!outcome.promoted);
    assert_eq!(outcome.champion_f1, Some(1.0));
    assert_ne!(outcome.version, champion);
    assert_eq!(registry.version_count(MODEL).await, 2);

    let prod = registry.version_by_alias(MODEL, ALIAS).await.unwrap().unwrap();
    assert_eq!(prod.version, champion);

    // Data is persisted whether or not the model was promoted.
    assert!(config.training_data_path.exists());
}

#[tokio::test]
async fn test_better_challenger_moves_alias() {
    let dir = TempDir::new().unwrap();
    let month = write_inputs(dir.path());
    let config = test_config(dir.path());
    let registry = Arc::new(InMemoryRegistry::new());
    register_champion(&registry, -1.0).await;

    let outcome = pipeline(&registry, &config).run(&month).await.unwrap();

    assert!(outcome.promoted);
    let prod = registry.version_by_alias(MODEL, ALIAS).await.unwrap().unwrap();
    assert_eq!(prod.version, outcome.version);
}

#[tokio::test]
async fn test_existing_dataset_takes_precedence_over_seed() {
    let dir = TempDir::new().unwrap();
    let month = write_inputs(dir.path());
    let config = test_config(dir.path());
    std::fs::create_dir_all(config.training_data_path.parent().unwrap()).unwrap();
    common::write_csv(&config.training_data_path, &common::labeled_batch(5_000, 20, 30));
    let registry = Arc::new(InMemoryRegistry::new());

    let outcome = pipeline(&registry, &config).run(&month).await.unwrap();

    assert_eq!(outcome.dataset_rows, 50 + 40);
}

#[tokio::test]
async fn test_missing_month_file_is_fatal() {
    let dir = TempDir::new().unwrap();
    write_inputs(dir.path());
    let config = test_config(dir.path());
    let registry = Arc::new(InMemoryRegistry::new());

    let res = pipeline(&registry, &config)
        .run(&dir.path().join("missing.csv"))
        .await;

    assert!(res.is_err());
    assert_eq!(registry.version_count(MODEL).await, 0);
    assert!(!config.training_data_path.exists());
}

#[tokio::test]
async fn test_missing_seed_and_dataset_is_fatal() {
    let dir = TempDir::new().unwrap();
    let month = write_inputs(dir.path());
    let mut config = test_config(dir.path());
    config.seed_data_path = dir.path().join("nope.csv");
    let registry = Arc::new(InMemoryRegistry::new());

    assert!(pipeline(&registry, &config).run(&month).await.is_err());
    assert_eq!(registry.version_count(MODEL).await, 0);
}

// ---- bootstrap ----

#[tokio::test]
async fn test_register_initial_model() {
    let dir = TempDir::new().unwrap();
    write_inputs(dir.path());
    let config = test_config(dir.path());
    let registry = InMemoryRegistry::new();
    // The initial model is promoted even over an existing alias holder.
    register_champion(&registry, 1.0).await;
    let store = FileDatasetStore::new(config.training_data_path.clone());

    let outcome = register_initial_model(&registry, &store, &config, &config.seed_data_path)
        .await
        .unwrap();

    assert_eq!(outcome.seeded_rows, 100);
    let prod = registry.version_by_alias(MODEL, ALIAS).await.unwrap().unwrap();
    assert_eq!(prod.version, outcome.version);

    let params = registry.run_params(&prod.run_id).await.unwrap();
    assert!(params.contains(&("model_type".into(), "initial_gbdt".into())));

    let persisted = read_csv_file(&config.training_data_path).await.unwrap();
    assert_eq!(persisted.len(), 100);
}
