use std::path::Path;
use std::sync::Arc;

use anyhow::Context;

use crate::config::RetrainConfig;
use crate::dataset::{self, DatasetStore};
use crate::registry::{ModelRegistry, NewModelVersion, F1_METRIC};

use super::pipeline::train_blocking;
use super::trainer::{TrainingPlan, DECISION_THRESHOLD};

/// Result of registering the first production model.
#[derive(Debug, Clone, PartialEq)]
pub struct BootstrapOutcome {
    pub version: u64,
    pub f1: f64,
    pub seeded_rows: usize,
}

/// Train on the seed dataset, register the model, point the production
/// alias at it unconditionally and seed the durable training dataset.
pub async fn register_initial_model(
    registry: &dyn ModelRegistry,
    store: &dyn DatasetStore,
    config: &RetrainConfig,
    seed_file: &Path,
) -> anyhow::Result<BootstrapOutcome> {
    tracing::info!(path = %seed_file.display(), "Loading seed training data");
    let seed = dataset::read_csv_file(seed_file)
        .await
        .with_context(|| format!("cannot read seed dataset {}", seed_file.display()))?;
    let seed = Arc::new(seed);

    let plan = TrainingPlan {
        params: config.params.clone(),
        test_fraction: config.test_fraction,
        split_seed: config.split_seed,
    };
    let trained = train_blocking(Arc::clone(&seed), plan).await?;
    tracing::info!(f1 = trained.f1, "Logging initial model");

    let registry_cfg = &config.registry;
    let version = registry
        .register_version(NewModelVersion {
            model_name: registry_cfg.model_name.clone(),
            run_name: "initial_production_model".into(),
            params: vec![
                ("model_type".into(), "initial_gbdt".into()),
                ("threshold".into(), DECISION_THRESHOLD.to_string()),
            ],
            metrics: vec![(F1_METRIC.into(), trained.f1)],
            artifact: trained.classifier.to_bytes()?,
        })
        .await
        .context("failed to register the initial model")?;

    tracing::info!(version = version.version, alias = %registry_cfg.alias, "Promoting initial model");
    registry
        .set_alias(&registry_cfg.model_name, &registry_cfg.alias, version.version)
        .await
        .context("failed to assign the production alias")?;

    tracing::info!(location = %store.location(), "Seeding training dataset");
    store.save(&seed).await.context("failed to seed the training dataset")?;

    Ok(BootstrapOutcome {
        version: version.version,
        f1: trained.f1,
        seeded_rows: seed.len(),
    })
}
