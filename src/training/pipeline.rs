use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;

use crate::config::RetrainConfig;
use crate::dataset::{self, DatasetStore};
use crate::models::ApplicationRecord;
use crate::registry::{ModelRegistry, NewModelVersion, F1_METRIC};

use super::promotion::{current_champion, should_promote};
use super::rebalance::rebalance;
use super::trainer::{train_and_evaluate, TrainedModel, TrainingPlan, DECISION_THRESHOLD};

/// Summary of one retraining cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrainOutcome {
    pub version: u64,
    pub f1: f64,
    pub champion_f1: Option<f64>,
    pub promoted: bool,
    /// Rows in the dataset written back to the store.
    pub dataset_rows: usize,
}

/// One monthly retrain: rebalance the batch, merge, train, register,
/// champion/challenger, persist.
pub struct RetrainPipeline {
    registry: Arc<dyn ModelRegistry>,
    store: Arc<dyn DatasetStore>,
    config: RetrainConfig,
}

impl RetrainPipeline {
    pub fn new(
        registry: Arc<dyn ModelRegistry>,
        store: Arc<dyn DatasetStore>,
        config: RetrainConfig,
    ) -> Self {
        Self {
            registry,
            store,
            config,
        }
    }

    pub fn plan(&self) -> TrainingPlan {
        TrainingPlan {
            params: self.config.params.clone(),
            test_fraction: self.config.test_fraction,
            split_seed: self.config.split_seed,
        }
    }

    /// Durable dataset, or the seed dataset on the very first run.
    async fn load_base(&self) -> anyhow::Result<Vec<ApplicationRecord>> {
        tracing::info!(location = %self.store.location(), "Loading base training data");
        if let Some(records) = self.store.load().await? {
            return Ok(records);
        }

        let seed = &self.config.seed_data_path;
        tracing::warn!(
            seed = %seed.display(),
            "Base training data not found, starting from the seed dataset"
        );
        dataset::read_csv_file(seed)
            .await
            .with_context(|| format!("seed dataset {} is unavailable", seed.display()))
    }

    pub async fn run(&self, month_file: &Path) -> anyhow::Result<RetrainOutcome> {
        let base = self.load_base().await?;

        tracing::info!(path = %month_file.display(), "Loading new monthly data");
        let month = dataset::read_csv_file(month_file)
            .await
            .with_context(|| format!("cannot read monthly batch {}", month_file.display()))?;
        let month_rows = month.len();

        let balanced = rebalance(month, self.config.rebalance_ratio, self.config.rebalance_seed);
        tracing::info!(
            base_rows = base.len(),
            month_rows,
            balanced_rows = balanced.len(),
            "Merging monthly batch into training data"
        );

        let mut combined = base;
        combined.extend(balanced);
        let combined = Arc::new(combined);

        let trained = train_blocking(Arc::clone(&combined), self.plan()).await?;

        let month_name = month_file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let registry_cfg = &self.config.registry;
        let request = NewModelVersion {
            model_name: registry_cfg.model_name.clone(),
            run_name: format!("retrain_{}", Utc::now().format("%Y%m%d_%H%M%S")),
            params: vec![
                ("max_depth".into(), self.config.params.max_depth.to_string()),
                ("threshold".into(), DECISION_THRESHOLD.to_string()),
                ("month_file".into(), month_name),
            ],
            metrics: vec![(F1_METRIC.into(), trained.f1)],
            artifact: trained.classifier.to_bytes()?,
        };
        let version = self
            .registry
            .register_version(request)
            .await
            .context("failed to register the new model version")?;
        tracing::info!(version = version.version, f1 = trained.f1, "New model registered");

        let champion = current_champion(
            self.registry.as_ref(),
            &registry_cfg.model_name,
            &registry_cfg.alias,
        )
        .await;
        let champion_f1 = champion.as_ref().map(|c| c.f1);

        let promoted = should_promote(trained.f1, champion_f1);
        if promoted {
            tracing::info!(version = version.version, "New model is better, promoting");
            self.registry
                .set_alias(&registry_cfg.model_name, &registry_cfg.alias, version.version)
                .await
                .context("failed to move the production alias")?;
        } else {
            tracing::info!(
                version = version.version,
                f1 = trained.f1,
                champion_f1,
                "New model is not better than the production model, not promoting"
            );
        }

        self.store
            .save(&combined)
            .await
            .context("failed to persist the merged training data")?;

        Ok(RetrainOutcome {
            version: version.version,
            f1: trained.f1,
            champion_f1,
            promoted,
            dataset_rows: combined.len(),
        })
    }
}

/// Run training on the blocking pool so the runtime stays responsive.
pub(crate) async fn train_blocking(
    records: Arc<Vec<ApplicationRecord>>,
    plan: TrainingPlan,
) -> anyhow::Result<TrainedModel> {
    let trained = tokio::task::spawn_blocking(move || train_and_evaluate(&records, &plan))
        .await
        .context("training task panicked")??;
    Ok(trained)
}
