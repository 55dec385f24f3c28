use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use fraud_risk::config::RetrainConfig;
use fraud_risk::dataset::FileDatasetStore;
use fraud_risk::logging::init_tracing;
use fraud_risk::models::validate_schema;
use fraud_risk::registry::MlflowClient;
use fraud_risk::training::RetrainPipeline;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let [month_file] = args.as_slice() else {
        eprintln!("Usage: retrain <path_to_month_file.csv>");
        return Ok(ExitCode::FAILURE);
    };
    let month_file = PathBuf::from(month_file);

    dotenvy::dotenv().ok();
    init_tracing();
    validate_schema()?;

    let config = RetrainConfig::from_env()?;
    let registry = Arc::new(MlflowClient::from_config(&config.registry)?);
    let store = Arc::new(FileDatasetStore::new(config.training_data_path.clone()));

    let outcome = RetrainPipeline::new(registry, store, config)
        .run(&month_file)
        .await?;

    tracing::info!(
        version = outcome.version,
        f1 = outcome.f1,
        champion_f1 = outcome.champion_f1,
        promoted = outcome.promoted,
        dataset_rows = outcome.dataset_rows,
        "Retraining complete"
    );
    Ok(ExitCode::SUCCESS)
}
