use std::path::PathBuf;
use std::process::ExitCode;

use fraud_risk::config::RetrainConfig;
use fraud_risk::dataset::FileDatasetStore;
use fraud_risk::logging::init_tracing;
use fraud_risk::models::validate_schema;
use fraud_risk::registry::MlflowClient;
use fraud_risk::training::register_initial_model;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let [seed_file] = args.as_slice() else {
        eprintln!("Usage: register-initial <path_to_seed_file.csv>");
        return Ok(ExitCode::FAILURE);
    };
    let seed_file = PathBuf::from(seed_file);

    dotenvy::dotenv().ok();
    init_tracing();
    validate_schema()?;

    let config = RetrainConfig::from_env()?;
    let registry = MlflowClient::from_config(&config.registry)?;
    let store = FileDatasetStore::new(config.training_data_path.clone());

    let outcome = register_initial_model(&registry, &store, &config, &seed_file).await?;
    tracing::info!(
        version = outcome.version,
        f1 = outcome.f1,
        seeded_rows = outcome.seeded_rows,
        alias = %config.registry.alias,
        "Initial model registered and promoted"
    );
    Ok(ExitCode::SUCCESS)
}
