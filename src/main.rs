use std::sync::Arc;
use std::time::Duration;

use fraud_risk::api::create_router;
use fraud_risk::config::AppConfig;
use fraud_risk::logging::init_tracing;
use fraud_risk::metrics::init_metrics;
use fraud_risk::models::validate_schema;
use fraud_risk::registry::MlflowClient;
use fraud_risk::scoring::ScoringService;
use fraud_risk::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    validate_schema()?;
    let config = AppConfig::from_env()?;
    let addr = format!("{}:{}", config.host, config.port);
    let metrics_handle = init_metrics()?;

    let registry = Arc::new(MlflowClient::from_config(&config.registry)?);
    let scoring = Arc::new(ScoringService::new(
        registry,
        &config.registry,
        Duration::from_secs(config.model_refresh_secs),
    ));

    // Warm the cache; a missing model is not fatal, /predict answers 503 until one appears.
    match scoring.classifier().await {
        Ok(_) => tracing::info!(
            model = %config.registry.model_name,
            alias = %config.registry.alias,
            "Production model ready"
        ),
        Err(e) => tracing::warn!(error = %e, "Production model not loaded at startup"),
    }

    if config.api_token.is_none() {
        tracing::warn!("API_TOKEN is not set, /predict is unauthenticated");
    }

    let state = AppState {
        config,
        scoring,
        metrics_handle,
    };
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {addr}");
    axum::serve(listener, router).await?;

    Ok(())
}
