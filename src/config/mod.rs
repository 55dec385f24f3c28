use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::Context;

use crate::ml::TrainingParams;

const DEFAULT_TRACKING_URI: &str = "http://127.0.0.1:5500";
const DEFAULT_MODEL_NAME: &str = "fraud_detector";
const DEFAULT_EXPERIMENT: &str = "fraud_detection_project";
const DEFAULT_REGISTRY_TIMEOUT_SECS: u64 = 30;
const DEFAULT_TRAINING_DATA_PATH: &str = "data/training/df_training_current.csv";
const DEFAULT_SEED_DATA_PATH: &str = "data/df_training_current.csv";

/// Read `key`, falling back to `default` when unset. A set but malformed
/// value is an error rather than a silent fallback.
fn env_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value: {raw:?}")),
        _ => Ok(default),
    }
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Where models are tracked and which alias serves traffic.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    pub tracking_uri: String,
    pub tracking_token: Option<String>,
    pub model_name: String,
    pub alias: String,
    pub experiment_name: String,
    pub artifact_location: Option<String>,
    /// Per-request timeout for registry and artifact calls.
    pub timeout_secs: u64,
}

impl RegistryConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            tracking_uri: env::var("MLFLOW_TRACKING_URI").unwrap_or_else(|_| DEFAULT_TRACKING_URI.into()),
            tracking_token: env_opt("MLFLOW_TRACKING_TOKEN"),
            model_name: env::var("MODEL_NAME").unwrap_or_else(|_| DEFAULT_MODEL_NAME.into()),
            alias: env::var("MODEL_ALIAS").unwrap_or_else(|_| "prod".into()),
            experiment_name: env::var("MLFLOW_EXPERIMENT").unwrap_or_else(|_| DEFAULT_EXPERIMENT.into()),
            artifact_location: env_opt("MLFLOW_ARTIFACT_LOCATION"),
            timeout_secs: env_or("MLFLOW_TIMEOUT_SECS", DEFAULT_REGISTRY_TIMEOUT_SECS)?,
        })
    }
}

/// Scoring server configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// Bearer token required on scoring routes; `None` disables auth.
    pub api_token: Option<String>,
    pub registry: RegistryConfig,
    /// Seconds a resolved model is served before the alias is checked again.
    pub model_refresh_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env_or("PORT", 8000)?,
            api_token: env_opt("API_TOKEN"),
            registry: RegistryConfig::from_env()?,
            model_refresh_secs: env_or("MODEL_REFRESH_SECS", 300)?,
        })
    }
}

/// Retraining and bootstrap configuration.
#[derive(Debug, Clone)]
pub struct RetrainConfig {
    pub registry: RegistryConfig,
    /// Durable training dataset, overwritten by every run.
    pub training_data_path: PathBuf,
    /// Fallback dataset used when the durable one does not exist yet.
    pub seed_data_path: PathBuf,
    pub rebalance_ratio: f64,
    pub rebalance_seed: u64,
    pub test_fraction: f64,
    pub split_seed: u64,
    pub params: TrainingParams,
}

impl Default for RetrainConfig {
    fn default() -> Self {
        Self {
            registry: RegistryConfig {
                tracking_uri: DEFAULT_TRACKING_URI.into(),
                tracking_token: None,
                model_name: DEFAULT_MODEL_NAME.into(),
                alias: "prod".into(),
                experiment_name: DEFAULT_EXPERIMENT.into(),
                artifact_location: None,
                timeout_secs: DEFAULT_REGISTRY_TIMEOUT_SECS,
            },
            training_data_path: DEFAULT_TRAINING_DATA_PATH.into(),
            seed_data_path: DEFAULT_SEED_DATA_PATH.into(),
            rebalance_ratio: 0.25,
            rebalance_seed: 42,
            test_fraction: 0.2,
            split_seed: 42,
            params: TrainingParams::default(),
        }
    }
}

impl RetrainConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();
        let p = defaults.params;

        let params = TrainingParams {
            learning_rate: env_or("GBDT_LEARNING_RATE", p.learning_rate)?,
            max_depth: env_or("GBDT_MAX_DEPTH", p.max_depth)?,
            min_leaf_size: env_or("GBDT_MIN_LEAF_SIZE", p.min_leaf_size)?,
            subsample: env_or("GBDT_SUBSAMPLE", p.subsample)?,
            colsample: env_or("GBDT_COLSAMPLE", p.colsample)?,
            iterations: env_or("GBDT_ITERATIONS", p.iterations)?,
        };

        Ok(Self {
            registry: RegistryConfig::from_env()?,
            training_data_path: env_or("TRAINING_DATA_PATH", defaults.training_data_path)?,
            seed_data_path: env_or("SEED_DATA_PATH", defaults.seed_data_path)?,
            params,
            ..defaults
        })
    }
}
