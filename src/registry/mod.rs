//! Model registry abstraction.
//!
//! The registry holds immutable, numbered model versions per model name,
//! each produced by a tracked run carrying params and metrics, plus mutable
//! aliases pointing at one version each. `MlflowClient` talks to an
//! MLflow-compatible tracking server; `InMemoryRegistry` keeps everything in
//! process and backs the tests.

pub mod memory;
pub mod mlflow;

use async_trait::async_trait;
use thiserror::Error;

pub use memory::InMemoryRegistry;
pub use mlflow::MlflowClient;

/// Metric key under which evaluation F1 is recorded.
pub const F1_METRIC: &str = "f1_score";

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("registry returned {status} {code}: {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    #[error("unexpected response: {0}")]
    Unexpected(String),
}

impl RegistryError {
    pub fn is_not_found(&self) -> bool {
        match self {
            RegistryError::NotFound(_) => true,
            RegistryError::Api { status, code, .. } => {
                *status == 404 || code == "RESOURCE_DOES_NOT_EXIST"
            }
            _ => false,
        }
    }
}

/// A registered model version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelVersion {
    pub name: String,
    pub version: u64,
    pub run_id: String,
    /// Artifact location of the serialized model.
    pub source: String,
}

/// Everything needed to record one trained model as a new version.
#[derive(Debug, Clone)]
pub struct NewModelVersion {
    pub model_name: String,
    pub run_name: String,
    pub params: Vec<(String, String)>,
    pub metrics: Vec<(String, f64)>,
    /// Serialized classifier.
    pub artifact: Vec<u8>,
}

#[async_trait]
pub trait ModelRegistry: Send + Sync {
    /// Track a run, store the artifact and register it as the next version.
    async fn register_version(&self, request: NewModelVersion) -> Result<ModelVersion, RegistryError>;

    /// Version currently holding `alias`, or `None` if the alias is unset.
    async fn version_by_alias(
        &self,
        model_name: &str,
        alias: &str,
    ) -> Result<Option<ModelVersion>, RegistryError>;

    /// Point `alias` at `version`, replacing any previous holder.
    async fn set_alias(&self, model_name: &str, alias: &str, version: u64) -> Result<(), RegistryError>;

    /// Metric recorded on a run, or `None` if it was never logged.
    async fn run_metric(&self, run_id: &str, key: &str) -> Result<Option<f64>, RegistryError>;

    /// Serialized classifier for a version.
    async fn download_model(&self, version: &ModelVersion) -> Result<Vec<u8>, RegistryError>;
}
