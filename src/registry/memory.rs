use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{ModelRegistry, ModelVersion, NewModelVersion, RegistryError};

#[derive(Debug, Clone)]
struct StoredRun {
    params: Vec<(String, String)>,
    metrics: HashMap<String, f64>,
}

#[derive(Default)]
struct State {
    runs: HashMap<String, StoredRun>,
    versions: HashMap<String, Vec<(ModelVersion, Vec<u8>)>>,
    aliases: HashMap<(String, String), u64>,
}

/// Process-local registry with the same semantics as the tracking server.
#[derive(Default)]
pub struct InMemoryRegistry {
    state: Mutex<State>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of versions registered under `model_name`.
    pub async fn version_count(&self, model_name: &str) -> usize {
        let state = self.state.lock().await;
        state.versions.get(model_name).map_or(0, Vec::len)
    }

    /// Params logged on a run, in logging order.
    pub async fn run_params(&self, run_id: &str) -> Option<Vec<(String, String)>> {
        let state = self.state.lock().await;
        state.runs.get(run_id).map(|r| r.params.clone())
    }
}

#[async_trait]
impl ModelRegistry for InMemoryRegistry {
    async fn register_version(&self, request: NewModelVersion) -> Result<ModelVersion, RegistryError> {
        let mut state = self.state.lock().await;

        let run_id = format!("run-{}", state.runs.len() + 1);
        state.runs.insert(
            run_id.clone(),
            StoredRun {
                params: request.params,
                metrics: request.metrics.into_iter().collect(),
            },
        );

        let versions = state.versions.entry(request.model_name.clone()).or_default();
        let version = ModelVersion {
            name: request.model_name.clone(),
            version: versions.len() as u64 + 1,
            source: format!("memory:/{}/{}/model", request.model_name, run_id),
            run_id,
        };
        versions.push((version.clone(), request.artifact));

        Ok(version)
    }

    async fn version_by_alias(
        &self,
        model_name: &str,
        alias: &str,
    ) -> Result<Option<ModelVersion>, RegistryError> {
        let state = self.state.lock().await;
        let Some(&number) = state.aliases.get(&(model_name.to_string(), alias.to_string())) else {
            return Ok(None);
        };

        Ok(state
            .versions
            .get(model_name)
            .and_then(|v| v.iter().find(|(mv, _)| mv.version == number))
            .map(|(mv, _)| mv.clone()))
    }

    async fn set_alias(&self, model_name: &str, alias: &str, version: u64) -> Result<(), RegistryError> {
        let mut state = self.state.lock().await;
        let exists = state
            .versions
            .get(model_name)
            .is_some_and(|v| v.iter().any(|(mv, _)| mv.version == version));
        if !exists {
            return Err(RegistryError::NotFound(format!("{model_name} version {version}")));
        }

        state
            .aliases
            .insert((model_name.to_string(), alias.to_string()), version);
        Ok(())
    }

    async fn run_metric(&self, run_id: &str, key: &str) -> Result<Option<f64>, RegistryError> {
        let state = self.state.lock().await;
        let run = state
            .runs
            .get(run_id)
            .ok_or_else(|| RegistryError::NotFound(format!("run {run_id}")))?;
        Ok(run.metrics.get(key).copied())
    }

    async fn download_model(&self, version: &ModelVersion) -> Result<Vec<u8>, RegistryError> {
        let state = self.state.lock().await;
        state
            .versions
            .get(&version.name)
            .and_then(|v| v.iter().find(|(mv, _)| mv.version == version.version))
            .map(|(_, bytes)| bytes.clone())
            .ok_or_else(|| RegistryError::NotFound(format!("{} version {}", version.name, version.version)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::F1_METRIC;

    fn request(f1: f64) -> NewModelVersion {
        NewModelVersion {
            model_name: "fraud".into(),
            run_name: "test".into(),
            params: vec![("threshold".into(), "0.25".into())],
            metrics: vec![(F1_METRIC.into(), f1)],
            artifact: b"model".to_vec(),
        }
    }

    #[tokio::test]
    async fn test_versions_are_numbered() {
        let registry = InMemoryRegistry::new();
        let v1 = registry.register_version(request(0.5)).await.unwrap();
        let v2 = registry.register_version(request(0.6)).await.unwrap();

        assert_eq!(v1.version, 1);
        assert_eq!(v2.version, 2);
        assert_eq!(registry.version_count("fraud").await, 2);
        assert_eq!(registry.run_metric(&v2.run_id, F1_METRIC).await.unwrap(), Some(0.6));
        assert_eq!(registry.download_model(&v1).await.unwrap(), b"model");
    }

    #[tokio::test]
    async fn test_alias_moves() {
        let registry = InMemoryRegistry::new();
        assert!(registry.version_by_alias("fraud", "prod").await.unwrap().is_none());

        let v1 = registry.register_version(request(0.5)).await.unwrap();
        let v2 = registry.register_version(request(0.6)).await.unwrap();
        registry.set_alias("fraud", "prod", v1.version).await.unwrap();
        registry.set_alias("fraud", "prod", v2.version).await.unwrap();

        let holder = registry.version_by_alias("fraud", "prod").await.unwrap();
        assert_eq!(holder, Some(v2));
        assert!(registry.set_alias("fraud", "prod", 9).await.is_err());
    }
}
