use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::sync::{Mutex, RwLock};

use crate::config::RegistryConfig;
use crate::ml::{Classifier, GbdtClassifier, ModelError};
use crate::models::{ApplicationRecord, RiskPrediction};
use crate::registry::{ModelRegistry, RegistryError};

use super::features::feature_names;
use super::policy::score_records;

/// Turns a downloaded artifact into a ready classifier.
pub type ModelDecoder =
    Arc<dyn Fn(&[u8]) -> Result<Arc<dyn Classifier>, ModelError> + Send + Sync>;

#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("no version of {model} holds alias {alias:?}")]
    NoProductionModel { model: String, alias: String },

    #[error("model registry unavailable: {0}")]
    Registry(#[from] RegistryError),

    #[error("model artifact rejected: {0}")]
    Model(#[from] ModelError),
}

struct CachedModel {
    version: u64,
    classifier: Arc<dyn Classifier>,
    checked_at: Instant,
}

/// Scores batches against the registry's production model.
///
/// Cache policy: the aliased model is resolved on first use and reused for
/// `refresh`. After that the next call asks the registry which version holds
/// the alias and downloads the artifact only if the version moved. When that
/// check fails the cached model keeps serving; with nothing cached the call
/// fails. A zero `refresh` checks the alias on every call.
pub struct ScoringService {
    registry: Arc<dyn ModelRegistry>,
    model_name: String,
    alias: String,
    refresh: Duration,
    decoder: ModelDecoder,
    cache: RwLock<Option<CachedModel>>,
    /// Held by the one task currently talking to the registry.
    refresh_guard: Mutex<()>,
}

impl ScoringService {
    pub fn new(registry: Arc<dyn ModelRegistry>, config: &RegistryConfig, refresh: Duration) -> Self {
        let expected = feature_names();
        let decoder: ModelDecoder = Arc::new(move |bytes: &[u8]| {
            let model = GbdtClassifier::from_bytes(bytes, &expected)?;
            Ok(Arc::new(model) as Arc<dyn Classifier>)
        });

        Self {
            registry,
            model_name: config.model_name.clone(),
            alias: config.alias.clone(),
            refresh,
            decoder,
            cache: RwLock::new(None),
            refresh_guard: Mutex::new(()),
        }
    }

    /// Replace the artifact decoder.
    pub fn with_decoder(mut self, decoder: ModelDecoder) -> Self {
        self.decoder = decoder;
        self
    }

    /// Version of the cached model, if one has been loaded.
    pub async fn loaded_version(&self) -> Option<u64> {
        self.cache.read().await.as_ref().map(|c| c.version)
    }

    pub async fn score(&self, records: &[ApplicationRecord]) -> Result<Vec<RiskPrediction>, ScoringError> {
        let classifier = self.classifier().await?;
        Ok(score_records(classifier.as_ref(), records))
    }

    /// Production classifier according to the cache policy.
    ///
    /// Registry calls run without holding the cache lock. While one task
    /// refreshes, other callers keep getting the cached model; they only
    /// wait when nothing has been loaded yet.
    pub async fn classifier(&self) -> Result<Arc<dyn Classifier>, ScoringError> {
        let stale = {
            let cache = self.cache.read().await;
            if let Some(hit) = self.fresh(cache.as_ref()) {
                return Ok(hit);
            }
            cache.as_ref().map(|c| Arc::clone(&c.classifier))
        };

        let _refreshing = match stale {
            Some(stale) => match self.refresh_guard.try_lock() {
                Ok(guard) => guard,
                Err(_) => return Ok(stale),
            },
            None => self.refresh_guard.lock().await,
        };

        // Another task may have refreshed while we waited for the guard.
        let cached_version = {
            let cache = self.cache.read().await;
            if let Some(hit) = self.fresh(cache.as_ref()) {
                return Ok(hit);
            }
            cache.as_ref().map(|c| c.version)
        };

        let resolved = self.resolve(cached_version).await;

        let mut cache = self.cache.write().await;
        match resolved {
            Ok(Some((version, classifier))) => {
                tracing::info!(model = %self.model_name, version, "Production model loaded");
                metrics::counter!("model_loads_total").increment(1);
                *cache = Some(CachedModel {
                    version,
                    classifier: Arc::clone(&classifier),
                    checked_at: Instant::now(),
                });
                Ok(classifier)
            }
            Ok(None) => {
                // Alias unchanged; the cached entry exists whenever this is returned.
                let entry = cache.as_mut().ok_or_else(|| ScoringError::NoProductionModel {
                    model: self.model_name.clone(),
                    alias: self.alias.clone(),
                })?;
                entry.checked_at = Instant::now();
                Ok(Arc::clone(&entry.classifier))
            }
            Err(e) => match cache.as_mut() {
                Some(entry) => {
                    tracing::warn!(
                        error = %e,
                        version = entry.version,
                        "Model refresh failed, serving cached model"
                    );
                    entry.checked_at = Instant::now();
                    Ok(Arc::clone(&entry.classifier))
                }
                None => Err(e),
            },
        }
    }

    fn fresh(&self, entry: Option<&CachedModel>) -> Option<Arc<dyn Classifier>> {
        entry
            .filter(|c| c.checked_at.elapsed() < self.refresh)
            .map(|c| Arc::clone(&c.classifier))
    }

    /// `Ok(None)` when the alias still points at `cached_version`.
    async fn resolve(
        &self,
        cached_version: Option<u64>,
    ) -> Result<Option<(u64, Arc<dyn Classifier>)>, ScoringError> {
        let version = self
            .registry
            .version_by_alias(&self.model_name, &self.alias)
            .await?
            .ok_or_else(|| ScoringError::NoProductionModel {
                model: self.model_name.clone(),
                alias: self.alias.clone(),
            })?;

        if cached_version == Some(version.version) {
            return Ok(None);
        }

        let bytes = self.registry.download_model(&version).await?;
        let classifier = (self.decoder)(&bytes)?;
        Ok(Some((version.version, classifier)))
    }
}
