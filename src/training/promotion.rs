use crate::registry::{ModelRegistry, ModelVersion, F1_METRIC};

/// The version currently serving and its recorded F1.
#[derive(Debug, Clone, PartialEq)]
pub struct Champion {
    pub version: ModelVersion,
    pub f1: f64,
}

/// Champion/challenger rule: strict improvement only. With no champion the
/// bar is negative infinity, so the first model always wins.
pub fn should_promote(challenger_f1: f64, champion_f1: Option<f64>) -> bool {
    challenger_f1 > champion_f1.unwrap_or(f64::NEG_INFINITY)
}

/// Resolve the alias holder and its F1. Any failure along the way means
/// "no champion"; it is logged and never aborts the run.
pub async fn current_champion(
    registry: &dyn ModelRegistry,
    model_name: &str,
    alias: &str,
) -> Option<Champion> {
    let version = match registry.version_by_alias(model_name, alias).await {
        Ok(Some(v)) => v,
        Ok(None) => {
            tracing::info!(model = model_name, alias, "No production model found to compare against");
            return None;
        }
        Err(e) => {
            tracing::warn!(model = model_name, alias, error = %e, "Champion lookup failed, treating as absent");
            return None;
        }
    };

    match registry.run_metric(&version.run_id, F1_METRIC).await {
        Ok(Some(f1)) => {
            tracing::info!(version = version.version, f1, "Current production model");
            Some(Champion { version, f1 })
        }
        Ok(None) => {
            tracing::warn!(version = version.version, "Production model has no recorded F1, treating as absent");
            None
        }
        Err(e) => {
            tracing::warn!(version = version.version, error = %e, "Champion metric lookup failed, treating as absent");
            None
        }
    }
}
