pub mod api;
pub mod config;
pub mod dataset;
pub mod errors;
pub mod logging;
pub mod metrics;
pub mod ml;
pub mod models;
pub mod registry;
pub mod scoring;
pub mod training;

use std::sync::Arc;

use crate::config::AppConfig;
use crate::scoring::ScoringService;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub scoring: Arc<ScoringService>,
    pub metrics_handle: metrics_exporter_prometheus::PrometheusHandle,
}
