use anyhow::Context;
use metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::models::RiskLevel;

/// Install the Prometheus exporter and register all application metrics.
/// Returns a `PrometheusHandle` whose `render()` method produces the
/// text/plain Prometheus scrape payload.
pub fn init_metrics() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .context("failed to install Prometheus recorder")?;
    register_metrics();
    Ok(handle)
}

/// Pre-register counters so they appear even before the first increment.
pub fn register_metrics() {
    counter!("predict_requests_total").absolute(0);
    counter!("model_loads_total").absolute(0);
    for level in [RiskLevel::LowRisk, RiskLevel::ModerateRisk, RiskLevel::HighRisk] {
        counter!("predictions_total", "risk_level" => level.as_str()).absolute(0);
    }

    // Histogram is lazily created on first record; force creation.
    histogram!("scoring_latency_seconds").record(0.0);
}
