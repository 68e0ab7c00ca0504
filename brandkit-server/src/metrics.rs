//! Prometheus metrics for brandkit-server.
//!
//! Provides metrics collection and a Prometheus-compatible `/metrics` endpoint.

use metrics::{counter, gauge};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

const SOCIAL_RENDERS_TOTAL: &str = "brandkit_social_renders_total";
const SOCIAL_TIER_FAILURES_TOTAL: &str = "brandkit_social_tier_failures_total";
const RASTER_FAILURES_TOTAL: &str = "brandkit_raster_failures_total";
const EXPORTS_TOTAL: &str = "brandkit_exports_total";
const VALIDATION_FAILURES_TOTAL: &str = "brandkit_validation_failures_total";
const PROJECTS_ACTIVE: &str = "brandkit_projects_active";

/// Initialize metrics and return the Prometheus handle.
///
/// # Errors
///
/// Returns an error if the Prometheus recorder cannot be installed
/// (e.g., if another recorder is already installed).
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Record a finished social render.
///
/// # Arguments
///
/// * `tier` - Tier that produced the image, or `"none"` when all failed
/// * `success` - Whether any tier succeeded
pub fn record_social_render(tier: &str, success: bool) {
    counter!(
        SOCIAL_RENDERS_TOTAL,
        "tier" => tier.to_string(),
        "success" => success.to_string()
    )
    .increment(1);
}

/// Record a tier that failed and escalated.
pub fn record_tier_failure(tier: &str) {
    counter!(SOCIAL_TIER_FAILURES_TOTAL, "tier" => tier.to_string()).increment(1);
}

/// Record icon sizes that failed to rasterize during an export.
pub fn record_raster_failures(count: usize) {
    if count > 0 {
        counter!(RASTER_FAILURES_TOTAL).increment(count as u64);
    }
}

/// Record an export attempt.
///
/// # Arguments
///
/// * `outcome` - "success" or "failure"
pub fn record_export(outcome: &str) {
    counter!(EXPORTS_TOTAL, "outcome" => outcome.to_string()).increment(1);
}

/// Record an input validation failure.
///
/// # Arguments
///
/// * `validation_type` - Field that failed (name, svg, color, size, etc.)
pub fn record_validation_failure(validation_type: &str) {
    counter!(
        VALIDATION_FAILURES_TOTAL,
        "type" => validation_type.to_string()
    )
    .increment(1);
}

/// Update the stored project count.
#[allow(clippy::cast_precision_loss)]
pub fn set_projects_active(count: usize) {
    gauge!(PROJECTS_ACTIVE).set(count as f64);
}
