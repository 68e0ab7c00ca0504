//! Health check endpoints for container orchestration.
//!
//! Provides liveness and readiness checks:
//! - `/health/live` - Liveness check (restart if fails)
//! - `/health/ready` - Readiness check (remove from LB if fails)
//! - `/health` - Combined check

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::AppState;

/// Health status response.
#[derive(Debug, Serialize)]
pub struct HealthStatus {
    /// Overall status: "healthy" or "unhealthy"
    pub status: &'static str,
    /// Server version
    pub version: &'static str,
    /// Individual component checks
    pub checks: HealthChecks,
}

/// Individual health checks.
#[derive(Debug, Serialize)]
pub struct HealthChecks {
    /// Project repository accessible
    pub project_store: bool,
    /// Social image typeface loads with at least one face
    pub font_asset: bool,
}

/// Liveness check - is the server running?
#[tracing::instrument(name = "liveness_check")]
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

/// Readiness check - can the server render social images and serve projects?
#[tracing::instrument(name = "readiness_check", skip(state))]
pub async fn readiness(State(state): State<AppState>) -> (StatusCode, Json<HealthStatus>) {
    let store_ok = match state.store().health_check() {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Project store unavailable");
            false
        }
    };
    crate::metrics::set_projects_active(state.store().list().len());

    let font_ok = match state.load_font().await {
        Ok(_) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Social image font unavailable");
            false
        }
    };

    let all_ok = store_ok && font_ok;

    let status = HealthStatus {
        status: if all_ok { "healthy" } else { "unhealthy" },
        version: env!("CARGO_PKG_VERSION"),
        checks: HealthChecks {
            project_store: store_ok,
            font_asset: font_ok,
        },
    };

    let code = if all_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (code, Json(status))
}
