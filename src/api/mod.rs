//! REST API for simulation state and telemetry.
//!
//! Provides three GET endpoints:
//! - `/state` returns the run configuration, KPI report and latest tick
//! - `/telemetry` returns market records with optional range filtering
//! - `/plants/{id}` returns one plant's dispatch history

mod handlers;
mod types;

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tracing::info;

use crate::sim::kpi::KpiReport;
use crate::sim::types::{SimConfig, StepResult};

pub use types::{ErrorResponse, PlantResponse, PlantTick, StateResponse, TelemetryRecord};

/// Read-only application state shared across all request handlers.
///
/// Built once after the run completes, so no locking is needed.
pub struct AppState {
    /// Simulation configuration used for this run.
    pub config: SimConfig,
    /// Aggregate KPI report.
    pub kpi: KpiReport,
    /// Per-tick simulation results.
    pub results: Vec<StepResult>,
}

/// Builds the axum router with all API routes.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/state", get(handlers::get_state))
        .route("/telemetry", get(handlers::get_telemetry))
        .route("/plants/{id}", get(handlers::get_plant))
        .with_state(state)
}

/// Binds to the given address and serves the API until the server stops.
///
/// # Errors
///
/// Returns an `io::Error` if the listener cannot bind to `addr` or the
/// server fails.
pub async fn serve(state: Arc<AppState>, addr: SocketAddr) -> io::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "API server listening");
    axum::serve(listener, app).await
}
