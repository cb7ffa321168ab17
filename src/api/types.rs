//! API response and query types.

use serde::{Deserialize, Serialize};

use crate::market::{Bid, Imbalance};
use crate::sim::kpi::KpiReport;
use crate::sim::types::{PlantRecord, SimConfig, StepResult};

/// Combined state response: config, KPIs, and latest market record.
#[derive(Debug, Serialize)]
pub struct StateResponse {
    /// Simulation configuration.
    pub config: SimConfig,
    /// Aggregate KPI report.
    pub kpi: KpiReport,
    /// Most recent market record, absent for an empty run.
    pub latest_step: Option<TelemetryRecord>,
}

/// Market-level view of one tick, matching the market CSV columns.
#[derive(Debug, Clone, Serialize)]
pub struct TelemetryRecord {
    pub tick: usize,
    pub slot: usize,
    pub demand: f64,
    pub predicted_demand: f64,
    pub clearing_price: f64,
    pub predicted_price: f64,
    pub buying_price: f64,
    pub selling_price: f64,
    pub load_factor: f64,
    pub renewable_qty: f64,
    pub total_quota: f64,
    pub epsilon: f64,
    pub iterations: usize,
    pub converged: bool,
    pub imbalance: Option<Imbalance>,
}

impl From<&StepResult> for TelemetryRecord {
    fn from(r: &StepResult) -> Self {
        Self {
            tick: r.tick,
            slot: r.slot,
            demand: r.demand,
            predicted_demand: r.predicted_demand,
            clearing_price: r.clearing_price,
            predicted_price: r.predicted_price,
            buying_price: r.buying_price,
            selling_price: r.selling_price,
            load_factor: r.load_factor,
            renewable_qty: r.renewable_qty,
            total_quota: r.total_quota,
            epsilon: r.epsilon,
            iterations: r.iterations,
            converged: r.converged,
            imbalance: r.imbalance,
        }
    }
}

/// One plant's part in one tick.
#[derive(Debug, Clone, Serialize)]
pub struct PlantTick {
    pub tick: usize,
    pub slot: usize,
    pub clearing_price: f64,
    pub bid: Bid,
    pub quota: f64,
    pub scale: f64,
    pub revenue: f64,
    pub profit: f64,
    pub reward: Option<f64>,
}

impl PlantTick {
    /// Combines a plant record with the tick it belongs to.
    pub fn new(step: &StepResult, record: &PlantRecord) -> Self {
        Self {
            tick: step.tick,
            slot: step.slot,
            clearing_price: step.clearing_price,
            bid: record.bid,
            quota: record.quota,
            scale: record.scale,
            revenue: record.revenue,
            profit: record.profit,
            reward: record.reward,
        }
    }
}

/// Dispatch history of one plant.
#[derive(Debug, Serialize)]
pub struct PlantResponse {
    /// Plant identifier.
    pub plant_id: String,
    /// Sum of profits over the run.
    pub total_profit: f64,
    /// Per-tick records in tick order.
    pub ticks: Vec<PlantTick>,
}

/// Optional range query parameters for the telemetry endpoint.
#[derive(Debug, Deserialize)]
pub struct TelemetryQuery {
    /// Start tick (inclusive).
    pub from: Option<usize>,
    /// End tick (inclusive).
    pub to: Option<usize>,
}

/// Error response body for 4xx errors.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Human-readable error message.
    pub error: String,
}
