//! Core simulation types: configuration and per-tick records.

use std::fmt;

use serde::Serialize;

use crate::market::{Bid, Imbalance};

/// Centralized simulation configuration.
///
/// Windows, policies and the engine all take their timing parameters from
/// this struct; nothing is read from global state.
///
/// # Examples
///
/// ```
/// use power_market_sim::sim::types::SimConfig;
///
/// let cfg = SimConfig::new(24, 168, 7, 42);
/// assert_eq!(cfg.total_steps(), 168);
/// assert_eq!(cfg.history_weight, 0.9);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimConfig {
    /// Number of ticks in one cycle (e.g. 24 hourly slots).
    pub period: usize,
    /// Number of samples kept by the forecasting windows.
    pub window_size: usize,
    /// Number of cycles to simulate.
    pub days: usize,
    /// Master random seed for reproducibility.
    pub seed: u64,
    /// Weight of the past in the exponentially smoothed load factor.
    pub history_weight: f64,
}

impl SimConfig {
    /// Creates a new simulation configuration.
    ///
    /// # Arguments
    ///
    /// * `period` - Ticks per cycle (must be > 0)
    /// * `window_size` - Forecast window length in ticks (must be > 0)
    /// * `days` - Number of cycles to simulate (must be > 0)
    /// * `seed` - Master random seed
    ///
    /// # Panics
    ///
    /// Panics if `period`, `window_size` or `days` is zero.
    pub fn new(period: usize, window_size: usize, days: usize, seed: u64) -> Self {
        assert!(period > 0, "period must be > 0");
        assert!(window_size > 0, "window_size must be > 0");
        assert!(days > 0, "days must be > 0");
        Self {
            period,
            window_size,
            days,
            seed,
            history_weight: 0.9,
        }
    }

    /// Replaces the load-factor smoothing weight.
    pub fn with_history_weight(mut self, history_weight: f64) -> Self {
        self.history_weight = history_weight;
        self
    }

    /// Total number of ticks across all cycles.
    pub fn total_steps(&self) -> usize {
        self.period * self.days
    }
}

/// One plant's part in a tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlantRecord {
    /// Plant identifier.
    pub plant_id: String,
    /// Bid submitted for the tick.
    pub bid: Bid,
    /// Quantity dispatched.
    pub quota: f64,
    /// Markup of the tick's slot.
    pub scale: f64,
    /// `a * scale * q^2 + b * scale * q + c`.
    pub revenue: f64,
    /// `revenue - cost`.
    pub profit: f64,
    /// Reward settled while bidding, for the plant's previous dispatch.
    pub reward: Option<f64>,
}

/// Complete record of one tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepResult {
    /// Tick index.
    pub tick: usize,
    /// `tick % period`.
    pub slot: usize,
    /// Aggregate demand cleared.
    pub demand: f64,
    /// Same-slot forecast of demand made before the tick.
    pub predicted_demand: f64,
    /// Clearing price (final lambda).
    pub clearing_price: f64,
    /// Same-slot forecast of the price made before the tick.
    pub predicted_price: f64,
    /// `clearing_price * (1 - price_adjustment)`.
    pub buying_price: f64,
    /// `clearing_price * (1 + price_adjustment)`.
    pub selling_price: f64,
    /// Smoothed demand load factor seen by bidders.
    pub load_factor: f64,
    /// Sum of renewable bids.
    pub renewable_qty: f64,
    /// Sum of all quotas.
    pub total_quota: f64,
    /// Residual imbalance at exit.
    pub epsilon: f64,
    /// Lambda iterations run.
    pub iterations: usize,
    /// Whether clearing converged.
    pub converged: bool,
    /// Direction of the imbalance when clearing did not converge.
    pub imbalance: Option<Imbalance>,
    /// Per-plant breakdown, in configuration order.
    pub plants: Vec<PlantRecord>,
}

impl fmt::Display for StepResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "t={:>4} (slot {:>2}) | demand={:>8.2} (pred {:>8.2}) | price={:>9.3} \
             (pred {:>9.3}) | supplied={:>8.2} renewable={:>7.2} | iter={:>4} ok={}",
            self.tick,
            self.slot,
            self.demand,
            self.predicted_demand,
            self.clearing_price,
            self.predicted_price,
            self.total_quota,
            self.renewable_qty,
            self.iterations,
            self.converged,
        )?;
        if let Some(imbalance) = self.imbalance {
            write!(f, " ({imbalance:?})")?;
        }
        Ok(())
    }
}
