//! Post-hoc KPI computation from simulation results.

use std::fmt;

use serde::Serialize;

use super::types::StepResult;
use crate::market::Imbalance;

/// Aggregate key performance indicators derived from a complete simulation run.
///
/// Computed post-hoc from `Vec<StepResult>` to ensure consistency between
/// step data and reported metrics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpiReport {
    /// Number of ticks.
    pub ticks: usize,
    /// Mean clearing price.
    pub mean_price: f64,
    /// Highest clearing price.
    pub peak_price: f64,
    /// Population standard deviation of the clearing price.
    pub price_std_dev: f64,
    /// Share of ticks that cleared within accuracy.
    pub converged_pct: f64,
    /// Ticks that ended short of supply.
    pub insufficient_power_count: usize,
    /// Ticks that ended with surplus supply.
    pub excess_power_count: usize,
    /// Mean lambda iterations per tick.
    pub mean_iterations: f64,
    /// Sum of demand.
    pub total_demand: f64,
    /// Sum of dispatched quantity.
    pub total_supplied: f64,
    /// Renewable share of the dispatched quantity.
    pub renewable_share_pct: f64,
    /// Mean absolute error of the same-slot demand forecast, over ticks with
    /// a forecast.
    pub demand_forecast_mae: f64,
    /// Sum of plant profits.
    pub total_profit: f64,
}

impl KpiReport {
    /// Computes all KPIs from the complete step record vector.
    ///
    /// # Arguments
    ///
    /// * `results` - Complete simulation step results
    ///
    /// # Returns
    ///
    /// A `KpiReport` with all fields populated. Every field is 0 for an empty run.
    pub fn from_results(results: &[StepResult]) -> Self {
        if results.is_empty() {
            return Self {
                ticks: 0,
                mean_price: 0.0,
                peak_price: 0.0,
                price_std_dev: 0.0,
                converged_pct: 0.0,
                insufficient_power_count: 0,
                excess_power_count: 0,
                mean_iterations: 0.0,
                total_demand: 0.0,
                total_supplied: 0.0,
                renewable_share_pct: 0.0,
                demand_forecast_mae: 0.0,
                total_profit: 0.0,
            };
        }

        let n = results.len() as f64;
        let mut price_sum = 0.0;
        let mut peak_price = f64::NEG_INFINITY;
        let mut converged = 0_usize;
        let mut insufficient = 0_usize;
        let mut excess = 0_usize;
        let mut iterations = 0_usize;
        let mut total_demand = 0.0;
        let mut total_supplied = 0.0;
        let mut renewable = 0.0;
        let mut forecast_err_sum = 0.0;
        let mut forecast_count = 0_usize;
        let mut total_profit = 0.0;

        for r in results {
            price_sum += r.clearing_price;
            peak_price = peak_price.max(r.clearing_price);

            if r.converged {
                converged += 1;
            }
            match r.imbalance {
                Some(Imbalance::InsufficientPower) => insufficient += 1,
                Some(Imbalance::ExcessPower) => excess += 1,
                None => {}
            }
            iterations += r.iterations;

            total_demand += r.demand;
            total_supplied += r.total_quota;
            renewable += r.renewable_qty;

            // the first cycle has no same-slot history
            if r.tick != r.slot {
                forecast_err_sum += (r.demand - r.predicted_demand).abs();
                forecast_count += 1;
            }

            total_profit += r.plants.iter().map(|p| p.profit).sum::<f64>();
        }

        let mean_price = price_sum / n;

        Self {
            ticks: results.len(),
            mean_price,
            peak_price,
            price_std_dev: scaled_std_dev(results.iter().map(|r| r.clearing_price), mean_price),
            converged_pct: 100.0 * converged as f64 / n,
            insufficient_power_count: insufficient,
            excess_power_count: excess,
            mean_iterations: iterations as f64 / n,
            total_demand,
            total_supplied,
            renewable_share_pct: if total_supplied > 0.0 {
                100.0 * renewable / total_supplied
            } else {
                0.0
            },
            demand_forecast_mae: if forecast_count > 0 {
                forecast_err_sum / forecast_count as f64
            } else {
                0.0
            },
            total_profit,
        }
    }
}

/// Population standard deviation, scaled by the largest magnitude so that
/// prices from runaway clearings do not overflow when squared.
fn scaled_std_dev(values: impl Iterator<Item = f64> + Clone, mean: f64) -> f64 {
    let scale = values.clone().fold(0.0_f64, |m, v| m.max(v.abs()));
    if scale == 0.0 || !scale.is_finite() {
        return 0.0;
    }
    let (sum, count) = values.fold((0.0, 0_usize), |(sum, count), v| {
        let d = (v - mean) / scale;
        (sum + d * d, count + 1)
    });
    scale * (sum / count as f64).sqrt()
}

impl fmt::Display for KpiReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- KPI Report ---")?;
        writeln!(f, "Ticks:                 {}", self.ticks)?;
        writeln!(
            f,
            "Clearing price:        mean {:.3}, peak {:.3}, std {:.3}",
            self.mean_price, self.peak_price, self.price_std_dev
        )?;
        writeln!(
            f,
            "Converged:             {:.1}% (mean {:.1} iterations)",
            self.converged_pct, self.mean_iterations
        )?;
        writeln!(
            f,
            "Imbalances:            {} insufficient, {} excess",
            self.insufficient_power_count, self.excess_power_count
        )?;
        writeln!(
            f,
            "Energy:                {:.2} demanded, {:.2} supplied ({:.1}% renewable)",
            self.total_demand, self.total_supplied, self.renewable_share_pct
        )?;
        writeln!(f, "Demand forecast MAE:   {:.3}", self.demand_forecast_mae)?;
        write!(f, "Total plant profit:    {:.2}", self.total_profit)
    }
}
