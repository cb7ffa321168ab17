//! Lambda-iteration market clearing.

use serde::Serialize;
use tracing::{debug, warn};

use super::Bid;

/// Tunables of the lambda iteration.
#[derive(Debug, Clone, PartialEq)]
pub struct ClearingConfig {
    /// Largest residual imbalance accepted as converged.
    pub accuracy: f64,
    /// Starting imbalance. Must exceed `accuracy` in magnitude for the
    /// iteration to run.
    pub epsilon: f64,
    /// Starting price.
    pub lambda: f64,
    /// Price multiplier while demand is unmet.
    pub scale_up_factor: f64,
    /// Price multiplier while supply exceeds demand.
    pub scale_down_factor: f64,
    /// Iteration limit.
    pub stop_lock: usize,
}

impl Default for ClearingConfig {
    fn default() -> Self {
        Self {
            accuracy: 0.1,
            epsilon: 10.0,
            lambda: 10.0,
            scale_up_factor: 1.1,
            scale_down_factor: 0.9,
            stop_lock: 5000,
        }
    }
}

/// Direction of the imbalance left by a clearing that did not converge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Imbalance {
    /// Conventional capacity could not cover the residual demand.
    InsufficientPower,
    /// Conventional minimums exceed the residual demand.
    ExcessPower,
}

/// Outcome of one clearing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispatchResult {
    /// Final lambda.
    pub clearing_price: f64,
    /// Quota per bid, same order as the input.
    pub quotas: Vec<f64>,
    /// `|epsilon| <= accuracy` at exit.
    pub converged: bool,
    /// Iterations run.
    pub iterations: usize,
    /// Residual demand minus total conventional quota at exit.
    pub epsilon: f64,
    /// Sum of renewable `q_max`.
    pub renewable_qty: f64,
    /// Demand left for conventional plants, floored at their minimums.
    pub residual_demand: f64,
    /// Set when the iteration did not converge.
    pub imbalance: Option<Imbalance>,
}

impl DispatchResult {
    /// Sum of every quota.
    pub fn total_quota(&self) -> f64 {
        self.quotas.iter().sum()
    }

    /// Retail price paid to sellers: `clearing_price * (1 - adjustment)`.
    pub fn buying_price(&self, adjustment: f64) -> f64 {
        self.clearing_price * (1.0 - adjustment)
    }

    /// Retail price charged to buyers: `clearing_price * (1 + adjustment)`.
    pub fn selling_price(&self, adjustment: f64) -> f64 {
        self.clearing_price * (1.0 + adjustment)
    }
}

/// Clears bids against aggregate demand by lambda iteration.
///
/// Renewable bids are taken in full; the remaining demand is split among
/// conventional bids by raising or lowering a common price until the sum of
/// the quantities each bid offers at that price meets the residual demand.
///
/// # Examples
///
/// ```
/// use power_market_sim::market::{Bid, ClearingConfig, MarketClearingEngine};
///
/// let engine = MarketClearingEngine::new(ClearingConfig::default());
/// let bids = [Bid::renewable(50.0), Bid::new(1.0, 2.0, 0.0, 100.0)];
///
/// let result = engine.clear(&bids, 80.0);
/// assert!(result.converged);
/// assert_eq!(result.quotas[0], 50.0);
/// assert!((result.quotas[1] - 30.0).abs() <= 0.1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MarketClearingEngine {
    config: ClearingConfig,
}

impl MarketClearingEngine {
    /// Creates an engine with the given tunables.
    pub fn new(config: ClearingConfig) -> Self {
        Self { config }
    }

    /// Tunables in use.
    pub fn config(&self) -> &ClearingConfig {
        &self.config
    }

    /// Clears `bids` against `demand`.
    ///
    /// # Arguments
    ///
    /// * `bids` - One bid per plant
    /// * `demand` - Aggregate demand for the tick
    ///
    /// # Returns
    ///
    /// The clearing price and one quota per bid. A result that did not
    /// converge still carries the last quotas and price; the price is not
    /// clamped and may grow or shrink without bound.
    pub fn clear(&self, bids: &[Bid], demand: f64) -> DispatchResult {
        let cfg = &self.config;

        let mut renewable_qty = 0.0;
        let mut min_conventional_qty = 0.0;
        for bid in bids {
            if bid.is_renewable() {
                renewable_qty += bid.q_max;
            } else {
                min_conventional_qty += bid.q_min;
            }
        }
        let residual_demand = (demand - renewable_qty).max(min_conventional_qty);

        let mut quotas: Vec<f64> = bids
            .iter()
            .map(|bid| if bid.is_renewable() { bid.q_max } else { bid.q_min })
            .collect();
        let mut lambda = cfg.lambda;
        let mut epsilon = cfg.epsilon;
        let mut iterations = 0;

        while epsilon.abs() > cfg.accuracy && iterations < cfg.stop_lock {
            lambda *= if epsilon > 0.0 {
                cfg.scale_up_factor
            } else {
                cfg.scale_down_factor
            };

            let mut total = 0.0;
            for (quota, bid) in quotas.iter_mut().zip(bids) {
                if !bid.is_renewable() {
                    *quota = bid.quantity_at(lambda);
                    total += *quota;
                }
            }
            epsilon = residual_demand - total;
            iterations += 1;
        }

        let converged = epsilon.abs() <= cfg.accuracy;
        let imbalance = if converged {
            None
        } else if epsilon > 0.0 {
            Some(Imbalance::InsufficientPower)
        } else {
            Some(Imbalance::ExcessPower)
        };

        if let Some(kind) = imbalance {
            warn!(
                ?kind,
                demand, residual_demand, epsilon, lambda, iterations, "market did not clear"
            );
        } else {
            debug!(demand, lambda, iterations, "market cleared");
        }

        DispatchResult {
            clearing_price: lambda,
            quotas,
            converged,
            iterations,
            epsilon,
            renewable_qty,
            residual_demand,
            imbalance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> MarketClearingEngine {
        MarketClearingEngine::default()
    }

    #[test]
    fn retail_prices_spread_around_clearing_price() {
        let result = DispatchResult {
            clearing_price: 100.0,
            quotas: vec![10.0, 20.0],
            converged: true,
            iterations: 3,
            epsilon: 0.0,
            renewable_qty: 0.0,
            residual_demand: 30.0,
            imbalance: None,
        };
        assert_eq!(result.buying_price(0.05), 95.0);
        assert_eq!(result.selling_price(0.05), 105.0);
        assert_eq!(result.total_quota(), 30.0);
    }

    fn assert_within_bounds(bids: &[Bid], result: &DispatchResult) {
        for (bid, quota) in bids.iter().zip(&result.quotas) {
            if bid.is_renewable() {
                assert_eq!(*quota, bid.q_max);
            } else {
                assert!(*quota >= bid.q_min && *quota <= bid.q_max, "{quota} outside {bid:?}");
            }
        }
    }

    #[test]
    fn two_conventional_bids_meet_demand() {
        let bids = [Bid::new(1.0, 2.0, 0.0, 100.0), Bid::new(2.0, 0.0, 0.0, 50.0)];
        let result = engine().clear(&bids, 60.0);
        assert!(result.converged);
        assert!((result.total_quota() - 60.0).abs() <= 0.1);
        assert_within_bounds(&bids, &result);
        assert_eq!(result.imbalance, None);
    }

    #[test]
    fn renewable_taken_first() {
        let bids = [Bid::renewable(50.0), Bid::new(1.0, 2.0, 0.0, 100.0)];
        let result = engine().clear(&bids, 80.0);
        assert!(result.converged);
        assert_eq!(result.quotas[0], 50.0);
        assert_eq!(result.renewable_qty, 50.0);
        assert_eq!(result.residual_demand, 30.0);
        assert!((result.quotas[1] - 30.0).abs() <= 0.1);
        // (lambda - 2) / 2 = 30
        assert!((result.clearing_price - 62.0).abs() <= 0.2);
    }

    #[test]
    fn conventional_minimums_set_the_floor() {
        let bids = [Bid::new(1.0, 2.0, 20.0, 100.0), Bid::new(2.0, 0.0, 20.0, 50.0)];
        let result = engine().clear(&bids, 10.0);
        assert_eq!(result.residual_demand, 40.0);
        assert!(result.converged);
        assert_eq!(result.quotas, vec![20.0, 20.0]);
    }

    #[test]
    fn renewable_surplus_drives_conventional_to_minimum() {
        let bids = [Bid::renewable(100.0), Bid::new(1.0, 2.0, 0.0, 100.0)];
        let result = engine().clear(&bids, 50.0);
        assert_eq!(result.residual_demand, 0.0);
        assert!(result.converged);
        assert!(result.quotas[1] <= 0.1);
    }

    #[test]
    fn insufficient_capacity_is_flagged() {
        let bids = [Bid::new(1.0, 2.0, 0.0, 10.0), Bid::new(2.0, 0.0, 0.0, 10.0)];
        let result = engine().clear(&bids, 60.0);
        assert!(!result.converged);
        assert_eq!(result.iterations, 5000);
        assert_eq!(result.imbalance, Some(Imbalance::InsufficientPower));
        assert_eq!(result.quotas, vec![10.0, 10.0]);
        assert!((result.epsilon - 40.0).abs() < 1e-9);
    }

    #[test]
    fn no_conventional_bids_cannot_converge() {
        let bids = [Bid::renewable(30.0)];
        let result = engine().clear(&bids, 60.0);
        assert!(!result.converged);
        assert_eq!(result.quotas, vec![30.0]);
        assert_eq!(result.imbalance, Some(Imbalance::InsufficientPower));
    }

    #[test]
    fn quotas_clamped_for_mixed_bids() {
        let bids = [
            Bid::new(0.5, 10.0, 5.0, 80.0),
            Bid::new(1.0, 5.0, 0.0, 60.0),
            Bid::new(0.25, 20.0, 10.0, 120.0),
            Bid::renewable(15.0),
            Bid::new(0.0, 7.0, 4.0, 40.0),
        ];
        for demand in [0.0, 25.0, 100.0, 150.0, 250.0, 400.0] {
            let result = engine().clear(&bids, demand);
            assert_within_bounds(&bids, &result);
            assert_eq!(result.quotas[4], 4.0);
        }
    }

    #[test]
    fn empty_bid_list() {
        let result = engine().clear(&[], 0.0);
        assert!(result.quotas.is_empty());
        assert!(result.converged);
    }
}
