//! Simulation engine that runs the bid, clear, dispatch loop.

use tracing::{debug, info};

use crate::forecast::{AdjustedWindowMax, Adjuster, PeriodicWindow};
use crate::market::{ClearingConfig, MarketClearingEngine, MarketSnapshot};
use crate::plant::{PlantError, PowerPlant};

use super::clock::Clock;
use super::demand::DemandProfile;
use super::types::{PlantRecord, SimConfig, StepResult};

/// Demand and price finalized at the end of a tick, fed to the windows at
/// the start of the next one.
#[derive(Debug, Clone, Copy)]
struct Observation {
    demand: f64,
    price: f64,
}

/// Simulation engine owning the market, the plants and the grid signals.
///
/// Ticks must be stepped in order starting at 0: the forecasting windows
/// keep their own tick counters and receive exactly one observation per tick.
pub struct Engine {
    config: SimConfig,
    market: MarketClearingEngine,
    price_adjustment: f64,
    demand: DemandProfile,
    plants: Vec<PowerPlant>,
    demand_window: AdjustedWindowMax,
    price_window: PeriodicWindow,
    load_factor: Option<f64>,
    pending: Option<Observation>,
}

impl Engine {
    /// Creates a new simulation engine.
    ///
    /// # Arguments
    ///
    /// * `config` - Simulation configuration
    /// * `clearing` - Lambda-iteration tunables
    /// * `price_adjustment` - Spread between buying and selling prices
    /// * `demand` - Aggregate demand source
    /// * `plants` - Participating plants, in bid order
    ///
    /// # Panics
    ///
    /// Panics if a plant's policy does not have one learner per slot.
    pub fn new(
        config: SimConfig,
        clearing: ClearingConfig,
        price_adjustment: f64,
        demand: DemandProfile,
        plants: Vec<PowerPlant>,
    ) -> Self {
        for plant in &plants {
            assert_eq!(
                plant.policy().period(),
                config.period,
                "plant `{}` has a policy for another period",
                plant.id()
            );
        }
        Self {
            demand_window: AdjustedWindowMax::new(
                config.period,
                config.window_size,
                Adjuster::Absolute,
            ),
            price_window: PeriodicWindow::from_config(&config),
            market: MarketClearingEngine::new(clearing),
            config,
            price_adjustment,
            demand,
            plants,
            load_factor: None,
            pending: None,
        }
    }

    /// Feeds the previous tick's observation into the windows.
    fn observe_previous(&mut self) {
        let Some(obs) = self.pending.take() else {
            return;
        };
        self.demand_window.add(obs.demand);
        self.price_window.add(obs.price);

        let raw = self.demand_window.load_factor();
        let h = self.config.history_weight;
        self.load_factor = Some(match self.load_factor {
            Some(old) => old * h + raw * (1.0 - h),
            None => raw,
        });
    }

    /// Grid signals as seen before the current tick is cleared.
    pub fn snapshot(&self) -> MarketSnapshot {
        MarketSnapshot {
            last_price: self.price_window.latest().unwrap_or(0.0),
            predicted_price: self.price_window.period_mean(1),
            mean_price: self.price_window.window_mean(),
            recent_demand: self.demand_window.window().recent_mean(),
            predicted_demand: self.demand_window.window().period_mean(1),
            load_factor: self.load_factor.unwrap_or(0.0),
        }
    }

    /// Executes one tick and returns its record.
    ///
    /// # Arguments
    ///
    /// * `t` - Tick index
    ///
    /// # Errors
    ///
    /// Returns [`PlantError`] if a plant rejects its quota.
    pub fn step(&mut self, t: usize) -> Result<StepResult, PlantError> {
        // 1. Grid signals from the previous tick
        self.observe_previous();
        let snapshot = self.snapshot();
        let demand = self.demand.demand_at(t);

        // 2. Settle last dispatch and collect bids
        let mut rewards = Vec::with_capacity(self.plants.len());
        let mut bids = Vec::with_capacity(self.plants.len());
        for plant in &mut self.plants {
            rewards.push(plant.settle());
            bids.push(plant.bid(t as u64, &snapshot));
        }

        // 3. Clear
        let dispatch = self.market.clear(&bids, demand);
        let price = dispatch.clearing_price;

        // 4. Dispatch quotas
        let mut records = Vec::with_capacity(self.plants.len());
        for (((plant, bid), quota), reward) in self
            .plants
            .iter_mut()
            .zip(bids)
            .zip(&dispatch.quotas)
            .zip(rewards)
        {
            let outcome = plant.execute(*quota)?;
            records.push(PlantRecord {
                plant_id: plant.id().to_string(),
                bid,
                quota: *quota,
                scale: outcome.scale,
                revenue: outcome.revenue,
                profit: outcome.profit(),
                reward,
            });
        }

        self.pending = Some(Observation { demand, price });

        let result = StepResult {
            tick: t,
            slot: t % self.config.period,
            demand,
            predicted_demand: snapshot.predicted_demand,
            clearing_price: price,
            predicted_price: snapshot.predicted_price,
            buying_price: dispatch.buying_price(self.price_adjustment),
            selling_price: dispatch.selling_price(self.price_adjustment),
            load_factor: snapshot.load_factor,
            renewable_qty: dispatch.renewable_qty,
            total_quota: dispatch.total_quota(),
            epsilon: dispatch.epsilon,
            iterations: dispatch.iterations,
            converged: dispatch.converged,
            imbalance: dispatch.imbalance,
            plants: records,
        };
        debug!(
            tick = t,
            demand,
            price,
            iterations = result.iterations,
            converged = result.converged,
            "tick cleared"
        );
        Ok(result)
    }

    /// Executes all ticks and returns the complete step record vector.
    ///
    /// Rewards of the final dispatch are settled before returning.
    ///
    /// # Errors
    ///
    /// Returns [`PlantError`] if a plant rejects its quota.
    pub fn run(&mut self) -> Result<Vec<StepResult>, PlantError> {
        let mut clock = Clock::new(self.config.period, self.config.days);
        info!(
            ticks = clock.remaining(),
            plants = self.plants.len(),
            seed = self.config.seed,
            "simulation started"
        );
        let mut results = Vec::with_capacity(clock.remaining());
        while let Some(tick) = clock.tick() {
            results.push(self.step(tick.index)?);
        }
        for plant in &mut self.plants {
            plant.settle();
        }
        let failed = results.iter().filter(|r| !r.converged).count();
        info!(ticks = results.len(), failed, "simulation finished");
        Ok(results)
    }

    /// Returns a reference to the simulation configuration.
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Participating plants.
    pub fn plants(&self) -> &[PowerPlant] {
        &self.plants
    }

    /// Demand history with its recent maximum.
    pub fn demand_window(&self) -> &AdjustedWindowMax {
        &self.demand_window
    }

    /// Clearing price history.
    pub fn price_window(&self) -> &PeriodicWindow {
        &self.price_window
    }
}
