//! Per-plant bidding and dispatch.

use rand::{SeedableRng, rngs::StdRng};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use super::QuantitySource;
use crate::learning::BidPolicy;
use crate::market::{Bid, MarketSnapshot};

/// Misuse of the bid/execute protocol.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlantError {
    /// `execute` was called without a bid awaiting dispatch.
    #[error("plant `{id}` has no outstanding bid to execute")]
    NoOutstandingBid {
        /// Plant identifier.
        id: String,
    },
}

/// Static description of a plant.
#[derive(Debug, Clone)]
pub struct PlantSpec {
    /// Unique identifier.
    pub id: String,
    /// Quadratic cost coefficient.
    pub a: f64,
    /// Linear cost coefficient.
    pub b: f64,
    /// Fixed cost.
    pub c: f64,
    /// Source of the lower production limit.
    pub min_quantity: QuantitySource,
    /// Source of the upper production limit.
    pub max_quantity: QuantitySource,
    /// Starting markup per slot.
    pub scaling_factors: Vec<f64>,
}

/// Where a plant is within the current tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickPhase {
    /// Nothing pending.
    Idle,
    /// A bid is out and awaiting its quota.
    BidRequested {
        /// The cached bid.
        bid: Bid,
        /// Slot the bid was built for.
        slot: usize,
        /// Action chosen for the bid.
        action: usize,
    },
    /// A quota was received; the reward is settled on the next bid.
    Dispatched {
        /// Slot the quota was dispatched in.
        slot: usize,
        /// Action that produced the bid.
        action: usize,
        /// Dispatched quantity.
        quantity: f64,
    },
}

/// What a plant earned from one quota.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PlantDispatch {
    /// Dispatched quantity.
    pub quantity: f64,
    /// Markup applied to the bid.
    pub scale: f64,
    /// `a * scale * q^2 + b * scale * q + c`.
    pub revenue: f64,
    /// `a * q^2 + b * q + c`.
    pub cost: f64,
}

impl PlantDispatch {
    /// `revenue - cost`.
    pub fn profit(&self) -> f64 {
        self.revenue - self.cost
    }
}

/// A generator that bids into the market and learns its markup.
///
/// Each tick follows `bid` then `execute`. The bid is cached until executed,
/// and the reward for a dispatch is fed to the policy lazily when the next bid
/// is requested (or on [`settle`](Self::settle)).
///
/// # Examples
///
/// ```
/// use power_market_sim::learning::{BidPolicy, PolicyConfig};
/// use power_market_sim::market::MarketSnapshot;
/// use power_market_sim::plant::{PlantSpec, PowerPlant, QuantityConfig, QuantitySource};
///
/// let spec = PlantSpec {
///     id: "coal".to_string(),
///     a: 0.01,
///     b: 20.0,
///     c: 100.0,
///     min_quantity: QuantitySource::new(&QuantityConfig::constant(10.0)).unwrap(),
///     max_quantity: QuantitySource::new(&QuantityConfig::constant(80.0)).unwrap(),
///     scaling_factors: vec![1.0; 24],
/// };
/// let policy = BidPolicy::new(&PolicyConfig::default(), 24);
/// let mut plant = PowerPlant::new(spec, policy, 42);
///
/// let market = MarketSnapshot::default();
/// let bid = plant.bid(0, &market);
/// assert_eq!(plant.bid(0, &market), bid);
///
/// let dispatch = plant.execute(40.0).unwrap();
/// assert_eq!(dispatch.quantity, 40.0);
/// assert!(plant.execute(40.0).is_err());
/// ```
#[derive(Debug, Clone)]
pub struct PowerPlant {
    spec: PlantSpec,
    policy: BidPolicy,
    phase: TickPhase,
    last_reward: Option<f64>,
    rng: StdRng,
}

impl PowerPlant {
    /// Creates a plant.
    ///
    /// # Arguments
    ///
    /// * `spec` - Costs, production limits and starting markups
    /// * `policy` - Learner set with one learner per slot
    /// * `seed` - Seed for the plant's own random stream
    ///
    /// # Panics
    ///
    /// Panics if `spec.scaling_factors` does not have one entry per policy slot.
    pub fn new(spec: PlantSpec, policy: BidPolicy, seed: u64) -> Self {
        assert_eq!(
            spec.scaling_factors.len(),
            policy.period(),
            "scaling_factors needs one entry per slot"
        );
        Self {
            spec,
            policy,
            phase: TickPhase::Idle,
            last_reward: None,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Plant identifier.
    pub fn id(&self) -> &str {
        &self.spec.id
    }

    /// Static description.
    pub fn spec(&self) -> &PlantSpec {
        &self.spec
    }

    /// Current markup of `slot`.
    pub fn scaling_factor(&self, slot: usize) -> f64 {
        self.spec.scaling_factors[slot]
    }

    /// Learner set.
    pub fn policy(&self) -> &BidPolicy {
        &self.policy
    }

    /// Current protocol phase.
    pub fn phase(&self) -> TickPhase {
        self.phase
    }

    /// Reward settled most recently.
    pub fn last_reward(&self) -> Option<f64> {
        self.last_reward
    }

    /// Profit of dispatching `quantity` at the markup `scale`.
    pub fn reward(&self, scale: f64, quantity: f64) -> f64 {
        (scale - 1.0) * (self.spec.a * quantity * quantity + self.spec.b * quantity)
    }

    /// Feeds the pending dispatch back to the policy.
    ///
    /// # Returns
    ///
    /// The reward learned, or `None` when nothing was pending.
    pub fn settle(&mut self) -> Option<f64> {
        let TickPhase::Dispatched {
            slot,
            action,
            quantity,
        } = self.phase
        else {
            return None;
        };
        let reward = self.reward(self.spec.scaling_factors[slot], quantity);
        self.policy.learn(slot, action, reward);
        self.phase = TickPhase::Idle;
        self.last_reward = Some(reward);
        Some(reward)
    }

    /// Returns the plant's bid for `tick`.
    ///
    /// Repeated calls before [`execute`](Self::execute) return the cached bid.
    /// Otherwise the previous dispatch is settled, a new action is drawn for
    /// the tick's slot and applied to that slot's markup, and fresh production
    /// limits are sampled. When the sampled minimum exceeds the maximum both
    /// take their average.
    pub fn bid(&mut self, tick: u64, market: &MarketSnapshot) -> Bid {
        if let TickPhase::BidRequested { bid, .. } = self.phase {
            return bid;
        }
        self.settle();

        let slot = (tick % self.policy.period() as u64) as usize;
        let action = self.policy.select_action(slot, &mut self.rng);
        let scale = &mut self.spec.scaling_factors[slot];
        *scale *= 1.0 + self.policy.action_delta(action);
        let scale = *scale;

        let mut q_min = self.spec.min_quantity.sample(tick, market, &mut self.rng);
        let mut q_max = self.spec.max_quantity.sample(tick, market, &mut self.rng);
        if q_min > q_max {
            let mid = (q_min + q_max) / 2.0;
            q_min = mid;
            q_max = mid;
        }

        let bid = Bid::new(self.spec.a * scale, self.spec.b * scale, q_min, q_max);
        debug!(plant = %self.spec.id, tick, slot, action, scale, "bid");
        self.phase = TickPhase::BidRequested { bid, slot, action };
        bid
    }

    /// Accepts the quota for the outstanding bid.
    ///
    /// # Errors
    ///
    /// Returns [`PlantError::NoOutstandingBid`] unless a bid is awaiting dispatch.
    pub fn execute(&mut self, quota: f64) -> Result<PlantDispatch, PlantError> {
        let TickPhase::BidRequested { slot, action, .. } = self.phase else {
            return Err(PlantError::NoOutstandingBid {
                id: self.spec.id.clone(),
            });
        };
        let scale = self.spec.scaling_factors[slot];
        let (a, b, c) = (self.spec.a, self.spec.b, self.spec.c);
        let variable_cost = a * quota * quota + b * quota;

        self.phase = TickPhase::Dispatched {
            slot,
            action,
            quantity: quota,
        };
        Ok(PlantDispatch {
            quantity: quota,
            scale,
            revenue: scale * variable_cost + c,
            cost: variable_cost + c,
        })
    }
}
