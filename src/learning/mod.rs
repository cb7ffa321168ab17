//! Adaptive bidding policies.
//!
//! A [`BidPolicy`] keeps one learner per period slot, so a plant can learn a
//! different markup strategy for each hour of the day. Actions are relative
//! markup changes: choosing action `i` multiplies the slot's scaling factor by
//! `1 + actions[i]`.

mod propensity;
mod q_learning;

pub use propensity::PropensityLearner;
pub use q_learning::QLearner;

use rand::Rng;
use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;
use serde::{Deserialize, Serialize};

/// Which learning rule a policy uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LearningKind {
    /// Q-value table, sampled proportionally to positive values.
    #[default]
    QLearning,
    /// Greedy propensities kept above a positive floor.
    Propensity,
}

/// Parameters shared by every slot learner of one policy.
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyConfig {
    /// Learning rule.
    pub kind: LearningKind,
    /// Relative markup change per action.
    pub actions: Vec<f64>,
    /// Starting table values, one per action. `None` starts uniform
    /// (Q-learning) or at the floor (propensity).
    pub initial_values: Option<Vec<f64>>,
    /// Learning rate.
    pub alpha: f64,
    /// Q-learning reward weight.
    pub gamma: f64,
    /// Propensity floor.
    pub min_value: f64,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            kind: LearningKind::QLearning,
            actions: vec![-0.1, 0.0, 0.1],
            initial_values: None,
            alpha: 0.5,
            gamma: 0.5,
            min_value: 1.0,
        }
    }
}

/// One slot's learner.
#[derive(Debug, Clone, PartialEq)]
pub enum Learner {
    /// Q-learning.
    QLearning(QLearner),
    /// Greedy propensity.
    Propensity(PropensityLearner),
}

impl Learner {
    fn from_config(config: &PolicyConfig) -> Self {
        let actions = config.actions.len();
        match (config.kind, &config.initial_values) {
            (LearningKind::QLearning, Some(values)) => {
                Self::QLearning(QLearner::new(values.clone(), config.alpha, config.gamma))
            }
            (LearningKind::QLearning, None) => {
                Self::QLearning(QLearner::uniform(actions, config.alpha, config.gamma))
            }
            (LearningKind::Propensity, Some(values)) => Self::Propensity(
                PropensityLearner::with_values(values.clone(), config.alpha, config.min_value),
            ),
            (LearningKind::Propensity, None) => Self::Propensity(PropensityLearner::new(
                actions,
                config.alpha,
                config.min_value,
            )),
        }
    }

    /// Samples the next action.
    pub fn select_action<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        match self {
            Self::QLearning(l) => l.select_action(rng),
            Self::Propensity(l) => l.select_action(rng),
        }
    }

    /// Feeds back the reward observed for `action`.
    pub fn learn(&mut self, action: usize, reward: f64) {
        match self {
            Self::QLearning(l) => l.learn(action, reward),
            Self::Propensity(l) => l.learn(action, reward),
        }
    }

    /// Current table values.
    pub fn values(&self) -> &[f64] {
        match self {
            Self::QLearning(l) => l.values(),
            Self::Propensity(l) => l.values(),
        }
    }
}

/// Per-slot action-selection policy.
///
/// # Examples
///
/// ```
/// use power_market_sim::learning::{BidPolicy, PolicyConfig};
/// use rand::SeedableRng;
/// use rand::rngs::StdRng;
///
/// let mut policy = BidPolicy::new(&PolicyConfig::default(), 24);
/// let mut rng = StdRng::seed_from_u64(42);
///
/// let action = policy.select_action(5, &mut rng);
/// assert!(action < policy.actions().len());
/// policy.learn(5, action, 12.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct BidPolicy {
    learners: Vec<Learner>,
    actions: Vec<f64>,
}

impl BidPolicy {
    /// Creates a policy with one learner per slot.
    ///
    /// # Panics
    ///
    /// Panics if `period` is zero, the action list is empty, or
    /// `initial_values` does not have one entry per action.
    pub fn new(config: &PolicyConfig, period: usize) -> Self {
        assert!(period > 0, "period must be > 0");
        assert!(!config.actions.is_empty(), "actions must not be empty");
        if let Some(values) = &config.initial_values {
            assert_eq!(
                values.len(),
                config.actions.len(),
                "initial_values needs one entry per action"
            );
        }
        Self {
            learners: (0..period).map(|_| Learner::from_config(config)).collect(),
            actions: config.actions.clone(),
        }
    }

    /// Samples an action index for `slot`.
    pub fn select_action<R: Rng + ?Sized>(&self, slot: usize, rng: &mut R) -> usize {
        self.learners[slot].select_action(rng)
    }

    /// Feeds back the reward earned by `action` in `slot`.
    pub fn learn(&mut self, slot: usize, action: usize, reward: f64) {
        self.learners[slot].learn(action, reward);
    }

    /// Relative markup change of `action`.
    pub fn action_delta(&self, action: usize) -> f64 {
        self.actions[action]
    }

    /// All action deltas.
    pub fn actions(&self) -> &[f64] {
        &self.actions
    }

    /// Learner owning `slot`.
    pub fn learner(&self, slot: usize) -> &Learner {
        &self.learners[slot]
    }

    /// Number of slots.
    pub fn period(&self) -> usize {
        self.learners.len()
    }
}

/// Draws an index with probability proportional to `weights`.
///
/// Negative and NaN weights count as 0. Falls back to a uniform draw when no
/// usable weight is left.
fn sample_proportional<R: Rng + ?Sized>(weights: &[f64], rng: &mut R) -> usize {
    let clamped: Vec<f64> = weights.iter().map(|w| w.max(0.0)).collect();
    let total: f64 = clamped.iter().sum();
    if !(total > 0.0 && total.is_finite()) {
        return rng.random_range(0..weights.len());
    }
    match WeightedIndex::new(&clamped) {
        Ok(dist) => dist.sample(rng),
        Err(_) => rng.random_range(0..weights.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn one_learner_per_slot() {
        let policy = BidPolicy::new(&PolicyConfig::default(), 24);
        assert_eq!(policy.period(), 24);
        assert_eq!(policy.action_delta(2), 0.1);
    }

    #[test]
    fn slots_learn_independently() {
        let mut policy = BidPolicy::new(&PolicyConfig::default(), 3);
        policy.learn(1, 0, 10.0);
        assert_eq!(policy.learner(0), policy.learner(2));
        assert_ne!(policy.learner(0), policy.learner(1));
    }

    #[test]
    fn propensity_policy_uses_floor() {
        let config = PolicyConfig {
            kind: LearningKind::Propensity,
            min_value: 2.0,
            ..PolicyConfig::default()
        };
        let policy = BidPolicy::new(&config, 2);
        assert_eq!(policy.learner(1).values(), &[2.0, 2.0, 2.0]);
    }

    #[test]
    fn initial_values_are_used() {
        let config = PolicyConfig {
            initial_values: Some(vec![0.0, 0.0, 1.0]),
            ..PolicyConfig::default()
        };
        let policy = BidPolicy::new(&config, 4);
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..50 {
            assert_eq!(policy.select_action(3, &mut rng), 2);
        }
    }

    #[test]
    fn proportional_sampling_handles_degenerate_weights() {
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..50 {
            assert!(sample_proportional(&[f64::NAN, 0.0], &mut rng) < 2);
            assert!(sample_proportional(&[f64::INFINITY, 1.0], &mut rng) < 2);
        }
    }

    #[test]
    #[should_panic]
    fn empty_actions_panic() {
        let config = PolicyConfig {
            actions: Vec::new(),
            ..PolicyConfig::default()
        };
        BidPolicy::new(&config, 24);
    }
}
