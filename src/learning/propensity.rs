use rand::Rng;

use super::sample_proportional;

/// Greedy propensity learner.
///
/// Keeps one positive propensity per action, moved toward the latest reward.
/// Rewards are shifted by an accumulated `offset` so that entries never drop
/// below `min_value`: whenever an update would, every entry is lifted by the
/// deficit and the offset grows by the same amount.
#[derive(Debug, Clone, PartialEq)]
pub struct PropensityLearner {
    propensities: Vec<f64>,
    alpha: f64,
    min_value: f64,
    offset: f64,
}

impl PropensityLearner {
    /// Creates a learner with every entry at `min_value`.
    ///
    /// # Panics
    ///
    /// Panics if `actions` is zero or `min_value` is not positive.
    pub fn new(actions: usize, alpha: f64, min_value: f64) -> Self {
        Self::with_values(vec![min_value; actions], alpha, min_value)
    }

    /// Creates a learner with explicit starting propensities, each raised to
    /// at least `min_value`.
    ///
    /// # Panics
    ///
    /// Panics if `initial` is empty or `min_value` is not positive.
    pub fn with_values(initial: Vec<f64>, alpha: f64, min_value: f64) -> Self {
        assert!(!initial.is_empty(), "a learner needs at least one action");
        assert!(min_value > 0.0, "min_value must be > 0");
        Self {
            propensities: initial.into_iter().map(|p| p.max(min_value)).collect(),
            alpha,
            min_value,
            offset: 0.0,
        }
    }

    /// Moves `action` toward `reward`, re-flooring the table if needed.
    pub fn learn(&mut self, action: usize, reward: f64) {
        let updated =
            (1.0 - self.alpha) * self.propensities[action] + self.alpha * (reward + self.offset);
        self.propensities[action] = updated;

        if updated < self.min_value {
            let shift = self.min_value - updated;
            for p in &mut self.propensities {
                *p += shift;
            }
            // the lifted entry lands on the floor exactly, not within rounding
            self.propensities[action] = self.min_value;
            self.offset += shift;
        }
    }

    /// Samples an action with probability `prop[a] / sum(prop)`.
    pub fn select_action<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        sample_proportional(&self.propensities, rng)
    }

    /// Current propensities, one per action.
    pub fn values(&self) -> &[f64] {
        &self.propensities
    }

    /// Total shift applied so far to keep the floor.
    pub fn offset(&self) -> f64 {
        self.offset
    }
}
