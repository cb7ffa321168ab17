use rand::Rng;

use super::sample_proportional;

/// Stateless Q-learner over a fixed action set.
///
/// Each update blends the previous value with the reward scaled by the best
/// value in the table:
///
/// `Q[a] = (1 - alpha) * Q[a] + gamma * reward * max(Q)`
#[derive(Debug, Clone, PartialEq)]
pub struct QLearner {
    values: Vec<f64>,
    alpha: f64,
    gamma: f64,
}

impl QLearner {
    /// Creates a learner with the given starting values.
    ///
    /// # Panics
    ///
    /// Panics if `initial` is empty.
    pub fn new(initial: Vec<f64>, alpha: f64, gamma: f64) -> Self {
        assert!(!initial.is_empty(), "a learner needs at least one action");
        Self {
            values: initial,
            alpha,
            gamma,
        }
    }

    /// Creates a learner with `actions` entries of `1 / actions` each.
    pub fn uniform(actions: usize, alpha: f64, gamma: f64) -> Self {
        Self::new(vec![1.0 / actions as f64; actions], alpha, gamma)
    }

    /// Applies one update for `action`.
    pub fn learn(&mut self, action: usize, reward: f64) {
        let best = self.values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let value = &mut self.values[action];
        *value = (1.0 - self.alpha) * *value + self.gamma * reward * best;
    }

    /// Samples an action with probability `Q[a] / sum(Q)`.
    ///
    /// Negative entries weigh 0; when no usable weight remains the action is
    /// drawn uniformly.
    pub fn select_action<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        sample_proportional(&self.values, rng)
    }

    /// Current Q-values, one per action.
    pub fn values(&self) -> &[f64] {
        &self.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn uniform_start() {
        let learner = QLearner::uniform(4, 0.5, 0.5);
        assert_eq!(learner.values(), &[0.25; 4]);
    }

    #[test]
    fn single_update_per_learn() {
        let mut learner = QLearner::new(vec![1.0, 2.0], 0.5, 0.5);
        learner.learn(0, 3.0);
        // 0.5 * 1.0 + 0.5 * 3.0 * 2.0
        assert_eq!(learner.values(), &[3.5, 2.0]);
    }

    #[test]
    fn negative_values_are_never_selected() {
        let learner = QLearner::new(vec![-5.0, 1.0, -0.1], 0.5, 0.5);
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..200 {
            assert_eq!(learner.select_action(&mut rng), 1);
        }
    }

    #[test]
    fn all_negative_falls_back_to_uniform() {
        let learner = QLearner::new(vec![-1.0, -2.0, -3.0], 0.5, 0.5);
        let mut rng = StdRng::seed_from_u64(11);
        let mut seen = [false; 3];
        for _ in 0..300 {
            seen[learner.select_action(&mut rng)] = true;
        }
        assert_eq!(seen, [true; 3]);
    }
}
