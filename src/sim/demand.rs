use rand::{SeedableRng, rngs::StdRng};
use rand_distr::{Distribution, Normal};

/// Synthetic aggregate demand with a daily shape.
///
/// Demand follows `base + amplitude * sin(2*pi*slot/period + phase)` plus
/// Gaussian noise, floored at zero.
///
/// # Examples
///
/// ```
/// use power_market_sim::sim::demand::DemandProfile;
///
/// let mut demand = DemandProfile::new(100.0, 30.0, 0.0, 0.0, 24, 42);
/// assert!((demand.demand_at(6) - 130.0).abs() < 1e-9);
/// ```
#[derive(Debug, Clone)]
pub struct DemandProfile {
    /// Mean demand.
    pub base: f64,
    /// Amplitude of the daily swing.
    pub amplitude: f64,
    /// Phase offset in radians.
    pub phase_rad: f64,
    /// Ticks per cycle.
    period: usize,
    noise: Option<Normal<f64>>,
    rng: StdRng,
}

impl DemandProfile {
    /// Creates a demand profile.
    ///
    /// # Arguments
    ///
    /// * `base` - Mean demand
    /// * `amplitude` - Amplitude of the sinusoidal swing
    /// * `phase_rad` - Phase offset in radians
    /// * `noise_std` - Standard deviation of additive noise (negative or
    ///   non-finite values disable noise)
    /// * `period` - Ticks per cycle
    /// * `seed` - Random seed for reproducible noise
    pub fn new(
        base: f64,
        amplitude: f64,
        phase_rad: f64,
        noise_std: f64,
        period: usize,
        seed: u64,
    ) -> Self {
        let noise = if noise_std > 0.0 {
            Normal::new(0.0, noise_std).ok()
        } else {
            None
        };
        Self {
            base,
            amplitude,
            phase_rad,
            period: period.max(1),
            noise,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Draws the demand for `tick`.
    pub fn demand_at(&mut self, tick: usize) -> f64 {
        let cycle_pos = (tick % self.period) as f64 / self.period as f64;
        let angle = 2.0 * std::f64::consts::PI * cycle_pos + self.phase_rad;
        let noise = match &self.noise {
            Some(dist) => dist.sample(&mut self.rng),
            None => 0.0,
        };
        (self.base + self.amplitude * angle.sin() + noise).max(0.0)
    }
}
