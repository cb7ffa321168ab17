//! Stochastic production limits.

use rand::Rng;
use rand_distr::{Distribution, LogNormal, Normal};
use serde::Deserialize;
use thiserror::Error;

use crate::forecast::Adjuster;
use crate::market::{BoundSignal, MarketSnapshot, ObservableValue, Signal};

/// How a quantity is drawn each tick.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
pub enum QuantityModel {
    /// Always `value`.
    Constant { value: f64 },
    /// Uniform on `[min, max]`.
    Uniform { min: f64, max: f64 },
    /// Gaussian.
    Normal { mean: f64, std_dev: f64 },
    /// `exp(N(mu, sigma))`.
    LogNormal { mu: f64, sigma: f64 },
    /// Deterministic series, `values[tick % len]`.
    Profile { values: Vec<f64> },
    /// `a * exp(b * v) + c * exp(d * v) + e` of a market signal `v`.
    Exponential {
        a: f64,
        b: f64,
        c: f64,
        d: f64,
        e: f64,
        signal: Signal,
    },
}

/// Configuration of a [`QuantitySource`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QuantityConfig {
    /// Base model.
    pub model: QuantityModel,
    /// Adjusters applied in order to every draw.
    #[serde(default)]
    pub adjusters: Vec<Adjuster>,
}

impl QuantityConfig {
    /// A fixed quantity without adjusters.
    pub fn constant(value: f64) -> Self {
        Self {
            model: QuantityModel::Constant { value },
            adjusters: Vec::new(),
        }
    }
}

/// Rejected quantity model parameters.
#[derive(Debug, Error)]
pub enum QuantityError {
    /// `min > max` for a uniform model.
    #[error("uniform range is empty: min {min} > max {max}")]
    EmptyRange { min: f64, max: f64 },
    /// Invalid normal or log-normal parameters.
    #[error("invalid distribution parameters: {0}")]
    Distribution(String),
    /// A profile without values.
    #[error("profile needs at least one value")]
    EmptyProfile,
}

#[derive(Debug, Clone)]
enum Sampler {
    Constant(f64),
    Uniform { min: f64, span: f64 },
    Normal(Normal<f64>),
    LogNormal(LogNormal<f64>),
    Profile(Vec<f64>),
    Exponential {
        a: f64,
        b: f64,
        c: f64,
        d: f64,
        e: f64,
        signal: BoundSignal,
    },
}

/// A ready-to-sample production limit.
///
/// # Examples
///
/// ```
/// use power_market_sim::forecast::Adjuster;
/// use power_market_sim::market::MarketSnapshot;
/// use power_market_sim::plant::{QuantityConfig, QuantityModel, QuantitySource};
/// use rand::SeedableRng;
/// use rand::rngs::StdRng;
///
/// let config = QuantityConfig {
///     model: QuantityModel::Profile { values: vec![-5.0, 10.0] },
///     adjusters: vec![Adjuster::Clamp { min: 0.0, max: 8.0 }],
/// };
/// let source = QuantitySource::new(&config).unwrap();
/// let mut rng = StdRng::seed_from_u64(0);
/// let market = MarketSnapshot::default();
///
/// assert_eq!(source.sample(0, &market, &mut rng), 0.0);
/// assert_eq!(source.sample(1, &market, &mut rng), 8.0);
/// ```
#[derive(Debug, Clone)]
pub struct QuantitySource {
    sampler: Sampler,
    adjuster: Option<Adjuster>,
}

impl QuantitySource {
    /// Builds the source, resolving distributions and market signals once.
    ///
    /// # Errors
    ///
    /// Returns [`QuantityError`] when the model parameters are unusable.
    pub fn new(config: &QuantityConfig) -> Result<Self, QuantityError> {
        let sampler = match &config.model {
            QuantityModel::Constant { value } => Sampler::Constant(*value),
            QuantityModel::Uniform { min, max } => {
                if min > max {
                    return Err(QuantityError::EmptyRange {
                        min: *min,
                        max: *max,
                    });
                }
                Sampler::Uniform {
                    min: *min,
                    span: max - min,
                }
            }
            QuantityModel::Normal { mean, std_dev } => {
                if !(std_dev.is_finite() && *std_dev >= 0.0) {
                    return Err(QuantityError::Distribution(format!(
                        "std_dev must be finite and >= 0, got {std_dev}"
                    )));
                }
                Sampler::Normal(
                    Normal::new(*mean, *std_dev)
                        .map_err(|e| QuantityError::Distribution(e.to_string()))?,
                )
            }
            QuantityModel::LogNormal { mu, sigma } => {
                if !(sigma.is_finite() && *sigma >= 0.0) {
                    return Err(QuantityError::Distribution(format!(
                        "sigma must be finite and >= 0, got {sigma}"
                    )));
                }
                Sampler::LogNormal(
                    LogNormal::new(*mu, *sigma)
                        .map_err(|e| QuantityError::Distribution(e.to_string()))?,
                )
            }
            QuantityModel::Profile { values } => {
                if values.is_empty() {
                    return Err(QuantityError::EmptyProfile);
                }
                Sampler::Profile(values.clone())
            }
            QuantityModel::Exponential {
                a,
                b,
                c,
                d,
                e,
                signal,
            } => Sampler::Exponential {
                a: *a,
                b: *b,
                c: *c,
                d: *d,
                e: *e,
                signal: signal.bind(),
            },
        };
        Ok(Self {
            sampler,
            adjuster: Adjuster::from_list(&config.adjusters),
        })
    }

    /// Draws the quantity for `tick`.
    pub fn sample<R: Rng + ?Sized>(
        &self,
        tick: u64,
        market: &MarketSnapshot,
        rng: &mut R,
    ) -> f64 {
        let raw = match &self.sampler {
            Sampler::Constant(value) => *value,
            Sampler::Uniform { min, span } => min + span * rng.random::<f64>(),
            Sampler::Normal(dist) => dist.sample(rng),
            Sampler::LogNormal(dist) => dist.sample(rng),
            Sampler::Profile(values) => values[(tick % values.len() as u64) as usize],
            Sampler::Exponential {
                a,
                b,
                c,
                d,
                e,
                signal,
            } => {
                let v = signal.value(market);
                a * (b * v).exp() + c * (d * v).exp() + e
            }
        };
        match &self.adjuster {
            Some(adjuster) => adjuster.adjust(raw),
            None => raw,
        }
    }
}
