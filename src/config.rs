//! TOML-based scenario configuration and preset definitions.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::forecast::Adjuster;
use crate::learning::{BidPolicy, LearningKind, PolicyConfig};
use crate::market::{ClearingConfig, Signal};
use crate::plant::{PlantSpec, PowerPlant, QuantityConfig, QuantityModel, QuantitySource};
use crate::sim::demand::DemandProfile;
use crate::sim::engine::Engine;
use crate::sim::types::SimConfig;

/// Seed offset between consecutive plants' random streams.
const PLANT_SEED_OFFSET: u64 = 101;

/// Top-level scenario configuration parsed from TOML.
///
/// All sections have defaults matching the baseline scenario. Load from
/// TOML with [`ScenarioConfig::from_toml_file`] or use
/// [`ScenarioConfig::baseline`] for the built-in default.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Timing, windows and seed.
    #[serde(default)]
    pub simulation: SimulationConfig,
    /// Market clearing tunables.
    #[serde(default)]
    pub market: MarketConfig,
    /// Synthetic aggregate demand.
    #[serde(default)]
    pub demand: DemandConfig,
    /// Participating plants, in bid order.
    #[serde(default = "baseline_plants")]
    pub plants: Vec<PlantConfig>,
}

/// Simulation timing and global parameters.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Ticks per cycle (must be > 0).
    pub period: usize,
    /// Samples kept by forecasting windows (must be > 0).
    pub window_size: usize,
    /// Cycles to simulate (must be > 0).
    pub days: usize,
    /// Master random seed.
    pub seed: u64,
    /// Load-factor smoothing weight in `[0, 1]`.
    pub history_weight: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            period: 24,
            window_size: 168,
            days: 7,
            seed: 42,
            history_weight: 0.9,
        }
    }
}

/// Market clearing tunables.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct MarketConfig {
    /// Convergence tolerance on the residual imbalance.
    pub accuracy: f64,
    /// Starting imbalance.
    pub epsilon: f64,
    /// Starting price.
    pub lambda: f64,
    /// Price multiplier while demand is unmet (> 1).
    pub scale_up_factor: f64,
    /// Price multiplier while supply exceeds demand (in `(0, 1)`).
    pub scale_down_factor: f64,
    /// Iteration limit.
    pub stop_lock: usize,
    /// Buy/sell spread around the clearing price.
    pub price_adjustment: f64,
}

impl Default for MarketConfig {
    fn default() -> Self {
        let clearing = ClearingConfig::default();
        Self {
            accuracy: clearing.accuracy,
            epsilon: clearing.epsilon,
            lambda: clearing.lambda,
            scale_up_factor: clearing.scale_up_factor,
            scale_down_factor: clearing.scale_down_factor,
            stop_lock: clearing.stop_lock,
            price_adjustment: 0.05,
        }
    }
}

impl MarketConfig {
    /// Lambda-iteration tunables.
    pub fn clearing(&self) -> ClearingConfig {
        ClearingConfig {
            accuracy: self.accuracy,
            epsilon: self.epsilon,
            lambda: self.lambda,
            scale_up_factor: self.scale_up_factor,
            scale_down_factor: self.scale_down_factor,
            stop_lock: self.stop_lock,
        }
    }
}

/// Synthetic aggregate demand parameters.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct DemandConfig {
    /// Mean demand.
    pub base: f64,
    /// Daily swing amplitude.
    pub amplitude: f64,
    /// Phase offset (radians).
    pub phase_rad: f64,
    /// Gaussian noise standard deviation.
    pub noise_std: f64,
}

impl Default for DemandConfig {
    fn default() -> Self {
        Self {
            base: 400.0,
            amplitude: 120.0,
            phase_rad: -2.0,
            noise_std: 10.0,
        }
    }
}

fn default_actions() -> Vec<f64> {
    vec![-0.1, 0.0, 0.1]
}

fn default_rate() -> f64 {
    0.5
}

fn default_min_value() -> f64 {
    1.0
}

/// One plant's parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlantConfig {
    /// Unique identifier.
    pub id: String,
    /// Learning rule.
    #[serde(default)]
    pub learning: LearningKind,
    /// Quadratic cost coefficient (>= 0). `a = b = 0` marks a renewable plant.
    pub a: f64,
    /// Linear cost coefficient.
    pub b: f64,
    /// Fixed cost.
    #[serde(default)]
    pub c: f64,
    /// Lower production limit.
    pub min_quantity: QuantityConfig,
    /// Upper production limit.
    pub max_quantity: QuantityConfig,
    /// Starting markup per slot (defaults to 1.0 everywhere).
    #[serde(default)]
    pub scaling_factors: Option<Vec<f64>>,
    /// Relative markup change per action.
    #[serde(default = "default_actions")]
    pub actions: Vec<f64>,
    /// Starting learner values, one per action.
    #[serde(default)]
    pub initial_values: Option<Vec<f64>>,
    /// Learning rate.
    #[serde(default = "default_rate")]
    pub alpha: f64,
    /// Q-learning reward weight.
    #[serde(default = "default_rate")]
    pub gamma: f64,
    /// Propensity floor (> 0).
    #[serde(default = "default_min_value")]
    pub min_value: f64,
}

impl PlantConfig {
    /// A plant with constant production limits and default learning.
    pub fn new(id: &str, a: f64, b: f64, c: f64, min: f64, max: f64) -> Self {
        Self {
            id: id.to_string(),
            learning: LearningKind::default(),
            a,
            b,
            c,
            min_quantity: QuantityConfig::constant(min),
            max_quantity: QuantityConfig::constant(max),
            scaling_factors: None,
            actions: default_actions(),
            initial_values: None,
            alpha: default_rate(),
            gamma: default_rate(),
            min_value: default_min_value(),
        }
    }

    /// Learner parameters.
    pub fn policy_config(&self) -> PolicyConfig {
        PolicyConfig {
            kind: self.learning,
            actions: self.actions.clone(),
            initial_values: self.initial_values.clone(),
            alpha: self.alpha,
            gamma: self.gamma,
            min_value: self.min_value,
        }
    }

    /// Builds the plant for a run with `period` slots.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if a production limit model is unusable.
    pub fn build(&self, field: &str, period: usize, seed: u64) -> Result<PowerPlant, ConfigError> {
        let source = |config: &QuantityConfig, name: &str| {
            QuantitySource::new(config).map_err(|e| ConfigError::new(format!("{field}.{name}"), e))
        };
        let spec = PlantSpec {
            id: self.id.clone(),
            a: self.a,
            b: self.b,
            c: self.c,
            min_quantity: source(&self.min_quantity, "min_quantity")?,
            max_quantity: source(&self.max_quantity, "max_quantity")?,
            scaling_factors: self
                .scaling_factors
                .clone()
                .unwrap_or_else(|| vec![1.0; period]),
        };
        let policy = BidPolicy::new(&self.policy_config(), period);
        Ok(PowerPlant::new(spec, policy, seed))
    }
}

/// Configuration error with field path and constraint description.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("config error: {field}: {message}")]
pub struct ConfigError {
    /// Dotted field path (e.g., `"simulation.period"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl ConfigError {
    fn new(field: impl Into<String>, message: impl ToString) -> Self {
        Self {
            field: field.into(),
            message: message.to_string(),
        }
    }
}

fn baseline_plants() -> Vec<PlantConfig> {
    vec![
        PlantConfig {
            max_quantity: QuantityConfig {
                model: QuantityModel::Normal {
                    mean: 80.0,
                    std_dev: 20.0,
                },
                adjusters: vec![Adjuster::Clamp {
                    min: 0.0,
                    max: 150.0,
                }],
            },
            ..PlantConfig::new("wind", 0.0, 0.0, 50.0, 0.0, 0.0)
        },
        PlantConfig::new("coal", 0.05, 25.0, 500.0, 50.0, 300.0),
        PlantConfig {
            learning: LearningKind::Propensity,
            max_quantity: QuantityConfig {
                model: QuantityModel::Uniform {
                    min: 150.0,
                    max: 200.0,
                },
                adjusters: Vec::new(),
            },
            ..PlantConfig::new("gas", 0.1, 40.0, 200.0, 0.0, 0.0)
        },
        PlantConfig::new("hydro", 0.08, 30.0, 100.0, 0.0, 120.0),
    ]
}

/// Relative solar output per hour for a 24-slot day.
const SOLAR_SHAPE: [f64; 24] = [
    0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.05, 0.2, 0.4, 0.6, 0.8, 0.95, 1.0, 0.95, 0.8, 0.6, 0.4, 0.2,
    0.05, 0.0, 0.0, 0.0, 0.0, 0.0,
];

impl ScenarioConfig {
    /// Returns the baseline scenario: one wind farm and three conventional plants.
    pub fn baseline() -> Self {
        Self {
            simulation: SimulationConfig::default(),
            market: MarketConfig::default(),
            demand: DemandConfig::default(),
            plants: baseline_plants(),
        }
    }

    /// Returns the renewable-mix preset: solar and a load-following wind farm
    /// displace most coal.
    pub fn renewable_mix() -> Self {
        let solar = PlantConfig {
            max_quantity: QuantityConfig {
                model: QuantityModel::Profile {
                    values: SOLAR_SHAPE.iter().map(|f| f * 180.0).collect(),
                },
                adjusters: Vec::new(),
            },
            ..PlantConfig::new("solar", 0.0, 0.0, 80.0, 0.0, 0.0)
        };
        // wind output rises with the smoothed load factor
        let wind = PlantConfig {
            max_quantity: QuantityConfig {
                model: QuantityModel::Exponential {
                    a: 60.0,
                    b: 0.5,
                    c: 0.0,
                    d: 0.0,
                    e: 20.0,
                    signal: Signal::LoadFactor,
                },
                adjusters: vec![Adjuster::Clamp {
                    min: 0.0,
                    max: 160.0,
                }],
            },
            ..PlantConfig::new("wind", 0.0, 0.0, 60.0, 0.0, 0.0)
        };
        Self {
            simulation: SimulationConfig::default(),
            market: MarketConfig::default(),
            demand: DemandConfig::default(),
            plants: vec![
                solar,
                wind,
                PlantConfig::new("coal", 0.05, 25.0, 300.0, 20.0, 150.0),
                PlantConfig {
                    learning: LearningKind::Propensity,
                    ..PlantConfig::new("gas", 0.1, 40.0, 200.0, 0.0, 250.0)
                },
                PlantConfig::new("hydro", 0.08, 30.0, 100.0, 0.0, 120.0),
            ],
        }
    }

    /// Returns the scarcity preset: evening peaks exceed installed capacity.
    pub fn scarcity() -> Self {
        Self {
            simulation: SimulationConfig::default(),
            market: MarketConfig {
                price_adjustment: 0.1,
                ..MarketConfig::default()
            },
            demand: DemandConfig {
                base: 520.0,
                amplitude: 200.0,
                noise_std: 20.0,
                ..DemandConfig::default()
            },
            plants: baseline_plants(),
        }
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &["baseline", "renewable_mix", "scarcity"];

    /// Loads a scenario from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "baseline" => Ok(Self::baseline()),
            "renewable_mix" => Ok(Self::renewable_mix()),
            "scarcity" => Ok(Self::scarcity()),
            _ => Err(ConfigError::new(
                "preset",
                format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            )),
        }
    }

    /// Parses a scenario from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::new("scenario", format!("cannot read \"{}\": {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a scenario from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::new("toml", e))
    }

    /// Simulation timing.
    ///
    /// # Panics
    ///
    /// Panics if `period`, `window_size` or `days` is zero; call
    /// [`validate`](Self::validate) first.
    pub fn sim_config(&self) -> SimConfig {
        let s = &self.simulation;
        SimConfig::new(s.period, s.window_size, s.days, s.seed)
            .with_history_weight(s.history_weight)
    }

    /// Validates and assembles the engine.
    ///
    /// # Errors
    ///
    /// Returns the first validation error, or a `ConfigError` if a plant
    /// cannot be built.
    pub fn build_engine(&self) -> Result<Engine, ConfigError> {
        if let Some(err) = self.validate().into_iter().next() {
            return Err(err);
        }
        let sim = self.sim_config();
        let d = &self.demand;
        let demand = DemandProfile::new(
            d.base,
            d.amplitude,
            d.phase_rad,
            d.noise_std,
            sim.period,
            sim.seed,
        );

        let plants = self
            .plants
            .iter()
            .enumerate()
            .map(|(i, plant)| {
                let seed = sim.seed.wrapping_add(PLANT_SEED_OFFSET * (i as u64 + 1));
                plant.build(&format!("plants[{i}]"), sim.period, seed)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Engine::new(
            sim,
            self.market.clearing(),
            self.market.price_adjustment,
            demand,
            plants,
        ))
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        let s = &self.simulation;

        if s.period == 0 {
            errors.push(ConfigError::new("simulation.period", "must be > 0"));
        }
        if s.window_size == 0 {
            errors.push(ConfigError::new("simulation.window_size", "must be > 0"));
        }
        if s.days == 0 {
            errors.push(ConfigError::new("simulation.days", "must be > 0"));
        }
        if !(0.0..=1.0).contains(&s.history_weight) {
            errors.push(ConfigError::new("simulation.history_weight", "must be in [0.0, 1.0]"));
        }

        let m = &self.market;
        if !(m.accuracy > 0.0) {
            errors.push(ConfigError::new("market.accuracy", "must be > 0"));
        }
        if !(m.epsilon.abs() > m.accuracy) {
            errors.push(ConfigError::new(
                "market.epsilon",
                "magnitude must exceed market.accuracy",
            ));
        }
        if !(m.lambda > 0.0) {
            errors.push(ConfigError::new("market.lambda", "must be > 0"));
        }
        if !(m.scale_up_factor > 1.0) {
            errors.push(ConfigError::new("market.scale_up_factor", "must be > 1"));
        }
        if !(m.scale_down_factor > 0.0 && m.scale_down_factor < 1.0) {
            errors.push(ConfigError::new("market.scale_down_factor", "must be in (0, 1)"));
        }
        if m.stop_lock == 0 {
            errors.push(ConfigError::new("market.stop_lock", "must be > 0"));
        }
        if !(0.0..1.0).contains(&m.price_adjustment) {
            errors.push(ConfigError::new("market.price_adjustment", "must be in [0.0, 1.0)"));
        }

        if !(self.demand.noise_std >= 0.0) {
            errors.push(ConfigError::new("demand.noise_std", "must be >= 0"));
        }

        if self.plants.is_empty() {
            errors.push(ConfigError::new("plants", "at least one plant is required"));
        }
        let mut ids = HashSet::new();
        for (i, plant) in self.plants.iter().enumerate() {
            self.validate_plant(i, plant, &mut ids, &mut errors);
        }

        errors
    }

    fn validate_plant(
        &self,
        i: usize,
        p: &PlantConfig,
        ids: &mut HashSet<String>,
        errors: &mut Vec<ConfigError>,
    ) {
        let field = |name: &str| format!("plants[{i}].{name}");

        if p.id.is_empty() {
            errors.push(ConfigError::new(field("id"), "must not be empty"));
        } else if !ids.insert(p.id.clone()) {
            errors.push(ConfigError::new(field("id"), format!("duplicate id \"{}\"", p.id)));
        }
        if !(p.a >= 0.0) {
            errors.push(ConfigError::new(field("a"), "must be >= 0"));
        }
        if p.a == 0.0 && p.b != 0.0 {
            errors.push(ConfigError::new(
                field("b"),
                "must be 0 when a is 0 (linear-only cost curves cannot be dispatched)",
            ));
        }
        let limits = [("min_quantity", &p.min_quantity), ("max_quantity", &p.max_quantity)];
        for (name, quantity) in limits {
            if let Err(e) = QuantitySource::new(quantity) {
                errors.push(ConfigError::new(field(name), e));
            }
        }
        if let Some(factors) = &p.scaling_factors {
            if factors.len() != self.simulation.period {
                errors.push(ConfigError::new(
                    field("scaling_factors"),
                    format!("needs {} entries, got {}", self.simulation.period, factors.len()),
                ));
            }
            if factors.iter().any(|f| !(*f > 0.0)) {
                errors.push(ConfigError::new(field("scaling_factors"), "entries must be > 0"));
            }
        }
        if p.actions.is_empty() {
            errors.push(ConfigError::new(field("actions"), "must not be empty"));
        }
        if p.actions.iter().any(|a| !(*a > -1.0)) {
            errors.push(ConfigError::new(field("actions"), "entries must be > -1"));
        }
        if let Some(values) = &p.initial_values {
            if values.len() != p.actions.len() {
                errors.push(ConfigError::new(
                    field("initial_values"),
                    format!("needs {} entries, got {}", p.actions.len(), values.len()),
                ));
            }
            // Q-values scale by max(Q) and are sampled proportionally
            if p.learning == LearningKind::QLearning && values.iter().any(|v| !(*v > 0.0)) {
                errors.push(ConfigError::new(
                    field("initial_values"),
                    "entries must be > 0 for q_learning",
                ));
            }
        }
        if !(p.alpha > 0.0 && p.alpha <= 1.0) {
            errors.push(ConfigError::new(field("alpha"), "must be in (0, 1]"));
        }
        if !(p.min_value > 0.0) {
            errors.push(ConfigError::new(field("min_value"), "must be > 0"));
        }
    }
}
