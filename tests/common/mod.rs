//! Shared test fixtures for integration tests.

use power_market_sim::config::{DemandConfig, PlantConfig, ScenarioConfig, SimulationConfig};
use power_market_sim::market::Bid;
use power_market_sim::sim::engine::Engine;

/// Four-slot noiseless scenario: a 20-unit wind farm, coal and gas.
pub fn small_scenario(days: usize) -> ScenarioConfig {
    ScenarioConfig {
        simulation: SimulationConfig {
            period: 4,
            window_size: 8,
            days,
            seed: 42,
            history_weight: 0.9,
        },
        demand: DemandConfig {
            base: 120.0,
            amplitude: 30.0,
            phase_rad: 0.0,
            noise_std: 0.0,
        },
        plants: vec![
            PlantConfig::new("wind", 0.0, 0.0, 0.0, 0.0, 20.0),
            PlantConfig::new("coal", 0.05, 10.0, 100.0, 0.0, 200.0),
            PlantConfig::new("gas", 0.1, 20.0, 50.0, 0.0, 150.0),
        ],
        ..ScenarioConfig::baseline()
    }
}

/// Engine for [`small_scenario`].
pub fn small_engine(days: usize) -> Engine {
    small_scenario(days)
        .build_engine()
        .expect("small scenario should build")
}

/// Conventional bid shorthand.
pub fn conventional(a: f64, b: f64, q_min: f64, q_max: f64) -> Bid {
    Bid::new(a, b, q_min, q_max)
}
