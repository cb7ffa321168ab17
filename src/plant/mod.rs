//! Generating plants: stochastic limits, markup learning and the bid protocol.

mod controller;
mod quantity;

pub use controller::{PlantDispatch, PlantError, PlantSpec, PowerPlant, TickPhase};
pub use quantity::{QuantityConfig, QuantityError, QuantityModel, QuantitySource};
