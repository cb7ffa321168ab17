//! Retail electricity market simulator.
//!
//! Plants bid quadratic cost curves into a lambda-iteration clearing market,
//! learn per-slot markups from their profits, and read periodic forecasts of
//! demand and price.

#[cfg(feature = "api")]
pub mod api;
pub mod config;
pub mod forecast;
pub mod io;
pub mod learning;
pub mod market;
pub mod plant;
/// Simulation engine, clock, demand and KPI modules.
pub mod sim;
