/// Simulation clock for tick management.
pub mod clock;
/// Synthetic aggregate demand.
pub mod demand;
pub mod engine;
pub mod kpi;
pub mod types;
