//! Windowed, period-aware forecasting.

mod adjuster;
mod window;
mod window_max;

pub use adjuster::Adjuster;
pub use window::PeriodicWindow;
pub use window_max::AdjustedWindowMax;
