//! Bids, market clearing and the signals plants observe.

mod bid;
mod clearing;
mod signal;

pub use bid::Bid;
pub use clearing::{ClearingConfig, DispatchResult, Imbalance, MarketClearingEngine};
pub use signal::{BoundSignal, MarketSnapshot, ObservableValue, Signal};
