//! Market observations published to plants each tick.

use serde::{Deserialize, Serialize};

/// Grid-level observations available when bids are built.
///
/// Predicted values are the same-slot historical means for the tick about to
/// be cleared.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct MarketSnapshot {
    /// Clearing price of the previous tick.
    pub last_price: f64,
    /// Forecast clearing price for this tick.
    pub predicted_price: f64,
    /// Mean clearing price over the whole price window.
    pub mean_price: f64,
    /// Mean demand over the latest period.
    pub recent_demand: f64,
    /// Forecast demand for this tick.
    pub predicted_demand: f64,
    /// Smoothed `|recent mean / recent max|` of demand.
    pub load_factor: f64,
}

/// Named field of a [`MarketSnapshot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    /// Clearing price of the previous tick.
    LastPrice,
    /// Same-slot price forecast for this tick.
    PredictedPrice,
    /// Mean price over the price window.
    MeanPrice,
    /// Mean demand over the latest period.
    RecentDemand,
    /// Same-slot demand forecast for this tick.
    PredictedDemand,
    /// Smoothed demand load factor.
    LoadFactor,
}

impl Signal {
    /// Resolves the signal to an accessor.
    pub fn bind(self) -> BoundSignal {
        let read: fn(&MarketSnapshot) -> f64 = match self {
            Self::LastPrice => |m: &MarketSnapshot| m.last_price,
            Self::PredictedPrice => |m: &MarketSnapshot| m.predicted_price,
            Self::MeanPrice => |m: &MarketSnapshot| m.mean_price,
            Self::RecentDemand => |m: &MarketSnapshot| m.recent_demand,
            Self::PredictedDemand => |m: &MarketSnapshot| m.predicted_demand,
            Self::LoadFactor => |m: &MarketSnapshot| m.load_factor,
        };
        BoundSignal { signal: self, read }
    }
}

/// A real-valued observation of the market.
pub trait ObservableValue {
    /// Current value given the latest snapshot.
    fn value(&self, market: &MarketSnapshot) -> f64;
}

/// A [`Signal`] already resolved to its accessor.
#[derive(Clone, Copy)]
pub struct BoundSignal {
    signal: Signal,
    read: fn(&MarketSnapshot) -> f64,
}

impl BoundSignal {
    /// The signal this accessor reads.
    pub fn signal(&self) -> Signal {
        self.signal
    }
}

impl ObservableValue for BoundSignal {
    fn value(&self, market: &MarketSnapshot) -> f64 {
        (self.read)(market)
    }
}

impl std::fmt::Debug for BoundSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("BoundSignal").field(&self.signal).finish()
    }
}

impl PartialEq for BoundSignal {
    fn eq(&self, other: &Self) -> bool {
        self.signal == other.signal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bound_signals_read_their_field() {
        let market = MarketSnapshot {
            last_price: 1.0,
            predicted_price: 2.0,
            mean_price: 3.0,
            recent_demand: 4.0,
            predicted_demand: 5.0,
            load_factor: 0.6,
        };
        let cases = [
            (Signal::LastPrice, 1.0),
            (Signal::PredictedPrice, 2.0),
            (Signal::MeanPrice, 3.0),
            (Signal::RecentDemand, 4.0),
            (Signal::PredictedDemand, 5.0),
            (Signal::LoadFactor, 0.6),
        ];
        for (signal, expected) in cases {
            assert_eq!(signal.bind().value(&market), expected);
        }
    }
}
