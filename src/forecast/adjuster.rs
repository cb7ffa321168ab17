//! Value adjusters applied to samples before they are ranked or emitted.

use serde::Deserialize;

/// A pure transformation of a sample value.
///
/// Adjusters are used by [`AdjustedWindowMax`](super::AdjustedWindowMax) to
/// rank magnitudes rather than signed values, and by quantity sources to keep
/// sampled production limits inside a physical range.
///
/// # Examples
///
/// ```
/// use power_market_sim::forecast::Adjuster;
///
/// let clamp = Adjuster::Clamp { min: 0.0, max: 10.0 };
/// assert_eq!(clamp.adjust(-3.0), 0.0);
/// assert_eq!(Adjuster::Absolute.adjust(-3.0), 3.0);
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
pub enum Adjuster {
    /// `|x|`
    Absolute,
    /// `e^x`
    Exp,
    /// `x * factor`
    Amplify {
        /// Multiplicative factor.
        factor: f64,
    },
    /// Limits `x` to `[min, max]`.
    Clamp {
        /// Lower bound (defaults to 0).
        #[serde(default)]
        min: f64,
        /// Upper bound (defaults to +inf).
        #[serde(default = "unbounded")]
        max: f64,
    },
    /// Applies each adjuster in order.
    Chain {
        /// Adjusters, first applied first.
        adjusters: Vec<Adjuster>,
    },
}

fn unbounded() -> f64 {
    f64::INFINITY
}

impl Adjuster {
    /// Returns the adjusted value.
    pub fn adjust(&self, value: f64) -> f64 {
        match self {
            Self::Absolute => value.abs(),
            Self::Exp => value.exp(),
            Self::Amplify { factor } => value * factor,
            // Not `f64::clamp`: that panics when min > max.
            Self::Clamp { min, max } => {
                if value > *max {
                    *max
                } else if value < *min {
                    *min
                } else {
                    value
                }
            }
            Self::Chain { adjusters } => adjusters
                .iter()
                .fold(value, |v, adjuster| adjuster.adjust(v)),
        }
    }

    /// Folds a list of adjusters into a single one, `None` when the list is empty.
    pub fn from_list(list: &[Adjuster]) -> Option<Self> {
        match list {
            [] => None,
            [single] => Some(single.clone()),
            many => Some(Self::Chain {
                adjusters: many.to_vec(),
            }),
        }
    }
}
