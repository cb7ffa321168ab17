use serde::Serialize;

/// A plant's offer for one tick.
///
/// The marginal cost curve is `2 * a * q + b`; the plant can deliver any
/// quantity in `[q_min, q_max]`. A bid with `a == 0 && b == 0` is renewable
/// and always fully taken.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bid {
    /// Quadratic cost coefficient.
    pub a: f64,
    /// Linear cost coefficient.
    pub b: f64,
    /// Minimum deliverable quantity.
    pub q_min: f64,
    /// Maximum deliverable quantity.
    pub q_max: f64,
}

impl Bid {
    /// Creates a bid.
    pub fn new(a: f64, b: f64, q_min: f64, q_max: f64) -> Self {
        Self { a, b, q_min, q_max }
    }

    /// A zero-cost must-take bid for `quantity`.
    pub fn renewable(quantity: f64) -> Self {
        Self::new(0.0, 0.0, 0.0, quantity)
    }

    /// `true` for zero-cost must-take bids.
    pub fn is_renewable(&self) -> bool {
        self.a == 0.0 && self.b == 0.0
    }

    /// Marginal cost at quantity `q`.
    pub fn marginal_cost(&self, q: f64) -> f64 {
        2.0 * self.a * q + self.b
    }

    /// Quantity offered at price `lambda`, clamped to the bid's range.
    ///
    /// Bids without a quadratic term cannot be solved for a quantity and
    /// return `q_min`.
    pub fn quantity_at(&self, lambda: f64) -> f64 {
        if self.a == 0.0 {
            return self.q_min;
        }
        let q = (lambda - self.b) / (2.0 * self.a);
        if q < self.q_min {
            self.q_min
        } else if q > self.q_max {
            self.q_max
        } else {
            q
        }
    }
}
