/// Position of one tick within the simulated horizon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    /// Absolute tick index, starting at 0.
    pub index: usize,
    /// `index % period`.
    pub slot: usize,
    /// `index / period`.
    pub cycle: usize,
}

/// A simulation clock that walks a fixed number of cycles tick by tick.
///
/// # Examples
///
/// ```
/// use power_market_sim::sim::clock::Clock;
///
/// let mut clock = Clock::new(3, 2);
/// let mut slots = Vec::new();
///
/// clock.run(|tick| slots.push(tick.slot));
/// assert_eq!(slots, vec![0, 1, 2, 0, 1, 2]);
/// ```
pub struct Clock {
    /// Next tick index
    current: usize,
    /// Ticks per cycle
    period: usize,
    /// Total ticks to run
    total: usize,
}

impl Clock {
    /// Creates a clock covering `cycles` cycles of `period` ticks.
    ///
    /// # Arguments
    ///
    /// * `period` - Ticks per cycle (clamped to at least 1)
    /// * `cycles` - Number of cycles
    pub fn new(period: usize, cycles: usize) -> Self {
        let period = period.max(1);
        Self {
            current: 0,
            period,
            total: period * cycles,
        }
    }

    /// Advances the clock by one tick.
    ///
    /// # Returns
    ///
    /// * `Some(tick)` - The tick before advancing
    /// * `None` - If every tick has been produced
    pub fn tick(&mut self) -> Option<Tick> {
        if self.current < self.total {
            let index = self.current;
            self.current += 1;
            Some(Tick {
                index,
                slot: index % self.period,
                cycle: index / self.period,
            })
        } else {
            None
        }
    }

    /// Ticks not yet produced.
    pub fn remaining(&self) -> usize {
        self.total - self.current
    }

    /// Runs a function for each remaining tick.
    pub fn run(&mut self, mut f: impl FnMut(Tick)) {
        while let Some(tick) = self.tick() {
            f(tick);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_clock() {
        let clock = Clock::new(24, 2);
        assert_eq!(clock.current, 0);
        assert_eq!(clock.total, 48);
        assert_eq!(clock.remaining(), 48);
    }

    #[test]
    fn test_tick_wraps_slots() {
        let mut clock = Clock::new(2, 2);
        let ticks: Vec<(usize, usize)> = std::iter::from_fn(|| clock.tick())
            .map(|t| (t.slot, t.cycle))
            .collect();
        assert_eq!(ticks, vec![(0, 0), (1, 0), (0, 1), (1, 1)]);
        assert_eq!(clock.tick(), None);
    }

    #[test]
    fn test_empty_clock() {
        let mut clock = Clock::new(24, 0);
        assert_eq!(clock.tick(), None);

        let mut was_called = false;
        clock.run(|_| was_called = true);
        assert!(!was_called);
    }
}
