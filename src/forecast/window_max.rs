//! Recent-range maximum on top of a [`PeriodicWindow`].

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use super::{Adjuster, PeriodicWindow};

/// Heap entry ordered by adjusted value, ties broken by tick.
#[derive(Debug, Clone, Copy)]
struct RankedSample {
    value: f64,
    tick: u64,
}

impl PartialEq for RankedSample {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for RankedSample {}

impl PartialOrd for RankedSample {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RankedSample {
    fn cmp(&self, other: &Self) -> Ordering {
        self.value
            .total_cmp(&other.value)
            .then(self.tick.cmp(&other.tick))
    }
}

/// A [`PeriodicWindow`] that also tracks the maximum adjusted value over the
/// recent range (the latest `period` samples).
///
/// Samples are passed through the [`Adjuster`] before ranking, so with
/// [`Adjuster::Absolute`] the maximum is the largest magnitude. The window
/// aggregates themselves are computed from the raw values.
///
/// Entries that leave the recent range are dropped lazily when they reach the
/// top of the heap; the heap is compacted once it holds more than twice the
/// recent range.
///
/// # Examples
///
/// ```
/// use power_market_sim::forecast::{Adjuster, AdjustedWindowMax};
///
/// let mut demand = AdjustedWindowMax::new(3, 6, Adjuster::Absolute);
/// for v in [5.0, -9.0, 2.0, 1.0, 4.0] {
///     demand.add(v);
/// }
/// // recent range is [2.0, 1.0, 4.0]
/// assert_eq!(demand.recent_max(), 4.0);
/// ```
#[derive(Debug, Clone)]
pub struct AdjustedWindowMax {
    window: PeriodicWindow,
    adjuster: Adjuster,
    heap: BinaryHeap<RankedSample>,
}

impl AdjustedWindowMax {
    /// Creates an empty window ranking samples through `adjuster`.
    ///
    /// # Panics
    ///
    /// Panics if `period` or `window_size` is zero.
    pub fn new(period: usize, window_size: usize, adjuster: Adjuster) -> Self {
        Self {
            window: PeriodicWindow::new(period, window_size),
            adjuster,
            heap: BinaryHeap::with_capacity(2 * period + 1),
        }
    }

    /// Appends the sample for the next tick and returns that tick's index.
    pub fn add(&mut self, value: f64) -> u64 {
        let tick = self.window.add(value);
        self.heap.push(RankedSample {
            value: self.adjuster.adjust(value),
            tick,
        });

        let first_recent = self.first_recent_tick();
        while self.heap.peek().is_some_and(|top| top.tick < first_recent) {
            self.heap.pop();
        }
        if self.heap.len() > 2 * self.window.period() {
            self.heap.retain(|entry| entry.tick >= first_recent);
        }
        tick
    }

    fn first_recent_tick(&self) -> u64 {
        self.window.ticks_observed() - self.window.recent_len() as u64
    }

    /// Largest adjusted value among the recent range, 0 when empty.
    pub fn recent_max(&self) -> f64 {
        self.heap.peek().map_or(0.0, |top| top.value)
    }

    /// `|recent_mean / recent_max|`, 0 when the maximum is 0.
    pub fn load_factor(&self) -> f64 {
        let max = self.recent_max();
        if max == 0.0 {
            0.0
        } else {
            (self.window.recent_mean() / max).abs()
        }
    }

    /// The underlying window of raw samples.
    pub fn window(&self) -> &PeriodicWindow {
        &self.window
    }

    /// The adjuster applied before ranking.
    pub fn adjuster(&self) -> &Adjuster {
        &self.adjuster
    }
}
