//! Period-aware running statistics over a bounded sample window.

use std::collections::VecDeque;

use crate::sim::types::SimConfig;

/// A bounded, tick-ordered sample buffer with incrementally maintained
/// aggregates.
///
/// Every call to [`add`](Self::add) records one sample for the next tick.
/// The window keeps the most recent `window_size` samples and tracks:
///
/// - the sum of the whole window,
/// - the sum of the most recent `period` samples ("recent" range),
/// - one partial sum per period slot (`tick % period`), used for
///   same-time-of-cycle forecasts,
/// - squared sums of the window and recent range, for variance.
///
/// # Examples
///
/// ```
/// use power_market_sim::forecast::PeriodicWindow;
///
/// let mut window = PeriodicWindow::new(2, 4);
/// for v in [1.0, 10.0, 3.0, 12.0] {
///     window.add(v);
/// }
/// assert_eq!(window.window_mean(), 6.5);
/// assert_eq!(window.recent_mean(), 7.5);
/// // next tick falls on slot 0: mean of 1.0 and 3.0
/// assert_eq!(window.period_mean(1), 2.0);
/// ```
#[derive(Debug, Clone)]
pub struct PeriodicWindow {
    period: usize,
    window_size: usize,
    samples: VecDeque<f64>,
    slot_sums: Vec<f64>,
    recent_sum: f64,
    recent_sq_sum: f64,
    window_sum: f64,
    window_sq_sum: f64,
    /// Number of samples ever added; also the tick index of the next sample.
    ticks: u64,
}

impl PeriodicWindow {
    /// Creates an empty window.
    ///
    /// # Arguments
    ///
    /// * `period` - Number of ticks in one cycle (must be > 0)
    /// * `window_size` - Maximum number of retained samples (must be > 0)
    ///
    /// # Panics
    ///
    /// Panics if `period` or `window_size` is zero.
    pub fn new(period: usize, window_size: usize) -> Self {
        assert!(period > 0, "period must be > 0");
        assert!(window_size > 0, "window_size must be > 0");
        Self {
            period,
            window_size,
            samples: VecDeque::with_capacity(window_size + 1),
            slot_sums: vec![0.0; period],
            recent_sum: 0.0,
            recent_sq_sum: 0.0,
            window_sum: 0.0,
            window_sq_sum: 0.0,
            ticks: 0,
        }
    }

    /// Creates an empty window sized from the simulation configuration.
    pub fn from_config(config: &SimConfig) -> Self {
        Self::new(config.period, config.window_size)
    }

    /// Appends the sample for the next tick and returns that tick's index.
    pub fn add(&mut self, value: f64) -> u64 {
        let tick = self.ticks;
        self.ticks += 1;

        self.samples.push_back(value);
        let slot = self.slot_of(tick);
        self.slot_sums[slot] += value;

        if self.samples.len() > self.period {
            let leaving = self.samples[self.samples.len() - self.period - 1];
            self.recent_sum += value - leaving;
            self.recent_sq_sum += value * value - leaving * leaving;
        } else {
            self.recent_sum += value;
            self.recent_sq_sum += value * value;
        }

        self.window_sum += value;
        self.window_sq_sum += value * value;

        while self.samples.len() > self.window_size {
            let Some(evicted) = self.samples.pop_front() else {
                break;
            };
            // Only reachable when window_size < period: the evicted sample
            // was still part of the recent range.
            if self.samples.len() < self.period {
                self.recent_sum -= evicted;
                self.recent_sq_sum -= evicted * evicted;
            }
            let evicted_tick = self.ticks - 1 - self.samples.len() as u64;
            let evicted_slot = self.slot_of(evicted_tick);
            self.slot_sums[evicted_slot] -= evicted;
            self.window_sum -= evicted;
            self.window_sq_sum -= evicted * evicted;
        }

        tick
    }

    fn slot_of(&self, tick: u64) -> usize {
        (tick % self.period as u64) as usize
    }

    /// Cycle length in ticks.
    pub fn period(&self) -> usize {
        self.period
    }

    /// Maximum number of retained samples.
    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Number of samples currently buffered.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Returns `true` when no sample has been buffered yet.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Total number of samples ever added.
    pub fn ticks_observed(&self) -> u64 {
        self.ticks
    }

    /// Slot of the most recently added sample, `None` before the first add.
    pub fn current_slot(&self) -> Option<usize> {
        self.ticks.checked_sub(1).map(|tick| self.slot_of(tick))
    }

    /// Most recently added sample.
    pub fn latest(&self) -> Option<f64> {
        self.samples.back().copied()
    }

    /// Buffered samples, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().copied()
    }

    /// Number of samples in the recent range: `min(len, period)`.
    pub fn recent_len(&self) -> usize {
        self.samples.len().min(self.period)
    }

    /// Sum of the recent range.
    pub fn recent_sum(&self) -> f64 {
        self.recent_sum
    }

    /// Mean of the recent range, 0 when empty.
    pub fn recent_mean(&self) -> f64 {
        match self.recent_len() {
            0 => 0.0,
            n => self.recent_sum / n as f64,
        }
    }

    /// Sum of every buffered sample.
    pub fn window_sum(&self) -> f64 {
        self.window_sum
    }

    /// Mean of every buffered sample, 0 when empty.
    pub fn window_mean(&self) -> f64 {
        match self.samples.len() {
            0 => 0.0,
            n => self.window_sum / n as f64,
        }
    }

    /// Partial sum of the buffered samples assigned to `slot`.
    ///
    /// # Panics
    ///
    /// Panics if `slot >= period`.
    pub fn slot_sum(&self, slot: usize) -> f64 {
        self.slot_sums[slot]
    }

    /// Number of buffered samples assigned to `slot`.
    pub fn slot_count(&self, slot: usize) -> usize {
        let Some(current) = self.current_slot() else {
            return 0;
        };
        let slot = slot % self.period;
        // Distance back from the latest sample to the newest sample in `slot`.
        let offset = (current + self.period - slot) % self.period;
        if offset < self.samples.len() {
            (self.samples.len() - 1 - offset) / self.period + 1
        } else {
            0
        }
    }

    /// Historical mean of the slot `foresight` ticks after the current slot.
    ///
    /// `period_mean(0)` averages the slot of the latest sample, and
    /// `period_mean(1)` forecasts the tick that has not been observed yet.
    /// Returns 0 when the target slot holds no sample.
    pub fn period_mean(&self, foresight: usize) -> f64 {
        let Some(current) = self.current_slot() else {
            return 0.0;
        };
        let slot = (current + foresight % self.period) % self.period;
        match self.slot_count(slot) {
            0 => 0.0,
            n => self.slot_sums[slot] / n as f64,
        }
    }

    /// Sample variance of the recent range, 0 with fewer than two samples.
    pub fn recent_variance(&self) -> f64 {
        sample_variance(self.recent_sum, self.recent_sq_sum, self.recent_len())
    }

    /// Sample standard deviation of the recent range.
    pub fn recent_std_dev(&self) -> f64 {
        self.recent_variance().sqrt()
    }

    /// Sample variance of the whole window, 0 with fewer than two samples.
    pub fn window_variance(&self) -> f64 {
        sample_variance(self.window_sum, self.window_sq_sum, self.samples.len())
    }

    /// Sample standard deviation of the whole window.
    pub fn window_std_dev(&self) -> f64 {
        self.window_variance().sqrt()
    }

    /// Mean of the latest `size` samples, recomputed from the buffer.
    pub fn mean_over(&self, size: usize) -> f64 {
        let n = size.min(self.samples.len());
        if n == 0 {
            return 0.0;
        }
        self.tail(n).sum::<f64>() / n as f64
    }

    /// Sample standard deviation of the latest `size` samples, recomputed
    /// from the buffer. 0 with fewer than two samples.
    pub fn std_dev_over(&self, size: usize) -> f64 {
        let n = size.min(self.samples.len());
        if n < 2 {
            return 0.0;
        }
        let mean = self.mean_over(n);
        let squares: f64 = self.tail(n).map(|v| (v - mean) * (v - mean)).sum();
        (squares / (n - 1) as f64).sqrt()
    }

    /// Relative spread of the recent range: `std_dev_over(period) / |recent_mean|`.
    pub fn coefficient_of_variation(&self) -> f64 {
        let mean = self.recent_mean().abs();
        if mean > 0.0 {
            self.std_dev_over(self.period) / mean
        } else {
            0.0
        }
    }

    fn tail(&self, n: usize) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().skip(self.samples.len() - n).copied()
    }
}

fn sample_variance(sum: f64, sq_sum: f64, n: usize) -> f64 {
    if n < 2 {
        return 0.0;
    }
    let n = n as f64;
    ((sq_sum - sum * sum / n) / (n - 1.0)).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Sums the reference samples that fall in `slot`, given the tick of the
    /// first reference sample.
    fn reference_slot_sum(reference: &[f64], first_tick: usize, period: usize, slot: usize) -> f64 {
        reference
            .iter()
            .enumerate()
            .filter(|(i, _)| (first_tick + i) % period == slot)
            .map(|(_, v)| v)
            .sum()
    }

    #[test]
    fn empty_window_means_are_zero() {
        let window = PeriodicWindow::new(24, 48);
        assert_eq!(window.window_mean(), 0.0);
        assert_eq!(window.recent_mean(), 0.0);
        assert_eq!(window.period_mean(0), 0.0);
        assert_eq!(window.period_mean(5), 0.0);
        assert_eq!(window.current_slot(), None);
    }

    #[test]
    fn period_five_window_ten_matches_manual_sums() {
        let mut window = PeriodicWindow::new(5, 10);
        for v in 1..=12 {
            window.add(v as f64);
        }

        // last 10 values: 3..=12
        assert_eq!(window.len(), 10);
        assert_eq!(window.window_sum(), (3..=12).sum::<i32>() as f64);

        // ticks 2..=11 hold values 3..=12; slot = tick % 5
        assert_eq!(window.slot_sum(0), 6.0 + 11.0); // ticks 5, 10
        assert_eq!(window.slot_sum(1), 7.0 + 12.0); // ticks 6, 11
        assert_eq!(window.slot_sum(2), 3.0 + 8.0); // ticks 2, 7
        assert_eq!(window.slot_sum(3), 4.0 + 9.0); // ticks 3, 8
        assert_eq!(window.slot_sum(4), 5.0 + 10.0); // ticks 4, 9

        // recent range: last 5 values 8..=12
        assert_eq!(window.recent_sum(), 50.0);
        assert_eq!(window.recent_mean(), 10.0);
    }

    #[test]
    fn evicted_samples_leave_their_slot() {
        let mut window = PeriodicWindow::new(2, 2);
        window.add(4.0);
        window.add(6.0);
        window.add(1.0);
        // tick 0 evicted from slot 0, tick 2 added to it
        assert_eq!(window.slot_sum(0), 1.0);
        assert_eq!(window.slot_count(0), 1);
        window.add(2.0);
        assert_eq!(window.slot_sum(1), 2.0);
        assert_eq!(window.window_sum(), 3.0);
    }

    #[test]
    fn aggregates_match_reference_buffer() {
        let period = 7;
        let window_size = 20;
        let mut window = PeriodicWindow::new(period, window_size);
        let mut reference: Vec<f64> = Vec::new();

        for n in 0..100 {
            let value = ((n * 37) % 23) as f64 - 11.0;
            window.add(value);
            reference.push(value);

            let start = reference.len().saturating_sub(window_size);
            let live = &reference[start..];
            let expected_mean = live.iter().sum::<f64>() / live.len() as f64;
            assert!((window.window_mean() - expected_mean).abs() < 1e-9);

            let recent_start = live.len().saturating_sub(period);
            let recent = &live[recent_start..];
            let expected_recent = recent.iter().sum::<f64>() / recent.len() as f64;
            assert!((window.recent_mean() - expected_recent).abs() < 1e-9);

            for slot in 0..period {
                let expected = reference_slot_sum(live, start, period, slot);
                assert!(
                    (window.slot_sum(slot) - expected).abs() < 1e-9,
                    "slot {slot} mismatch after {} samples",
                    n + 1
                );
            }
        }
    }

    #[test]
    fn window_smaller_than_period_keeps_recent_consistent() {
        let mut window = PeriodicWindow::new(10, 3);
        for v in [4.0, 8.0, 15.0, 16.0, 23.0] {
            window.add(v);
        }
        assert_eq!(window.len(), 3);
        assert_eq!(window.recent_len(), 3);
        assert_eq!(window.recent_sum(), 15.0 + 16.0 + 23.0);
        assert_eq!(window.window_sum(), window.recent_sum());
    }

    #[test]
    fn period_mean_averages_matching_slot() {
        let period = 4;
        let mut window = PeriodicWindow::new(period, 50);
        let mut reference = Vec::new();
        for n in 0..23 {
            let value = (n * n) as f64;
            window.add(value);
            reference.push(value);
        }
        let current = window.current_slot().unwrap_or(0);
        assert_eq!(current, 22 % period);

        for foresight in 0..period {
            let slot = (current + foresight) % period;
            let matching: Vec<f64> = reference
                .iter()
                .enumerate()
                .filter(|(tick, _)| tick % period == slot)
                .map(|(_, v)| *v)
                .collect();
            let expected = matching.iter().sum::<f64>() / matching.len() as f64;
            assert!((window.period_mean(foresight) - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn period_mean_without_history_for_slot_is_zero() {
        let mut window = PeriodicWindow::new(24, 48);
        window.add(5.0);
        window.add(7.0);
        assert_eq!(window.period_mean(0), 7.0);
        assert_eq!(window.period_mean(23), 5.0);
        assert_eq!(window.period_mean(1), 0.0);
    }

    #[test]
    fn variance_matches_recomputation() {
        let mut window = PeriodicWindow::new(5, 12);
        for v in [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0, 1.0, 3.0, 8.0, 6.0, 2.0, 9.0] {
            window.add(v);
        }
        assert!((window.recent_std_dev() - window.std_dev_over(5)).abs() < 1e-9);
        assert!((window.window_std_dev() - window.std_dev_over(12)).abs() < 1e-9);
        assert!((window.mean_over(5) - window.recent_mean()).abs() < 1e-12);
    }

    #[test]
    fn single_sample_statistics_do_not_divide_by_zero() {
        let mut window = PeriodicWindow::new(3, 3);
        window.add(4.0);
        assert_eq!(window.recent_variance(), 0.0);
        assert_eq!(window.std_dev_over(10), 0.0);
        assert_eq!(window.coefficient_of_variation(), 0.0);
    }

    #[test]
    #[should_panic]
    fn zero_period_panics() {
        PeriodicWindow::new(0, 4);
    }
}
