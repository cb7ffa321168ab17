//! Integration tests for clearing, forecasting windows and learners.

mod common;

use rand::SeedableRng;
use rand::rngs::StdRng;

use power_market_sim::forecast::{AdjustedWindowMax, Adjuster, PeriodicWindow};
use power_market_sim::learning::{PropensityLearner, QLearner};
use power_market_sim::market::{Bid, ClearingConfig, MarketClearingEngine};

#[test]
fn two_conventional_bids_share_demand() {
    let engine = MarketClearingEngine::default();
    let bids = [
        common::conventional(1.0, 2.0, 0.0, 100.0),
        common::conventional(2.0, 0.0, 0.0, 50.0),
    ];

    let result = engine.clear(&bids, 60.0);

    assert!(result.converged);
    assert!((result.total_quota() - 60.0).abs() <= 0.1);
    for (quota, bid) in result.quotas.iter().zip(&bids) {
        assert!(*quota >= bid.q_min && *quota <= bid.q_max);
    }
    // equal marginal cost at the clearing price
    let lambda = result.clearing_price;
    assert!((bids[0].marginal_cost(result.quotas[0]) - lambda).abs() < 1e-9);
    assert!((bids[1].marginal_cost(result.quotas[1]) - lambda).abs() < 1e-9);
}

#[test]
fn renewable_taken_first_and_residual_sets_price() {
    let engine = MarketClearingEngine::default();
    let bids = [Bid::renewable(50.0), common::conventional(1.0, 2.0, 0.0, 100.0)];

    let result = engine.clear(&bids, 80.0);

    assert!(result.converged);
    assert_eq!(result.quotas[0], 50.0);
    assert_eq!(result.residual_demand, 30.0);
    assert!((result.quotas[1] - 30.0).abs() <= 0.1);
    // q = (lambda - 2) / 2 within accuracy of 30
    assert!((result.clearing_price - 62.0).abs() <= 0.2 + 1e-9);
}

#[test]
fn capacity_shortfall_reports_insufficient_power() {
    let engine = MarketClearingEngine::new(ClearingConfig {
        stop_lock: 200,
        ..ClearingConfig::default()
    });
    let bids = [common::conventional(1.0, 2.0, 0.0, 10.0)];

    let result = engine.clear(&bids, 100.0);

    assert!(!result.converged);
    assert_eq!(result.iterations, 200);
    assert_eq!(result.quotas[0], 10.0);
    assert!((result.epsilon - 90.0).abs() < 1e-9);
}

#[test]
fn periodic_window_sums_last_values() {
    let mut window = PeriodicWindow::new(5, 10);
    for v in 1..=12 {
        window.add(f64::from(v));
    }

    // window holds 3..=12
    assert_eq!(window.window_sum(), (3..=12).sum::<i32>() as f64);
    let kept: Vec<f64> = (3..=12).map(f64::from).collect();
    for slot in 0..5 {
        let expected: f64 = kept
            .iter()
            .enumerate()
            // value v was added at tick v - 1
            .filter(|(i, _)| (i + 2) % 5 == slot)
            .map(|(_, v)| v)
            .sum();
        assert_eq!(window.slot_sum(slot), expected, "slot {slot}");
    }
    assert_eq!(window.recent_sum(), (8..=12).sum::<i32>() as f64);
}

#[test]
fn window_max_tracks_recent_period() {
    let mut window = AdjustedWindowMax::new(3, 9, Adjuster::Absolute);
    for v in [-50.0, 1.0, 2.0, 3.0, 4.0] {
        window.add(v);
    }
    // only the last three samples count
    assert_eq!(window.recent_max(), 4.0);
    assert!((window.load_factor() - 0.75).abs() < 1e-12);
}

#[test]
fn q_learner_moves_towards_rewarded_action() {
    let mut learner = QLearner::uniform(3, 0.5, 0.5);
    learner.learn(2, 4.0);
    // (1 - 0.5) * 1/3 + 0.5 * 4 * 1/3
    let expected = [1.0 / 3.0, 1.0 / 3.0, 5.0 / 6.0];
    for (value, want) in learner.values().iter().zip(expected) {
        assert!((value - want).abs() < 1e-12, "{value} != {want}");
    }

    let mut rng = StdRng::seed_from_u64(3);
    let picks = (0..2000)
        .filter(|_| learner.select_action(&mut rng) == 2)
        .count();
    // expected share (5/6) / (3/2) = 5/9
    assert!(picks > 1000 && picks < 1250, "picked action 2 {picks} times");
}

#[test]
fn propensity_floor_shifts_all_values() {
    let mut learner = PropensityLearner::new(3, 0.5, 1.0);
    learner.learn(0, -10.0);
    let values = learner.values();
    assert!(values.iter().all(|v| *v >= 1.0));
    assert_eq!(values[0], 1.0);
    assert!(learner.offset() > 0.0);
}
