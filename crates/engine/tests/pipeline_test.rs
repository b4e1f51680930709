//! Integration tests for the compute chain against the in-memory store:
//! cold-start labelling, leakage, idempotence, weight renormalization and
//! the transmission -> stress dependency.

use chrono::{Days, NaiveDate};
use configuration::Config;
use core_types::{RawObservation, TransmissionRegime};
use engine::{
    BaselineResolver, EngineError, Pipeline, StressIndexEngine, TransmissionScoreEngine, datasets,
    metrics,
};
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use std::sync::Arc;
use store::{MemoryStore, MetricStore, SeriesWriter};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Seeds `count` consecutive daily observations ending at `last`, with
/// values produced by `value_at(i)` for i in `0..count` (oldest first).
async fn seed_series(
    store: &MemoryStore,
    series_id: &str,
    last: NaiveDate,
    count: usize,
    value_at: impl Fn(usize) -> f64,
) {
    for i in 0..count {
        let d = last
            .checked_sub_days(Days::new((count - 1 - i) as u64))
            .unwrap();
        store
            .upsert_observation(&RawObservation {
                series_id: series_id.to_string(),
                date: d,
                value: Decimal::from_f64(value_at(i)).unwrap(),
                source: "test".to_string(),
            })
            .await
            .unwrap();
    }
}

/// Seeds every series of the default map with mildly varying histories so
/// all five families are computable for `target`.
async fn seed_all_families(store: &MemoryStore, config: &Config, target: NaiveDate) {
    let s = &config.series;
    let n = 300;
    seed_series(store, &s.overnight_rate, target, n, |i| {
        3.0 + (i % 11) as f64 * 0.03
    })
    .await;
    seed_series(store, &s.interbank_spread, target, n, |i| {
        0.2 + (i % 7) as f64 * 0.01
    })
    .await;
    seed_series(store, &s.curve_slope, target, n, |i| {
        1.0 + (i % 13) as f64 * 0.02
    })
    .await;
    seed_series(store, &s.curve_level, target, n, |i| {
        6.5 + (i % 9) as f64 * 0.03
    })
    .await;
    seed_series(store, &s.curve_curvature, target, n, |i| {
        -0.1 + (i % 5) as f64 * 0.02
    })
    .await;
    seed_series(store, &s.auction_bid_to_cover, target, n, |i| {
        2.1 + (i % 6) as f64 * 0.08
    })
    .await;
    seed_series(store, &s.auction_sold, target, n, |i| {
        150.0 + (i % 8) as f64 * 5.0
    })
    .await;
    seed_series(store, &s.auction_cutoff, target, n, |i| {
        6.8 + (i % 10) as f64 * 0.02
    })
    .await;
    seed_series(store, &s.turnover_value, target, n, |i| {
        900.0 + (i % 12) as f64 * 20.0
    })
    .await;
    seed_series(store, &s.policy_rate, target, n, |i| {
        if i < 150 { 5.0 } else { 5.5 }
    })
    .await;
    seed_series(store, &s.term_premium, target, n, |i| {
        0.8 + (i % 14) as f64 * 0.01
    })
    .await;
}

#[tokio::test]
async fn empty_store_yields_labelled_neutral_score() {
    let store = Arc::new(MemoryStore::new());
    let config = Config::default();
    let engine = TransmissionScoreEngine::new(Arc::clone(&store), &config);

    let result = engine.compute(date(2024, 1, 2)).await.unwrap();

    assert_eq!(result.score, 50.0);
    assert_eq!(result.regime, TransmissionRegime::B2);
    assert!(result.data_availability.neutral_fallback);
    assert_eq!(result.data_availability.included.len(), 0);
    assert_eq!(result.data_availability.missing.len(), 5);

    // The persisted basis marker must distinguish the fallback from a
    // computed reading.
    let basis = store
        .read_metric(date(2024, 1, 2), datasets::TRANSMISSION, metrics::SCORE_BASIS)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(basis.as_text(), Some(metrics::BASIS_NEUTRAL));
}

#[tokio::test]
async fn full_history_produces_computed_score() {
    let store = Arc::new(MemoryStore::new());
    let config = Config::default();
    let target = date(2024, 6, 14);
    seed_all_families(&store, &config, target).await;

    let engine = TransmissionScoreEngine::new(Arc::clone(&store), &config);
    let result = engine.compute(target).await.unwrap();

    assert!(!result.data_availability.neutral_fallback);
    assert_eq!(result.data_availability.included.len(), 5);
    assert!(result.score >= 0.0 && result.score <= 100.0);
    assert_eq!(result.regime, TransmissionRegime::from_score(result.score));
}

#[tokio::test]
async fn recomputation_is_bit_identical() {
    let store = Arc::new(MemoryStore::new());
    let config = Config::default();
    let target = date(2024, 6, 14);
    seed_all_families(&store, &config, target).await;

    let engine = TransmissionScoreEngine::new(Arc::clone(&store), &config);
    let first = engine.compute(target).await.unwrap();
    let second = engine.compute(target).await.unwrap();

    assert_eq!(first, second);
}

#[tokio::test]
async fn future_observations_do_not_change_the_score() {
    let store = Arc::new(MemoryStore::new());
    let config = Config::default();
    let target = date(2024, 6, 14);
    seed_all_families(&store, &config, target).await;

    let engine = TransmissionScoreEngine::new(Arc::clone(&store), &config);
    let before = engine.compute(target).await.unwrap();

    // Wild prints after the target date must be invisible to a
    // recomputation "as of" the target.
    for series_id in [
        &config.series.overnight_rate,
        &config.series.curve_slope,
        &config.series.turnover_value,
    ] {
        seed_series(
            &store,
            series_id,
            target.checked_add_days(Days::new(30)).unwrap(),
            20,
            |_| 1e6,
        )
        .await;
    }

    let after = engine.compute(target).await.unwrap();
    assert_eq!(before, after);
}

#[tokio::test]
async fn effective_weights_sum_to_one_for_any_subset() {
    let store = Arc::new(MemoryStore::new());
    let config = Config::default();
    let target = date(2024, 6, 14);

    // Seed only three families: curve, liquidity, demand.
    let s = &config.series;
    seed_series(&store, &s.overnight_rate, target, 300, |i| {
        3.0 + (i % 11) as f64 * 0.03
    })
    .await;
    seed_series(&store, &s.curve_slope, target, 300, |i| {
        1.0 + (i % 13) as f64 * 0.02
    })
    .await;
    seed_series(&store, &s.turnover_value, target, 300, |i| {
        900.0 + (i % 12) as f64 * 20.0
    })
    .await;

    let engine = TransmissionScoreEngine::new(Arc::clone(&store), &config);
    let result = engine.compute(target).await.unwrap();

    assert!(!result.data_availability.neutral_fallback);
    assert_eq!(result.components.len(), 3);
    let weight_sum: f64 = result.components.iter().map(|c| c.weight).sum();
    assert!((weight_sum - 1.0).abs() < 1e-9, "weights summed to {weight_sum}");
    assert_eq!(
        result.data_availability.missing,
        vec!["supply".to_string(), "policy".to_string()]
    );
}

#[tokio::test]
async fn stress_requires_transmission_first() {
    let store = Arc::new(MemoryStore::new());
    let config = Config::default();
    let engine = StressIndexEngine::new(Arc::clone(&store), &config);

    let err = engine.compute(date(2024, 1, 2)).await.unwrap_err();
    assert!(matches!(err, EngineError::DependencyMissing { .. }));
}

#[tokio::test]
async fn stress_composite_and_drivers() {
    let store = Arc::new(MemoryStore::new());
    let config = Config::default();
    let target = date(2024, 6, 14);
    seed_all_families(&store, &config, target).await;

    let transmission = TransmissionScoreEngine::new(Arc::clone(&store), &config);
    transmission.compute(target).await.unwrap();

    let stress = StressIndexEngine::new(Arc::clone(&store), &config);
    let result = stress.compute(target).await.unwrap();

    assert!(result.stress_index >= 0.0 && result.stress_index <= 100.0);
    assert!(result.drivers.len() <= 3);
    assert!(!result.data_availability.neutral_fallback);
    assert_eq!(result.data_availability.included.len(), 5);

    // Drivers are sorted by absolute contribution, descending.
    for pair in result.drivers.windows(2) {
        assert!(pair[0].contribution.abs() >= pair[1].contribution.abs());
    }
}

#[tokio::test]
async fn stress_reflects_neutral_transmission_basis() {
    let store = Arc::new(MemoryStore::new());
    let config = Config::default();
    let target = date(2024, 6, 14);

    // Only the stress sub-score series are seeded; the transmission score
    // itself will be a cold-start neutral fallback.
    let s = &config.series;
    seed_series(&store, &s.overnight_rate, target, 300, |i| {
        3.0 + (i % 11) as f64 * 0.03
    })
    .await;
    seed_series(&store, &s.curve_slope, target, 300, |i| {
        1.0 + (i % 13) as f64 * 0.02
    })
    .await;

    let transmission = TransmissionScoreEngine::new(Arc::clone(&store), &config);
    let t = transmission.compute(target).await.unwrap();
    assert!(t.data_availability.neutral_fallback);

    let stress = StressIndexEngine::new(Arc::clone(&store), &config);
    let result = stress.compute(target).await.unwrap();
    assert!(result.data_availability.neutral_fallback);
}

#[tokio::test]
async fn baseline_skips_weekend_gap() {
    let store = Arc::new(MemoryStore::new());
    let config = Config::default();

    // Friday 2024-01-05 computed (cold-start neutral is still a computed
    // record); Saturday/Sunday have nothing.
    let friday = date(2024, 1, 5);
    let monday = date(2024, 1, 8);
    let engine = TransmissionScoreEngine::new(Arc::clone(&store), &config);
    engine.compute(friday).await.unwrap();

    let resolver = BaselineResolver::new(Arc::clone(&store));
    assert_eq!(resolver.resolve(monday).await.unwrap(), Some(friday));

    // First-ever computation has no baseline.
    assert_eq!(resolver.resolve(friday).await.unwrap(), None);
}

#[tokio::test]
async fn range_run_skips_already_computed_dates() {
    let store = Arc::new(MemoryStore::new());
    let config = Config::default();
    let pipeline = Pipeline::new(Arc::clone(&store), &config);

    let start = date(2024, 1, 1);
    let end = date(2024, 1, 5);

    let first = pipeline.run_range(start, end, true).await.unwrap();
    assert_eq!(first.computed, 5);
    assert_eq!(first.skipped, 0);

    // A resumed run over the same range touches nothing.
    let second = pipeline.run_range(start, end, true).await.unwrap();
    assert_eq!(second.computed, 0);
    assert_eq!(second.skipped, 5);

    // Without skip-existing the dates are recomputed idempotently.
    let third = pipeline.run_range(start, end, false).await.unwrap();
    assert_eq!(third.computed, 5);
}

#[tokio::test]
async fn pipeline_runs_end_to_end_on_partial_data() {
    let store = Arc::new(MemoryStore::new());
    let config = Config::default();
    let target = date(2024, 6, 14);
    seed_all_families(&store, &config, target).await;

    let pipeline = Pipeline::new(Arc::clone(&store), &config);
    let outcome = pipeline.run_date(target).await.unwrap();

    assert_eq!(outcome.date, target);
    assert!(!outcome.transmission.data_availability.neutral_fallback);
    assert!(outcome.stress.stress_index >= 0.0);
}
