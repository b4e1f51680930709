//! Integration tests for alert detection: trigger conditions, evidence
//! completeness, threshold overrides and graceful handling of partial data.

use chrono::{Days, NaiveDate};
use configuration::Config;
use core_types::{
    AlertSeverity, AlertThreshold, ComponentMetric, RawObservation, ThresholdParams, TriggerMethod,
};
use engine::{AlertEngine, codes, datasets, metrics};
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use std::sync::Arc;
use store::{MemoryStore, MetricStore, SeriesWriter, ThresholdStore};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

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

#[tokio::test]
async fn liquidity_spike_emits_zscore_evidence() {
    let store = Arc::new(MemoryStore::new());
    let config = Config::default();
    let target = date(2024, 6, 14);

    // 60 consecutive days with the overnight rate grinding up from 3.0%
    // and surging to 6.0% on the final date.
    seed_series(&store, &config.series.overnight_rate, target, 60, |i| {
        if i == 59 { 6.0 } else { 3.0 + i as f64 * 0.008 }
    })
    .await;

    let engine = AlertEngine::new(Arc::clone(&store), &config);
    let events = engine.detect(target).await.unwrap();

    let spike = events
        .iter()
        .find(|e| e.alert_code == codes::LIQUIDITY_SPIKE)
        .expect("liquidity spike must trigger");

    assert_eq!(spike.evidence.method, TriggerMethod::Zscore);
    assert_eq!(spike.evidence.unit, "sigma");
    assert_eq!(spike.evidence.metric, config.series.overnight_rate);
    assert_eq!(spike.evidence.window, 60);
    assert_eq!(spike.evidence.n, 59);
    assert!(spike.metric_value >= 2.0);
    assert_eq!(spike.threshold, 2.0);
    assert_eq!(spike.date, target);
}

#[tokio::test]
async fn quiet_market_emits_nothing() {
    let store = Arc::new(MemoryStore::new());
    let config = Config::default();
    let target = date(2024, 6, 14);

    seed_series(&store, &config.series.overnight_rate, target, 60, |i| {
        3.0 + (i % 5) as f64 * 0.01
    })
    .await;
    seed_series(&store, &config.series.turnover_value, target, 300, |i| {
        900.0 + (i % 12) as f64 * 20.0
    })
    .await;

    let engine = AlertEngine::new(Arc::clone(&store), &config);
    let events = engine.detect(target).await.unwrap();
    assert!(events.is_empty(), "unexpected events: {events:?}");
}

#[tokio::test]
async fn detect_survives_an_empty_store() {
    let store = Arc::new(MemoryStore::new());
    let config = Config::default();

    // No series, no metrics, no thresholds: every rule must skip, none
    // may fail the call.
    let engine = AlertEngine::new(Arc::clone(&store), &config);
    let events = engine.detect(date(2024, 6, 14)).await.unwrap();
    assert!(events.is_empty());
}

#[tokio::test]
async fn policy_rate_change_is_event_based() {
    let store = Arc::new(MemoryStore::new());
    let config = Config::default();
    let target = date(2024, 6, 14);

    // Rate parked at 5.0% and hiked to 5.5% on the target date. The
    // previous print is two days back, so the evidence must name that
    // date, not "yesterday".
    let prior = date(2024, 6, 12);
    seed_series(&store, &config.series.policy_rate, prior, 30, |_| 5.0).await;
    seed_series(&store, &config.series.policy_rate, target, 1, |_| 5.5).await;

    let engine = AlertEngine::new(Arc::clone(&store), &config);
    let events = engine.detect(target).await.unwrap();

    let change = events
        .iter()
        .find(|e| e.alert_code == codes::POLICY_RATE_CHANGE)
        .expect("policy change must trigger");

    assert_eq!(change.evidence.method, TriggerMethod::Event);
    assert_eq!(change.evidence.unit, "pp");
    assert_eq!(change.evidence.baseline_date, Some(prior));
    assert!((change.metric_value - 0.5).abs() < 1e-9);
    assert_eq!(change.severity, AlertSeverity::Info);
}

#[tokio::test]
async fn weak_auction_uses_absolute_method() {
    let store = Arc::new(MemoryStore::new());
    let config = Config::default();
    let target = date(2024, 6, 14);

    seed_series(&store, &config.series.auction_bid_to_cover, target, 20, |i| {
        if i == 19 { 1.5 } else { 2.3 }
    })
    .await;

    let engine = AlertEngine::new(Arc::clone(&store), &config);
    let events = engine.detect(target).await.unwrap();

    let weak = events
        .iter()
        .find(|e| e.alert_code == codes::AUCTION_WEAK_DEMAND)
        .expect("weak auction must trigger");
    assert_eq!(weak.evidence.method, TriggerMethod::Absolute);
    assert_eq!(weak.evidence.unit, "ratio");
    assert!((weak.metric_value - 1.5).abs() < 1e-9);
}

#[tokio::test]
async fn turnover_drop_triggers_on_the_downside_only() {
    let store = Arc::new(MemoryStore::new());
    let config = Config::default();
    let target = date(2024, 6, 14);

    // Steady turnover, then a collapse on the target date.
    seed_series(&store, &config.series.turnover_value, target, 300, |i| {
        if i == 299 { 200.0 } else { 900.0 + (i % 12) as f64 * 20.0 }
    })
    .await;

    let engine = AlertEngine::new(Arc::clone(&store), &config);
    let events = engine.detect(target).await.unwrap();

    let drop = events
        .iter()
        .find(|e| e.alert_code == codes::TURNOVER_DROP)
        .expect("turnover drop must trigger");
    assert_eq!(drop.evidence.method, TriggerMethod::Zscore);
    assert!(drop.metric_value <= -2.0);
}

#[tokio::test]
async fn score_ceilings_read_persisted_composites() {
    let store = Arc::new(MemoryStore::new());
    let config = Config::default();
    let target = date(2024, 6, 14);

    store
        .write_metric(&ComponentMetric::numeric(
            target,
            datasets::TRANSMISSION,
            metrics::TRANSMISSION_SCORE,
            85.0,
            vec![],
        ))
        .await
        .unwrap();
    store
        .write_metric(&ComponentMetric::numeric(
            target,
            datasets::STRESS,
            metrics::STRESS_INDEX,
            92.5,
            vec![],
        ))
        .await
        .unwrap();

    let engine = AlertEngine::new(Arc::clone(&store), &config);
    let events = engine.detect(target).await.unwrap();

    let high = events
        .iter()
        .find(|e| e.alert_code == codes::TRANSMISSION_HIGH)
        .expect("transmission ceiling must trigger");
    assert_eq!(high.severity, AlertSeverity::Critical);
    assert_eq!(high.evidence.n, 1);

    let stress = events
        .iter()
        .find(|e| e.alert_code == codes::STRESS_HIGH)
        .expect("stress ceiling must trigger");
    assert!((stress.metric_value - 92.5).abs() < 1e-9);
}

#[tokio::test]
async fn transmission_jump_names_its_baseline() {
    let store = Arc::new(MemoryStore::new());
    let config = Config::default();
    let friday = date(2024, 6, 7);
    let monday = date(2024, 6, 10);

    store
        .write_metric(&ComponentMetric::numeric(
            friday,
            datasets::TRANSMISSION,
            metrics::TRANSMISSION_SCORE,
            40.0,
            vec![],
        ))
        .await
        .unwrap();
    store
        .write_metric(&ComponentMetric::numeric(
            monday,
            datasets::TRANSMISSION,
            metrics::TRANSMISSION_SCORE,
            55.0,
            vec![],
        ))
        .await
        .unwrap();

    let engine = AlertEngine::new(Arc::clone(&store), &config);
    let events = engine.detect(monday).await.unwrap();

    let jump = events
        .iter()
        .find(|e| e.alert_code == codes::TRANSMISSION_JUMP)
        .expect("score jump must trigger");
    // The baseline is the previous computed date across the weekend gap.
    assert_eq!(jump.evidence.baseline_date, Some(friday));
    assert!((jump.metric_value - 15.0).abs() < 1e-9);
}

#[tokio::test]
async fn stored_thresholds_override_defaults() {
    let store = Arc::new(MemoryStore::new());
    let config = Config::default();
    let target = date(2024, 6, 14);

    seed_series(&store, &config.series.overnight_rate, target, 60, |i| {
        if i == 59 { 6.0 } else { 3.0 + i as f64 * 0.008 }
    })
    .await;

    // An operator dialled the rule down to near-impossible sensitivity.
    store
        .upsert_threshold(&AlertThreshold {
            alert_code: codes::LIQUIDITY_SPIKE.to_string(),
            enabled: true,
            severity: AlertSeverity::Warning,
            params: ThresholdParams {
                method: TriggerMethod::Zscore,
                value: 50.0,
                window: Some(60),
            },
        })
        .await
        .unwrap();

    let engine = AlertEngine::new(Arc::clone(&store), &config);
    let events = engine.detect(target).await.unwrap();
    assert!(
        !events.iter().any(|e| e.alert_code == codes::LIQUIDITY_SPIKE),
        "override must suppress the spike"
    );
}

#[tokio::test]
async fn disabled_rules_are_skipped() {
    let store = Arc::new(MemoryStore::new());
    let config = Config::default();
    let target = date(2024, 6, 14);

    seed_series(&store, &config.series.overnight_rate, target, 60, |i| {
        if i == 59 { 6.0 } else { 3.0 + i as f64 * 0.008 }
    })
    .await;

    store
        .upsert_threshold(&AlertThreshold {
            alert_code: codes::LIQUIDITY_SPIKE.to_string(),
            enabled: false,
            severity: AlertSeverity::Warning,
            params: ThresholdParams {
                method: TriggerMethod::Zscore,
                value: 2.0,
                window: Some(60),
            },
        })
        .await
        .unwrap();

    let engine = AlertEngine::new(Arc::clone(&store), &config);
    let events = engine.detect(target).await.unwrap();
    assert!(!events.iter().any(|e| e.alert_code == codes::LIQUIDITY_SPIKE));
}

#[tokio::test]
async fn cross_market_rule_degrades_silently_without_foreign_data() {
    let store = Arc::new(MemoryStore::new());
    let config = Config::default();
    let target = date(2024, 6, 14);

    // Domestic long yields exist, the foreign reference does not; the
    // comparator must be omitted, not an error.
    seed_series(&store, &config.series.curve_level, target, 300, |i| {
        6.5 + (i % 9) as f64 * 0.03
    })
    .await;

    let engine = AlertEngine::new(Arc::clone(&store), &config);
    let events = engine.detect(target).await.unwrap();
    assert!(
        !events
            .iter()
            .any(|e| e.alert_code == codes::CROSS_MARKET_DIVERGENCE)
    );
}

#[tokio::test]
async fn cross_market_divergence_triggers_when_spread_dislocates() {
    let store = Arc::new(MemoryStore::new());
    let config = Config::default();
    let target = date(2024, 6, 14);

    seed_series(&store, &config.series.curve_level, target, 300, |i| {
        if i == 299 { 9.5 } else { 6.5 + (i % 9) as f64 * 0.03 }
    })
    .await;
    seed_series(&store, &config.series.foreign_reference_yield, target, 300, |i| {
        4.0 + (i % 6) as f64 * 0.02
    })
    .await;

    let engine = AlertEngine::new(Arc::clone(&store), &config);
    let events = engine.detect(target).await.unwrap();

    let divergence = events
        .iter()
        .find(|e| e.alert_code == codes::CROSS_MARKET_DIVERGENCE)
        .expect("spread dislocation must trigger");
    assert_eq!(divergence.evidence.method, TriggerMethod::Zscore);
}
