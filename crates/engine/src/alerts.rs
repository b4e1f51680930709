use crate::error::EngineError;
use crate::series::load_series_window;
use crate::{datasets, metrics};
use analytics::{ComponentScorer, RollingStats, WindowMode, select_window};
use chrono::NaiveDate;
use configuration::{AlertingConfig, Config, ScoringConfig, SeriesMap};
use core_types::{
    AlertEvent, AlertEvidence, AlertSeverity, AlertThreshold, ThresholdParams, TriggerMethod,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use store::{AlertStore, MetricStore, SeriesReader, ThresholdStore};
use uuid::Uuid;

/// The alert rule codes known to the engine. Evaluation order follows this
/// list; each rule is independent, so a data gap in one never blocks the
/// others.
pub mod codes {
    pub const LIQUIDITY_SPIKE: &str = "liquidity_spike";
    pub const CURVE_BEAR_STEEPENING: &str = "curve_bear_steepening";
    pub const AUCTION_WEAK_DEMAND: &str = "auction_weak_demand";
    pub const TURNOVER_DROP: &str = "turnover_drop";
    pub const POLICY_RATE_CHANGE: &str = "policy_rate_change";
    pub const TRANSMISSION_JUMP: &str = "transmission_jump";
    pub const TRANSMISSION_HIGH: &str = "transmission_high";
    pub const STRESS_HIGH: &str = "stress_high";
    pub const CROSS_MARKET_DIVERGENCE: &str = "cross_market_divergence";

    pub const ALL: [&str; 9] = [
        LIQUIDITY_SPIKE,
        CURVE_BEAR_STEEPENING,
        AUCTION_WEAK_DEMAND,
        TURNOVER_DROP,
        POLICY_RATE_CHANGE,
        TRANSMISSION_JUMP,
        TRANSMISSION_HIGH,
        STRESS_HIGH,
        CROSS_MARKET_DIVERGENCE,
    ];
}

/// A short-lived cache over the threshold store.
///
/// Sensitivity must be adjustable without redeploying, so thresholds are
/// data, not code; the cache keeps detection from hammering the store while
/// staying fresh within the configured TTL (at most five minutes).
struct ThresholdCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, (Instant, Option<AlertThreshold>)>>,
}

impl ThresholdCache {
    fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn get(&self, code: &str) -> Option<Option<AlertThreshold>> {
        let entries = self.entries.lock().ok()?;
        entries.get(code).and_then(|(loaded_at, threshold)| {
            if loaded_at.elapsed() < self.ttl {
                Some(threshold.clone())
            } else {
                None
            }
        })
    }

    fn put(&self, code: &str, threshold: Option<AlertThreshold>) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(code.to_string(), (Instant::now(), threshold));
        }
    }
}

/// Evaluates the configured alert rules for a date and persists triggered
/// events.
///
/// Every emitted event carries complete quantitative evidence (metric,
/// method, unit, sample size, window, baseline date where applicable); a
/// rule that cannot assemble full evidence is suppressed rather than
/// emitted half-documented.
pub struct AlertEngine<S> {
    store: Arc<S>,
    alerting: AlertingConfig,
    scoring: ScoringConfig,
    series: SeriesMap,
    scorer: ComponentScorer,
    cache: ThresholdCache,
}

impl<S> AlertEngine<S>
where
    S: SeriesReader + MetricStore + ThresholdStore + AlertStore,
{
    pub fn new(store: Arc<S>, config: &Config) -> Self {
        Self {
            store,
            alerting: config.alerting.clone(),
            scoring: config.scoring.clone(),
            series: config.series.clone(),
            scorer: ComponentScorer::new(config.scoring.auction_cover_ceiling),
            cache: ThresholdCache::new(Duration::from_secs(config.alerting.cache_ttl_secs)),
        }
    }

    /// Evaluates every enabled rule against `target`.
    ///
    /// Missing underlying data for one rule skips that rule only; the call
    /// as a whole fails only on store I/O errors. Triggered events are
    /// persisted (idempotent upsert on `(date, alert_code)`) and returned.
    #[tracing::instrument(skip(self), fields(date = %target))]
    pub async fn detect(&self, target: NaiveDate) -> Result<Vec<AlertEvent>, EngineError> {
        let mut events = Vec::new();

        for code in codes::ALL {
            let threshold = self.effective_threshold(code).await;
            if !threshold.enabled {
                tracing::debug!(code, "rule disabled, skipping");
                continue;
            }

            let event = self.evaluate(code, &threshold, target).await?;
            match event {
                Some(event) => {
                    self.store.write_alert(&event).await?;
                    tracing::info!(
                        code,
                        value = event.metric_value,
                        threshold = event.threshold,
                        "alert triggered"
                    );
                    events.push(event);
                }
                None => tracing::debug!(code, "rule not triggered"),
            }
        }

        Ok(events)
    }

    /// The threshold for a rule: the store override when one exists, the
    /// compiled-in default otherwise. Store failures fall back to the
    /// default too; a dead config store must not stop detection.
    async fn effective_threshold(&self, code: &str) -> AlertThreshold {
        if let Some(cached) = self.cache.get(code) {
            return cached.unwrap_or_else(|| self.default_threshold(code));
        }

        match self.store.read_threshold(code).await {
            Ok(stored) => {
                self.cache.put(code, stored.clone());
                stored.unwrap_or_else(|| self.default_threshold(code))
            }
            Err(e) => {
                tracing::warn!(code, error = %e, "threshold store unavailable, using default");
                self.default_threshold(code)
            }
        }
    }

    fn default_threshold(&self, code: &str) -> AlertThreshold {
        let a = &self.alerting;
        let (severity, method, value, window) = match code {
            codes::LIQUIDITY_SPIKE => (
                AlertSeverity::Warning,
                TriggerMethod::Zscore,
                a.liquidity_spike_z,
                Some(self.scoring.liquidity_window),
            ),
            codes::CURVE_BEAR_STEEPENING => (
                AlertSeverity::Warning,
                TriggerMethod::Zscore,
                a.bear_steepening_z,
                Some(self.scoring.long_window),
            ),
            codes::AUCTION_WEAK_DEMAND => (
                AlertSeverity::Warning,
                TriggerMethod::Absolute,
                a.weak_auction_cover,
                None,
            ),
            codes::TURNOVER_DROP => (
                AlertSeverity::Warning,
                TriggerMethod::Zscore,
                a.turnover_drop_z,
                Some(self.scoring.long_window),
            ),
            codes::POLICY_RATE_CHANGE => (
                AlertSeverity::Info,
                TriggerMethod::Event,
                a.policy_change_min_pp,
                Some(self.scoring.liquidity_window),
            ),
            codes::TRANSMISSION_JUMP => (
                AlertSeverity::Warning,
                TriggerMethod::Absolute,
                a.transmission_jump_pts,
                None,
            ),
            codes::TRANSMISSION_HIGH => (
                AlertSeverity::Critical,
                TriggerMethod::Absolute,
                a.transmission_high,
                None,
            ),
            codes::STRESS_HIGH => (
                AlertSeverity::Critical,
                TriggerMethod::Absolute,
                a.stress_high,
                None,
            ),
            codes::CROSS_MARKET_DIVERGENCE => (
                AlertSeverity::Info,
                TriggerMethod::Zscore,
                a.liquidity_spike_z,
                Some(self.scoring.long_window),
            ),
            other => {
                // Unknown codes come only from a future config row; treat
                // them as disabled rather than guessing semantics.
                tracing::warn!(code = other, "no default for unknown alert code");
                return AlertThreshold {
                    alert_code: other.to_string(),
                    enabled: false,
                    severity: AlertSeverity::Info,
                    params: ThresholdParams {
                        method: TriggerMethod::Absolute,
                        value: 0.0,
                        window: None,
                    },
                };
            }
        };

        AlertThreshold {
            alert_code: code.to_string(),
            enabled: true,
            severity,
            params: ThresholdParams {
                method,
                value,
                window,
            },
        }
    }

    async fn evaluate(
        &self,
        code: &str,
        threshold: &AlertThreshold,
        target: NaiveDate,
    ) -> Result<Option<AlertEvent>, EngineError> {
        match code {
            codes::LIQUIDITY_SPIKE => self.liquidity_spike(threshold, target).await,
            codes::CURVE_BEAR_STEEPENING => self.curve_bear_steepening(threshold, target).await,
            codes::AUCTION_WEAK_DEMAND => self.auction_weak_demand(threshold, target).await,
            codes::TURNOVER_DROP => self.turnover_drop(threshold, target).await,
            codes::POLICY_RATE_CHANGE => self.policy_rate_change(threshold, target).await,
            codes::TRANSMISSION_JUMP => self.transmission_jump(threshold, target).await,
            codes::TRANSMISSION_HIGH => self.score_ceiling(threshold, target, datasets::TRANSMISSION, metrics::TRANSMISSION_SCORE, "transmission score").await,
            codes::STRESS_HIGH => self.score_ceiling(threshold, target, datasets::STRESS, metrics::STRESS_INDEX, "stress index").await,
            codes::CROSS_MARKET_DIVERGENCE => self.cross_market_divergence(threshold, target).await,
            _ => Ok(None),
        }
    }

    /// Overnight rate z-score spike above the configured bound.
    async fn liquidity_spike(
        &self,
        threshold: &AlertThreshold,
        target: NaiveDate,
    ) -> Result<Option<AlertEvent>, EngineError> {
        let lookback = threshold.params.window.unwrap_or(self.scoring.liquidity_window);
        let series =
            load_series_window(&*self.store, &self.series.overnight_rate, target, lookback).await?;
        let Some(latest) = series.latest else {
            return Ok(None);
        };
        let Ok(z) = self.scorer.level_zscore(&series.window, latest) else {
            return Ok(None);
        };

        if z < threshold.params.value {
            return Ok(None);
        }

        Ok(Some(self.event(
            target,
            threshold,
            format!(
                "Overnight rate at {latest:.2}% is {z:.2} sigma above its trailing window"
            ),
            z,
            AlertEvidence {
                metric: self.series.overnight_rate.clone(),
                method: TriggerMethod::Zscore,
                unit: "sigma".to_string(),
                baseline_date: None,
                n: series.window.len(),
                window: lookback,
            },
        )))
    }

    /// Curve slope rising day-over-day while statistically stretched.
    async fn curve_bear_steepening(
        &self,
        threshold: &AlertThreshold,
        target: NaiveDate,
    ) -> Result<Option<AlertEvent>, EngineError> {
        let lookback = threshold.params.window.unwrap_or(self.scoring.long_window);
        let series =
            load_series_window(&*self.store, &self.series.curve_slope, target, lookback).await?;
        let (Some(latest), Some((baseline_date, previous))) = (series.latest, series.previous)
        else {
            return Ok(None);
        };
        let Ok(z) = self.scorer.level_zscore(&series.window, latest) else {
            return Ok(None);
        };

        let steepening = latest > previous;
        if !steepening || z < threshold.params.value {
            return Ok(None);
        }

        Ok(Some(self.event(
            target,
            threshold,
            format!(
                "Curve slope steepened to {latest:.2} ({z:.2} sigma above its trailing window)"
            ),
            z,
            AlertEvidence {
                metric: self.series.curve_slope.clone(),
                method: TriggerMethod::Zscore,
                unit: "sigma".to_string(),
                baseline_date: Some(baseline_date),
                n: series.window.len(),
                window: lookback,
            },
        )))
    }

    /// Bid-to-cover below the absolute floor on an auction date.
    async fn auction_weak_demand(
        &self,
        threshold: &AlertThreshold,
        target: NaiveDate,
    ) -> Result<Option<AlertEvent>, EngineError> {
        let series = load_series_window(
            &*self.store,
            &self.series.auction_bid_to_cover,
            target,
            self.scoring.long_window,
        )
        .await?;
        // No observation means no auction settled on this date.
        let Some(cover) = series.latest else {
            return Ok(None);
        };

        if cover >= threshold.params.value {
            return Ok(None);
        }

        Ok(Some(self.event(
            target,
            threshold,
            format!(
                "Auction bid-to-cover of {cover:.2} is below the {:.2} floor",
                threshold.params.value
            ),
            cover,
            AlertEvidence {
                metric: self.series.auction_bid_to_cover.clone(),
                method: TriggerMethod::Absolute,
                unit: "ratio".to_string(),
                baseline_date: None,
                n: 1,
                window: 1,
            },
        )))
    }

    /// Secondary turnover collapsing below its trailing window.
    async fn turnover_drop(
        &self,
        threshold: &AlertThreshold,
        target: NaiveDate,
    ) -> Result<Option<AlertEvent>, EngineError> {
        let lookback = threshold.params.window.unwrap_or(self.scoring.long_window);
        let series =
            load_series_window(&*self.store, &self.series.turnover_value, target, lookback).await?;
        let Some(latest) = series.latest else {
            return Ok(None);
        };
        let Ok(z) = self.scorer.level_zscore(&series.window, latest) else {
            return Ok(None);
        };

        // The rule triggers on the downside: volume z at or below the
        // negated bound.
        if z > -threshold.params.value {
            return Ok(None);
        }

        Ok(Some(self.event(
            target,
            threshold,
            format!("Secondary turnover is {:.2} sigma below its trailing window", -z),
            z,
            AlertEvidence {
                metric: self.series.turnover_value.clone(),
                method: TriggerMethod::Zscore,
                unit: "sigma".to_string(),
                baseline_date: None,
                n: series.window.len(),
                window: lookback,
            },
        )))
    }

    /// Event-based: the policy rate moved relative to its previous
    /// published value.
    async fn policy_rate_change(
        &self,
        threshold: &AlertThreshold,
        target: NaiveDate,
    ) -> Result<Option<AlertEvent>, EngineError> {
        let lookback = threshold.params.window.unwrap_or(self.scoring.liquidity_window);
        let series =
            load_series_window(&*self.store, &self.series.policy_rate, target, lookback).await?;
        let (Some(latest), Some((baseline_date, previous))) = (series.latest, series.previous)
        else {
            return Ok(None);
        };

        let delta = latest - previous;
        if delta.abs() <= threshold.params.value {
            return Ok(None);
        }

        let direction = if delta > 0.0 { "hiked" } else { "cut" };
        Ok(Some(self.event(
            target,
            threshold,
            format!(
                "Policy rate {direction} by {:.2}pp to {latest:.2}% (from {previous:.2}% on {baseline_date})",
                delta.abs()
            ),
            delta,
            AlertEvidence {
                metric: self.series.policy_rate.clone(),
                method: TriggerMethod::Event,
                unit: "pp".to_string(),
                baseline_date: Some(baseline_date),
                n: 2,
                window: lookback,
            },
        )))
    }

    /// Day-over-day tightening jump in the transmission score, measured
    /// against the previous available computed date.
    async fn transmission_jump(
        &self,
        threshold: &AlertThreshold,
        target: NaiveDate,
    ) -> Result<Option<AlertEvent>, EngineError> {
        let Some(today) = self
            .store
            .read_metric(target, datasets::TRANSMISSION, metrics::TRANSMISSION_SCORE)
            .await?
            .and_then(|v| v.as_numeric())
        else {
            return Ok(None);
        };
        let Some(baseline_date) = self
            .store
            .latest_date_before(datasets::TRANSMISSION, metrics::TRANSMISSION_SCORE, target)
            .await?
        else {
            return Ok(None);
        };
        let Some(baseline) = self
            .store
            .read_metric(baseline_date, datasets::TRANSMISSION, metrics::TRANSMISSION_SCORE)
            .await?
            .and_then(|v| v.as_numeric())
        else {
            return Ok(None);
        };

        let jump = today - baseline;
        if jump < threshold.params.value {
            return Ok(None);
        }

        Ok(Some(self.event(
            target,
            threshold,
            format!(
                "Transmission score jumped {jump:.1} points ({baseline:.1} on {baseline_date} to {today:.1})"
            ),
            jump,
            AlertEvidence {
                metric: metrics::TRANSMISSION_SCORE.to_string(),
                method: TriggerMethod::Absolute,
                unit: "pts".to_string(),
                baseline_date: Some(baseline_date),
                n: 2,
                window: 1,
            },
        )))
    }

    /// Absolute ceiling breach on a persisted composite (transmission
    /// score or stress index).
    async fn score_ceiling(
        &self,
        threshold: &AlertThreshold,
        target: NaiveDate,
        dataset: &str,
        metric_name: &str,
        label: &str,
    ) -> Result<Option<AlertEvent>, EngineError> {
        let Some(value) = self
            .store
            .read_metric(target, dataset, metric_name)
            .await?
            .and_then(|v| v.as_numeric())
        else {
            return Ok(None);
        };

        if value < threshold.params.value {
            return Ok(None);
        }

        Ok(Some(self.event(
            target,
            threshold,
            format!(
                "{label} at {value:.1} breached the {:.0}-point ceiling",
                threshold.params.value
            ),
            value,
            AlertEvidence {
                metric: metric_name.to_string(),
                method: TriggerMethod::Absolute,
                unit: "pts".to_string(),
                baseline_date: None,
                n: 1,
                window: 1,
            },
        )))
    }

    /// Cross-market comparator: the spread between the domestic long
    /// benchmark and the foreign reference yield, z-scored. Degrades
    /// silently when the foreign series is not ingested.
    async fn cross_market_divergence(
        &self,
        threshold: &AlertThreshold,
        target: NaiveDate,
    ) -> Result<Option<AlertEvent>, EngineError> {
        let lookback = threshold.params.window.unwrap_or(self.scoring.long_window);
        let span = chrono::Days::new((lookback as u64) * 2 + 30);
        let start = target.checked_sub_days(span).unwrap_or(NaiveDate::MIN);

        let domestic = self
            .store
            .read_series(&self.series.curve_level, start, target)
            .await?;
        let foreign = self
            .store
            .read_series(&self.series.foreign_reference_yield, start, target)
            .await?;
        if foreign.is_empty() {
            return Ok(None);
        }

        // Join by date; the spread only exists where both markets printed.
        let foreign_by_date: HashMap<NaiveDate, f64> = foreign
            .iter()
            .filter_map(|o| {
                rust_decimal::prelude::ToPrimitive::to_f64(&o.value).map(|v| (o.date, v))
            })
            .collect();
        let spread: Vec<(NaiveDate, f64)> = domestic
            .iter()
            .filter_map(|o| {
                let dom = rust_decimal::prelude::ToPrimitive::to_f64(&o.value)?;
                let frn = foreign_by_date.get(&o.date)?;
                Some((o.date, dom - frn))
            })
            .collect();

        let Some(&(last_date, latest)) = spread.last() else {
            return Ok(None);
        };
        if last_date != target {
            return Ok(None);
        }

        let window = select_window(&spread, target, WindowMode::TrainOnly, lookback);
        let Ok(stats) = RollingStats::from_window(&window) else {
            return Ok(None);
        };
        let Ok(z) = stats.zscore(latest) else {
            return Ok(None);
        };

        if z.abs() < threshold.params.value {
            return Ok(None);
        }

        Ok(Some(self.event(
            target,
            threshold,
            format!(
                "Cross-market spread at {latest:.2}pp is {:.2} sigma from its trailing window",
                z.abs()
            ),
            z,
            AlertEvidence {
                metric: format!(
                    "{}-{}",
                    self.series.curve_level, self.series.foreign_reference_yield
                ),
                method: TriggerMethod::Zscore,
                unit: "sigma".to_string(),
                baseline_date: None,
                n: window.len(),
                window: lookback,
            },
        )))
    }

    fn event(
        &self,
        target: NaiveDate,
        threshold: &AlertThreshold,
        message: String,
        metric_value: f64,
        evidence: AlertEvidence,
    ) -> AlertEvent {
        AlertEvent {
            event_id: Uuid::new_v4(),
            date: target,
            alert_code: threshold.alert_code.clone(),
            severity: threshold.severity,
            message,
            metric_value,
            threshold: threshold.params.value,
            evidence,
        }
    }
}
