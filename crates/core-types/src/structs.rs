use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::enums::{
    AlertSeverity, ComponentFamily, StressComponent, StressRegime, TransmissionRegime,
    TriggerMethod,
};

/// A single raw ingested data point for one series on one date.
///
/// Observations are immutable per `(series_id, date, source)`; a later
/// re-fetch of the same key overwrites the value (upsert), it never appends
/// a second logical record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawObservation {
    /// Identifier of the series, e.g. `"mm_overnight_rate"`.
    pub series_id: String,
    pub date: NaiveDate,
    /// Raw market value. High-precision decimal; statistics convert to
    /// `f64` at the analytics boundary.
    pub value: Decimal,
    /// The provider that produced this observation.
    pub source: String,
}

/// A metric value is either numeric (scores, z-scores, percentiles) or
/// categorical text (regime buckets, score basis markers). Modelled as a
/// sum type so a metric can never carry both at once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Numeric(f64),
    Text(String),
}

impl MetricValue {
    pub fn as_numeric(&self) -> Option<f64> {
        match self {
            MetricValue::Numeric(v) => Some(*v),
            MetricValue::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            MetricValue::Numeric(_) => None,
            MetricValue::Text(s) => Some(s),
        }
    }
}

impl From<f64> for MetricValue {
    fn from(v: f64) -> Self {
        MetricValue::Numeric(v)
    }
}

impl From<String> for MetricValue {
    fn from(s: String) -> Self {
        MetricValue::Text(s)
    }
}

impl From<&str> for MetricValue {
    fn from(s: &str) -> Self {
        MetricValue::Text(s.to_string())
    }
}

/// One normalized, persisted measurement produced by the engines,
/// e.g. `liquidity_zscore` or `transmission_score`.
///
/// The upsert key is `(date, dataset, metric_name)`; recomputation
/// overwrites idempotently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentMetric {
    pub date: NaiveDate,
    /// Logical grouping, e.g. `"transmission"` or `"stress"`.
    pub dataset: String,
    pub metric_name: String,
    pub value: MetricValue,
    /// Provenance and explanatory notes, e.g. `"neutral fallback, calibrating"`.
    pub sources: Vec<String>,
}

impl ComponentMetric {
    pub fn numeric(
        date: NaiveDate,
        dataset: &str,
        metric_name: &str,
        value: f64,
        sources: Vec<String>,
    ) -> Self {
        Self {
            date,
            dataset: dataset.to_string(),
            metric_name: metric_name.to_string(),
            value: MetricValue::Numeric(value),
            sources,
        }
    }

    pub fn text(
        date: NaiveDate,
        dataset: &str,
        metric_name: &str,
        value: &str,
        sources: Vec<String>,
    ) -> Self {
        Self {
            date,
            dataset: dataset.to_string(),
            metric_name: metric_name.to_string(),
            value: MetricValue::Text(value.to_string()),
            sources,
        }
    }
}

/// The direction-corrected contribution of one component family to the
/// transmission composite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentContribution {
    pub family: ComponentFamily,
    /// Direction-corrected z-score of the family for the target date.
    pub zscore: f64,
    /// Effective weight after renormalization over available families.
    pub weight: f64,
}

/// Which inputs a composite actually used, and whether the result is a
/// cold-start neutral fallback rather than a data-driven reading.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DataAvailability {
    pub included: Vec<String>,
    pub missing: Vec<String>,
    /// True when the score is the fixed neutral value emitted during
    /// calibration, never to be confused with a computed reading.
    pub neutral_fallback: bool,
}

/// The composite transmission score for one date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransmissionScoreResult {
    pub date: NaiveDate,
    /// Composite score in `[0, 100]`.
    pub score: f64,
    pub regime: TransmissionRegime,
    pub components: Vec<ComponentContribution>,
    pub data_availability: DataAvailability,
}

/// One named driver of the stress index, with signed magnitude.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StressDriver {
    pub component: StressComponent,
    /// Percentile rank of the component in `[0, 100]`.
    pub percentile: f64,
    /// Effective weight after renormalization over available components.
    pub weight: f64,
    /// `(percentile - 50) * weight`; positive pushes stress up.
    pub contribution: f64,
}

/// The composite stress index for one date, built on top of the persisted
/// transmission score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StressIndexResult {
    pub date: NaiveDate,
    /// Composite stress index in `[0, 100]`.
    pub stress_index: f64,
    pub regime: StressRegime,
    /// Top drivers by absolute contribution, descending.
    pub drivers: Vec<StressDriver>,
    pub data_availability: DataAvailability,
}

/// Numeric parameters of one alert rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdParams {
    pub method: TriggerMethod,
    /// The trigger level: a z-score bound, an absolute level, or a minimum
    /// change for event rules, depending on `method`.
    pub value: f64,
    /// Lookback length for statistical rules; `None` for pure level checks.
    pub window: Option<usize>,
}

/// Externally adjustable configuration for one alert rule. Defaults exist
/// in code so the engine works against an empty configuration store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertThreshold {
    pub alert_code: String,
    pub enabled: bool,
    pub severity: AlertSeverity,
    pub params: ThresholdParams,
}

/// Quantitative evidence attached to every emitted alert. An alert whose
/// evidence cannot be fully assembled is suppressed, not emitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertEvidence {
    /// Name of the metric or series the rule evaluated.
    pub metric: String,
    pub method: TriggerMethod,
    /// Unit of `metric_value`, e.g. `"sigma"`, `"pct"`, `"pp"`, `"pts"`.
    pub unit: String,
    /// The prior date compared against, for day-over-day rules.
    pub baseline_date: Option<NaiveDate>,
    /// Sample size used for the statistic.
    pub n: usize,
    /// Lookback length actually scanned.
    pub window: usize,
}

/// A triggered alert with its evidence, keyed by `(date, alert_code)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertEvent {
    pub event_id: Uuid,
    pub date: NaiveDate,
    pub alert_code: String,
    pub severity: AlertSeverity,
    pub message: String,
    pub metric_value: f64,
    pub threshold: f64,
    pub evidence: AlertEvidence,
}
