use crate::error::StoreError;
use async_trait::async_trait;
use chrono::NaiveDate;
use core_types::{AlertEvent, AlertThreshold, ComponentMetric, MetricValue, RawObservation};

/// Read-only access to raw ingested series.
#[async_trait]
pub trait SeriesReader: Send + Sync {
    /// All observations for `series_id` within `[start, end]`, ordered by
    /// date ascending, one value per date (the most recently ingested
    /// source wins). Returns an empty vector when no data exists; "no
    /// data" is never an error.
    async fn read_series(
        &self,
        series_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RawObservation>, StoreError>;
}

/// Write access for ingestion collaborators and test setup.
#[async_trait]
pub trait SeriesWriter: Send + Sync {
    /// Idempotent upsert keyed by `(series_id, date, source)`. A re-fetch
    /// of the same key overwrites the value, never appends a duplicate
    /// logical record.
    async fn upsert_observation(&self, observation: &RawObservation) -> Result<(), StoreError>;
}

/// Persistence for computed metrics.
#[async_trait]
pub trait MetricStore: Send + Sync {
    /// Idempotent upsert keyed by `(date, dataset, metric_name)`.
    async fn write_metric(&self, metric: &ComponentMetric) -> Result<(), StoreError>;

    /// The stored value for one metric on one date, `None` when absent.
    async fn read_metric(
        &self,
        date: NaiveDate,
        dataset: &str,
        metric_name: &str,
    ) -> Result<Option<MetricValue>, StoreError>;

    /// Date-ascending numeric history of one metric strictly before `end`,
    /// at most `lookback` points. Text-valued rows are skipped.
    async fn metric_history(
        &self,
        dataset: &str,
        metric_name: &str,
        end: NaiveDate,
        lookback: usize,
    ) -> Result<Vec<(NaiveDate, f64)>, StoreError>;

    /// The most recent date strictly before `date` on which this metric
    /// was computed. Weekend and holiday gaps are skipped by construction:
    /// this scans what exists, it never does calendar arithmetic.
    async fn latest_date_before(
        &self,
        dataset: &str,
        metric_name: &str,
        date: NaiveDate,
    ) -> Result<Option<NaiveDate>, StoreError>;
}

/// Persistence for triggered alert events.
#[async_trait]
pub trait AlertStore: Send + Sync {
    /// Idempotent upsert keyed by `(date, alert_code)`.
    async fn write_alert(&self, event: &AlertEvent) -> Result<(), StoreError>;

    /// All events recorded for one date, ordered by alert code.
    async fn read_alerts(&self, date: NaiveDate) -> Result<Vec<AlertEvent>, StoreError>;
}

/// Externally mutable alert-rule configuration.
#[async_trait]
pub trait ThresholdStore: Send + Sync {
    /// The stored override for one rule, `None` when the store has no row
    /// (callers fall back to compiled-in defaults).
    async fn read_threshold(&self, alert_code: &str)
    -> Result<Option<AlertThreshold>, StoreError>;

    /// Idempotent upsert keyed by `alert_code`.
    async fn upsert_threshold(&self, threshold: &AlertThreshold) -> Result<(), StoreError>;
}
