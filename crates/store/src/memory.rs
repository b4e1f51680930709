use crate::error::StoreError;
use crate::traits::{AlertStore, MetricStore, SeriesReader, SeriesWriter, ThresholdStore};
use async_trait::async_trait;
use chrono::NaiveDate;
use core_types::{AlertEvent, AlertThreshold, ComponentMetric, MetricValue, RawObservation};
use std::collections::BTreeMap;
use std::sync::RwLock;

/// A complete in-memory store.
///
/// Used by the integration tests and by embedded callers that want the
/// engines without a database. The maps mirror the production tables and
/// their upsert keys exactly, so behavior observed against `MemoryStore`
/// carries over to the Postgres adapter.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    /// Keyed by `(series_id, date, source)`; the u64 is an ingestion
    /// sequence so reads can pick the most recently written source per
    /// date, matching the adapter's `ingested_at` ordering.
    observations: BTreeMap<(String, NaiveDate, String), (u64, RawObservation)>,
    metrics: BTreeMap<(String, String, NaiveDate), ComponentMetric>,
    alerts: BTreeMap<(NaiveDate, String), AlertEvent>,
    thresholds: BTreeMap<String, AlertThreshold>,
    next_seq: u64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned(_: impl std::fmt::Debug) -> StoreError {
    StoreError::Io("memory store lock poisoned".to_string())
}

#[async_trait]
impl SeriesReader for MemoryStore {
    async fn read_series(
        &self,
        series_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RawObservation>, StoreError> {
        let inner = self.inner.read().map_err(poisoned)?;

        // One value per date: among sources for the same date, the most
        // recently ingested wins.
        let mut by_date: BTreeMap<NaiveDate, (u64, RawObservation)> = BTreeMap::new();
        for ((sid, date, _source), (seq, obs)) in inner.observations.iter() {
            if sid.as_str() != series_id || *date < start || *date > end {
                continue;
            }
            match by_date.get(date) {
                Some((existing_seq, _)) if existing_seq > seq => {}
                _ => {
                    by_date.insert(*date, (*seq, obs.clone()));
                }
            }
        }

        Ok(by_date.into_values().map(|(_, obs)| obs).collect())
    }
}

#[async_trait]
impl SeriesWriter for MemoryStore {
    async fn upsert_observation(&self, observation: &RawObservation) -> Result<(), StoreError> {
        let mut inner = self.inner.write().map_err(poisoned)?;
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.observations.insert(
            (
                observation.series_id.clone(),
                observation.date,
                observation.source.clone(),
            ),
            (seq, observation.clone()),
        );
        Ok(())
    }
}

#[async_trait]
impl MetricStore for MemoryStore {
    async fn write_metric(&self, metric: &ComponentMetric) -> Result<(), StoreError> {
        let mut inner = self.inner.write().map_err(poisoned)?;
        inner.metrics.insert(
            (
                metric.dataset.clone(),
                metric.metric_name.clone(),
                metric.date,
            ),
            metric.clone(),
        );
        Ok(())
    }

    async fn read_metric(
        &self,
        date: NaiveDate,
        dataset: &str,
        metric_name: &str,
    ) -> Result<Option<MetricValue>, StoreError> {
        let inner = self.inner.read().map_err(poisoned)?;
        Ok(inner
            .metrics
            .get(&(dataset.to_string(), metric_name.to_string(), date))
            .map(|m| m.value.clone()))
    }

    async fn metric_history(
        &self,
        dataset: &str,
        metric_name: &str,
        end: NaiveDate,
        lookback: usize,
    ) -> Result<Vec<(NaiveDate, f64)>, StoreError> {
        let inner = self.inner.read().map_err(poisoned)?;
        let lower = (dataset.to_string(), metric_name.to_string(), NaiveDate::MIN);
        let upper = (dataset.to_string(), metric_name.to_string(), end);

        let mut history: Vec<(NaiveDate, f64)> = inner
            .metrics
            .range(lower..upper)
            .filter_map(|((_, _, date), metric)| {
                metric.value.as_numeric().map(|value| (*date, value))
            })
            .collect();

        if history.len() > lookback {
            history.drain(..history.len() - lookback);
        }
        Ok(history)
    }

    async fn latest_date_before(
        &self,
        dataset: &str,
        metric_name: &str,
        date: NaiveDate,
    ) -> Result<Option<NaiveDate>, StoreError> {
        let inner = self.inner.read().map_err(poisoned)?;
        let lower = (dataset.to_string(), metric_name.to_string(), NaiveDate::MIN);
        let upper = (dataset.to_string(), metric_name.to_string(), date);

        Ok(inner
            .metrics
            .range(lower..upper)
            .next_back()
            .map(|((_, _, found), _)| *found))
    }
}

#[async_trait]
impl AlertStore for MemoryStore {
    async fn write_alert(&self, event: &AlertEvent) -> Result<(), StoreError> {
        let mut inner = self.inner.write().map_err(poisoned)?;
        inner
            .alerts
            .insert((event.date, event.alert_code.clone()), event.clone());
        Ok(())
    }

    async fn read_alerts(&self, date: NaiveDate) -> Result<Vec<AlertEvent>, StoreError> {
        let inner = self.inner.read().map_err(poisoned)?;
        Ok(inner
            .alerts
            .range((date, String::new())..)
            .take_while(|((event_date, _), _)| *event_date == date)
            .map(|(_, event)| event.clone())
            .collect())
    }
}

#[async_trait]
impl ThresholdStore for MemoryStore {
    async fn read_threshold(
        &self,
        alert_code: &str,
    ) -> Result<Option<AlertThreshold>, StoreError> {
        let inner = self.inner.read().map_err(poisoned)?;
        Ok(inner.thresholds.get(alert_code).cloned())
    }

    async fn upsert_threshold(&self, threshold: &AlertThreshold) -> Result<(), StoreError> {
        let mut inner = self.inner.write().map_err(poisoned)?;
        inner
            .thresholds
            .insert(threshold.alert_code.clone(), threshold.clone());
        Ok(())
    }
}
