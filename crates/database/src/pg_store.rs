use async_trait::async_trait;
use chrono::NaiveDate;
use core_types::{
    AlertEvent, AlertSeverity, AlertThreshold, ComponentMetric, MetricValue, RawObservation,
    ThresholdParams,
};
use rust_decimal::Decimal;
use sqlx::Row;
use sqlx::postgres::PgPool;
use std::str::FromStr;
use store::{
    AlertStore, MetricStore, SeriesReader, SeriesWriter, StoreError, ThresholdStore,
};
use uuid::Uuid;

/// The PostgreSQL implementation of the store traits.
///
/// Encapsulates all SQL; the engines only ever see the trait methods.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Creates a new `PgStore` with a shared database connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn io_error(e: sqlx::Error) -> StoreError {
    StoreError::Io(e.to_string())
}

#[async_trait]
impl SeriesReader for PgStore {
    async fn read_series(
        &self,
        series_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RawObservation>, StoreError> {
        // One value per date: among sources for the same date, the most
        // recently ingested wins.
        let rows = sqlx::query(
            r#"
            SELECT DISTINCT ON (obs_date) series_id, obs_date, value, source
            FROM raw_observations
            WHERE series_id = $1 AND obs_date >= $2 AND obs_date <= $3
            ORDER BY obs_date ASC, ingested_at DESC
            "#,
        )
        .bind(series_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await
        .map_err(io_error)?;

        Ok(rows
            .into_iter()
            .map(|row| RawObservation {
                series_id: row.get("series_id"),
                date: row.get("obs_date"),
                value: row.get::<Decimal, _>("value"),
                source: row.get("source"),
            })
            .collect())
    }
}

#[async_trait]
impl SeriesWriter for PgStore {
    async fn upsert_observation(&self, observation: &RawObservation) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO raw_observations (series_id, obs_date, value, source, ingested_at)
            VALUES ($1, $2, $3, $4, NOW())
            ON CONFLICT (series_id, obs_date, source)
            DO UPDATE SET value = EXCLUDED.value, ingested_at = NOW()
            "#,
        )
        .bind(&observation.series_id)
        .bind(observation.date)
        .bind(observation.value)
        .bind(&observation.source)
        .execute(&self.pool)
        .await
        .map_err(io_error)?;
        Ok(())
    }
}

#[async_trait]
impl MetricStore for PgStore {
    async fn write_metric(&self, metric: &ComponentMetric) -> Result<(), StoreError> {
        let (value, value_text) = match &metric.value {
            MetricValue::Numeric(v) => (Some(*v), None),
            MetricValue::Text(s) => (None, Some(s.clone())),
        };
        let sources = serde_json::to_value(&metric.sources)?;

        sqlx::query(
            r#"
            INSERT INTO component_metrics (metric_date, dataset, metric_name, value, value_text, sources, computed_at)
            VALUES ($1, $2, $3, $4, $5, $6, NOW())
            ON CONFLICT (metric_date, dataset, metric_name)
            DO UPDATE SET value = EXCLUDED.value,
                          value_text = EXCLUDED.value_text,
                          sources = EXCLUDED.sources,
                          computed_at = NOW()
            "#,
        )
        .bind(metric.date)
        .bind(&metric.dataset)
        .bind(&metric.metric_name)
        .bind(value)
        .bind(value_text)
        .bind(sources)
        .execute(&self.pool)
        .await
        .map_err(io_error)?;
        Ok(())
    }

    async fn read_metric(
        &self,
        date: NaiveDate,
        dataset: &str,
        metric_name: &str,
    ) -> Result<Option<MetricValue>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT value, value_text
            FROM component_metrics
            WHERE metric_date = $1 AND dataset = $2 AND metric_name = $3
            "#,
        )
        .bind(date)
        .bind(dataset)
        .bind(metric_name)
        .fetch_optional(&self.pool)
        .await
        .map_err(io_error)?;

        match row {
            None => Ok(None),
            Some(row) => {
                let value: Option<f64> = row.get("value");
                let value_text: Option<String> = row.get("value_text");
                match (value, value_text) {
                    (Some(v), _) => Ok(Some(MetricValue::Numeric(v))),
                    (None, Some(s)) => Ok(Some(MetricValue::Text(s))),
                    (None, None) => Err(StoreError::Payload(format!(
                        "metric {dataset}/{metric_name} on {date} has neither value nor text"
                    ))),
                }
            }
        }
    }

    async fn metric_history(
        &self,
        dataset: &str,
        metric_name: &str,
        end: NaiveDate,
        lookback: usize,
    ) -> Result<Vec<(NaiveDate, f64)>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT metric_date, value
            FROM component_metrics
            WHERE dataset = $1 AND metric_name = $2 AND metric_date < $3 AND value IS NOT NULL
            ORDER BY metric_date DESC
            LIMIT $4
            "#,
        )
        .bind(dataset)
        .bind(metric_name)
        .bind(end)
        .bind(lookback as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(io_error)?;

        let mut history: Vec<(NaiveDate, f64)> = rows
            .into_iter()
            .map(|row| (row.get("metric_date"), row.get("value")))
            .collect();
        // The query scans newest-first for the LIMIT; callers want
        // date-ascending windows.
        history.reverse();
        Ok(history)
    }

    async fn latest_date_before(
        &self,
        dataset: &str,
        metric_name: &str,
        date: NaiveDate,
    ) -> Result<Option<NaiveDate>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT metric_date
            FROM component_metrics
            WHERE dataset = $1 AND metric_name = $2 AND metric_date < $3
            ORDER BY metric_date DESC
            LIMIT 1
            "#,
        )
        .bind(dataset)
        .bind(metric_name)
        .bind(date)
        .fetch_optional(&self.pool)
        .await
        .map_err(io_error)?;

        Ok(row.map(|r| r.get("metric_date")))
    }
}

#[async_trait]
impl AlertStore for PgStore {
    async fn write_alert(&self, event: &AlertEvent) -> Result<(), StoreError> {
        let evidence = serde_json::to_value(&event.evidence)?;

        sqlx::query(
            r#"
            INSERT INTO alert_events (alert_date, alert_code, event_id, severity, message, metric_value, threshold, evidence, detected_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NOW())
            ON CONFLICT (alert_date, alert_code)
            DO UPDATE SET event_id = EXCLUDED.event_id,
                          severity = EXCLUDED.severity,
                          message = EXCLUDED.message,
                          metric_value = EXCLUDED.metric_value,
                          threshold = EXCLUDED.threshold,
                          evidence = EXCLUDED.evidence,
                          detected_at = NOW()
            "#,
        )
        .bind(event.date)
        .bind(&event.alert_code)
        .bind(event.event_id)
        .bind(event.severity.as_str())
        .bind(&event.message)
        .bind(event.metric_value)
        .bind(event.threshold)
        .bind(evidence)
        .execute(&self.pool)
        .await
        .map_err(io_error)?;
        Ok(())
    }

    async fn read_alerts(&self, date: NaiveDate) -> Result<Vec<AlertEvent>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT alert_date, alert_code, event_id, severity, message, metric_value, threshold, evidence
            FROM alert_events
            WHERE alert_date = $1
            ORDER BY alert_code ASC
            "#,
        )
        .bind(date)
        .fetch_all(&self.pool)
        .await
        .map_err(io_error)?;

        rows.into_iter()
            .map(|row| {
                let severity_raw: String = row.get("severity");
                let severity = AlertSeverity::from_str(&severity_raw)
                    .map_err(|e| StoreError::Payload(e.to_string()))?;
                let evidence = serde_json::from_value(row.get("evidence"))?;

                Ok(AlertEvent {
                    event_id: row.get::<Uuid, _>("event_id"),
                    date: row.get("alert_date"),
                    alert_code: row.get("alert_code"),
                    severity,
                    message: row.get("message"),
                    metric_value: row.get("metric_value"),
                    threshold: row.get("threshold"),
                    evidence,
                })
            })
            .collect()
    }
}

#[async_trait]
impl ThresholdStore for PgStore {
    async fn read_threshold(
        &self,
        alert_code: &str,
    ) -> Result<Option<AlertThreshold>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT alert_code, enabled, severity, params
            FROM alert_thresholds
            WHERE alert_code = $1
            "#,
        )
        .bind(alert_code)
        .fetch_optional(&self.pool)
        .await
        .map_err(io_error)?;

        match row {
            None => Ok(None),
            Some(row) => {
                let severity_raw: String = row.get("severity");
                let severity = AlertSeverity::from_str(&severity_raw)
                    .map_err(|e| StoreError::Payload(e.to_string()))?;
                let params: ThresholdParams = serde_json::from_value(row.get("params"))?;

                Ok(Some(AlertThreshold {
                    alert_code: row.get("alert_code"),
                    enabled: row.get("enabled"),
                    severity,
                    params,
                }))
            }
        }
    }

    async fn upsert_threshold(&self, threshold: &AlertThreshold) -> Result<(), StoreError> {
        let params = serde_json::to_value(&threshold.params)?;

        sqlx::query(
            r#"
            INSERT INTO alert_thresholds (alert_code, enabled, severity, params, updated_at)
            VALUES ($1, $2, $3, $4, NOW())
            ON CONFLICT (alert_code)
            DO UPDATE SET enabled = EXCLUDED.enabled,
                          severity = EXCLUDED.severity,
                          params = EXCLUDED.params,
                          updated_at = NOW()
            "#,
        )
        .bind(&threshold.alert_code)
        .bind(threshold.enabled)
        .bind(threshold.severity.as_str())
        .bind(params)
        .execute(&self.pool)
        .await
        .map_err(io_error)?;
        Ok(())
    }
}
