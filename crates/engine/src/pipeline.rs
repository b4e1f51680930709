use crate::alerts::AlertEngine;
use crate::error::EngineError;
use crate::stress::StressIndexEngine;
use crate::transmission::TransmissionScoreEngine;
use crate::{datasets, metrics};
use chrono::{Days, NaiveDate};
use core_types::{AlertEvent, StressIndexResult, TransmissionScoreResult};
use std::fmt;
use std::sync::Arc;
use store::{AlertStore, MetricStore, SeriesReader, ThresholdStore};

/// The stages a date moves through. Data-level degradation (neutral
/// fallbacks, dropped components) still reaches `Persisted`; only store
/// I/O aborts a run mid-stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Pending,
    ComputeTransmission,
    ComputeStress,
    DetectAlerts,
    Persisted,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::Pending => "pending",
            PipelineStage::ComputeTransmission => "compute_transmission",
            PipelineStage::ComputeStress => "compute_stress",
            PipelineStage::DetectAlerts => "detect_alerts",
            PipelineStage::Persisted => "persisted",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything computed for one date.
#[derive(Debug, Clone)]
pub struct DateRunOutcome {
    pub date: NaiveDate,
    pub transmission: TransmissionScoreResult,
    pub stress: StressIndexResult,
    pub alerts: Vec<AlertEvent>,
}

/// Summary of a range/backfill run.
#[derive(Debug, Clone, Default)]
pub struct RangeSummary {
    pub computed: usize,
    pub skipped: usize,
    pub alerts: usize,
}

/// Runs the full per-date chain: transmission score, then the stress index
/// on top of it, then alert detection over both.
///
/// Dates are independent of each other (each reads only already-finalized
/// prior dates and writes under its own date key), so backfill callers may
/// parallelize across *different* dates. Two processes recomputing the
/// *same* date concurrently race on last-writer-wins upserts; avoiding
/// that is a caller responsibility, the pipeline takes no locks.
pub struct Pipeline<S> {
    store: Arc<S>,
    transmission: TransmissionScoreEngine<S>,
    stress: StressIndexEngine<S>,
    alerts: AlertEngine<S>,
}

impl<S> Pipeline<S>
where
    S: SeriesReader + MetricStore + ThresholdStore + AlertStore,
{
    pub fn new(store: Arc<S>, config: &configuration::Config) -> Self {
        Self {
            transmission: TransmissionScoreEngine::new(Arc::clone(&store), config),
            stress: StressIndexEngine::new(Arc::clone(&store), config),
            alerts: AlertEngine::new(Arc::clone(&store), config),
            store,
        }
    }

    /// Computes one date end-to-end.
    #[tracing::instrument(skip(self), fields(date = %date))]
    pub async fn run_date(&self, date: NaiveDate) -> Result<DateRunOutcome, EngineError> {
        let mut stage = PipelineStage::Pending;

        stage = self.advance(stage, PipelineStage::ComputeTransmission);
        let transmission = self.transmission.compute(date).await?;

        stage = self.advance(stage, PipelineStage::ComputeStress);
        let stress = self.stress.compute(date).await?;

        stage = self.advance(stage, PipelineStage::DetectAlerts);
        let alerts = self.alerts.detect(date).await?;

        self.advance(stage, PipelineStage::Persisted);
        Ok(DateRunOutcome {
            date,
            transmission,
            stress,
            alerts,
        })
    }

    /// Computes every date in `[start, end]` sequentially.
    ///
    /// With `skip_existing`, dates that already carry a transmission score
    /// are left untouched, which makes a cancelled-and-resumed backfill
    /// idempotent.
    pub async fn run_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        skip_existing: bool,
    ) -> Result<RangeSummary, EngineError> {
        let mut summary = RangeSummary::default();
        let mut date = start;

        while date <= end {
            if skip_existing && self.already_computed(date).await? {
                tracing::debug!(date = %date, "already computed, skipping");
                summary.skipped += 1;
            } else {
                let outcome = self.run_date(date).await?;
                summary.computed += 1;
                summary.alerts += outcome.alerts.len();
            }

            date = match date.checked_add_days(Days::new(1)) {
                Some(next) => next,
                None => break,
            };
        }

        Ok(summary)
    }

    async fn already_computed(&self, date: NaiveDate) -> Result<bool, EngineError> {
        Ok(self
            .store
            .read_metric(date, datasets::TRANSMISSION, metrics::TRANSMISSION_SCORE)
            .await?
            .is_some())
    }

    fn advance(&self, from: PipelineStage, to: PipelineStage) -> PipelineStage {
        tracing::debug!(from = %from, to = %to, "pipeline stage transition");
        to
    }
}
