use crate::error::EngineError;
use crate::{datasets, metrics};
use chrono::NaiveDate;
use std::sync::Arc;
use store::MetricStore;

/// Resolves the "previous available day" for day-over-day comparisons.
///
/// Scans backward through the persisted metrics for the most recent date
/// with a computed transmission score. Weekends and holidays are skipped
/// transparently because only computed dates exist in the store; this is
/// never a calendar-day subtraction.
pub struct BaselineResolver<S> {
    store: Arc<S>,
}

impl<S> BaselineResolver<S>
where
    S: MetricStore,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// The most recent date strictly before `target` with computed data,
    /// or `None` on the first-ever computation.
    pub async fn resolve(&self, target: NaiveDate) -> Result<Option<NaiveDate>, EngineError> {
        let baseline = self
            .store
            .latest_date_before(datasets::TRANSMISSION, metrics::TRANSMISSION_SCORE, target)
            .await?;
        Ok(baseline)
    }
}
