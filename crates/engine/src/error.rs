use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    /// A required upstream computed result does not exist for the target
    /// date. Fatal for the specific call; never silently defaulted.
    #[error("Dependency missing: no {dataset} result computed for {date}")]
    DependencyMissing { date: NaiveDate, dataset: String },

    /// Persistence failure, propagated unchanged. Retry policy belongs to
    /// the batch orchestrator, not the engine.
    #[error("Store error: {0}")]
    Store(#[from] store::StoreError),

    #[error("Serialization error: {0}")]
    SerdeJson(#[from] serde_json::Error),
}
