//! # Conduit Core Types
//!
//! This crate defines the shared vocabulary of the Conduit market-conditions
//! engine: raw series observations, normalized component metrics, composite
//! score results, and the alerting data model.
//!
//! ## Architectural Principles
//!
//! - **Layer 0:** This crate sits at the bottom of the dependency graph. It
//!   has no knowledge of stores, statistics, or engines; every other crate
//!   depends on it.
//! - **Serializable by Construction:** Every type derives `Serialize` /
//!   `Deserialize` so results can cross the persistence and API boundaries
//!   without bespoke mapping code.
//!
//! ## Public API
//!
//! - Observation and metric types: `RawObservation`, `MetricValue`,
//!   `ComponentMetric`.
//! - Composite results: `TransmissionScoreResult`, `StressIndexResult`,
//!   `DataAvailability`.
//! - Alerting model: `AlertThreshold`, `AlertEvidence`, `AlertEvent`.
//! - Close-ended vocabularies in `enums`: component families, regime
//!   buckets, severities, trigger methods.

pub mod enums;
pub mod error;
pub mod structs;

// Re-export the core types to provide a clean public API.
pub use enums::{
    AlertSeverity, ComponentFamily, StressComponent, StressRegime, TransmissionRegime,
    TriggerMethod,
};
pub use error::CoreError;
pub use structs::{
    AlertEvent, AlertEvidence, AlertThreshold, ComponentContribution, ComponentMetric,
    DataAvailability, MetricValue, RawObservation, StressDriver, StressIndexResult,
    ThresholdParams, TransmissionScoreResult,
};
