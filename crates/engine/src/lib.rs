//! # Conduit Analytics Engine
//!
//! The compute core of the system: it turns raw per-series observations
//! into the composite transmission score, the stress index built on top of
//! it, and threshold-based alerts with quantitative evidence.
//!
//! ## Architectural Principles
//!
//! - **Generic over the Store:** Every engine takes any implementation of
//!   the `store` traits, so the same code runs against PostgreSQL in
//!   production and `MemoryStore` in tests.
//! - **Train-Only Statistics:** A score "as of" a date never sees that
//!   date's own observation in its baseline window. The leakage rule is
//!   enforced once, in the window loader, not per call site.
//! - **Degrade, Don't Die:** Missing families and components fall back to
//!   neutral scores or weight renormalization, always with structured
//!   metadata (`sources`, `data_availability`) so a fallback is never
//!   mistaken for a real reading. Only missing upstream dependencies and
//!   store I/O cross the call boundary as errors.
//! - **Idempotent Recomputation:** Computing a date twice with unchanged
//!   inputs writes identical metrics; all persistence is upsert-keyed by
//!   the date.
//!
//! ## Public API
//!
//! - `TransmissionScoreEngine`: the five-family composite score.
//! - `StressIndexEngine`: the stress composite over the persisted score.
//! - `AlertEngine`: threshold rules with evidence, cached configuration.
//! - `BaselineResolver`: "previous available day" lookups.
//! - `Pipeline`: the per-date state machine and range backfill.
//! - `EngineError`: the error types that cross the engine boundary.

pub mod alerts;
pub mod baseline;
pub mod error;
pub mod pipeline;
mod series;
pub mod stress;
pub mod transmission;

// Re-export the key components to create a clean, public-facing API.
pub use alerts::{AlertEngine, codes};
pub use baseline::BaselineResolver;
pub use error::EngineError;
pub use pipeline::{DateRunOutcome, Pipeline, PipelineStage, RangeSummary};
pub use stress::StressIndexEngine;
pub use transmission::TransmissionScoreEngine;

/// Dataset names under which computed metrics are persisted.
pub mod datasets {
    pub const TRANSMISSION: &str = "transmission";
    pub const STRESS: &str = "stress";
}

/// Metric names shared between the engines and their consumers.
pub mod metrics {
    pub const TRANSMISSION_SCORE: &str = "transmission_score";
    pub const STRESS_INDEX: &str = "stress_index";
    pub const REGIME_BUCKET: &str = "regime_bucket";
    /// `"computed"` or `"neutral_fallback"`; lets downstream consumers
    /// distinguish a calibrating placeholder from a real reading.
    pub const SCORE_BASIS: &str = "score_basis";
    pub const STRESS_DRIVERS: &str = "stress_drivers";

    pub const BASIS_COMPUTED: &str = "computed";
    pub const BASIS_NEUTRAL: &str = "neutral_fallback";

    /// The provenance note attached to cold-start neutral scores.
    pub const NEUTRAL_SOURCE_NOTE: &str = "neutral fallback, calibrating";
}
