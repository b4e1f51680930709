//! # Conduit Store Boundary
//!
//! This crate defines the abstract time-indexed store the engines compute
//! against, and an in-memory implementation of it.
//!
//! ## Architectural Principles
//!
//! - **The Trait Is the Contract:** Engines are generic over these traits,
//!   so the underlying implementation (PostgreSQL in production,
//!   `MemoryStore` in tests and embedded callers) can be swapped without
//!   touching the compute code.
//! - **Idempotent Writes:** Every write is an upsert keyed by the record's
//!   logical identity (`(series, date, source)`, `(date, dataset, metric)`,
//!   `(date, alert_code)`). Recomputing a date overwrites; it never
//!   duplicates. Last writer wins — cross-process coordination for the
//!   *same* date is a caller responsibility, not a store guarantee.
//! - **"No Data" Is Not an Error:** Readers return empty sequences or
//!   `None` for absent data. Only real I/O failures surface as
//!   `StoreError`.
//!
//! ## Public API
//!
//! - `SeriesReader` / `SeriesWriter`: raw observation access.
//! - `MetricStore`: computed metric persistence and backward scans.
//! - `AlertStore`, `ThresholdStore`: alert events and mutable rule config.
//! - `MemoryStore`: the complete in-memory implementation.
//! - `StoreError`: the error type shared by every implementation.

pub mod error;
pub mod memory;
pub mod traits;

// Re-export the key components to create a clean, public-facing API.
pub use error::StoreError;
pub use memory::MemoryStore;
pub use traits::{AlertStore, MetricStore, SeriesReader, SeriesWriter, ThresholdStore};
