//! # Conduit Analytics Kernel
//!
//! This crate provides the rolling statistics and direction-correction
//! transforms that every composite indicator is built from.
//!
//! ## Architectural Principles
//!
//! - **Layer 1 Logic:** This is a pure logic crate. It has no knowledge of
//!   stores or engines, and works on plain `(date, f64)` observations; the
//!   engines convert from high-precision decimals at this boundary.
//! - **Train-Only by Default:** Any statistic used to score a target date
//!   selects its window strictly before that date. Leakage of the scored
//!   observation into its own baseline is a correctness bug, not a tuning
//!   choice, so the window selection is explicit about its mode.
//! - **Stateless Calculation:** `RollingStats` is derived from a window and
//!   discarded. Nothing here caches across dates, which keeps recomputation
//!   bit-identical.
//!
//! ## Public API
//!
//! - `select_window` / `WindowMode`: leakage-safe window selection.
//! - `RollingStats`: windowed mean, sample std and z-scores.
//! - `winsorize`, `percentile_from_z`, `norm_cdf`: the percentile transform.
//! - `ComponentScorer`: stress-direction corrections per indicator family.
//! - `AnalyticsError`: the specific error types returned from this crate.

pub mod error;
pub mod rolling;
pub mod scorer;

// Re-export the key components to create a clean, public-facing API.
pub use error::AnalyticsError;
pub use rolling::{norm_cdf, percentile_from_z, select_window, winsorize, RollingStats, WindowMode};
pub use scorer::ComponentScorer;
