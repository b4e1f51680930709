//! # Conduit Database Crate
//!
//! This crate is the PostgreSQL adapter behind the abstract store boundary.
//! It is the system's "permanent archive."
//!
//! ## Architectural Principles
//!
//! - **Layer 3 Adapter:** All SQL lives here. The engines only ever see the
//!   `store` traits, so this crate can be swapped for another backend
//!   without touching compute code.
//! - **Idempotent Upserts:** Every write uses `ON CONFLICT ... DO UPDATE`
//!   on the record's logical key, so recomputing a date (or re-ingesting an
//!   observation) overwrites instead of duplicating. Last writer wins.
//! - **Asynchronous & Pooled:** All operations are asynchronous over a
//!   shared `PgPool`.
//!
//! ## Public API
//!
//! - `connect`: The async function to establish the database connection pool.
//! - `run_migrations`: Applies migrations so the schema is up-to-date.
//! - `PgStore`: The store-trait implementation over the pool.
//! - `DbError`: Connection/migration errors specific to this crate.

// Declare the modules that constitute this crate.
pub mod connection;
pub mod error;
pub mod pg_store;

// Re-export the key components to create a clean, public-facing API.
pub use connection::{connect, run_migrations};
pub use error::DbError;
pub use pg_store::PgStore;
