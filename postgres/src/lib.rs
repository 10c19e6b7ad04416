//! `PostgreSQL` store for PG-Pal.
//!
//! Implements the `Store` / `StoreTransaction` traits from `pgpal-core` on top
//! of sqlx. Every lifecycle transaction is a real database transaction:
//!
//! - rows read before a write are locked with `SELECT ... FOR UPDATE`
//! - partial unique indexes back up the "one active tenant per bed" and
//!   "unique contact per owner" rules, and violations are reported as
//!   [`StoreError::UniqueViolation`](pgpal_core::StoreError::UniqueViolation)
//!   tagged with the matching constraint
//! - dues are inserted with `ON CONFLICT DO NOTHING` so concurrent generator
//!   runs never duplicate a `(tenant, due_date)` pair
//!
//! # Example
//!
//! ```ignore
//! use pgpal_postgres::{PoolConfig, PostgresStore};
//!
//! let store = PostgresStore::connect("postgres://localhost/pgpal", &PoolConfig::default()).await?;
//! store.migrate().await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod rows;
mod store;
mod transaction;

pub use store::{PoolConfig, PostgresStore};
