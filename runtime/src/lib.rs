//! # PG-Pal Runtime
//!
//! The imperative shell around `pgpal-core`: everything that touches the
//! store, the clock or the SMS provider.
//!
//! ## Core Components
//!
//! - **Tenancy Lifecycle Manager** ([`lifecycle`]): create, vacate and
//!   transfer tenants; delete beds; settle payments
//! - **Recurring Dues Generator** ([`dues`]): idempotent catch-up billing
//! - **Dues runner** ([`runner`]): single-flight guard shared by the
//!   schedule and the manual trigger
//! - **Scheduler** ([`scheduler`]): injectable recurring timer
//! - **Scoped transactions** ([`transaction`]) and ownership checks
//!   ([`authorization`])
//!
//! ## Example
//!
//! ```ignore
//! use pgpal_runtime::lifecycle::{NewTenant, TenancyLifecycle};
//!
//! let lifecycle = TenancyLifecycle::new(store, clock, calendar);
//! let created = lifecycle.create_tenant(owner_id, new_tenant).await?;
//! println!("{} dues back-filled", created.dues_created);
//! ```

/// Ownership checks shared by every lifecycle operation
pub mod authorization;

/// Recurring dues generation
pub mod dues;

/// Tenant and bed lifecycle operations
pub mod lifecycle;

/// Prometheus metrics
pub mod metrics;

/// Bounded retry with exponential backoff
pub mod retry;

/// Single-flight dues runner
pub mod runner;

/// Recurring timer
pub mod scheduler;

/// SMS reminder channels
pub mod sms;

/// Scoped transactions
pub mod transaction;

pub use dues::{DuesGenerator, DuesReport};
pub use lifecycle::{CreatedTenant, NewTenant, TenancyLifecycle, TenantUpdate, ValidTenantUpdate};
pub use runner::{DuesRunner, Trigger};
pub use scheduler::{DailySchedule, IntervalSchedule, Schedule, ScheduleError, Scheduler};
