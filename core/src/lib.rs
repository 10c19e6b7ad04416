//! # PG-Pal Core
//!
//! Domain types and pure rules for the PG-Pal hostel management backend.
//!
//! This crate is the functional core of the system. It owns no I/O: every
//! dependency on the outside world (persistence, time, SMS) is expressed as a
//! trait that the runtime crate wires to a concrete implementation.
//!
//! ## Core Concepts
//!
//! - **Bed**: the billable occupancy unit, `Available` or `Occupied`
//! - **Tenant**: a person holding exactly one bed while active
//! - **Payment**: a monthly rent obligation keyed by `(tenant, due_date)`
//! - **Billing calendar**: the anniversary arithmetic shared by back-fill and catch-up
//! - **Occupancy machine**: the only legal bed status transitions
//!
//! ## Architecture Principles
//!
//! - Functional Core, Imperative Shell
//! - Explicit transactional boundaries (see [`store`])
//! - Dependency Injection via traits ([`environment::Clock`],
//!   [`store::Store`], [`notification::ReminderChannel`])
//!
//! ## Example
//!
//! ```
//! use chrono::NaiveDate;
//! use pgpal_core::calendar::{backfill_dates, catch_up_dates};
//!
//! let joined = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
//! let today = NaiveDate::from_ymd_opt(2024, 4, 15).unwrap();
//!
//! let dues = backfill_dates(joined, today);
//! assert_eq!(dues.len(), 4);
//!
//! // Nothing more is owed until the next anniversary.
//! let later = NaiveDate::from_ymd_opt(2024, 5, 14).unwrap();
//! assert!(catch_up_dates(joined, dues.last().copied(), later).is_empty());
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, NaiveDate, Utc};
pub use serde::{Deserialize, Serialize};

pub mod calendar;
pub mod error;
pub mod notification;
pub mod occupancy;
pub mod store;
pub mod types;

/// Environment module - Dependency injection traits
///
/// All external dependencies are abstracted behind traits and injected
/// into the runtime services.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```ignore
    /// // Test - fixed time for deterministic tests
    /// struct FixedClock { time: DateTime<Utc> }
    /// impl Clock for FixedClock {
    ///     fn now(&self) -> DateTime<Utc> {
    ///         self.time
    ///     }
    /// }
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock backed by the system time.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}

pub use error::{ConflictReason, Constraint, Entity, LifecycleError, StoreError};
pub use types::{
    Bed, BedId, BedStatus, Money, OwnerId, Payment, PaymentId, PaymentStatus, Property,
    PropertyId, Room, RoomId, Tenant, TenantId,
};
