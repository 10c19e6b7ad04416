//! Error taxonomy shared by every layer.
//!
//! [`StoreError`] is what persistence reports. [`LifecycleError`] is what the
//! tenancy operations report to callers; each variant maps to a distinct
//! response so a client can tell "not your property" from "bed taken".

use std::fmt;
use thiserror::Error;

/// Uniqueness constraints the store enforces.
///
/// These back up the precondition checks made inside transactions, so a
/// check-then-act race surfaces as a violation instead of corrupt state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Constraint {
    /// At most one active tenant per bed
    ActiveTenantBed,
    /// Phone unique per owner among active tenants
    TenantPhone,
    /// Email unique per owner among active tenants
    TenantEmail,
    /// At most one payment per `(tenant, due_date)`
    PaymentDueDate,
    /// Bed labels unique within a room
    BedNumber,
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ActiveTenantBed => "one active tenant per bed",
            Self::TenantPhone => "unique tenant phone",
            Self::TenantEmail => "unique tenant email",
            Self::PaymentDueDate => "one payment per due date",
            Self::BedNumber => "unique bed number per room",
        };
        f.write_str(name)
    }
}

/// Errors reported by a [`Store`](crate::store::Store) implementation.
#[derive(Error, Debug)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write.
    #[error("Constraint violated: {0}")]
    UniqueViolation(Constraint),

    /// Connection, query or transaction failure.
    #[error("Database error: {0}")]
    Database(String),

    /// A persisted value could not be decoded.
    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

/// Kinds of records a lookup can miss.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Entity {
    /// A property
    Property,
    /// A room
    Room,
    /// A bed
    Bed,
    /// A tenant
    Tenant,
    /// A payment
    Payment,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Property => "Property",
            Self::Room => "Room",
            Self::Bed => "Bed",
            Self::Tenant => "Tenant",
            Self::Payment => "Payment",
        };
        f.write_str(name)
    }
}

/// Why a lifecycle operation conflicted with current state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConflictReason {
    /// The target bed already has an active tenant
    BedOccupied,
    /// An occupied bed cannot be deleted
    BedInUse,
    /// Another active tenant of this owner uses the phone number
    DuplicatePhone,
    /// Another active tenant of this owner uses the email
    DuplicateEmail,
    /// A payment already exists for this tenant and due date
    AlreadyBilled,
    /// The payment is already settled
    AlreadyPaid,
    /// The tenant has already vacated
    AlreadyVacated,
}

impl ConflictReason {
    /// Stable machine-readable code for clients.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::BedOccupied => "BED_OCCUPIED",
            Self::BedInUse => "BED_IN_USE",
            Self::DuplicatePhone => "DUPLICATE_PHONE",
            Self::DuplicateEmail => "DUPLICATE_EMAIL",
            Self::AlreadyBilled => "ALREADY_BILLED",
            Self::AlreadyPaid => "ALREADY_PAID",
            Self::AlreadyVacated => "ALREADY_VACATED",
        }
    }
}

impl fmt::Display for ConflictReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            Self::BedOccupied => "bed already occupied",
            Self::BedInUse => "cannot delete an occupied bed; vacate the tenant first",
            Self::DuplicatePhone => "phone number is already registered to another tenant",
            Self::DuplicateEmail => "email is already registered to another tenant",
            Self::AlreadyBilled => "rent is already billed for this due date",
            Self::AlreadyPaid => "payment is already marked as paid",
            Self::AlreadyVacated => "tenant has already vacated",
        };
        f.write_str(message)
    }
}

/// Errors reported by tenancy lifecycle operations.
#[derive(Error, Debug)]
pub enum LifecycleError {
    /// A referenced record does not exist.
    #[error("{entity} with id {id} not found")]
    NotFound {
        /// Kind of record
        entity: Entity,
        /// Identifier that was looked up
        id: String,
    },

    /// The requester does not own the property chain of the record.
    #[error("Not authorized to access {entity} {id}")]
    Unauthorized {
        /// Kind of record
        entity: Entity,
        /// Identifier of the protected record
        id: String,
    },

    /// The operation conflicts with current state.
    #[error("Conflict: {0}")]
    Conflict(ConflictReason),

    /// Malformed input rejected before any persistence attempt.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Unexpected persistence failure.
    #[error("Store error: {0}")]
    Store(StoreError),
}

impl LifecycleError {
    /// Shorthand for [`LifecycleError::NotFound`].
    pub fn not_found(entity: Entity, id: impl fmt::Display) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Shorthand for [`LifecycleError::Unauthorized`].
    pub fn unauthorized(entity: Entity, id: impl fmt::Display) -> Self {
        Self::Unauthorized {
            entity,
            id: id.to_string(),
        }
    }
}

impl From<StoreError> for LifecycleError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UniqueViolation(Constraint::ActiveTenantBed) => {
                Self::Conflict(ConflictReason::BedOccupied)
            },
            StoreError::UniqueViolation(Constraint::TenantPhone) => {
                Self::Conflict(ConflictReason::DuplicatePhone)
            },
            StoreError::UniqueViolation(Constraint::TenantEmail) => {
                Self::Conflict(ConflictReason::DuplicateEmail)
            },
            StoreError::UniqueViolation(Constraint::PaymentDueDate) => {
                Self::Conflict(ConflictReason::AlreadyBilled)
            },
            other => Self::Store(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_violations_become_distinct_conflicts() {
        let cases = [
            (Constraint::ActiveTenantBed, ConflictReason::BedOccupied),
            (Constraint::TenantPhone, ConflictReason::DuplicatePhone),
            (Constraint::TenantEmail, ConflictReason::DuplicateEmail),
            (Constraint::PaymentDueDate, ConflictReason::AlreadyBilled),
        ];
        for (constraint, reason) in cases {
            let err = LifecycleError::from(StoreError::UniqueViolation(constraint));
            assert!(matches!(err, LifecycleError::Conflict(r) if r == reason));
        }
    }

    #[test]
    fn database_errors_stay_store_errors() {
        let err = LifecycleError::from(StoreError::Database("connection reset".into()));
        assert!(matches!(err, LifecycleError::Store(StoreError::Database(_))));
    }

    #[test]
    fn not_found_message_names_the_entity() {
        let err = LifecycleError::not_found(Entity::Bed, "b-1");
        assert_eq!(err.to_string(), "Bed with id b-1 not found");
    }
}
