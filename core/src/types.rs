//! Domain types for PG-Pal.
//!
//! Identifiers, money, and the three shared records the core operates on:
//! [`Bed`], [`Tenant`] and [`Payment`]. [`Property`] and [`Room`] are carried
//! only as the ownership scope above beds.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::StoreError;

// ============================================================================
// Identifiers
// ============================================================================

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            #[doc = concat!("Creates a new random `", stringify!($name), "`")]
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            #[doc = concat!("Create a `", stringify!($name), "` from a `Uuid`")]
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Get the inner UUID
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_id!(
    /// Unique identifier for an owner account
    OwnerId
);
uuid_id!(
    /// Unique identifier for a property
    PropertyId
);
uuid_id!(
    /// Unique identifier for a room
    RoomId
);
uuid_id!(
    /// Unique identifier for a bed
    BedId
);
uuid_id!(
    /// Unique identifier for a tenant
    TenantId
);
uuid_id!(
    /// Unique identifier for a payment obligation
    PaymentId
);

// ============================================================================
// Money
// ============================================================================

/// An amount of Indian rupees, stored in paise.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(u64);

impl Money {
    /// Creates a `Money` value from paise
    #[must_use]
    pub const fn from_paise(paise: u64) -> Self {
        Self(paise)
    }

    /// Creates a `Money` value from whole rupees with overflow checking
    #[must_use]
    pub const fn checked_from_rupees(rupees: u64) -> Option<Self> {
        match rupees.checked_mul(100) {
            Some(paise) => Some(Self(paise)),
            None => None,
        }
    }

    /// Creates a `Money` value from whole rupees, saturating on overflow
    #[must_use]
    pub const fn from_rupees(rupees: u64) -> Self {
        Self(rupees.saturating_mul(100))
    }

    /// Returns the amount in paise
    #[must_use]
    pub const fn paise(&self) -> u64 {
        self.0
    }

    /// Returns the amount in whole rupees (rounded down)
    #[must_use]
    pub const fn rupees(&self) -> u64 {
        self.0 / 100
    }

    /// Checks if the amount is zero
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let paise = self.0 % 100;
        if paise == 0 {
            write!(f, "{}", self.rupees())
        } else {
            write!(f, "{}.{paise:02}", self.rupees())
        }
    }
}

// ============================================================================
// Ownership scope
// ============================================================================

/// A managed building owned by exactly one owner.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    /// Property identifier
    pub id: PropertyId,
    /// Owning account
    pub owner_id: OwnerId,
    /// Display name
    pub name: String,
    /// Street address
    pub address: String,
}

/// A subdivision of a property containing beds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    /// Room identifier
    pub id: RoomId,
    /// Property the room belongs to
    pub property_id: PropertyId,
    /// Room number, unique within the property
    pub room_number: String,
    /// Floor the room is on
    pub floor: i32,
}

// ============================================================================
// Bed
// ============================================================================

/// Occupancy status of a bed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BedStatus {
    /// No active tenant holds the bed
    Available,
    /// Exactly one active tenant holds the bed
    Occupied,
}

impl BedStatus {
    /// Convert status to its persisted string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "Available",
            Self::Occupied => "Occupied",
        }
    }

    /// Parse status from its persisted string representation.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Corrupt`] if the string is not a known status.
    pub fn parse(s: &str) -> Result<Self, StoreError> {
        match s {
            "Available" => Ok(Self::Available),
            "Occupied" => Ok(Self::Occupied),
            _ => Err(StoreError::Corrupt(format!("Invalid bed status: {s}"))),
        }
    }
}

/// The billable occupancy unit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bed {
    /// Bed identifier
    pub id: BedId,
    /// Room the bed belongs to
    pub room_id: RoomId,
    /// Label, unique within the room
    pub bed_number: String,
    /// Monthly rent charged for this bed
    pub rent_amount: Money,
    /// Current occupancy status
    pub status: BedStatus,
}

impl Bed {
    /// Whether the bed is currently held by a tenant.
    #[must_use]
    pub fn is_occupied(&self) -> bool {
        self.status == BedStatus::Occupied
    }
}

// ============================================================================
// Tenant
// ============================================================================

/// A person renting a bed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tenant {
    /// Tenant identifier
    pub id: TenantId,
    /// Owner the tenant is registered with
    pub owner_id: OwnerId,
    /// Property of the tenant's current bed
    pub property_id: PropertyId,
    /// Current bed; `None` only for legacy records that lost their bed
    pub bed_id: Option<BedId>,
    /// Full name
    pub full_name: String,
    /// Ten digit phone number, unique per owner among active tenants
    pub phone: String,
    /// Optional email, unique per owner among active tenants
    pub email: Option<String>,
    /// Date the tenancy started; anchors every rent anniversary
    pub joining_date: NaiveDate,
    /// Security deposit collected at joining
    pub advance_paid: Money,
    /// Whether the tenant currently occupies a bed
    pub active: bool,
    /// When the tenant vacated
    pub vacated_at: Option<DateTime<Utc>>,
    /// When the record was created
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Payment
// ============================================================================

/// Lifecycle status of a payment obligation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentStatus {
    /// Rent is owed
    Due,
    /// Rent has been collected
    Paid,
    /// Obligation was written off when the tenant left
    Vacated,
}

impl PaymentStatus {
    /// Convert status to its persisted string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Due => "Due",
            Self::Paid => "Paid",
            Self::Vacated => "Vacated",
        }
    }

    /// Parse status from its persisted string representation.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Corrupt`] if the string is not a known status.
    pub fn parse(s: &str) -> Result<Self, StoreError> {
        match s {
            "Due" => Ok(Self::Due),
            "Paid" => Ok(Self::Paid),
            "Vacated" => Ok(Self::Vacated),
            _ => Err(StoreError::Corrupt(format!("Invalid payment status: {s}"))),
        }
    }
}

/// One month's rent owed by a tenant, dated to a rent anniversary.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    /// Payment identifier
    pub id: PaymentId,
    /// Tenant owing the rent
    pub tenant_id: TenantId,
    /// Property the rent is collected for
    pub property_id: PropertyId,
    /// Amount owed
    pub amount: Money,
    /// Anniversary the obligation belongs to; unique per tenant
    pub due_date: NaiveDate,
    /// Current status
    pub status: PaymentStatus,
    /// When the rent was collected
    pub paid_at: Option<DateTime<Utc>>,
    /// When the record was created
    pub created_at: DateTime<Utc>,
}

impl Payment {
    /// Build a new `Due` obligation for a tenant.
    #[must_use]
    pub fn due(
        tenant: &Tenant,
        amount: Money,
        due_date: NaiveDate,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: PaymentId::new(),
            tenant_id: tenant.id,
            property_id: tenant.property_id,
            amount,
            due_date,
            status: PaymentStatus::Due,
            paid_at: None,
            created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn money_display_drops_zero_paise() {
        assert_eq!(Money::from_rupees(5000).to_string(), "5000");
        assert_eq!(Money::from_paise(500_050).to_string(), "5000.50");
    }

    #[test]
    fn money_checked_from_rupees_detects_overflow() {
        assert!(Money::checked_from_rupees(u64::MAX).is_none());
        assert_eq!(Money::checked_from_rupees(12), Some(Money::from_paise(1200)));
    }

    #[test]
    fn statuses_round_trip_through_storage_strings() {
        for status in [BedStatus::Available, BedStatus::Occupied] {
            assert_eq!(BedStatus::parse(status.as_str()).ok(), Some(status));
        }
        for status in [PaymentStatus::Due, PaymentStatus::Paid, PaymentStatus::Vacated] {
            assert_eq!(PaymentStatus::parse(status.as_str()).ok(), Some(status));
        }
        assert!(BedStatus::parse("Reserved").is_err());
    }

    #[test]
    fn ids_serialize_as_plain_uuids() {
        let id = BedId::new();
        let json = serde_json::to_string(&id).unwrap_or_default();
        assert_eq!(json, format!("\"{id}\""));
    }
}
