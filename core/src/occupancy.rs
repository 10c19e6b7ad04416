//! The bed occupancy state machine.
//!
//! ```text
//!             occupy
//! Available ──────────▶ Occupied
//!     ▲                     │
//!     └─────────────────────┘
//!             release
//! ```
//!
//! A bed may only be occupied from `Available`. Releasing is idempotent so
//! that vacating a tenant whose bed was already repaired by reconciliation
//! does not fail. Deleting is refused while the bed is occupied.

use crate::error::{ConflictReason, LifecycleError};
use crate::types::{Bed, BedStatus};

/// Status a bed takes when a tenant moves in.
///
/// # Errors
///
/// Returns [`ConflictReason::BedOccupied`] if the bed is not `Available`.
pub fn occupy(bed: &Bed) -> Result<BedStatus, LifecycleError> {
    match bed.status {
        BedStatus::Available => Ok(BedStatus::Occupied),
        BedStatus::Occupied => Err(LifecycleError::Conflict(ConflictReason::BedOccupied)),
    }
}

/// Status a bed takes when its tenant leaves.
#[must_use]
pub const fn release(_bed: &Bed) -> BedStatus {
    BedStatus::Available
}

/// Check that a bed may be removed.
///
/// # Errors
///
/// Returns [`ConflictReason::BedInUse`] while the bed is `Occupied`.
pub fn ensure_deletable(bed: &Bed) -> Result<(), LifecycleError> {
    if bed.is_occupied() {
        Err(LifecycleError::Conflict(ConflictReason::BedInUse))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BedId, Money, RoomId};

    fn bed(status: BedStatus) -> Bed {
        Bed {
            id: BedId::new(),
            room_id: RoomId::new(),
            bed_number: "A".to_string(),
            rent_amount: Money::from_rupees(5000),
            status,
        }
    }

    #[test]
    fn available_bed_can_be_occupied() {
        assert_eq!(occupy(&bed(BedStatus::Available)).ok(), Some(BedStatus::Occupied));
    }

    #[test]
    fn occupied_bed_rejects_second_tenant() {
        let result = occupy(&bed(BedStatus::Occupied));
        assert!(matches!(
            result,
            Err(LifecycleError::Conflict(ConflictReason::BedOccupied))
        ));
    }

    #[test]
    fn release_is_idempotent() {
        assert_eq!(release(&bed(BedStatus::Occupied)), BedStatus::Available);
        assert_eq!(release(&bed(BedStatus::Available)), BedStatus::Available);
    }

    #[test]
    fn only_free_beds_are_deletable() {
        assert!(ensure_deletable(&bed(BedStatus::Available)).is_ok());
        assert!(matches!(
            ensure_deletable(&bed(BedStatus::Occupied)),
            Err(LifecycleError::Conflict(ConflictReason::BedInUse))
        ));
    }
}
