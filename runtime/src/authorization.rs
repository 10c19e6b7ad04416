//! Ownership checks.
//!
//! Every lifecycle operation resolves the property a record belongs to and
//! calls [`authorize_ownership`] before mutating anything. A record owned by
//! someone else is reported as [`LifecycleError::Unauthorized`], never as
//! not-found.

use pgpal_core::store::StoreTransaction;
use pgpal_core::{Bed, Entity, LifecycleError, OwnerId, Property, PropertyId};

/// Check that `owner_id` owns `property_id`.
///
/// # Errors
///
/// - [`LifecycleError::NotFound`] if the property does not exist
/// - [`LifecycleError::Unauthorized`] if another owner holds it
pub async fn authorize_ownership(
    tx: &mut dyn StoreTransaction,
    owner_id: OwnerId,
    property_id: PropertyId,
) -> Result<Property, LifecycleError> {
    let property = tx
        .property(property_id)
        .await?
        .ok_or_else(|| LifecycleError::not_found(Entity::Property, property_id))?;

    if property.owner_id != owner_id {
        tracing::warn!(
            owner_id = %owner_id,
            property_id = %property_id,
            "Cross-owner access rejected"
        );
        return Err(LifecycleError::unauthorized(Entity::Property, property_id));
    }

    Ok(property)
}

/// Resolve a bed's property through its room and check ownership.
///
/// # Errors
///
/// - [`LifecycleError::NotFound`] if the room or property is missing
/// - [`LifecycleError::Unauthorized`] if another owner holds the property
pub async fn authorize_bed(
    tx: &mut dyn StoreTransaction,
    owner_id: OwnerId,
    bed: &Bed,
) -> Result<Property, LifecycleError> {
    let room = tx
        .room(bed.room_id)
        .await?
        .ok_or_else(|| LifecycleError::not_found(Entity::Room, bed.room_id))?;

    authorize_ownership(tx, owner_id, room.property_id)
        .await
        .map_err(|err| match err {
            LifecycleError::Unauthorized { .. } => LifecycleError::unauthorized(Entity::Bed, bed.id),
            other => other,
        })
}
