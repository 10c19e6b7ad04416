//! Row decoding and error translation.

use pgpal_core::{
    Bed, BedId, BedStatus, Constraint, Money, OwnerId, Payment, PaymentId, PaymentStatus, Property,
    PropertyId, Room, RoomId, StoreError, Tenant, TenantId,
};
use sqlx::Row;
use sqlx::postgres::PgRow;
use uuid::Uuid;

/// Translate a sqlx error, recognising our unique indexes by name.
pub(crate) fn map_db_error(err: sqlx::Error) -> StoreError {
    if let Some(db) = err.as_database_error() {
        if db.is_unique_violation() {
            if let Some(constraint) = db.constraint().and_then(constraint_for) {
                return StoreError::UniqueViolation(constraint);
            }
        }
    }
    StoreError::Database(err.to_string())
}

/// Map an index or constraint name from the migrations to [`Constraint`].
pub(crate) fn constraint_for(name: &str) -> Option<Constraint> {
    match name {
        "tenants_active_bed_key" => Some(Constraint::ActiveTenantBed),
        "tenants_active_phone_key" => Some(Constraint::TenantPhone),
        "tenants_active_email_key" => Some(Constraint::TenantEmail),
        "payments_tenant_due_date_key" => Some(Constraint::PaymentDueDate),
        "beds_room_bed_number_key" => Some(Constraint::BedNumber),
        _ => None,
    }
}

fn corrupt(err: sqlx::Error) -> StoreError {
    StoreError::Corrupt(err.to_string())
}

fn uuid(row: &PgRow, column: &str) -> Result<Uuid, StoreError> {
    row.try_get::<Uuid, _>(column).map_err(corrupt)
}

pub(crate) fn money_from_db(value: i64) -> Result<Money, StoreError> {
    u64::try_from(value)
        .map(Money::from_paise)
        .map_err(|_| StoreError::Corrupt(format!("Negative amount: {value}")))
}

pub(crate) fn money_to_db(value: Money) -> Result<i64, StoreError> {
    i64::try_from(value.paise())
        .map_err(|_| StoreError::Database(format!("Amount out of range: {value}")))
}

pub(crate) fn property_from_row(row: &PgRow) -> Result<Property, StoreError> {
    Ok(Property {
        id: PropertyId::from_uuid(uuid(row, "id")?),
        owner_id: OwnerId::from_uuid(uuid(row, "owner_id")?),
        name: row.try_get("name").map_err(corrupt)?,
        address: row.try_get("address").map_err(corrupt)?,
    })
}

pub(crate) fn room_from_row(row: &PgRow) -> Result<Room, StoreError> {
    Ok(Room {
        id: RoomId::from_uuid(uuid(row, "id")?),
        property_id: PropertyId::from_uuid(uuid(row, "property_id")?),
        room_number: row.try_get("room_number").map_err(corrupt)?,
        floor: row.try_get("floor").map_err(corrupt)?,
    })
}

pub(crate) fn bed_from_row(row: &PgRow) -> Result<Bed, StoreError> {
    let status: String = row.try_get("status").map_err(corrupt)?;
    Ok(Bed {
        id: BedId::from_uuid(uuid(row, "id")?),
        room_id: RoomId::from_uuid(uuid(row, "room_id")?),
        bed_number: row.try_get("bed_number").map_err(corrupt)?,
        rent_amount: money_from_db(row.try_get("rent_amount").map_err(corrupt)?)?,
        status: BedStatus::parse(&status)?,
    })
}

pub(crate) fn tenant_from_row(row: &PgRow) -> Result<Tenant, StoreError> {
    let bed_id: Option<Uuid> = row.try_get("bed_id").map_err(corrupt)?;
    Ok(Tenant {
        id: TenantId::from_uuid(uuid(row, "id")?),
        owner_id: OwnerId::from_uuid(uuid(row, "owner_id")?),
        property_id: PropertyId::from_uuid(uuid(row, "property_id")?),
        bed_id: bed_id.map(BedId::from_uuid),
        full_name: row.try_get("full_name").map_err(corrupt)?,
        phone: row.try_get("phone").map_err(corrupt)?,
        email: row.try_get("email").map_err(corrupt)?,
        joining_date: row.try_get("joining_date").map_err(corrupt)?,
        advance_paid: money_from_db(row.try_get("advance_paid").map_err(corrupt)?)?,
        active: row.try_get("active").map_err(corrupt)?,
        vacated_at: row.try_get("vacated_at").map_err(corrupt)?,
        created_at: row.try_get("created_at").map_err(corrupt)?,
    })
}

pub(crate) fn payment_from_row(row: &PgRow) -> Result<Payment, StoreError> {
    let status: String = row.try_get("status").map_err(corrupt)?;
    Ok(Payment {
        id: PaymentId::from_uuid(uuid(row, "id")?),
        tenant_id: TenantId::from_uuid(uuid(row, "tenant_id")?),
        property_id: PropertyId::from_uuid(uuid(row, "property_id")?),
        amount: money_from_db(row.try_get("amount").map_err(corrupt)?)?,
        due_date: row.try_get("due_date").map_err(corrupt)?,
        status: PaymentStatus::parse(&status)?,
        paid_at: row.try_get("paid_at").map_err(corrupt)?,
        created_at: row.try_get("created_at").map_err(corrupt)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_names_map_to_constraints() {
        assert_eq!(
            constraint_for("tenants_active_bed_key"),
            Some(Constraint::ActiveTenantBed)
        );
        assert_eq!(
            constraint_for("payments_tenant_due_date_key"),
            Some(Constraint::PaymentDueDate)
        );
        assert_eq!(constraint_for("properties_pkey"), None);
    }

    #[test]
    fn negative_amounts_are_corrupt() {
        assert!(matches!(money_from_db(-1), Err(StoreError::Corrupt(_))));
        assert_eq!(money_from_db(500_000).ok(), Some(Money::from_rupees(5000)));
    }

    #[test]
    fn non_database_errors_stay_generic() {
        assert!(matches!(
            map_db_error(sqlx::Error::RowNotFound),
            StoreError::Database(_)
        ));
    }
}
