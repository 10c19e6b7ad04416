//! [`StoreTransaction`] over a sqlx transaction.

use pgpal_core::store::{StoreFuture, StoreTransaction};
use pgpal_core::{
    Bed, BedId, BedStatus, OwnerId, Payment, PaymentId, Property, PropertyId, Room, RoomId,
    StoreError, Tenant, TenantId,
};
use sqlx::{Postgres, QueryBuilder, Row, Transaction};
use uuid::Uuid;

use crate::rows::{
    bed_from_row, map_db_error, money_to_db, payment_from_row, property_from_row, room_from_row,
    tenant_from_row,
};

const BED_COLUMNS: &str = "id, room_id, bed_number, rent_amount, status";
const TENANT_COLUMNS: &str = "id, owner_id, property_id, bed_id, full_name, phone, email, \
     joining_date, advance_paid, active, vacated_at, created_at";
const PAYMENT_COLUMNS: &str =
    "id, tenant_id, property_id, amount, due_date, status, paid_at, created_at";

/// Prefix every column in a column list with a table alias.
fn qualified(alias: &str, columns: &str) -> String {
    columns
        .split(',')
        .map(|column| format!("{alias}.{}", column.trim()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// One open database transaction.
///
/// Dropping it without `commit` rolls back when the connection returns to
/// the pool.
pub(crate) struct PgTransaction {
    tx: Transaction<'static, Postgres>,
}

impl PgTransaction {
    pub(crate) const fn new(tx: Transaction<'static, Postgres>) -> Self {
        Self { tx }
    }
}

impl StoreTransaction for PgTransaction {
    fn property(&mut self, id: PropertyId) -> StoreFuture<'_, Option<Property>> {
        Box::pin(async move {
            let row = sqlx::query("SELECT id, owner_id, name, address FROM properties WHERE id = $1")
                .bind(*id.as_uuid())
                .fetch_optional(&mut *self.tx)
                .await
                .map_err(map_db_error)?;
            row.as_ref().map(property_from_row).transpose()
        })
    }

    fn room(&mut self, id: RoomId) -> StoreFuture<'_, Option<Room>> {
        Box::pin(async move {
            let row =
                sqlx::query("SELECT id, property_id, room_number, floor FROM rooms WHERE id = $1")
                    .bind(*id.as_uuid())
                    .fetch_optional(&mut *self.tx)
                    .await
                    .map_err(map_db_error)?;
            row.as_ref().map(room_from_row).transpose()
        })
    }

    fn bed(&mut self, id: BedId) -> StoreFuture<'_, Option<Bed>> {
        Box::pin(async move {
            let query = format!("SELECT {BED_COLUMNS} FROM beds WHERE id = $1 FOR UPDATE");
            let row = sqlx::query(&query)
                .bind(*id.as_uuid())
                .fetch_optional(&mut *self.tx)
                .await
                .map_err(map_db_error)?;
            row.as_ref().map(bed_from_row).transpose()
        })
    }

    fn update_bed_status(&mut self, id: BedId, status: BedStatus) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            sqlx::query("UPDATE beds SET status = $2 WHERE id = $1")
                .bind(*id.as_uuid())
                .bind(status.as_str())
                .execute(&mut *self.tx)
                .await
                .map_err(map_db_error)?;
            Ok(())
        })
    }

    fn delete_bed(&mut self, id: BedId) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            sqlx::query("DELETE FROM beds WHERE id = $1")
                .bind(*id.as_uuid())
                .execute(&mut *self.tx)
                .await
                .map_err(map_db_error)?;
            Ok(())
        })
    }

    fn occupied_beds_without_tenant(&mut self, owner_id: OwnerId) -> StoreFuture<'_, Vec<BedId>> {
        Box::pin(async move {
            let rows = sqlx::query(
                r"
                SELECT b.id
                FROM beds b
                JOIN rooms r ON r.id = b.room_id
                JOIN properties p ON p.id = r.property_id
                WHERE p.owner_id = $1
                  AND b.status = 'Occupied'
                  AND NOT EXISTS (
                      SELECT 1 FROM tenants t WHERE t.bed_id = b.id AND t.active
                  )
                ORDER BY b.id
                FOR UPDATE OF b
                ",
            )
            .bind(*owner_id.as_uuid())
            .fetch_all(&mut *self.tx)
            .await
            .map_err(map_db_error)?;

            rows.iter()
                .map(|row| {
                    row.try_get::<Uuid, _>("id")
                        .map(BedId::from_uuid)
                        .map_err(|e| StoreError::Corrupt(e.to_string()))
                })
                .collect()
        })
    }

    fn tenant(&mut self, id: TenantId) -> StoreFuture<'_, Option<Tenant>> {
        Box::pin(async move {
            let query = format!("SELECT {TENANT_COLUMNS} FROM tenants WHERE id = $1 FOR UPDATE");
            let row = sqlx::query(&query)
                .bind(*id.as_uuid())
                .fetch_optional(&mut *self.tx)
                .await
                .map_err(map_db_error)?;
            row.as_ref().map(tenant_from_row).transpose()
        })
    }

    fn active_tenant_ids(&mut self) -> StoreFuture<'_, Vec<TenantId>> {
        Box::pin(async move {
            let ids: Vec<(Uuid,)> =
                sqlx::query_as("SELECT id FROM tenants WHERE active ORDER BY created_at, id")
                    .fetch_all(&mut *self.tx)
                    .await
                    .map_err(map_db_error)?;
            Ok(ids.into_iter().map(|(id,)| TenantId::from_uuid(id)).collect())
        })
    }

    fn active_tenant_with_phone(
        &mut self,
        owner_id: OwnerId,
        phone: String,
    ) -> StoreFuture<'_, Option<TenantId>> {
        Box::pin(async move {
            let id: Option<(Uuid,)> = sqlx::query_as(
                "SELECT id FROM tenants WHERE owner_id = $1 AND phone = $2 AND active LIMIT 1",
            )
            .bind(*owner_id.as_uuid())
            .bind(phone)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(map_db_error)?;
            Ok(id.map(|(id,)| TenantId::from_uuid(id)))
        })
    }

    fn active_tenant_with_email(
        &mut self,
        owner_id: OwnerId,
        email: String,
    ) -> StoreFuture<'_, Option<TenantId>> {
        Box::pin(async move {
            let id: Option<(Uuid,)> = sqlx::query_as(
                "SELECT id FROM tenants WHERE owner_id = $1 AND email = $2 AND active LIMIT 1",
            )
            .bind(*owner_id.as_uuid())
            .bind(email)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(map_db_error)?;
            Ok(id.map(|(id,)| TenantId::from_uuid(id)))
        })
    }

    fn insert_tenant(&mut self, tenant: Tenant) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            sqlx::query(
                r"
                INSERT INTO tenants (
                    id, owner_id, property_id, bed_id, full_name, phone, email,
                    joining_date, advance_paid, active, vacated_at, created_at
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
                ",
            )
            .bind(*tenant.id.as_uuid())
            .bind(*tenant.owner_id.as_uuid())
            .bind(*tenant.property_id.as_uuid())
            .bind(tenant.bed_id.map(|id| *id.as_uuid()))
            .bind(&tenant.full_name)
            .bind(&tenant.phone)
            .bind(&tenant.email)
            .bind(tenant.joining_date)
            .bind(money_to_db(tenant.advance_paid)?)
            .bind(tenant.active)
            .bind(tenant.vacated_at)
            .bind(tenant.created_at)
            .execute(&mut *self.tx)
            .await
            .map_err(map_db_error)?;
            Ok(())
        })
    }

    fn update_tenant(&mut self, tenant: Tenant) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            sqlx::query(
                r"
                UPDATE tenants SET
                    property_id = $2, bed_id = $3, full_name = $4, phone = $5, email = $6,
                    joining_date = $7, advance_paid = $8, active = $9, vacated_at = $10
                WHERE id = $1
                ",
            )
            .bind(*tenant.id.as_uuid())
            .bind(*tenant.property_id.as_uuid())
            .bind(tenant.bed_id.map(|id| *id.as_uuid()))
            .bind(&tenant.full_name)
            .bind(&tenant.phone)
            .bind(&tenant.email)
            .bind(tenant.joining_date)
            .bind(money_to_db(tenant.advance_paid)?)
            .bind(tenant.active)
            .bind(tenant.vacated_at)
            .execute(&mut *self.tx)
            .await
            .map_err(map_db_error)?;
            Ok(())
        })
    }

    fn latest_payment(&mut self, tenant_id: TenantId) -> StoreFuture<'_, Option<Payment>> {
        Box::pin(async move {
            let query = format!(
                "SELECT {PAYMENT_COLUMNS} FROM payments WHERE tenant_id = $1 \
                 ORDER BY due_date DESC LIMIT 1"
            );
            let row = sqlx::query(&query)
                .bind(*tenant_id.as_uuid())
                .fetch_optional(&mut *self.tx)
                .await
                .map_err(map_db_error)?;
            row.as_ref().map(payment_from_row).transpose()
        })
    }

    fn insert_payments(&mut self, payments: Vec<Payment>) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            if payments.is_empty() {
                return Ok(());
            }
            let amounts = payments
                .iter()
                .map(|p| money_to_db(p.amount))
                .collect::<Result<Vec<i64>, _>>()?;

            let mut builder = QueryBuilder::<Postgres>::new(format!(
                "INSERT INTO payments ({PAYMENT_COLUMNS}) "
            ));
            builder.push_values(payments.iter().zip(amounts), |mut row, (payment, amount)| {
                row.push_bind(*payment.id.as_uuid())
                    .push_bind(*payment.tenant_id.as_uuid())
                    .push_bind(*payment.property_id.as_uuid())
                    .push_bind(amount)
                    .push_bind(payment.due_date)
                    .push_bind(payment.status.as_str())
                    .push_bind(payment.paid_at)
                    .push_bind(payment.created_at);
            });
            builder
                .build()
                .execute(&mut *self.tx)
                .await
                .map_err(map_db_error)?;
            Ok(())
        })
    }

    fn insert_due_if_absent(&mut self, payment: Payment) -> StoreFuture<'_, bool> {
        Box::pin(async move {
            let query = format!(
                "INSERT INTO payments ({PAYMENT_COLUMNS}) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
                 ON CONFLICT (tenant_id, due_date) DO NOTHING"
            );
            let result = sqlx::query(&query)
                .bind(*payment.id.as_uuid())
                .bind(*payment.tenant_id.as_uuid())
                .bind(*payment.property_id.as_uuid())
                .bind(money_to_db(payment.amount)?)
                .bind(payment.due_date)
                .bind(payment.status.as_str())
                .bind(payment.paid_at)
                .bind(payment.created_at)
                .execute(&mut *self.tx)
                .await
                .map_err(map_db_error)?;
            Ok(result.rows_affected() == 1)
        })
    }

    fn payment(&mut self, id: PaymentId) -> StoreFuture<'_, Option<Payment>> {
        Box::pin(async move {
            let query = format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE id = $1 FOR UPDATE");
            let row = sqlx::query(&query)
                .bind(*id.as_uuid())
                .fetch_optional(&mut *self.tx)
                .await
                .map_err(map_db_error)?;
            row.as_ref().map(payment_from_row).transpose()
        })
    }

    fn update_payment(&mut self, payment: Payment) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            sqlx::query("UPDATE payments SET status = $2, paid_at = $3 WHERE id = $1")
                .bind(*payment.id.as_uuid())
                .bind(payment.status.as_str())
                .bind(payment.paid_at)
                .execute(&mut *self.tx)
                .await
                .map_err(map_db_error)?;
            Ok(())
        })
    }

    fn payments_for_tenant(&mut self, tenant_id: TenantId) -> StoreFuture<'_, Vec<Payment>> {
        Box::pin(async move {
            let query = format!(
                "SELECT {PAYMENT_COLUMNS} FROM payments WHERE tenant_id = $1 ORDER BY due_date DESC"
            );
            let rows = sqlx::query(&query)
                .bind(*tenant_id.as_uuid())
                .fetch_all(&mut *self.tx)
                .await
                .map_err(map_db_error)?;
            rows.iter().map(payment_from_row).collect()
        })
    }

    fn outstanding_payments(
        &mut self,
        owner_id: OwnerId,
        property_id: Option<PropertyId>,
    ) -> StoreFuture<'_, Vec<Payment>> {
        Box::pin(async move {
            let query = format!(
                "SELECT {} FROM payments pay \
                 JOIN properties p ON p.id = pay.property_id \
                 WHERE p.owner_id = $1 AND pay.status = 'Due' \
                   AND ($2::uuid IS NULL OR pay.property_id = $2) \
                 ORDER BY pay.due_date ASC, pay.tenant_id",
                qualified("pay", PAYMENT_COLUMNS)
            );
            let rows = sqlx::query(&query)
                .bind(*owner_id.as_uuid())
                .bind(property_id.map(|id| *id.as_uuid()))
                .fetch_all(&mut *self.tx)
                .await
                .map_err(map_db_error)?;
            rows.iter().map(payment_from_row).collect()
        })
    }

    fn commit(self: Box<Self>) -> StoreFuture<'static, ()> {
        Box::pin(async move { self.tx.commit().await.map_err(map_db_error) })
    }

    fn rollback(self: Box<Self>) -> StoreFuture<'static, ()> {
        Box::pin(async move { self.tx.rollback().await.map_err(map_db_error) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qualified_prefixes_each_column() {
        assert_eq!(
            qualified("pay", "id, tenant_id,\n     due_date"),
            "pay.id, pay.tenant_id, pay.due_date"
        );
    }
}
