//! Transactional persistence abstraction.
//!
//! Every lifecycle operation runs inside exactly one [`StoreTransaction`]:
//! the runtime acquires one with [`Store::begin`], performs its reads and
//! writes through it, then consumes it with `commit` or `rollback`. Readers
//! outside the transaction never observe a half-applied state.
//!
//! # Implementations
//!
//! - `PostgresStore` (in `pgpal-postgres`): production, row locks plus
//!   partial unique indexes
//! - `InMemoryStore` (in `pgpal-testing`): serialised transactions over a
//!   staged copy, enforcing the same uniqueness constraints
//!
//! # Dyn Compatibility
//!
//! Methods return [`StoreFuture`] instead of using `async fn` so that both
//! traits can be used as trait objects (`Arc<dyn Store>`,
//! `Box<dyn StoreTransaction>`).

use std::future::Future;
use std::pin::Pin;

use crate::error::StoreError;
use crate::types::{
    Bed, BedId, BedStatus, OwnerId, Payment, PaymentId, Property, PropertyId, Room, RoomId, Tenant,
    TenantId,
};

/// Boxed future returned by store operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

/// Source of transactions.
pub trait Store: Send + Sync {
    /// Open a new transaction.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if no connection is available.
    fn begin(&self) -> StoreFuture<'_, Box<dyn StoreTransaction>>;
}

/// A unit of work over beds, tenants and payments.
///
/// Reads of beds, tenants and payments that precede a write take a row lock
/// (or equivalent) held until the transaction ends, so a precondition checked
/// inside the transaction still holds when the write lands.
///
/// Dropping a transaction without committing discards its writes.
pub trait StoreTransaction: Send {
    // ------------------------------------------------------------------
    // Ownership scope
    // ------------------------------------------------------------------

    /// Load a property.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on persistence failure.
    fn property(&mut self, id: PropertyId) -> StoreFuture<'_, Option<Property>>;

    /// Load a room.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on persistence failure.
    fn room(&mut self, id: RoomId) -> StoreFuture<'_, Option<Room>>;

    // ------------------------------------------------------------------
    // Beds
    // ------------------------------------------------------------------

    /// Load and lock a bed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on persistence failure.
    fn bed(&mut self, id: BedId) -> StoreFuture<'_, Option<Bed>>;

    /// Set a bed's occupancy status.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on persistence failure.
    fn update_bed_status(&mut self, id: BedId, status: BedStatus) -> StoreFuture<'_, ()>;

    /// Remove a bed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on persistence failure.
    fn delete_bed(&mut self, id: BedId) -> StoreFuture<'_, ()>;

    /// Beds in the owner's properties marked `Occupied` that no active
    /// tenant references.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on persistence failure.
    fn occupied_beds_without_tenant(&mut self, owner_id: OwnerId) -> StoreFuture<'_, Vec<BedId>>;

    // ------------------------------------------------------------------
    // Tenants
    // ------------------------------------------------------------------

    /// Load and lock a tenant.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on persistence failure.
    fn tenant(&mut self, id: TenantId) -> StoreFuture<'_, Option<Tenant>>;

    /// Identifiers of every active tenant, across all owners.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on persistence failure.
    fn active_tenant_ids(&mut self) -> StoreFuture<'_, Vec<TenantId>>;

    /// The owner's active tenant using `phone`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on persistence failure.
    fn active_tenant_with_phone(
        &mut self,
        owner_id: OwnerId,
        phone: String,
    ) -> StoreFuture<'_, Option<TenantId>>;

    /// The owner's active tenant using `email`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on persistence failure.
    fn active_tenant_with_email(
        &mut self,
        owner_id: OwnerId,
        email: String,
    ) -> StoreFuture<'_, Option<TenantId>>;

    /// Insert a new tenant.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UniqueViolation`] tagged with
    /// [`Constraint::ActiveTenantBed`](crate::error::Constraint::ActiveTenantBed),
    /// `TenantPhone` or `TenantEmail` when the tenant collides with an active
    /// one.
    fn insert_tenant(&mut self, tenant: Tenant) -> StoreFuture<'_, ()>;

    /// Overwrite an existing tenant.
    ///
    /// # Errors
    ///
    /// Same constraints as [`insert_tenant`](Self::insert_tenant).
    fn update_tenant(&mut self, tenant: Tenant) -> StoreFuture<'_, ()>;

    // ------------------------------------------------------------------
    // Payments
    // ------------------------------------------------------------------

    /// The tenant's payment with the latest due date.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on persistence failure.
    fn latest_payment(&mut self, tenant_id: TenantId) -> StoreFuture<'_, Option<Payment>>;

    /// Insert payments, failing on any duplicate due date.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UniqueViolation`] with
    /// [`Constraint::PaymentDueDate`](crate::error::Constraint::PaymentDueDate)
    /// if a `(tenant, due_date)` pair already exists.
    fn insert_payments(&mut self, payments: Vec<Payment>) -> StoreFuture<'_, ()>;

    /// Insert a payment unless one already exists for its `(tenant, due_date)`.
    ///
    /// Returns `true` if the payment was inserted. A duplicate is not an error
    /// and leaves the transaction usable.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on persistence failure.
    fn insert_due_if_absent(&mut self, payment: Payment) -> StoreFuture<'_, bool>;

    /// Load and lock a payment.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on persistence failure.
    fn payment(&mut self, id: PaymentId) -> StoreFuture<'_, Option<Payment>>;

    /// Overwrite an existing payment's status and paid timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on persistence failure.
    fn update_payment(&mut self, payment: Payment) -> StoreFuture<'_, ()>;

    /// Every payment of a tenant, latest due date first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on persistence failure.
    fn payments_for_tenant(&mut self, tenant_id: TenantId) -> StoreFuture<'_, Vec<Payment>>;

    /// The owner's `Due` payments, oldest due date first, optionally limited
    /// to one property.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on persistence failure.
    fn outstanding_payments(
        &mut self,
        owner_id: OwnerId,
        property_id: Option<PropertyId>,
    ) -> StoreFuture<'_, Vec<Payment>>;

    // ------------------------------------------------------------------
    // Completion
    // ------------------------------------------------------------------

    /// Make every write visible atomically.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the commit fails; nothing is persisted then.
    fn commit(self: Box<Self>) -> StoreFuture<'static, ()>;

    /// Discard every write.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the rollback could not be issued.
    fn rollback(self: Box<Self>) -> StoreFuture<'static, ()>;
}
