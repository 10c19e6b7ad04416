//! Transactional in-memory store.
//!
//! Transactions are serialised: [`InMemoryStore::begin`] takes an owned lock
//! on the whole state and works on a staged copy that replaces the state on
//! commit. The same uniqueness constraints as the `PostgreSQL` schema are
//! enforced on write, so races that slip past a precondition check surface
//! as [`StoreError::UniqueViolation`] here too.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use pgpal_core::store::{Store, StoreFuture, StoreTransaction};
use pgpal_core::{
    Bed, BedId, BedStatus, Constraint, OwnerId, Payment, PaymentId, PaymentStatus, Property,
    PropertyId, Room, RoomId, StoreError, Tenant, TenantId,
};

/// Store operations that can be made to fail on demand.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FailurePoint {
    /// `insert_payments`
    InsertPayments,
    /// `insert_due_if_absent`
    InsertDue,
    /// `update_tenant`
    UpdateTenant,
    /// `commit`
    Commit,
}

#[derive(Clone, Debug, Default)]
struct State {
    properties: HashMap<PropertyId, Property>,
    rooms: HashMap<RoomId, Room>,
    beds: HashMap<BedId, Bed>,
    tenants: HashMap<TenantId, Tenant>,
    payments: HashMap<PaymentId, Payment>,
}

impl State {
    fn owner_of_bed(&self, bed: &Bed) -> Option<OwnerId> {
        let room = self.rooms.get(&bed.room_id)?;
        self.properties.get(&room.property_id).map(|p| p.owner_id)
    }

    fn check_tenant_constraints(&self, candidate: &Tenant) -> Result<(), StoreError> {
        if !candidate.active {
            return Ok(());
        }
        for other in self.tenants.values() {
            if other.id == candidate.id || !other.active {
                continue;
            }
            if candidate.bed_id.is_some() && other.bed_id == candidate.bed_id {
                return Err(StoreError::UniqueViolation(Constraint::ActiveTenantBed));
            }
            if other.owner_id != candidate.owner_id {
                continue;
            }
            if other.phone == candidate.phone {
                return Err(StoreError::UniqueViolation(Constraint::TenantPhone));
            }
            if candidate.email.is_some() && other.email == candidate.email {
                return Err(StoreError::UniqueViolation(Constraint::TenantEmail));
            }
        }
        Ok(())
    }

    fn has_due_date(&self, payment: &Payment) -> bool {
        self.payments
            .values()
            .any(|p| p.tenant_id == payment.tenant_id && p.due_date == payment.due_date)
    }

    fn tenant_payments(&self, tenant_id: TenantId) -> Vec<Payment> {
        let mut payments: Vec<Payment> = self
            .payments
            .values()
            .filter(|p| p.tenant_id == tenant_id)
            .cloned()
            .collect();
        payments.sort_by(|a, b| b.due_date.cmp(&a.due_date));
        payments
    }
}

type Failures = Arc<Mutex<HashSet<FailurePoint>>>;

fn should_fail(failures: &Failures, point: FailurePoint) -> bool {
    failures
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .contains(&point)
}

fn injected(point: FailurePoint) -> StoreError {
    StoreError::Database(format!("injected failure at {point:?}"))
}

/// In-memory [`Store`] for tests.
///
/// Cheap to clone; clones share state.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<AsyncMutex<State>>,
    failures: Failures,
}

impl InMemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `point` fail until [`clear_failures`](Self::clear_failures).
    pub fn fail_at(&self, point: FailurePoint) {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(point);
    }

    /// Remove every injected failure.
    pub fn clear_failures(&self) {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    // ------------------------------------------------------------------
    // Seeding (bypasses constraints and transactions)
    // ------------------------------------------------------------------

    /// Seed a property.
    pub async fn put_property(&self, property: Property) {
        self.state.lock().await.properties.insert(property.id, property);
    }

    /// Seed a room.
    pub async fn put_room(&self, room: Room) {
        self.state.lock().await.rooms.insert(room.id, room);
    }

    /// Seed a bed.
    pub async fn put_bed(&self, bed: Bed) {
        self.state.lock().await.beds.insert(bed.id, bed);
    }

    /// Seed a tenant.
    pub async fn put_tenant(&self, tenant: Tenant) {
        self.state.lock().await.tenants.insert(tenant.id, tenant);
    }

    /// Seed a payment.
    pub async fn put_payment(&self, payment: Payment) {
        self.state.lock().await.payments.insert(payment.id, payment);
    }

    // ------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------

    /// Committed state of a bed.
    pub async fn get_bed(&self, id: BedId) -> Option<Bed> {
        self.state.lock().await.beds.get(&id).cloned()
    }

    /// Committed state of a tenant.
    pub async fn get_tenant(&self, id: TenantId) -> Option<Tenant> {
        self.state.lock().await.tenants.get(&id).cloned()
    }

    /// Committed payments of a tenant, latest due date first.
    pub async fn get_payments(&self, tenant_id: TenantId) -> Vec<Payment> {
        self.state.lock().await.tenant_payments(tenant_id)
    }

    /// Every committed tenant.
    pub async fn all_tenants(&self) -> Vec<Tenant> {
        self.state.lock().await.tenants.values().cloned().collect()
    }

    /// Every committed payment.
    pub async fn all_payments(&self) -> Vec<Payment> {
        self.state.lock().await.payments.values().cloned().collect()
    }

    /// Active tenants currently referencing a bed.
    pub async fn active_tenants_on_bed(&self, bed_id: BedId) -> Vec<Tenant> {
        self.state
            .lock()
            .await
            .tenants
            .values()
            .filter(|t| t.active && t.bed_id == Some(bed_id))
            .cloned()
            .collect()
    }
}

impl Store for InMemoryStore {
    fn begin(&self) -> StoreFuture<'_, Box<dyn StoreTransaction>> {
        let state = Arc::clone(&self.state);
        let failures = Arc::clone(&self.failures);
        Box::pin(async move {
            let guard = state.lock_owned().await;
            let staged = State::clone(&guard);
            let tx: Box<dyn StoreTransaction> = Box::new(InMemoryTransaction {
                guard,
                staged,
                failures,
            });
            Ok(tx)
        })
    }
}

struct InMemoryTransaction {
    guard: OwnedMutexGuard<State>,
    staged: State,
    failures: Failures,
}

impl InMemoryTransaction {
    fn fail(&self, point: FailurePoint) -> Result<(), StoreError> {
        if should_fail(&self.failures, point) {
            Err(injected(point))
        } else {
            Ok(())
        }
    }
}

impl StoreTransaction for InMemoryTransaction {
    fn property(&mut self, id: PropertyId) -> StoreFuture<'_, Option<Property>> {
        let found = self.staged.properties.get(&id).cloned();
        Box::pin(async move { Ok(found) })
    }

    fn room(&mut self, id: RoomId) -> StoreFuture<'_, Option<Room>> {
        let found = self.staged.rooms.get(&id).cloned();
        Box::pin(async move { Ok(found) })
    }

    fn bed(&mut self, id: BedId) -> StoreFuture<'_, Option<Bed>> {
        let found = self.staged.beds.get(&id).cloned();
        Box::pin(async move { Ok(found) })
    }

    fn update_bed_status(&mut self, id: BedId, status: BedStatus) -> StoreFuture<'_, ()> {
        if let Some(bed) = self.staged.beds.get_mut(&id) {
            bed.status = status;
        }
        Box::pin(async { Ok(()) })
    }

    fn delete_bed(&mut self, id: BedId) -> StoreFuture<'_, ()> {
        self.staged.beds.remove(&id);
        Box::pin(async { Ok(()) })
    }

    fn occupied_beds_without_tenant(&mut self, owner_id: OwnerId) -> StoreFuture<'_, Vec<BedId>> {
        let state = &self.staged;
        let mut orphaned: Vec<BedId> = state
            .beds
            .values()
            .filter(|bed| bed.is_occupied() && state.owner_of_bed(bed) == Some(owner_id))
            .filter(|bed| {
                !state
                    .tenants
                    .values()
                    .any(|t| t.active && t.bed_id == Some(bed.id))
            })
            .map(|bed| bed.id)
            .collect();
        orphaned.sort();
        Box::pin(async move { Ok(orphaned) })
    }

    fn tenant(&mut self, id: TenantId) -> StoreFuture<'_, Option<Tenant>> {
        let found = self.staged.tenants.get(&id).cloned();
        Box::pin(async move { Ok(found) })
    }

    fn active_tenant_ids(&mut self) -> StoreFuture<'_, Vec<TenantId>> {
        let mut active: Vec<&Tenant> = self.staged.tenants.values().filter(|t| t.active).collect();
        active.sort_by_key(|t| (t.created_at, t.id));
        let ids: Vec<TenantId> = active.into_iter().map(|t| t.id).collect();
        Box::pin(async move { Ok(ids) })
    }

    fn active_tenant_with_phone(
        &mut self,
        owner_id: OwnerId,
        phone: String,
    ) -> StoreFuture<'_, Option<TenantId>> {
        let found = self
            .staged
            .tenants
            .values()
            .find(|t| t.active && t.owner_id == owner_id && t.phone == phone)
            .map(|t| t.id);
        Box::pin(async move { Ok(found) })
    }

    fn active_tenant_with_email(
        &mut self,
        owner_id: OwnerId,
        email: String,
    ) -> StoreFuture<'_, Option<TenantId>> {
        let found = self
            .staged
            .tenants
            .values()
            .find(|t| t.active && t.owner_id == owner_id && t.email.as_deref() == Some(email.as_str()))
            .map(|t| t.id);
        Box::pin(async move { Ok(found) })
    }

    fn insert_tenant(&mut self, tenant: Tenant) -> StoreFuture<'_, ()> {
        let result = self.staged.check_tenant_constraints(&tenant).map(|()| {
            self.staged.tenants.insert(tenant.id, tenant);
        });
        Box::pin(async move { result })
    }

    fn update_tenant(&mut self, tenant: Tenant) -> StoreFuture<'_, ()> {
        let result = self
            .fail(FailurePoint::UpdateTenant)
            .and_then(|()| self.staged.check_tenant_constraints(&tenant))
            .map(|()| {
                self.staged.tenants.insert(tenant.id, tenant);
            });
        Box::pin(async move { result })
    }

    fn latest_payment(&mut self, tenant_id: TenantId) -> StoreFuture<'_, Option<Payment>> {
        let latest = self.staged.tenant_payments(tenant_id).into_iter().next();
        Box::pin(async move { Ok(latest) })
    }

    fn insert_payments(&mut self, payments: Vec<Payment>) -> StoreFuture<'_, ()> {
        let result = self.fail(FailurePoint::InsertPayments).and_then(|()| {
            for payment in payments {
                if self.staged.has_due_date(&payment) {
                    return Err(StoreError::UniqueViolation(Constraint::PaymentDueDate));
                }
                self.staged.payments.insert(payment.id, payment);
            }
            Ok(())
        });
        Box::pin(async move { result })
    }

    fn insert_due_if_absent(&mut self, payment: Payment) -> StoreFuture<'_, bool> {
        let result = self.fail(FailurePoint::InsertDue).map(|()| {
            if self.staged.has_due_date(&payment) {
                false
            } else {
                self.staged.payments.insert(payment.id, payment);
                true
            }
        });
        Box::pin(async move { result })
    }

    fn payment(&mut self, id: PaymentId) -> StoreFuture<'_, Option<Payment>> {
        let found = self.staged.payments.get(&id).cloned();
        Box::pin(async move { Ok(found) })
    }

    fn update_payment(&mut self, payment: Payment) -> StoreFuture<'_, ()> {
        if let Some(existing) = self.staged.payments.get_mut(&payment.id) {
            existing.status = payment.status;
            existing.paid_at = payment.paid_at;
        }
        Box::pin(async { Ok(()) })
    }

    fn payments_for_tenant(&mut self, tenant_id: TenantId) -> StoreFuture<'_, Vec<Payment>> {
        let payments = self.staged.tenant_payments(tenant_id);
        Box::pin(async move { Ok(payments) })
    }

    fn outstanding_payments(
        &mut self,
        owner_id: OwnerId,
        property_id: Option<PropertyId>,
    ) -> StoreFuture<'_, Vec<Payment>> {
        let state = &self.staged;
        let mut due: Vec<Payment> = state
            .payments
            .values()
            .filter(|p| p.status == PaymentStatus::Due)
            .filter(|p| property_id.is_none_or(|id| p.property_id == id))
            .filter(|p| {
                state
                    .properties
                    .get(&p.property_id)
                    .is_some_and(|property| property.owner_id == owner_id)
            })
            .cloned()
            .collect();
        due.sort_by_key(|p| (p.due_date, p.tenant_id));
        Box::pin(async move { Ok(due) })
    }

    fn commit(self: Box<Self>) -> StoreFuture<'static, ()> {
        let Self {
            mut guard,
            staged,
            failures,
        } = *self;
        Box::pin(async move {
            if should_fail(&failures, FailurePoint::Commit) {
                return Err(injected(FailurePoint::Commit));
            }
            *guard = staged;
            Ok(())
        })
    }

    fn rollback(self: Box<Self>) -> StoreFuture<'static, ()> {
        drop(self);
        Box::pin(async { Ok(()) })
    }
}
