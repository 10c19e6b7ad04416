//! Tenancy Lifecycle Manager.
//!
//! Orchestrates the operations that move tenants in and out of beds. Each
//! operation runs in one transaction: ownership is checked first, then the
//! occupancy preconditions, then every write. Any failure rolls the whole
//! operation back.
//!
//! | Operation | Bed effect | Tenant effect | Payment effect |
//! |-----------|------------|---------------|----------------|
//! | [`create_tenant`](TenancyLifecycle::create_tenant) | `Available → Occupied` | inserted, active | back-filled dues |
//! | [`vacate_tenant`](TenancyLifecycle::vacate_tenant) | `Occupied → Available` | inactive, vacated | none |
//! | [`transfer_tenant`](TenancyLifecycle::transfer_tenant) | old freed, new occupied | bed and property replaced | none |
//! | [`delete_bed`](TenancyLifecycle::delete_bed) | removed if free | none | none |
//! | [`mark_paid`](TenancyLifecycle::mark_paid) | none | none | `Due → Paid` |
//! | [`update_tenant`](TenancyLifecycle::update_tenant) | none | contact details edited | none |
//! | [`reconcile_beds`](TenancyLifecycle::reconcile_beds) | orphaned `Occupied → Available` | none | none |

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use metrics::counter;
use serde::{Deserialize, Serialize};

use pgpal_core::calendar::{BillingCalendar, backfill_dates};
use pgpal_core::environment::Clock;
use pgpal_core::occupancy;
use pgpal_core::store::{Store, StoreTransaction};
use pgpal_core::{
    Bed, BedId, BedStatus, ConflictReason, Entity, LifecycleError, Money, OwnerId, Payment, PaymentId,
    PaymentStatus, PropertyId, Tenant, TenantId,
};

use crate::authorization::{authorize_bed, authorize_ownership};
use crate::transaction::atomically;

/// Input for [`TenancyLifecycle::create_tenant`].
///
/// Amounts are in paise.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTenant {
    /// Full name
    pub full_name: String,
    /// Ten digit phone number
    pub phone: String,
    /// Optional email; blank is treated as absent
    #[serde(default)]
    pub email: Option<String>,
    /// First day of the tenancy
    pub joining_date: NaiveDate,
    /// Security deposit collected at joining
    #[serde(default)]
    pub advance_paid: Money,
    /// Bed to occupy
    pub bed_id: BedId,
}

impl NewTenant {
    /// Normalise and check the input before anything touches the store.
    ///
    /// Trims the name, phone and email, and drops a blank email.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Validation`] naming the first bad field.
    pub fn validate(mut self) -> Result<Self, LifecycleError> {
        self.full_name = checked_name(&self.full_name)?;
        self.phone = checked_phone(&self.phone)?;
        self.email = checked_email(self.email.as_deref())?;
        checked_amount(self.advance_paid)?;
        Ok(self)
    }
}

/// Edits to a tenant's contact details and deposit.
///
/// Absent fields are left unchanged. An email that is present but blank
/// clears the stored email.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantUpdate {
    /// New full name
    #[serde(default)]
    pub full_name: Option<String>,
    /// New ten digit phone number
    #[serde(default)]
    pub phone: Option<String>,
    /// New email; blank removes it
    #[serde(default)]
    pub email: Option<String>,
    /// Corrected security deposit
    #[serde(default)]
    pub advance_paid: Option<Money>,
}

impl TenantUpdate {
    /// Normalise and check the fields that are present.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Validation`] naming the first bad field.
    pub fn validate(self) -> Result<ValidTenantUpdate, LifecycleError> {
        Ok(ValidTenantUpdate {
            full_name: self.full_name.as_deref().map(checked_name).transpose()?,
            phone: self.phone.as_deref().map(checked_phone).transpose()?,
            email: self
                .email
                .as_deref()
                .map(|email| checked_email(Some(email)))
                .transpose()?,
            advance_paid: self.advance_paid.map(checked_amount).transpose()?,
        })
    }
}

/// A [`TenantUpdate`] that passed validation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidTenantUpdate {
    full_name: Option<String>,
    phone: Option<String>,
    email: Option<Option<String>>,
    advance_paid: Option<Money>,
}

impl ValidTenantUpdate {
    fn apply(self, tenant: &mut Tenant) {
        if let Some(full_name) = self.full_name {
            tenant.full_name = full_name;
        }
        if let Some(phone) = self.phone {
            tenant.phone = phone;
        }
        if let Some(email) = self.email {
            tenant.email = email;
        }
        if let Some(advance_paid) = self.advance_paid {
            tenant.advance_paid = advance_paid;
        }
    }
}

fn checked_name(full_name: &str) -> Result<String, LifecycleError> {
    let full_name = full_name.trim();
    if full_name.is_empty() {
        return Err(LifecycleError::Validation("fullName is required".to_string()));
    }
    Ok(full_name.to_string())
}

fn checked_phone(phone: &str) -> Result<String, LifecycleError> {
    let phone = phone.trim();
    if phone.len() != 10 || !phone.bytes().all(|b| b.is_ascii_digit()) {
        return Err(LifecycleError::Validation(
            "phone must be exactly 10 digits".to_string(),
        ));
    }
    Ok(phone.to_string())
}

fn checked_email(email: Option<&str>) -> Result<Option<String>, LifecycleError> {
    let Some(email) = email.map(str::trim).filter(|email| !email.is_empty()) else {
        return Ok(None);
    };
    if !email.contains('@') {
        return Err(LifecycleError::Validation("email is not valid".to_string()));
    }
    Ok(Some(email.to_string()))
}

/// Amounts are stored as signed 64-bit paise.
fn checked_amount(amount: Money) -> Result<Money, LifecycleError> {
    if i64::try_from(amount.paise()).is_err() {
        return Err(LifecycleError::Validation(
            "advancePaid is out of range".to_string(),
        ));
    }
    Ok(amount)
}

/// Result of [`TenancyLifecycle::create_tenant`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedTenant {
    /// The persisted tenant
    pub tenant: Tenant,
    /// Number of back-filled `Due` payments
    pub dues_created: usize,
}

/// Tenancy Lifecycle Manager.
///
/// Cheap to clone; all collaborators are shared.
#[derive(Clone)]
pub struct TenancyLifecycle {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    calendar: BillingCalendar,
}

impl TenancyLifecycle {
    /// Create a lifecycle manager.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>, calendar: BillingCalendar) -> Self {
        Self {
            store,
            clock,
            calendar,
        }
    }

    /// Register a tenant on a free bed and back-fill the rent owed so far.
    ///
    /// One `Due` payment at the bed's rent is created for every monthly
    /// anniversary of the joining date up to and including today.
    ///
    /// # Errors
    ///
    /// - `Validation` for malformed input
    /// - `NotFound` if the bed (or its room or property) is missing
    /// - `Unauthorized` if the bed belongs to another owner
    /// - `Conflict` with `BedOccupied`, `DuplicatePhone` or `DuplicateEmail`
    #[tracing::instrument(skip(self, new_tenant), fields(bed_id = %new_tenant.bed_id))]
    pub async fn create_tenant(
        &self,
        owner_id: OwnerId,
        new_tenant: NewTenant,
    ) -> Result<CreatedTenant, LifecycleError> {
        let new_tenant = new_tenant.validate()?;
        let now = self.clock.now();
        let today = self.calendar.today(now);

        let result = atomically(self.store.as_ref(), move |tx| {
            Box::pin(create_in_tx(tx, owner_id, new_tenant, now, today))
        })
        .await;

        if let Ok(created) = &result {
            counter!("pgpal_tenants_created_total").increment(1);
            tracing::info!(
                tenant_id = %created.tenant.id,
                dues_created = created.dues_created,
                "Tenant created"
            );
        }
        record_conflict(result)
    }

    /// Mark a tenant as having left and free their bed.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the tenant is missing
    /// - `Unauthorized` if the tenant belongs to another owner
    /// - `Conflict` with `AlreadyVacated` for an inactive tenant
    #[tracing::instrument(skip(self))]
    pub async fn vacate_tenant(
        &self,
        owner_id: OwnerId,
        tenant_id: TenantId,
    ) -> Result<Tenant, LifecycleError> {
        let now = self.clock.now();

        let result = atomically(self.store.as_ref(), move |tx| {
            Box::pin(vacate_in_tx(tx, owner_id, tenant_id, now))
        })
        .await;

        if result.is_ok() {
            counter!("pgpal_tenants_vacated_total").increment(1);
            tracing::info!(tenant_id = %tenant_id, "Tenant vacated");
        }
        record_conflict(result)
    }

    /// Move an active tenant to another free bed.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the tenant or the new bed is missing
    /// - `Unauthorized` if either belongs to another owner
    /// - `Conflict` with `BedOccupied` if the new bed is taken, or
    ///   `AlreadyVacated` if the tenant is inactive
    #[tracing::instrument(skip(self))]
    pub async fn transfer_tenant(
        &self,
        owner_id: OwnerId,
        tenant_id: TenantId,
        new_bed_id: BedId,
    ) -> Result<Tenant, LifecycleError> {
        let result = atomically(self.store.as_ref(), move |tx| {
            Box::pin(transfer_in_tx(tx, owner_id, tenant_id, new_bed_id))
        })
        .await;

        if result.is_ok() {
            counter!("pgpal_tenants_transferred_total").increment(1);
            tracing::info!(tenant_id = %tenant_id, new_bed_id = %new_bed_id, "Tenant transferred");
        }
        record_conflict(result)
    }

    /// Remove a bed that nobody occupies.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the bed is missing
    /// - `Unauthorized` if the bed belongs to another owner
    /// - `Conflict` with `BedInUse` while the bed is occupied
    #[tracing::instrument(skip(self))]
    pub async fn delete_bed(&self, owner_id: OwnerId, bed_id: BedId) -> Result<(), LifecycleError> {
        let result = atomically(self.store.as_ref(), move |tx| {
            Box::pin(delete_bed_in_tx(tx, owner_id, bed_id))
        })
        .await;

        if result.is_ok() {
            tracing::info!(bed_id = %bed_id, "Bed deleted");
        }
        record_conflict(result)
    }

    /// Record a due payment as collected.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the payment is missing
    /// - `Unauthorized` if the payment belongs to another owner
    /// - `Conflict` with `AlreadyPaid` if it was already collected
    #[tracing::instrument(skip(self))]
    pub async fn mark_paid(
        &self,
        owner_id: OwnerId,
        payment_id: PaymentId,
    ) -> Result<Payment, LifecycleError> {
        let now = self.clock.now();

        let result = atomically(self.store.as_ref(), move |tx| {
            Box::pin(mark_paid_in_tx(tx, owner_id, payment_id, now))
        })
        .await;

        record_conflict(result)
    }

    /// Free every bed of the owner marked occupied without an active tenant.
    ///
    /// Returns how many beds were reset.
    ///
    /// # Errors
    ///
    /// Returns `Store` on persistence failure.
    #[tracing::instrument(skip(self))]
    pub async fn reconcile_beds(&self, owner_id: OwnerId) -> Result<usize, LifecycleError> {
        let reset = atomically(self.store.as_ref(), move |tx| {
            Box::pin(reconcile_in_tx(tx, owner_id))
        })
        .await?;

        if reset > 0 {
            tracing::warn!(owner_id = %owner_id, beds_reset = reset, "Repaired orphaned bed statuses");
        }
        Ok(reset)
    }

    /// Edit a tenant's name, contact details or deposit.
    ///
    /// A new phone or email must not belong to another of the owner's active
    /// tenants.
    ///
    /// # Errors
    ///
    /// - `Validation` for malformed input
    /// - `NotFound` if the tenant is missing
    /// - `Unauthorized` if the tenant belongs to another owner
    /// - `Conflict` with `DuplicatePhone` or `DuplicateEmail`
    #[tracing::instrument(skip(self, update))]
    pub async fn update_tenant(
        &self,
        owner_id: OwnerId,
        tenant_id: TenantId,
        update: TenantUpdate,
    ) -> Result<Tenant, LifecycleError> {
        let update = update.validate()?;

        let result = atomically(self.store.as_ref(), move |tx| {
            Box::pin(update_in_tx(tx, owner_id, tenant_id, update))
        })
        .await;

        if result.is_ok() {
            tracing::info!(tenant_id = %tenant_id, "Tenant updated");
        }
        record_conflict(result)
    }

    /// Every unpaid due of the owner, oldest first.
    ///
    /// With `property_id` the listing is limited to that property.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the property is missing
    /// - `Unauthorized` if the property belongs to another owner
    pub async fn outstanding_payments(
        &self,
        owner_id: OwnerId,
        property_id: Option<PropertyId>,
    ) -> Result<Vec<Payment>, LifecycleError> {
        atomically(self.store.as_ref(), move |tx| {
            Box::pin(async move {
                if let Some(property_id) = property_id {
                    authorize_ownership(tx, owner_id, property_id).await?;
                }
                Ok(tx.outstanding_payments(owner_id, property_id).await?)
            })
        })
        .await
    }

    /// A tenant's payments, latest due date first.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the tenant is missing
    /// - `Unauthorized` if the tenant belongs to another owner
    pub async fn payment_history(
        &self,
        owner_id: OwnerId,
        tenant_id: TenantId,
    ) -> Result<Vec<Payment>, LifecycleError> {
        atomically(self.store.as_ref(), move |tx| {
            Box::pin(async move {
                let tenant = load_tenant(tx, tenant_id).await?;
                authorize_ownership(tx, owner_id, tenant.property_id).await?;
                Ok(tx.payments_for_tenant(tenant_id).await?)
            })
        })
        .await
    }
}

fn record_conflict<T>(result: Result<T, LifecycleError>) -> Result<T, LifecycleError> {
    if let Err(LifecycleError::Conflict(reason)) = &result {
        counter!("pgpal_lifecycle_conflicts_total", "reason" => reason.code()).increment(1);
        tracing::debug!(reason = %reason, "Lifecycle conflict");
    }
    result
}

async fn load_tenant(
    tx: &mut dyn StoreTransaction,
    tenant_id: TenantId,
) -> Result<Tenant, LifecycleError> {
    tx.tenant(tenant_id)
        .await?
        .ok_or_else(|| LifecycleError::not_found(Entity::Tenant, tenant_id))
}

async fn load_bed(
    tx: &mut dyn StoreTransaction,
    bed_id: BedId,
) -> Result<Bed, LifecycleError> {
    tx.bed(bed_id)
        .await?
        .ok_or_else(|| LifecycleError::not_found(Entity::Bed, bed_id))
}

async fn create_in_tx(
    tx: &mut dyn StoreTransaction,
    owner_id: OwnerId,
    new_tenant: NewTenant,
    now: DateTime<Utc>,
    today: NaiveDate,
) -> Result<CreatedTenant, LifecycleError> {
    let bed = load_bed(tx, new_tenant.bed_id).await?;
    let property = authorize_bed(tx, owner_id, &bed).await?;
    let occupied = occupancy::occupy(&bed)?;

    if tx
        .active_tenant_with_phone(owner_id, new_tenant.phone.clone())
        .await?
        .is_some()
    {
        return Err(LifecycleError::Conflict(ConflictReason::DuplicatePhone));
    }
    if let Some(email) = &new_tenant.email {
        if tx
            .active_tenant_with_email(owner_id, email.clone())
            .await?
            .is_some()
        {
            return Err(LifecycleError::Conflict(ConflictReason::DuplicateEmail));
        }
    }

    let tenant = Tenant {
        id: TenantId::new(),
        owner_id,
        property_id: property.id,
        bed_id: Some(bed.id),
        full_name: new_tenant.full_name,
        phone: new_tenant.phone,
        email: new_tenant.email,
        joining_date: new_tenant.joining_date,
        advance_paid: new_tenant.advance_paid,
        active: true,
        vacated_at: None,
        created_at: now,
    };
    tx.insert_tenant(tenant.clone()).await?;
    tx.update_bed_status(bed.id, occupied).await?;

    let dues: Vec<Payment> = backfill_dates(tenant.joining_date, today)
        .into_iter()
        .map(|due_date| Payment::due(&tenant, bed.rent_amount, due_date, now))
        .collect();
    let dues_created = dues.len();
    if !dues.is_empty() {
        tx.insert_payments(dues).await?;
    }

    Ok(CreatedTenant {
        tenant,
        dues_created,
    })
}

async fn update_in_tx(
    tx: &mut dyn StoreTransaction,
    owner_id: OwnerId,
    tenant_id: TenantId,
    update: ValidTenantUpdate,
) -> Result<Tenant, LifecycleError> {
    let mut tenant = load_tenant(tx, tenant_id).await?;
    authorize_ownership(tx, owner_id, tenant.property_id).await?;
    update.apply(&mut tenant);

    // Inactive tenants do not hold their phone or email.
    if tenant.active {
        let phone_holder = tx
            .active_tenant_with_phone(tenant.owner_id, tenant.phone.clone())
            .await?;
        if phone_holder.is_some_and(|holder| holder != tenant.id) {
            return Err(LifecycleError::Conflict(ConflictReason::DuplicatePhone));
        }
        if let Some(email) = &tenant.email {
            let email_holder = tx
                .active_tenant_with_email(tenant.owner_id, email.clone())
                .await?;
            if email_holder.is_some_and(|holder| holder != tenant.id) {
                return Err(LifecycleError::Conflict(ConflictReason::DuplicateEmail));
            }
        }
    }

    tx.update_tenant(tenant.clone()).await?;
    Ok(tenant)
}

async fn vacate_in_tx(
    tx: &mut dyn StoreTransaction,
    owner_id: OwnerId,
    tenant_id: TenantId,
    now: DateTime<Utc>,
) -> Result<Tenant, LifecycleError> {
    let mut tenant = load_tenant(tx, tenant_id).await?;
    authorize_ownership(tx, owner_id, tenant.property_id).await?;
    if !tenant.active {
        return Err(LifecycleError::Conflict(ConflictReason::AlreadyVacated));
    }

    if let Some(bed_id) = tenant.bed_id {
        if let Some(bed) = tx.bed(bed_id).await? {
            tx.update_bed_status(bed.id, occupancy::release(&bed)).await?;
        }
    }

    tenant.active = false;
    tenant.vacated_at = Some(now);
    tx.update_tenant(tenant.clone()).await?;

    Ok(tenant)
}

async fn transfer_in_tx(
    tx: &mut dyn StoreTransaction,
    owner_id: OwnerId,
    tenant_id: TenantId,
    new_bed_id: BedId,
) -> Result<Tenant, LifecycleError> {
    let mut tenant = load_tenant(tx, tenant_id).await?;
    authorize_ownership(tx, owner_id, tenant.property_id).await?;
    if !tenant.active {
        return Err(LifecycleError::Conflict(ConflictReason::AlreadyVacated));
    }

    // Lock both beds in id order so opposing transfers cannot deadlock.
    let old_bed_id = tenant.bed_id;
    let mut lock_order: Vec<BedId> = old_bed_id.into_iter().chain([new_bed_id]).collect();
    lock_order.sort();
    lock_order.dedup();

    let mut old_bed = None;
    let mut new_bed = None;
    for bed_id in lock_order {
        let bed = tx.bed(bed_id).await?;
        if bed_id == new_bed_id {
            new_bed = bed.clone();
        }
        if Some(bed_id) == old_bed_id {
            old_bed = bed;
        }
    }

    let new_bed = new_bed.ok_or_else(|| LifecycleError::not_found(Entity::Bed, new_bed_id))?;
    let new_property = authorize_bed(tx, owner_id, &new_bed).await?;
    let occupied = occupancy::occupy(&new_bed)?;

    if let Some(old_bed) = old_bed.filter(|bed| bed.id != new_bed.id) {
        tx.update_bed_status(old_bed.id, occupancy::release(&old_bed))
            .await?;
    }
    tx.update_bed_status(new_bed.id, occupied).await?;

    tenant.bed_id = Some(new_bed.id);
    tenant.property_id = new_property.id;
    tx.update_tenant(tenant.clone()).await?;

    Ok(tenant)
}

async fn delete_bed_in_tx(
    tx: &mut dyn StoreTransaction,
    owner_id: OwnerId,
    bed_id: BedId,
) -> Result<(), LifecycleError> {
    let bed = load_bed(tx, bed_id).await?;
    authorize_bed(tx, owner_id, &bed).await?;
    occupancy::ensure_deletable(&bed)?;
    tx.delete_bed(bed.id).await?;
    Ok(())
}

async fn mark_paid_in_tx(
    tx: &mut dyn StoreTransaction,
    owner_id: OwnerId,
    payment_id: PaymentId,
    now: DateTime<Utc>,
) -> Result<Payment, LifecycleError> {
    let mut payment = tx
        .payment(payment_id)
        .await?
        .ok_or_else(|| LifecycleError::not_found(Entity::Payment, payment_id))?;
    authorize_ownership(tx, owner_id, payment.property_id).await?;

    if payment.status == PaymentStatus::Paid {
        return Err(LifecycleError::Conflict(ConflictReason::AlreadyPaid));
    }

    payment.status = PaymentStatus::Paid;
    payment.paid_at = Some(now);
    tx.update_payment(payment.clone()).await?;

    Ok(payment)
}

async fn reconcile_in_tx(
    tx: &mut dyn StoreTransaction,
    owner_id: OwnerId,
) -> Result<usize, LifecycleError> {
    let orphaned = tx.occupied_beds_without_tenant(owner_id).await?;
    for bed_id in &orphaned {
        tx.update_bed_status(*bed_id, BedStatus::Available).await?;
    }
    Ok(orphaned.len())
}
