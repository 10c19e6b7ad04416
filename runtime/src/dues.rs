//! Recurring Dues Generator.
//!
//! Brings every active tenant's billing up to date, however long the
//! generator has been idle. For each tenant the next due date is the first
//! rent anniversary after the latest existing payment, and every anniversary
//! from there up to today is billed at the tenant's current bed rent.
//!
//! Each tenant is billed in its own transaction. Inserts go through
//! `insert_due_if_absent`, so a second run on the same day, or a run racing
//! another one, creates nothing new. Reminders are sent only after the
//! tenant's transaction has committed and their failure is logged, never
//! propagated.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use metrics::counter;
use serde::Serialize;

use pgpal_core::calendar::{BillingCalendar, catch_up_dates};
use pgpal_core::environment::Clock;
use pgpal_core::notification::ReminderChannel;
use pgpal_core::store::{Store, StoreTransaction};
use pgpal_core::{Money, Payment, StoreError, Tenant, TenantId};

use crate::transaction::atomically;

/// Outcome of one generator run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DuesReport {
    /// `Due` payments created
    pub created: usize,
    /// Reminders accepted by the channel
    pub reminders_sent: usize,
    /// Reminders the channel failed to deliver
    pub reminders_failed: usize,
    /// Tenants whose billing transaction failed and was rolled back
    pub tenants_failed: usize,
}

/// Dues created for one tenant, kept for the post-commit reminders.
struct TenantBilling {
    tenant: Tenant,
    created: Vec<Payment>,
}

/// Rent reminder text for one due payment.
#[must_use]
pub fn reminder_message(name: &str, amount: Money, due_date: NaiveDate, brand: &str) -> String {
    format!(
        "Hi {name}, your monthly rent of ₹{amount} due on {} for {brand} is pending. Thank you.",
        due_date.format("%d/%m/%Y")
    )
}

/// Recurring Dues Generator.
pub struct DuesGenerator {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    calendar: BillingCalendar,
    channel: Arc<dyn ReminderChannel>,
    brand: String,
}

impl DuesGenerator {
    /// Create a generator.
    #[must_use]
    pub fn new(
        store: Arc<dyn Store>,
        clock: Arc<dyn Clock>,
        calendar: BillingCalendar,
        channel: Arc<dyn ReminderChannel>,
        brand: impl Into<String>,
    ) -> Self {
        Self {
            store,
            clock,
            calendar,
            channel,
            brand: brand.into(),
        }
    }

    /// Catch every active tenant up to today.
    ///
    /// A tenant whose transaction fails is counted in
    /// [`DuesReport::tenants_failed`] and skipped; the remaining tenants are
    /// still billed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] only if the list of active tenants cannot be
    /// read.
    #[tracing::instrument(skip(self))]
    pub async fn generate(&self) -> Result<DuesReport, StoreError> {
        let now = self.clock.now();
        let today = self.calendar.today(now);

        let tenant_ids = atomically(self.store.as_ref(), |tx| tx.active_tenant_ids()).await?;
        tracing::debug!(tenants = tenant_ids.len(), %today, "Generating dues");

        let mut report = DuesReport::default();
        for tenant_id in tenant_ids {
            let billed = atomically(self.store.as_ref(), move |tx| {
                Box::pin(bill_tenant(tx, tenant_id, today, now))
            })
            .await;

            match billed {
                Ok(Some(billing)) => {
                    report.created += billing.created.len();
                    self.send_reminders(&billing, &mut report).await;
                },
                Ok(None) => {},
                Err(err) => {
                    report.tenants_failed += 1;
                    tracing::error!(tenant_id = %tenant_id, error = %err, "Failed to bill tenant");
                },
            }
        }

        counter!("pgpal_dues_created_total")
            .increment(u64::try_from(report.created).unwrap_or(u64::MAX));
        tracing::info!(
            created = report.created,
            reminders_sent = report.reminders_sent,
            reminders_failed = report.reminders_failed,
            tenants_failed = report.tenants_failed,
            "Dues generation finished"
        );
        Ok(report)
    }

    async fn send_reminders(&self, billing: &TenantBilling, report: &mut DuesReport) {
        for due in &billing.created {
            let message =
                reminder_message(&billing.tenant.full_name, due.amount, due.due_date, &self.brand);

            match self.channel.send_reminder(&billing.tenant.phone, &message).await {
                Ok(()) => {
                    report.reminders_sent += 1;
                    counter!("pgpal_reminders_total", "outcome" => "sent").increment(1);
                },
                Err(err) => {
                    report.reminders_failed += 1;
                    counter!("pgpal_reminders_total", "outcome" => "failed").increment(1);
                    tracing::warn!(
                        tenant_id = %billing.tenant.id,
                        due_date = %due.due_date,
                        error = %err,
                        "Rent reminder not delivered"
                    );
                },
            }
        }
    }
}

/// Bill one tenant up to `today`.
///
/// Returns `None` when the tenant is gone, inactive, or has no bed to take
/// the rent from.
async fn bill_tenant(
    tx: &mut dyn StoreTransaction,
    tenant_id: TenantId,
    today: NaiveDate,
    now: DateTime<Utc>,
) -> Result<Option<TenantBilling>, StoreError> {
    // Re-read under lock: the tenant may have vacated since the listing.
    let Some(tenant) = tx.tenant(tenant_id).await?.filter(|tenant| tenant.active) else {
        return Ok(None);
    };
    let Some(bed_id) = tenant.bed_id else {
        return Ok(None);
    };
    let Some(bed) = tx.bed(bed_id).await? else {
        tracing::warn!(tenant_id = %tenant_id, bed_id = %bed_id, "Active tenant references a missing bed");
        return Ok(None);
    };

    let last_billed = tx.latest_payment(tenant_id).await?.map(|p| p.due_date);

    let mut created = Vec::new();
    for due_date in catch_up_dates(tenant.joining_date, last_billed, today) {
        let payment = Payment::due(&tenant, bed.rent_amount, due_date, now);
        if tx.insert_due_if_absent(payment.clone()).await? {
            created.push(payment);
        }
    }

    Ok(Some(TenantBilling { tenant, created }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reminder_message_formats_amount_and_date() {
        let due = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap_or_default();
        let message = reminder_message("Asha", Money::from_rupees(5000), due, "Sunrise PG");
        assert_eq!(
            message,
            "Hi Asha, your monthly rent of ₹5000 due on 05/03/2024 for Sunrise PG is pending. Thank you."
        );
    }
}
