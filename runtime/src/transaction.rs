//! Scoped transactions.
//!
//! [`atomically`] acquires a transaction, hands it to a closure, and commits
//! when the closure returns `Ok` or rolls back when it returns `Err`. The
//! transaction is consumed on every exit path, so callers never thread a
//! session handle around or forget to release one.
//!
//! ```rust,ignore
//! let tenant = atomically(store.as_ref(), move |tx| {
//!     Box::pin(vacate_in_tx(tx, owner_id, tenant_id, now))
//! })
//! .await?;
//! ```

use futures::future::BoxFuture;
use pgpal_core::store::{Store, StoreTransaction};
use pgpal_core::StoreError;

/// Run `op` inside a fresh transaction.
///
/// The closure may only borrow the transaction for the duration of its
/// future; anything else it needs must be moved in.
///
/// # Errors
///
/// Returns the closure's error after rolling back, or a [`StoreError`]
/// (converted into `E`) if the transaction cannot be opened or committed.
pub async fn atomically<T, E, F>(store: &dyn Store, op: F) -> Result<T, E>
where
    F: for<'t> FnOnce(&'t mut dyn StoreTransaction) -> BoxFuture<'t, Result<T, E>> + Send,
    E: From<StoreError>,
{
    let mut tx = store.begin().await?;

    match op(tx.as_mut()).await {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        },
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                tracing::warn!(error = %rollback_err, "Transaction rollback failed");
            }
            Err(err)
        },
    }
}
