//! Outbound rent reminders.
//!
//! Delivery is best-effort: callers log a [`NotificationError`] and carry on.
//! A failed reminder never rolls back or fails the operation that produced it.

use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Why a reminder could not be delivered.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotificationError {
    /// The provider refused the message.
    #[error("Provider rejected message (status {status}): {message}")]
    Rejected {
        /// Provider status code
        status: u16,
        /// Provider error text
        message: String,
    },

    /// The provider could not be reached.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The recipient number is unusable.
    #[error("Invalid recipient: {0}")]
    InvalidRecipient(String),
}

/// A channel that can deliver a text reminder to a phone number.
///
/// Returns a boxed future so the channel can be held as
/// `Arc<dyn ReminderChannel>`.
pub trait ReminderChannel: Send + Sync {
    /// Send `message` to `phone`.
    ///
    /// # Errors
    ///
    /// Returns [`NotificationError`] if delivery failed.
    fn send_reminder(
        &self,
        phone: &str,
        message: &str,
    ) -> Pin<Box<dyn Future<Output = Result<(), NotificationError>> + Send + '_>>;
}
