//! # PG-Pal Testing
//!
//! Test doubles for the traits `pgpal-core` injects:
//!
//! - [`InMemoryStore`]: transactional store enforcing the production
//!   uniqueness constraints, with failure injection
//! - [`FixedClock`]: settable deterministic time
//! - [`RecordingChannel`] / [`FailingChannel`]: reminder channels that
//!   capture or refuse messages
//! - [`PropertyFixture`]: owner, property and room with helpers to add beds
//!
//! ## Example
//!
//! ```ignore
//! let store = InMemoryStore::new();
//! let fixture = PropertyFixture::create(&store).await;
//! let bed_id = fixture.add_bed(&store, "A", Money::from_rupees(5000)).await;
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use pgpal_core::environment::Clock;

mod fixtures;
mod store;

pub use fixtures::PropertyFixture;
pub use store::{FailurePoint, InMemoryStore};

/// Mock implementations of Environment traits.
pub mod mocks {
    use super::{Clock, DateTime, NaiveDate, Utc};
    use pgpal_core::notification::{NotificationError, ReminderChannel};
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::sync::{Arc, Mutex, PoisonError};

    /// Settable clock for deterministic tests
    ///
    /// Returns the same instant until moved with [`set`](Self::set) or
    /// [`advance`](Self::advance). Clones share the instant.
    ///
    /// # Example
    ///
    /// ```
    /// use pgpal_testing::mocks::FixedClock;
    /// use pgpal_core::environment::Clock;
    /// use chrono::{Duration, Utc};
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let before = clock.now();
    /// assert_eq!(before, clock.now());
    ///
    /// clock.advance(Duration::days(31));
    /// assert_eq!(clock.now() - before, Duration::days(31));
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        micros: Arc<AtomicI64>,
    }

    impl FixedClock {
        /// Create a new fixed clock at the given time
        #[must_use]
        pub fn new(time: DateTime<Utc>) -> Self {
            Self {
                micros: Arc::new(AtomicI64::new(time.timestamp_micros())),
            }
        }

        /// Clock at noon UTC on `date`
        #[must_use]
        pub fn on(date: NaiveDate) -> Self {
            Self::new(noon(date))
        }

        /// Move the clock to `time`
        pub fn set(&self, time: DateTime<Utc>) {
            self.micros.store(time.timestamp_micros(), Ordering::SeqCst);
        }

        /// Move the clock to noon UTC on `date`
        pub fn set_date(&self, date: NaiveDate) {
            self.set(noon(date));
        }

        /// Move the clock forward
        pub fn advance(&self, by: chrono::Duration) {
            self.set(self.now() + by);
        }
    }

    fn noon(date: NaiveDate) -> DateTime<Utc> {
        date.and_hms_opt(12, 0, 0).unwrap_or_default().and_utc()
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            DateTime::from_timestamp_micros(self.micros.load(Ordering::SeqCst)).unwrap_or_default()
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(DateTime::from_timestamp(1_735_689_600, 0).unwrap_or_default())
    }

    /// A reminder captured by [`RecordingChannel`].
    #[derive(Clone, Debug, PartialEq, Eq)]
    pub struct SentReminder {
        /// Recipient as passed to the channel
        pub phone: String,
        /// Message body
        pub message: String,
    }

    /// Reminder channel that records every message and reports success.
    #[derive(Clone, Debug, Default)]
    pub struct RecordingChannel {
        sent: Arc<Mutex<Vec<SentReminder>>>,
    }

    impl RecordingChannel {
        /// Create an empty recorder
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Messages sent so far, in order
        #[must_use]
        pub fn sent(&self) -> Vec<SentReminder> {
            self.sent
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        }
    }

    impl ReminderChannel for RecordingChannel {
        fn send_reminder(
            &self,
            phone: &str,
            message: &str,
        ) -> Pin<Box<dyn Future<Output = Result<(), NotificationError>> + Send + '_>> {
            self.sent
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(SentReminder {
                    phone: phone.to_string(),
                    message: message.to_string(),
                });
            Box::pin(async { Ok(()) })
        }
    }

    /// Reminder channel that refuses every message.
    #[derive(Clone, Copy, Debug, Default)]
    pub struct FailingChannel;

    impl ReminderChannel for FailingChannel {
        fn send_reminder(
            &self,
            _phone: &str,
            _message: &str,
        ) -> Pin<Box<dyn Future<Output = Result<(), NotificationError>> + Send + '_>> {
            Box::pin(async { Err(NotificationError::Transport("provider unreachable".to_string())) })
        }
    }
}

/// Install a test log subscriber once; later calls are no-ops.
///
/// Honours `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// Re-export commonly used items
pub use mocks::{FailingChannel, FixedClock, RecordingChannel, SentReminder, test_clock};

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    #[test]
    fn test_clock_is_new_year_2025() {
        let now = test_clock().now();
        assert_eq!((now.year(), now.month(), now.day()), (2025, 1, 1));
    }

    #[test]
    fn clones_share_the_instant() {
        let clock = test_clock();
        let shared = clock.clone();
        clock.advance(chrono::Duration::hours(5));
        assert_eq!(clock.now(), shared.now());
    }

    #[tokio::test]
    async fn recording_channel_keeps_order() {
        use pgpal_core::notification::ReminderChannel;

        let channel = RecordingChannel::new();
        assert!(channel.send_reminder("1", "first").await.is_ok());
        assert!(channel.send_reminder("2", "second").await.is_ok());

        let phones: Vec<String> = channel.sent().into_iter().map(|s| s.phone).collect();
        assert_eq!(phones, vec!["1".to_string(), "2".to_string()]);
    }
}
