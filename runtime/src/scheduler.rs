//! Injectable recurring timer.
//!
//! A [`Schedule`] answers "when is the next fire time after `now`";
//! [`Scheduler::start`] spawns a task that sleeps until then, runs the job,
//! and repeats until the returned [`SchedulerHandle`] is shut down. A failing
//! job is logged and the loop keeps going.
//!
//! ```rust,ignore
//! let schedule = DailySchedule::parse("01:00", calendar.offset())?;
//! let handle = Scheduler::start(schedule, clock, move || {
//!     let runner = Arc::clone(&runner);
//!     async move { runner.run(Trigger::Scheduled).await }
//! });
//! // ...
//! handle.shutdown().await;
//! ```

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, NaiveTime, TimeDelta, TimeZone, Utc};
use thiserror::Error;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use pgpal_core::environment::Clock;

/// Errors building a schedule.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    /// The wall-clock time is not `HH:MM` or `HH:MM:SS`.
    #[error("Invalid time of day: {0}")]
    InvalidTime(String),

    /// The period must be positive.
    #[error("Interval must be greater than zero")]
    ZeroInterval,
}

/// When a recurring job fires.
pub trait Schedule: Send + Sync + 'static {
    /// The first fire time strictly after `now`.
    ///
    /// `None` means the schedule is exhausted.
    fn next_after(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>>;
}

/// Fires once a day at a wall-clock time in a fixed offset.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DailySchedule {
    at: NaiveTime,
    offset: FixedOffset,
}

impl DailySchedule {
    /// Fire every day at `at` in `offset`.
    #[must_use]
    pub const fn new(at: NaiveTime, offset: FixedOffset) -> Self {
        Self { at, offset }
    }

    /// Parse `HH:MM` (or `HH:MM:SS`).
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError::InvalidTime`] if the string is not a time of
    /// day.
    pub fn parse(at: &str, offset: FixedOffset) -> Result<Self, ScheduleError> {
        let at = at.trim();
        NaiveTime::parse_from_str(at, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(at, "%H:%M:%S"))
            .map(|time| Self::new(time, offset))
            .map_err(|_| ScheduleError::InvalidTime(at.to_string()))
    }

    /// Wall-clock fire time.
    #[must_use]
    pub const fn at(&self) -> NaiveTime {
        self.at
    }
}

impl Schedule for DailySchedule {
    fn next_after(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let local_date = now.with_timezone(&self.offset).date_naive();
        let candidate = self
            .offset
            .from_local_datetime(&local_date.and_time(self.at))
            .single()?
            .with_timezone(&Utc);

        if candidate > now {
            Some(candidate)
        } else {
            candidate.checked_add_signed(TimeDelta::days(1))
        }
    }
}

/// Fires at a fixed period after each evaluation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IntervalSchedule {
    period: TimeDelta,
}

impl IntervalSchedule {
    /// Fire every `period`.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError::ZeroInterval`] for a zero period.
    pub fn new(period: Duration) -> Result<Self, ScheduleError> {
        let period = TimeDelta::from_std(period).map_err(|_| ScheduleError::ZeroInterval)?;
        if period <= TimeDelta::zero() {
            return Err(ScheduleError::ZeroInterval);
        }
        Ok(Self { period })
    }
}

impl Schedule for IntervalSchedule {
    fn next_after(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        now.checked_add_signed(self.period)
    }
}

/// Spawns recurring jobs.
pub struct Scheduler;

impl Scheduler {
    /// Run `job` on `schedule` until the handle is shut down or dropped.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start<S, F, Fut, T, E>(schedule: S, clock: Arc<dyn Clock>, job: F) -> SchedulerHandle
    where
        S: Schedule,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Display + Send + 'static,
    {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            loop {
                let now = clock.now();
                let Some(next) = schedule.next_after(now) else {
                    tracing::info!("Schedule exhausted, stopping");
                    break;
                };
                let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
                tracing::debug!(next_run = %next, "Next scheduled run");

                tokio::select! {
                    _ = &mut shutdown_rx => {
                        tracing::info!("Scheduler shutting down");
                        break;
                    }
                    () = tokio::time::sleep(wait) => {}
                }

                if let Err(err) = job().await {
                    tracing::error!(error = %err, "Scheduled job failed");
                }
            }
        });

        SchedulerHandle {
            shutdown: Some(shutdown_tx),
            task,
        }
    }
}

/// Handle to a running schedule.
pub struct SchedulerHandle {
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Stop the loop and wait for it to exit.
    ///
    /// A job already running is allowed to finish.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Err(err) = (&mut self.task).await {
            tracing::warn!(error = %err, "Scheduler task ended abnormally");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Offset;

    fn ist() -> FixedOffset {
        FixedOffset::east_opt(330 * 60).unwrap_or_else(|| Utc.fix())
    }

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).single().unwrap_or_default()
    }

    #[test]
    fn daily_fires_later_the_same_local_day() {
        let schedule = DailySchedule::parse("01:00", ist());
        assert!(schedule.is_ok());
        let schedule = schedule.unwrap_or(DailySchedule::new(NaiveTime::MIN, ist()));

        // 2024-04-14 18:00 UTC is 23:30 IST; next 01:00 IST is 19:30 UTC.
        let next = schedule.next_after(utc(2024, 4, 14, 18, 0));
        assert_eq!(next, Some(utc(2024, 4, 14, 19, 30)));
    }

    #[test]
    fn daily_rolls_to_tomorrow_once_passed() {
        let at = NaiveTime::from_hms_opt(1, 0, 0).unwrap_or(NaiveTime::MIN);
        let schedule = DailySchedule::new(at, ist());

        // Exactly at the fire time counts as passed.
        let next = schedule.next_after(utc(2024, 4, 14, 19, 30));
        assert_eq!(next, Some(utc(2024, 4, 15, 19, 30)));
    }

    #[test]
    fn parse_rejects_garbage() {
        assert_eq!(
            DailySchedule::parse("25:99", ist()),
            Err(ScheduleError::InvalidTime("25:99".to_string()))
        );
        assert!(DailySchedule::parse("06:15:30", ist()).is_ok());
    }

    #[test]
    fn interval_rejects_zero() {
        assert_eq!(IntervalSchedule::new(Duration::ZERO), Err(ScheduleError::ZeroInterval));
    }
}
