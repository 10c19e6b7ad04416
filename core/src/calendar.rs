//! Rent anniversary arithmetic.
//!
//! Rent falls due on monthly anniversaries of the tenant's joining date. The
//! k-th anniversary is `joining_date + k calendar months`, with the day clamped
//! to the last day of the target month when it does not exist there:
//!
//! ```text
//! joined 2024-01-31 → 2024-01-31, 2024-02-29, 2024-03-31, 2024-04-30, ...
//! ```
//!
//! Anniversaries are always derived from the joining date, never chained from
//! a previously clamped date, so a short February does not pull every later
//! due date back to the 29th. Back-fill at tenant creation and the recurring
//! catch-up both walk the same sequence, which is what makes them agree.

use chrono::{DateTime, FixedOffset, Months, NaiveDate, Offset, Utc};

/// Converts instants into billing dates.
///
/// "Today" for billing purposes is the calendar date of the current instant in
/// the configured offset, so a job firing at 01:00 local time bills for the
/// local date rather than the UTC one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BillingCalendar {
    offset: FixedOffset,
}

impl BillingCalendar {
    /// Create a calendar for the given offset.
    #[must_use]
    pub const fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    /// Calendar evaluated in UTC.
    #[must_use]
    pub fn utc() -> Self {
        Self::new(Utc.fix())
    }

    /// Calendar for an offset expressed in minutes east of UTC.
    ///
    /// Returns `None` if the offset is out of range (beyond ±24h).
    #[must_use]
    pub fn from_utc_offset_minutes(minutes: i32) -> Option<Self> {
        minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .map(Self::new)
    }

    /// The configured offset.
    #[must_use]
    pub const fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// The billing date of an instant.
    #[must_use]
    pub fn today(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.offset).date_naive()
    }
}

impl Default for BillingCalendar {
    fn default() -> Self {
        Self::utc()
    }
}

/// The k-th rent anniversary of a joining date, clamped to month end.
///
/// Returns `None` only when the result falls outside chrono's date range.
#[must_use]
pub fn anniversary(joining_date: NaiveDate, months: u32) -> Option<NaiveDate> {
    joining_date.checked_add_months(Months::new(months))
}

/// Iterator over every anniversary of a joining date, starting with the
/// joining date itself.
#[derive(Clone, Debug)]
pub struct Anniversaries {
    joining_date: NaiveDate,
    next: Option<u32>,
}

impl Anniversaries {
    /// Start walking the anniversaries of `joining_date`.
    #[must_use]
    pub const fn of(joining_date: NaiveDate) -> Self {
        Self {
            joining_date,
            next: Some(0),
        }
    }
}

impl Iterator for Anniversaries {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<Self::Item> {
        let k = self.next?;
        match anniversary(self.joining_date, k) {
            Some(date) => {
                self.next = k.checked_add(1);
                Some(date)
            },
            None => {
                self.next = None;
                None
            },
        }
    }
}

/// Due dates owed at tenant creation.
///
/// The first candidate is the joining date; candidates advance one month at a
/// time while they are on or before `today`.
#[must_use]
pub fn backfill_dates(joining_date: NaiveDate, today: NaiveDate) -> Vec<NaiveDate> {
    Anniversaries::of(joining_date)
        .take_while(|date| *date <= today)
        .collect()
}

/// Due dates still owed by a tenant whose latest bill is `last_billed`.
///
/// The next due date is the first anniversary strictly after `last_billed`;
/// every anniversary from there up to and including `today` is returned, which
/// catches up any number of missed months in one call. A tenant who has never
/// been billed counts as billed on the joining date, so their first due date
/// is one month after joining.
#[must_use]
pub fn catch_up_dates(
    joining_date: NaiveDate,
    last_billed: Option<NaiveDate>,
    today: NaiveDate,
) -> Vec<NaiveDate> {
    let last = last_billed.unwrap_or(joining_date);
    Anniversaries::of(joining_date)
        .skip_while(|date| *date <= last)
        .take_while(|date| *date <= today)
        .collect()
}
