//! Working-day calendar.
//!
//! Models an employee's weekly availability: a fixed set of weekdays that
//! are never worked. Every date computation in the planner goes through
//! [`WorkCalendar::finish_date`] (or its deadline-bounded variant) so the
//! counting rule is identical everywhere.
//!
//! # Counting rule
//! The start date is day zero. Working days are counted on the days after
//! it, skipping days off, and the end date is the day on which the count
//! reaches the duration. A 5-day task starting on a Friday with weekends off
//! therefore ends on the following Friday.

use chrono::{Datelike, Days, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

/// Weekly availability pattern.
///
/// An empty calendar (no days off) works every day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkCalendar {
    /// Days off indexed by `Weekday::num_days_from_monday`.
    days_off: [bool; 7],
}

impl WorkCalendar {
    /// Creates a calendar that works every day.
    pub fn always_working() -> Self {
        Self::default()
    }

    /// Creates a calendar from a set of weekdays off.
    pub fn from_days_off(days: impl IntoIterator<Item = Weekday>) -> Self {
        days.into_iter().fold(Self::default(), Self::with_day_off)
    }

    /// Adds a weekday off.
    pub fn with_day_off(mut self, day: Weekday) -> Self {
        self.days_off[day.num_days_from_monday() as usize] = true;
        self
    }

    /// Whether `day` is a day off.
    #[inline]
    pub fn is_day_off(&self, day: Weekday) -> bool {
        self.days_off[day.num_days_from_monday() as usize]
    }

    /// Whether the date is a working day.
    #[inline]
    pub fn is_working_day(&self, date: NaiveDate) -> bool {
        !self.is_day_off(date.weekday())
    }

    /// Whether at least one weekday is worked.
    pub fn has_working_days(&self) -> bool {
        self.days_off.iter().any(|off| !off)
    }

    /// Number of working days per week.
    pub fn working_days_per_week(&self) -> usize {
        self.days_off.iter().filter(|off| !**off).count()
    }

    /// First working day at or after `from`.
    ///
    /// Returns `None` if no weekday is worked or the date range overflows.
    pub fn next_working_day(&self, from: NaiveDate) -> Option<NaiveDate> {
        if !self.has_working_days() {
            return None;
        }
        let mut date = from;
        // At most six days off in a row.
        for _ in 0..7 {
            if self.is_working_day(date) {
                return Some(date);
            }
            date = date.succ_opt()?;
        }
        None
    }

    /// End date of a task of `duration` working days starting on `start`.
    ///
    /// Returns `None` if no weekday is worked or the date range overflows.
    pub fn finish_date(&self, start: NaiveDate, duration: u32) -> Option<NaiveDate> {
        self.count_working_days(start, duration, None)
    }

    /// Like [`finish_date`](Self::finish_date), but gives up as soon as the
    /// running date passes `deadline`.
    ///
    /// Returns `None` when the task cannot finish on or before the deadline.
    pub fn finish_date_within(
        &self,
        start: NaiveDate,
        duration: u32,
        deadline: NaiveDate,
    ) -> Option<NaiveDate> {
        self.count_working_days(start, duration, Some(deadline))
    }

    fn count_working_days(
        &self,
        start: NaiveDate,
        duration: u32,
        deadline: Option<NaiveDate>,
    ) -> Option<NaiveDate> {
        if duration > 0 && !self.has_working_days() {
            return None;
        }
        let mut current = start;
        let mut counted = 0;
        while counted < duration {
            current = current.succ_opt()?;
            if deadline.is_some_and(|d| current > d) {
                return None;
            }
            if self.is_working_day(current) {
                counted += 1;
            }
        }
        Some(current)
    }
}

/// Adds whole calendar days to a date, `None` on overflow or negative result.
pub(crate) fn add_days(date: NaiveDate, days: i64) -> Option<NaiveDate> {
    if days >= 0 {
        date.checked_add_days(Days::new(days as u64))
    } else {
        date.checked_sub_days(Days::new(days.unsigned_abs()))
    }
}

/// Inclusive calendar-day span between two dates.
pub(crate) fn inclusive_span(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days() + 1
}
