//! Running state of one calendar resolution.

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::error::{ResolveError, ResolveResult};
use crate::models::{add_days, Employee, PlanWarning, WorkCalendar};

/// One roster entry with its bookings so far.
#[derive(Debug, Clone)]
pub struct RosterSlot<'a> {
    pub employee: &'a Employee,
    pub calendar: WorkCalendar,
    /// Booked (start, end) ranges, both inclusive, in booking order.
    pub busy: Vec<(NaiveDate, NaiveDate)>,
    /// Working days assigned so far.
    pub workload: u32,
}

impl RosterSlot<'_> {
    /// Latest end among bookings that share a day with `[start, end]`.
    fn conflict_end(&self, start: NaiveDate, end: NaiveDate) -> Option<NaiveDate> {
        self.busy
            .iter()
            .filter(|&&(s, e)| s <= end && start <= e)
            .map(|&(_, e)| e)
            .max()
    }
}

/// Scheduling state threaded through a resolver run.
///
/// Owns the employees' running schedules and the completion date of every
/// task placed so far. Created fresh per run; nothing is shared between runs.
#[derive(Debug, Clone)]
pub struct ResolverContext<'a> {
    /// Calendar date of CPM offset 0.
    pub project_start: NaiveDate,
    roster: Vec<RosterSlot<'a>>,
    completions: HashMap<String, NaiveDate>,
    search_horizon_days: u32,
}

impl<'a> ResolverContext<'a> {
    /// Creates a context over the roster (kept in roster order).
    pub fn new(employees: &'a [Employee], project_start: NaiveDate, search_horizon_days: u32) -> Self {
        Self {
            project_start,
            roster: employees
                .iter()
                .map(|employee| RosterSlot {
                    employee,
                    calendar: employee.calendar(),
                    busy: Vec::new(),
                    workload: 0,
                })
                .collect(),
            completions: HashMap::new(),
            search_horizon_days,
        }
    }

    /// Warnings about roster entries that can never be scheduled as given.
    pub fn roster_warnings(&self) -> Vec<PlanWarning> {
        let mut warnings = Vec::new();
        for slot in &self.roster {
            let e = slot.employee;
            let unknown = e.unknown_days_off();
            if !unknown.is_empty() {
                warnings.push(PlanWarning::unknown_day_off(
                    &e.id,
                    format!("{} has unrecognized days off: {}", e.name, unknown.join(", ")),
                ));
            }
            if !slot.calendar.has_working_days() {
                warnings.push(PlanWarning::ineligible_employee(
                    &e.id,
                    format!("{} has no working days and cannot be assigned", e.name),
                ));
            }
        }
        warnings
    }

    pub fn slot(&self, idx: usize) -> &RosterSlot<'a> {
        &self.roster[idx]
    }

    /// Roster indices able to fill `position`, in roster order.
    pub fn eligible(&self, position: &str) -> Vec<usize> {
        self.roster
            .iter()
            .enumerate()
            .filter(|(_, s)| s.employee.matches_position(position) && s.calendar.has_working_days())
            .map(|(i, _)| i)
            .collect()
    }

    /// Records the end date of a placed task.
    pub fn record_completion(&mut self, task_id: impl Into<String>, end: NaiveDate) {
        self.completions.insert(task_id.into(), end);
    }

    pub fn completion(&self, task_id: &str) -> Option<NaiveDate> {
        self.completions.get(task_id).copied()
    }

    /// First day `task_id` may start once `predecessor` is done.
    pub fn day_after(&self, task_id: &str, predecessor: &str) -> ResolveResult<NaiveDate> {
        let end = self
            .completion(predecessor)
            .ok_or_else(|| ResolveError::MissingCompletion {
                task: task_id.to_string(),
                predecessor: predecessor.to_string(),
            })?;
        end.succ_opt()
            .ok_or_else(|| ResolveError::DateOverflow(task_id.to_string()))
    }

    /// Earliest `(start, end)` for a task on employee `idx`, starting no
    /// earlier than `lower`, on a working day, without overlapping any of
    /// the employee's bookings.
    ///
    /// Returns `None` when no slot starts within the search horizon.
    pub fn earliest_slot(
        &self,
        idx: usize,
        lower: NaiveDate,
        duration: u32,
    ) -> Option<(NaiveDate, NaiveDate)> {
        let slot = &self.roster[idx];
        let horizon = add_days(lower, i64::from(self.search_horizon_days))?;
        let mut start = slot.calendar.next_working_day(lower)?;
        while start <= horizon {
            let end = slot.calendar.finish_date(start, duration)?;
            match slot.conflict_end(start, end) {
                None => return Some((start, end)),
                Some(busy_until) => {
                    start = slot.calendar.next_working_day(busy_until.succ_opt()?)?;
                }
            }
        }
        None
    }

    /// Books `[start, end]` on employee `idx`.
    pub fn book(&mut self, idx: usize, start: NaiveDate, end: NaiveDate, duration: u32) {
        let slot = &mut self.roster[idx];
        slot.busy.push((start, end));
        slot.workload += duration;
    }
}
