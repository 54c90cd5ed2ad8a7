//! Post-resolution consistency passes.
//!
//! [`ScheduleRepairPass::apply`] reconciles every parent entry with its
//! subtasks:
//!
//! 1. Subtasks of a sequential parent are pushed forward so each starts on a
//!    working day after the previous one ends. The end date is recounted with
//!    the assignee's calendar.
//! 2. Parent start = min(subtask starts), end = max(subtask ends), duration =
//!    inclusive day span, assignee = team of the subtask assignees.
//!
//! Both steps leave a consistent plan untouched, so the pass is idempotent.
//!
//! [`ScheduleRepairPass::enforce_critical_path`] is the optional second pass
//! that lines critical tasks up in CPM order by translating them in time.

use std::collections::HashMap;

use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::models::{
    add_days, inclusive_span, Assignee, CalendarPlan, Employee, PlanWarning, ResolvedTask,
    WorkCalendar,
};

/// Parent/subtask reconciliation and critical-path date enforcement.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScheduleRepairPass;

impl ScheduleRepairPass {
    pub fn new() -> Self {
        Self
    }

    /// Runs re-sequencing and parent aggregation over the whole plan.
    ///
    /// Returns the number of entries changed.
    pub fn apply(&self, plan: &mut CalendarPlan) -> usize {
        let parents: Vec<usize> = plan
            .tasks
            .iter()
            .enumerate()
            .filter(|(_, t)| t.is_parent)
            .map(|(i, _)| i)
            .collect();

        let mut changed = 0;
        for &idx in &parents {
            if plan.tasks[idx].sequential {
                changed += Self::resequence(plan, idx);
            }
        }
        for &idx in &parents {
            if Self::aggregate_parent(plan, idx) {
                changed += 1;
            }
        }
        plan.refresh_duration();

        if changed > 0 {
            debug!(changed, "repair pass adjusted entries");
        }
        changed
    }

    /// Sets the parent at `idx` to span its subtasks.
    ///
    /// Returns whether the entry changed. Parents without subtask entries are
    /// left as they are.
    pub(crate) fn aggregate_parent(plan: &mut CalendarPlan, idx: usize) -> bool {
        let parent_id = plan.tasks[idx].task_id.clone();
        let mut span: Option<(NaiveDate, NaiveDate)> = None;
        let mut names: Vec<String> = Vec::new();
        for sub in plan.tasks.iter().filter(|t| t.parent_id.as_deref() == Some(parent_id.as_str())) {
            span = Some(match span {
                None => (sub.start, sub.end),
                Some((s, e)) => (s.min(sub.start), e.max(sub.end)),
            });
            if let Assignee::Employee { name, .. } = &sub.assignee {
                if !names.contains(name) {
                    names.push(name.clone());
                }
            }
        }
        let Some((start, end)) = span else {
            return false;
        };

        let duration = u32::try_from(inclusive_span(start, end)).unwrap_or(0);
        let assignee = Assignee::Team { names };
        let parent = &mut plan.tasks[idx];
        if parent.start == start
            && parent.end == end
            && parent.duration == duration
            && parent.assignee == assignee
        {
            return false;
        }
        parent.start = start;
        parent.end = end;
        parent.duration = duration;
        parent.assignee = assignee;
        true
    }

    /// Moves subtasks of the sequential parent at `idx` so none starts on or
    /// before the previous subtask's end.
    fn resequence(plan: &mut CalendarPlan, idx: usize) -> usize {
        let parent_id = plan.tasks[idx].task_id.clone();
        let subs: Vec<usize> = plan
            .tasks
            .iter()
            .enumerate()
            .filter(|(_, t)| t.parent_id.as_deref() == Some(parent_id.as_str()))
            .map(|(i, _)| i)
            .collect();

        let mut moved = 0;
        let mut previous_end: Option<NaiveDate> = None;
        for i in subs {
            if let Some(prev) = previous_end {
                if plan.tasks[i].start <= prev {
                    let calendar = assignee_calendar(&plan.employees, &plan.tasks[i].assignee);
                    let duration = plan.tasks[i].duration;
                    let shifted = prev
                        .succ_opt()
                        .and_then(|day| calendar.next_working_day(day))
                        .and_then(|start| calendar.finish_date(start, duration).map(|end| (start, end)));
                    match shifted {
                        Some((start, end)) => {
                            let entry = &mut plan.tasks[i];
                            debug!(task = %entry.task_id, from = %entry.start, to = %start, "subtask re-sequenced");
                            entry.start = start;
                            entry.end = end;
                            moved += 1;
                        }
                        None => {
                            warn!(task = %plan.tasks[i].task_id, "cannot re-sequence subtask; left in place");
                        }
                    }
                }
            }
            previous_end = Some(plan.tasks[i].end);
        }
        moved
    }

    /// Shifts critical tasks forward so each starts after the previous
    /// critical task ends, in CPM order.
    ///
    /// Tasks are only translated in time; parents move together with their
    /// subtasks, and entries that depend on a moved task move with it when
    /// they would otherwise start too early. A critical task is skipped with
    /// a warning, keeping its dates, when it is missing from the plan, when
    /// its early start does not come after the previous one, or when the
    /// shift would double-book an employee.
    ///
    /// Returns the number of tasks shifted.
    pub fn enforce_critical_path(&self, plan: &mut CalendarPlan) -> usize {
        let ids = plan.critical_path_ids.clone();
        let mut previous: Option<(i64, NaiveDate)> = None;
        let mut shifted = 0;

        for id in &ids {
            let Some(idx) = plan.tasks.iter().position(|t| &t.task_id == id) else {
                warn!(task = %id, "critical task has no plan entry; skipped");
                plan.add_warning(PlanWarning::critical_path_out_of_order(
                    id,
                    format!("critical task '{id}' has no plan entry"),
                ));
                continue;
            };
            let early_start = plan.tasks[idx].early_start;

            if let Some((prev_es, prev_end)) = previous {
                if early_start <= prev_es {
                    warn!(task = %id, early_start, previous = prev_es, "critical task out of order; skipped");
                    plan.add_warning(PlanWarning::critical_path_out_of_order(
                        id,
                        format!(
                            "'{}' does not follow the previous critical task (early start {early_start} <= {prev_es})",
                            plan.tasks[idx].name
                        ),
                    ));
                    continue;
                }
                if let Some(required) = prev_end.succ_opt() {
                    let offset = (required - plan.tasks[idx].start).num_days();
                    if offset > 0 {
                        match shift_with_dependents(plan, idx, offset) {
                            Ok(moved) => {
                                debug!(task = %id, offset, moved, "critical task shifted");
                                shifted += 1;
                            }
                            Err(ShiftBlocked::Overlap { moved, other }) => {
                                warn!(task = %id, blocked_by = %other, "critical shift would double-book; skipped");
                                plan.add_warning(PlanWarning::critical_path_out_of_order(
                                    id,
                                    format!(
                                        "shifting '{id}' by {offset} days would overlap '{moved}' with '{other}'"
                                    ),
                                ));
                                continue;
                            }
                            Err(ShiftBlocked::Overflow) => {
                                plan.add_warning(PlanWarning::internal(
                                    id,
                                    format!("shifting '{id}' by {offset} days overflowed"),
                                ));
                                continue;
                            }
                        }
                    }
                }
            }
            previous = Some((early_start, plan.tasks[idx].end));
        }

        plan.refresh_duration();
        shifted
    }
}

/// Calendar of the employee behind `assignee`; unassigned work counts every day.
fn assignee_calendar(employees: &[Employee], assignee: &Assignee) -> WorkCalendar {
    assignee
        .employee_id()
        .and_then(|id| employees.iter().find(|e| e.id == id))
        .map(Employee::calendar)
        .unwrap_or_else(WorkCalendar::always_working)
}

/// Why a critical-path shift was not applied.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ShiftBlocked {
    /// `moved` would share days with `other`, booked on the same employee.
    Overlap { moved: String, other: String },
    Overflow,
}

/// Moves the entry at `idx` by `offset` days, together with its subtasks and
/// every entry that would otherwise start on or before a moved predecessor's
/// new end (transitively). All moved entries keep their length.
///
/// Nothing moves if a moved entry would overlap an unmoved booking of the
/// same employee, or a date would overflow. Returns the number of entries
/// moved.
fn shift_with_dependents(
    plan: &mut CalendarPlan,
    idx: usize,
    offset: i64,
) -> Result<usize, ShiftBlocked> {
    let tasks = &plan.tasks;
    let index: HashMap<&str, usize> = tasks
        .iter()
        .enumerate()
        .map(|(i, t)| (t.task_id.as_str(), i))
        .collect();
    let mut shifted: Vec<Option<(NaiveDate, NaiveDate)>> = vec![None; tasks.len()];
    mark_group(tasks, &index, idx, offset, &mut shifted)?;

    loop {
        let mut grew = false;
        for j in 0..tasks.len() {
            if shifted[j].is_some() {
                continue;
            }
            let pushed = tasks[j].predecessors.iter().any(|p| {
                index
                    .get(p.as_str())
                    .and_then(|&pi| shifted[pi])
                    .is_some_and(|(_, end)| tasks[j].start <= end)
            });
            if pushed {
                mark_group(tasks, &index, j, offset, &mut shifted)?;
                grew = true;
            }
        }
        if !grew {
            break;
        }
    }

    for (j, dates) in shifted.iter().enumerate() {
        let (Some((start, end)), Some(employee)) = (*dates, tasks[j].assignee.employee_id()) else {
            continue;
        };
        let clash = tasks.iter().enumerate().find(|(k, t)| {
            shifted[*k].is_none()
                && t.assignee.employee_id() == Some(employee)
                && t.start <= end
                && start <= t.end
        });
        if let Some((_, other)) = clash {
            return Err(ShiftBlocked::Overlap {
                moved: tasks[j].task_id.clone(),
                other: other.task_id.clone(),
            });
        }
    }

    let mut moved = 0;
    for (entry, dates) in plan.tasks.iter_mut().zip(shifted) {
        if let Some((start, end)) = dates {
            entry.start = start;
            entry.end = end;
            moved += 1;
        }
    }
    Ok(moved)
}

/// Marks the entry at `j` for shifting along with its whole composite: the
/// parent and every subtask.
fn mark_group(
    tasks: &[ResolvedTask],
    index: &HashMap<&str, usize>,
    j: usize,
    offset: i64,
    shifted: &mut [Option<(NaiveDate, NaiveDate)>],
) -> Result<(), ShiftBlocked> {
    let root = tasks[j]
        .parent_id
        .as_deref()
        .and_then(|p| index.get(p).copied())
        .unwrap_or(j);
    let root_id = tasks[root].task_id.as_str();
    for (k, t) in tasks.iter().enumerate() {
        if shifted[k].is_some() || (k != root && t.parent_id.as_deref() != Some(root_id)) {
            continue;
        }
        let start = add_days(t.start, offset).ok_or(ShiftBlocked::Overflow)?;
        let end = add_days(t.end, offset).ok_or(ShiftBlocked::Overflow)?;
        shifted[k] = Some((start, end));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WarningKind;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn entry(id: &str, start: NaiveDate, end: NaiveDate, early_start: i64) -> ResolvedTask {
        ResolvedTask {
            task_id: id.into(),
            name: id.into(),
            start,
            end,
            duration: u32::try_from((end - start).num_days()).unwrap(),
            is_critical: true,
            reserve: 0,
            early_start,
            assignee: Assignee::Unassigned,
            position: String::new(),
            parent_id: None,
            predecessors: Vec::new(),
            is_parent: false,
            sequential: false,
            subtask_ids: Vec::new(),
            exceeds_parent_window: false,
        }
    }

    fn assigned(id: &str, who: &str, start: NaiveDate, end: NaiveDate) -> ResolvedTask {
        let mut e = entry(id, start, end, 0);
        e.assignee = Assignee::from_employee(&Employee::new(who, "Dev"));
        e
    }

    fn employee_entry(id: &str, who: &str, start: NaiveDate, end: NaiveDate, parent: &str) -> ResolvedTask {
        let mut e = assigned(id, who, start, end);
        e.parent_id = Some(parent.into());
        e
    }

    fn parent(id: &str, sequential: bool) -> ResolvedTask {
        let mut p = entry(id, date(2024, 1, 1), date(2024, 1, 1), 0);
        p.is_parent = true;
        p.sequential = sequential;
        p.assignee = Assignee::Team { names: Vec::new() };
        p
    }

    fn plan_with(tasks: Vec<ResolvedTask>) -> CalendarPlan {
        let mut plan = CalendarPlan::new(date(2024, 1, 1), vec![Employee::new("E1", "Dev")]);
        plan.tasks = tasks;
        plan
    }

    #[test]
    fn test_parent_spans_subtasks() {
        let mut plan = plan_with(vec![
            parent("P", false),
            employee_entry("S1", "E1", date(2024, 1, 3), date(2024, 1, 5), "P"),
            employee_entry("S2", "E2", date(2024, 1, 2), date(2024, 1, 4), "P"),
        ]);
        let changed = ScheduleRepairPass::new().apply(&mut plan);
        assert_eq!(changed, 1);
        let p = plan.entry("P").unwrap();
        assert_eq!(p.start, date(2024, 1, 2));
        assert_eq!(p.end, date(2024, 1, 5));
        assert_eq!(p.duration, 4);
        assert_eq!(
            p.assignee,
            Assignee::Team {
                names: vec!["E1".into(), "E2".into()]
            }
        );
        assert_eq!(plan.project_duration, 5);
    }

    #[test]
    fn test_repair_idempotent() {
        let mut plan = plan_with(vec![
            parent("P", true),
            employee_entry("S1", "E1", date(2024, 1, 1), date(2024, 1, 3), "P"),
            employee_entry("S2", "E1", date(2024, 1, 2), date(2024, 1, 4), "P"),
            parent("Q", false),
            employee_entry("S3", "E1", date(2024, 1, 8), date(2024, 1, 9), "Q"),
        ]);
        let pass = ScheduleRepairPass::new();
        assert!(pass.apply(&mut plan) > 0);
        let once = plan.clone();
        assert_eq!(pass.apply(&mut plan), 0);
        assert_eq!(plan, once);
    }

    #[test]
    fn test_resequence_keeps_working_days() {
        let mut plan = plan_with(vec![
            parent("P", true),
            employee_entry("S1", "E1", date(2024, 1, 1), date(2024, 1, 3), "P"),
            employee_entry("S2", "E1", date(2024, 1, 2), date(2024, 1, 4), "P"),
        ]);
        plan.employees = vec![Employee::new("E1", "Dev").with_day_off("Thursday")];
        ScheduleRepairPass::new().apply(&mut plan);
        let s2 = plan.entry("S2").unwrap();
        // Thu 4th is off → Fri 5th, two working days → Sun 7th
        assert_eq!(s2.start, date(2024, 1, 5));
        assert_eq!(s2.end, date(2024, 1, 7));
        assert_eq!(s2.duration, 2);
        assert_eq!(plan.entry("P").unwrap().end, date(2024, 1, 7));
    }

    #[test]
    fn test_parent_without_subtasks_untouched() {
        let mut plan = plan_with(vec![parent("P", false)]);
        let before = plan.entry("P").unwrap().clone();
        assert_eq!(ScheduleRepairPass::new().apply(&mut plan), 0);
        assert_eq!(plan.entry("P").unwrap(), &before);
    }

    #[test]
    fn test_enforce_shifts_by_translation() {
        let mut plan = plan_with(vec![
            entry("A", date(2024, 1, 1), date(2024, 1, 5), 0),
            entry("B", date(2024, 1, 3), date(2024, 1, 6), 4),
        ]);
        plan.critical_path_ids = vec!["A".into(), "B".into()];
        let shifted = ScheduleRepairPass::new().enforce_critical_path(&mut plan);
        assert_eq!(shifted, 1);
        let b = plan.entry("B").unwrap();
        assert_eq!(b.start, date(2024, 1, 6));
        assert_eq!(b.end, date(2024, 1, 9));
        assert_eq!(b.span_days(), 4);
        assert_eq!(b.duration, 3);
    }

    #[test]
    fn test_enforce_moves_subtasks_with_parent() {
        let mut p = parent("P", false);
        p.start = date(2024, 1, 2);
        p.end = date(2024, 1, 4);
        p.early_start = 3;
        let mut plan = plan_with(vec![
            entry("A", date(2024, 1, 1), date(2024, 1, 3), 0),
            p,
            employee_entry("S1", "E1", date(2024, 1, 2), date(2024, 1, 4), "P"),
        ]);
        plan.critical_path_ids = vec!["A".into(), "P".into()];
        ScheduleRepairPass::new().enforce_critical_path(&mut plan);
        assert_eq!(plan.entry("P").unwrap().start, date(2024, 1, 4));
        let s1 = plan.entry("S1").unwrap();
        assert_eq!((s1.start, s1.end), (date(2024, 1, 4), date(2024, 1, 6)));
    }

    #[test]
    fn test_enforce_pushes_dependents_along() {
        let mut b = assigned("B", "E2", date(2024, 1, 3), date(2024, 1, 6));
        b.early_start = 4;
        let mut g = assigned("G", "E2", date(2024, 1, 7), date(2024, 1, 8));
        g.is_critical = false;
        g.predecessors = vec!["B".into()];
        let mut late = entry("L", date(2024, 1, 20), date(2024, 1, 21), 9);
        late.predecessors = vec!["G".into()];
        let mut plan = plan_with(vec![entry("A", date(2024, 1, 1), date(2024, 1, 5), 0), b, g, late]);
        plan.critical_path_ids = vec!["A".into(), "B".into()];

        assert_eq!(ScheduleRepairPass::new().enforce_critical_path(&mut plan), 1);
        let b = plan.entry("B").unwrap();
        let g = plan.entry("G").unwrap();
        assert_eq!((b.start, b.end), (date(2024, 1, 6), date(2024, 1, 9)));
        assert_eq!((g.start, g.end), (date(2024, 1, 10), date(2024, 1, 11)));
        assert!(g.start > b.end);
        assert!(!b.overlaps(g));
        // Already late enough
        assert_eq!(plan.entry("L").unwrap().start, date(2024, 1, 20));
    }

    #[test]
    fn test_enforce_refuses_double_booking() {
        let mut b = assigned("B", "E2", date(2024, 1, 3), date(2024, 1, 6));
        b.early_start = 4;
        let other = assigned("X", "E2", date(2024, 1, 8), date(2024, 1, 8));
        let mut plan = plan_with(vec![entry("A", date(2024, 1, 1), date(2024, 1, 5), 0), b, other]);
        plan.critical_path_ids = vec!["A".into(), "B".into()];
        let before = plan.tasks.clone();

        assert_eq!(ScheduleRepairPass::new().enforce_critical_path(&mut plan), 0);
        assert_eq!(plan.tasks, before);
        assert!(plan
            .warnings
            .iter()
            .any(|w| w.kind == WarningKind::CriticalPathOutOfOrder && w.entity_id == "B"));
    }

    #[test]
    fn test_enforce_skips_out_of_order() {
        let mut plan = plan_with(vec![
            entry("A", date(2024, 1, 1), date(2024, 1, 5), 0),
            entry("B", date(2024, 1, 1), date(2024, 1, 3), 0),
        ]);
        plan.critical_path_ids = vec!["A".into(), "B".into(), "X".into()];
        let before = plan.entry("B").unwrap().clone();
        let shifted = ScheduleRepairPass::new().enforce_critical_path(&mut plan);
        assert_eq!(shifted, 0);
        assert_eq!(plan.entry("B").unwrap(), &before);
        let out_of_order: Vec<_> = plan
            .warnings
            .iter()
            .filter(|w| w.kind == WarningKind::CriticalPathOutOfOrder)
            .map(|w| w.entity_id.as_str())
            .collect();
        assert_eq!(out_of_order, vec!["B", "X"]);
    }

    #[test]
    fn test_enforce_leaves_ordered_plan() {
        let mut plan = plan_with(vec![
            entry("A", date(2024, 1, 1), date(2024, 1, 2), 0),
            entry("B", date(2024, 1, 3), date(2024, 1, 4), 2),
        ]);
        plan.critical_path_ids = vec!["A".into(), "B".into()];
        let before = plan.clone();
        assert_eq!(ScheduleRepairPass::new().enforce_critical_path(&mut plan), 0);
        assert_eq!(plan.tasks, before.tasks);
    }
}
