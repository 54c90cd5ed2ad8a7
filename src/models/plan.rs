//! Calendar plan (solution) model.
//!
//! A calendar plan binds every task to concrete dates and, for leaf tasks,
//! to a specific employee. Degraded conditions (no eligible employee, a
//! subtask overrunning its parent's window) are recorded as warnings in the
//! plan rather than raised as errors, so the plan is always usable.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::calendar::inclusive_span;
use super::Employee;

/// Display name used for tasks nobody could be assigned to.
pub const UNASSIGNED: &str = "Unassigned";

/// Who performs a resolved task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Assignee {
    /// A single employee from the roster.
    Employee {
        id: String,
        name: String,
        email: Option<String>,
    },
    /// Composite parent: the employees working on its subtasks.
    Team { names: Vec<String> },
    /// No employee holds the required position.
    Unassigned,
}

impl Assignee {
    /// Creates an employee assignee from a roster entry.
    pub fn from_employee(employee: &Employee) -> Self {
        Self::Employee {
            id: employee.id.clone(),
            name: employee.name.clone(),
            email: employee.email.clone(),
        }
    }

    /// Name shown to users.
    pub fn display_name(&self) -> String {
        match self {
            Self::Employee { name, .. } => name.clone(),
            Self::Team { names } => names.join(", "),
            Self::Unassigned => UNASSIGNED.to_string(),
        }
    }

    /// Employee ID for single-employee assignments.
    pub fn employee_id(&self) -> Option<&str> {
        match self {
            Self::Employee { id, .. } => Some(id),
            _ => None,
        }
    }

    /// Contact email for single-employee assignments.
    pub fn email(&self) -> Option<&str> {
        match self {
            Self::Employee { email, .. } => email.as_deref(),
            _ => None,
        }
    }

    pub fn is_unassigned(&self) -> bool {
        matches!(self, Self::Unassigned)
    }
}

/// A task bound to calendar dates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedTask {
    /// Task identifier (generated subtasks use `"{parent}#{k}"`).
    pub task_id: String,
    /// Task name.
    pub name: String,
    /// First day of work (inclusive).
    pub start: NaiveDate,
    /// Last day of work (inclusive).
    pub end: NaiveDate,
    /// Working days for leaf tasks; inclusive day span for parents.
    pub duration: u32,
    /// Whether the task (or its parent) lies on the critical path.
    pub is_critical: bool,
    /// Float in days from the CPM analysis.
    pub reserve: i64,
    /// CPM early start offset (days from project start).
    pub early_start: i64,
    /// Who performs the task.
    pub assignee: Assignee,
    /// Required position.
    pub position: String,
    /// Composite parent, for subtasks.
    pub parent_id: Option<String>,
    /// IDs of the entries this one waits for.
    #[serde(default)]
    pub predecessors: Vec<String>,
    /// Whether this entry is a composite parent.
    pub is_parent: bool,
    /// Whether this parent's subtasks run one after another.
    pub sequential: bool,
    /// Subtask IDs in planning order, for parents.
    pub subtask_ids: Vec<String>,
    /// Subtask could not finish inside its parent's planned window.
    pub exceeds_parent_window: bool,
}

impl ResolvedTask {
    /// Inclusive calendar-day span of the entry.
    pub fn span_days(&self) -> i64 {
        inclusive_span(self.start, self.end)
    }

    /// Whether two entries share at least one calendar day.
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start <= other.end && other.start <= self.end
    }
}

/// Classification of plan warnings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarningKind {
    /// No employee holds the required position.
    Unassigned,
    /// A subtask finishes after its parent's planned window.
    ExceedsParentWindow,
    /// A critical task could not be placed in chain order.
    CriticalPathOutOfOrder,
    /// An employee can never be assigned (no working days).
    IneligibleEmployee,
    /// A day-off name is not a weekday.
    UnknownDayOff,
    /// Resolution stopped early; the plan is partial.
    Internal,
}

/// A degraded-but-valid condition found while planning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanWarning {
    /// Type of warning.
    pub kind: WarningKind,
    /// Related task or employee ID.
    pub entity_id: String,
    /// Human-readable description.
    pub message: String,
}

impl PlanWarning {
    fn new(kind: WarningKind, entity_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            entity_id: entity_id.into(),
            message: message.into(),
        }
    }

    pub fn unassigned(task_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(WarningKind::Unassigned, task_id, message)
    }

    pub fn exceeds_parent_window(task_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(WarningKind::ExceedsParentWindow, task_id, message)
    }

    pub fn critical_path_out_of_order(
        task_id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(WarningKind::CriticalPathOutOfOrder, task_id, message)
    }

    pub fn ineligible_employee(employee_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(WarningKind::IneligibleEmployee, employee_id, message)
    }

    pub fn unknown_day_off(employee_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(WarningKind::UnknownDayOff, employee_id, message)
    }

    pub fn internal(entity_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(WarningKind::Internal, entity_id, message)
    }
}

/// A complete calendar plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarPlan {
    /// Project start date (CPM offset 0).
    pub project_start: NaiveDate,
    /// Resolved entries; each parent is followed by its subtasks.
    pub tasks: Vec<ResolvedTask>,
    /// Critical task names ordered by early start.
    pub critical_path: Vec<String>,
    /// Critical task IDs in the same order as `critical_path`.
    pub critical_path_ids: Vec<String>,
    /// Inclusive calendar days from project start to the latest end date.
    pub project_duration: i64,
    /// Theoretical duration from the CPM analysis (days).
    pub cpm_duration: i64,
    /// Roster used for the plan.
    pub employees: Vec<Employee>,
    /// Degraded conditions found while planning.
    pub warnings: Vec<PlanWarning>,
}

impl CalendarPlan {
    /// Creates an empty plan.
    pub fn new(project_start: NaiveDate, employees: Vec<Employee>) -> Self {
        Self {
            project_start,
            tasks: Vec::new(),
            critical_path: Vec::new(),
            critical_path_ids: Vec::new(),
            project_duration: 0,
            cpm_duration: 0,
            employees,
            warnings: Vec::new(),
        }
    }

    /// Finds the entry for a task.
    pub fn entry(&self, task_id: &str) -> Option<&ResolvedTask> {
        self.tasks.iter().find(|t| t.task_id == task_id)
    }

    /// Entries assigned to one employee, in plan order.
    pub fn entries_for_employee(&self, employee_id: &str) -> Vec<&ResolvedTask> {
        self.tasks
            .iter()
            .filter(|t| t.assignee.employee_id() == Some(employee_id))
            .collect()
    }

    /// Subtask entries of a parent, in plan order.
    pub fn subtasks_of(&self, parent_id: &str) -> Vec<&ResolvedTask> {
        self.tasks
            .iter()
            .filter(|t| t.parent_id.as_deref() == Some(parent_id))
            .collect()
    }

    /// Leaf entries nobody was assigned to.
    pub fn unassigned(&self) -> Vec<&ResolvedTask> {
        self.tasks
            .iter()
            .filter(|t| !t.is_parent && t.assignee.is_unassigned())
            .collect()
    }

    /// Working days assigned per employee ID.
    pub fn workload_by_employee(&self) -> BTreeMap<String, u32> {
        let mut load = BTreeMap::new();
        for t in &self.tasks {
            if let Some(id) = t.assignee.employee_id() {
                *load.entry(id.to_string()).or_insert(0) += t.duration;
            }
        }
        load
    }

    /// Latest end date across all entries.
    pub fn finish_date(&self) -> Option<NaiveDate> {
        self.tasks.iter().map(|t| t.end).max()
    }

    /// Recomputes `project_duration` from the entries.
    pub fn refresh_duration(&mut self) {
        self.project_duration = self
            .finish_date()
            .map(|end| inclusive_span(self.project_start, end).max(0))
            .unwrap_or(0);
    }

    pub fn add_warning(&mut self, warning: PlanWarning) {
        self.warnings.push(warning);
    }

    /// Whether planning finished without any warning.
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    /// Number of entries (parents and subtasks included).
    pub fn entry_count(&self) -> usize {
        self.tasks.len()
    }
}
