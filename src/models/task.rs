//! Planning task model.
//!
//! A task is a unit of project work measured in working days. It names the
//! role (position) able to perform it, the tasks that must finish before it
//! starts, and optionally the composite parent it belongs to.
//!
//! # Composite tasks
//!
//! A task is composite when it needs more than one employee
//! (`required_employees > 1`) or when other tasks name it as their parent.
//! Composite tasks are planned once in the network and realized as
//! subtasks on the calendar.

use serde::{Deserialize, Serialize};

/// A task (planning node) supplied by the caller.
///
/// # Time Representation
/// `duration` is in working days. Which days count as working depends on
/// the employee the task is eventually assigned to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanTask {
    /// Unique task identifier within the project.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Working days needed to complete the task.
    pub duration: u32,
    /// Required role/position. Empty for pure composite parents.
    #[serde(default)]
    pub position: String,
    /// IDs of tasks that must complete before this one starts.
    #[serde(default)]
    pub predecessors: Vec<String>,
    /// Number of employees needed (1 = ordinary task).
    #[serde(default = "default_required_employees")]
    pub required_employees: u32,
    /// Whether the subtasks of this task run strictly one after another.
    #[serde(default)]
    pub sequential_subtasks: bool,
    /// Composite parent this task is a subtask of.
    #[serde(default)]
    pub parent_id: Option<String>,
}

fn default_required_employees() -> u32 {
    1
}

impl PlanTask {
    /// Creates a one-day task with the given ID (name defaults to the ID).
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            duration: 1,
            position: String::new(),
            predecessors: Vec::new(),
            required_employees: 1,
            sequential_subtasks: false,
            parent_id: None,
        }
    }

    /// Sets the task name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the duration in working days.
    pub fn with_duration(mut self, days: u32) -> Self {
        self.duration = days;
        self
    }

    /// Sets the required position.
    pub fn with_position(mut self, position: impl Into<String>) -> Self {
        self.position = position.into();
        self
    }

    /// Adds a predecessor task ID.
    pub fn with_predecessor(mut self, predecessor_id: impl Into<String>) -> Self {
        self.predecessors.push(predecessor_id.into());
        self
    }

    /// Sets the number of employees the task needs.
    pub fn with_required_employees(mut self, count: u32) -> Self {
        self.required_employees = count.max(1);
        self
    }

    /// Marks the subtasks of this task as strictly sequential.
    pub fn with_sequential_subtasks(mut self) -> Self {
        self.sequential_subtasks = true;
        self
    }

    /// Makes this task a subtask of `parent_id`.
    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    /// Whether this task is a subtask of a composite parent.
    pub fn is_subtask(&self) -> bool {
        self.parent_id.is_some()
    }

    /// Whether the task needs several employees on its own.
    pub fn needs_team(&self) -> bool {
        self.required_employees > 1
    }
}
