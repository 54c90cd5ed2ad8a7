//! Input validation for planning requests.
//!
//! Checks structural integrity of tasks and the roster before planning.
//! Unlike [`NetworkModelBuilder::build`](crate::network::NetworkModelBuilder::build),
//! which stops at the first fatal problem, this collects everything it finds.
//! Detects:
//! - Duplicate task and employee IDs
//! - Unknown predecessor and parent references
//! - Zero durations on tasks without subtasks
//! - Circular precedence dependencies
//! - Unrecognized day-off names, employees with no working day
//! - Positions nobody on the roster holds
//!
//! Only the first four block planning; the rest show up in the plan as
//! warnings or unassigned tasks.

use std::collections::HashSet;

use crate::error::NetworkError;
use crate::models::{Employee, PlanTask};
use crate::network::NetworkModelBuilder;

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// Two tasks or two employees share the same ID.
    DuplicateId,
    /// A task references a predecessor that doesn't exist.
    InvalidPredecessor,
    /// A task references a missing parent, or a parent that is itself a subtask.
    InvalidParent,
    /// A task without subtasks has zero duration.
    ZeroDuration,
    /// Precedence graph contains a cycle.
    CyclicDependency,
    /// An employee's day off is not a weekday name.
    UnknownDayOff,
    /// An employee is off every day of the week.
    NoWorkingDays,
    /// No employee holds a position some task requires.
    UnstaffedPosition,
}

impl ValidationError {
    fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Whether planning would refuse the input because of this error.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self.kind,
            ValidationErrorKind::DuplicateId
                | ValidationErrorKind::InvalidParent
                | ValidationErrorKind::ZeroDuration
                | ValidationErrorKind::CyclicDependency
        )
    }
}

/// Validates the input data for a planning request.
///
/// Checks:
/// 1. No duplicate task IDs and no duplicate employee IDs
/// 2. All parent references point to existing top-level tasks
/// 3. All predecessor references point to existing tasks
/// 4. Tasks without subtasks have a non-zero duration
/// 5. No circular precedence dependencies (only checked when 1, 2 and 4 pass)
/// 6. Day-off names are weekdays and every employee works at least one day
/// 7. Every position a task needs is held by someone on the roster
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_input(tasks: &[PlanTask], employees: &[Employee]) -> ValidationResult {
    let mut errors = Vec::new();

    let mut employee_ids = HashSet::new();
    for e in employees {
        if !employee_ids.insert(e.id.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate employee ID: {}", e.id),
            ));
        }
        let unknown = e.unknown_days_off();
        if !unknown.is_empty() {
            errors.push(ValidationError::new(
                ValidationErrorKind::UnknownDayOff,
                format!("Employee '{}' has unrecognized days off: {}", e.id, unknown.join(", ")),
            ));
        }
        if !e.calendar().has_working_days() {
            errors.push(ValidationError::new(
                ValidationErrorKind::NoWorkingDays,
                format!("Employee '{}' has no working days", e.id),
            ));
        }
    }

    let mut task_ids = HashSet::new();
    for task in tasks {
        if !task_ids.insert(task.id.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate task ID: {}", task.id),
            ));
        }
    }

    // Parent references
    let mut parents_with_children = HashSet::new();
    for task in tasks {
        let Some(parent_id) = task.parent_id.as_deref() else {
            continue;
        };
        match tasks.iter().find(|t| t.id == parent_id) {
            None => errors.push(ValidationError::new(
                ValidationErrorKind::InvalidParent,
                format!("Task '{}' references unknown parent '{}'", task.id, parent_id),
            )),
            Some(parent) if parent.is_subtask() => errors.push(ValidationError::new(
                ValidationErrorKind::InvalidParent,
                format!(
                    "Task '{}' has parent '{}', which is itself a subtask",
                    task.id, parent_id
                ),
            )),
            Some(_) => {
                parents_with_children.insert(parent_id);
            }
        }
    }

    for task in tasks {
        for pred in &task.predecessors {
            if !task_ids.contains(pred.as_str()) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::InvalidPredecessor,
                    format!("Task '{}' references unknown predecessor '{}'", task.id, pred),
                ));
            }
        }
        if task.duration == 0 && !parents_with_children.contains(task.id.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::ZeroDuration,
                format!("Task '{}' has zero duration", task.id),
            ));
        }
    }

    // Positions that need someone
    let mut reported = HashSet::new();
    for task in tasks {
        if parents_with_children.contains(task.id.as_str()) {
            continue;
        }
        let staffed = employees.iter().any(|e| e.matches_position(&task.position));
        if !staffed && reported.insert(task.position.trim().to_lowercase()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::UnstaffedPosition,
                format!(
                    "No employee holds position '{}' (needed by '{}')",
                    task.position, task.id
                ),
            ));
        }
    }

    // Cycle detection reuses the network builder, which needs sound structure
    if !errors.iter().any(ValidationError::is_fatal) {
        if let Err(err @ NetworkError::CyclicDependency { .. }) = NetworkModelBuilder::new().build(tasks) {
            errors.push(ValidationError::new(
                ValidationErrorKind::CyclicDependency,
                err.to_string(),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
