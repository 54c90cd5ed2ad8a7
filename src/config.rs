//! Planner configuration.
//!
//! Plain data supplied by the embedding application. Every field has a
//! default, so a partial JSON object (or none at all) is a valid config.

use serde::{Deserialize, Serialize};

/// Tuning knobs for calendar resolution and repair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Shift critical tasks so their dates follow CPM order strictly.
    pub enforce_critical_path: bool,
    /// Prefer employees not already on a sibling subtask of the same parent.
    pub distinct_subtask_assignees: bool,
    /// Longest stretch (days) scanned when searching an employee's free slot.
    pub search_horizon_days: u32,
}

impl PlannerConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables or disables critical-path date enforcement.
    pub fn with_critical_path_enforcement(mut self, enabled: bool) -> Self {
        self.enforce_critical_path = enabled;
        self
    }

    /// Enables or disables distinct assignees for sibling subtasks.
    pub fn with_distinct_subtask_assignees(mut self, enabled: bool) -> Self {
        self.distinct_subtask_assignees = enabled;
        self
    }

    /// Sets the slot search horizon (at least one day).
    pub fn with_search_horizon_days(mut self, days: u32) -> Self {
        self.search_horizon_days = days.max(1);
        self
    }
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            enforce_critical_path: false,
            distinct_subtask_assignees: true,
            search_horizon_days: 3660,
        }
    }
}
