//! Error types.
//!
//! Only malformed task networks are fatal. Everything the calendar resolver
//! runs into is absorbed into the plan as warnings; [`ResolveError`] exists
//! so the resolver's internals can use `?` before converting the failure
//! into a partial plan.

use thiserror::Error;

/// Fatal input errors raised while building the task network.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetworkError {
    /// The precedence graph contains a cycle. Names are in traversal order,
    /// with the closing task repeated at the end.
    #[error("cyclic dependency: {}", cycle.join(" -> "))]
    CyclicDependency { cycle: Vec<String> },

    #[error("duplicate task ID: {0}")]
    DuplicateTaskId(String),

    #[error("task '{0}' has zero duration")]
    ZeroDuration(String),

    #[error("task '{task}' references unknown parent '{parent}'")]
    UnknownParent { task: String, parent: String },

    #[error("task '{task}' has parent '{parent}', which is itself a subtask")]
    NestedSubtask { task: String, parent: String },
}

impl NetworkError {
    /// Task names forming the cycle, if this is a cycle error.
    pub fn cycle(&self) -> Option<&[String]> {
        match self {
            Self::CyclicDependency { cycle } => Some(cycle),
            _ => None,
        }
    }
}

/// Internal failures during calendar resolution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("no completion date recorded for predecessor '{predecessor}' of '{task}'")]
    MissingCompletion { task: String, predecessor: String },

    #[error("date arithmetic overflowed while scheduling '{0}'")]
    DateOverflow(String),
}

pub type NetworkResult<T> = std::result::Result<T, NetworkError>;

pub type ResolveResult<T> = std::result::Result<T, ResolveError>;
