//! Project planning framework for the U-Engine ecosystem.
//!
//! Turns a list of tasks with durations, precedence and required positions
//! into a dated calendar plan bound to named employees. Network analysis
//! follows the Critical Path Method; calendar resolution is a greedy,
//! day-off-aware earliest-completion assignment.
//!
//! # Modules
//!
//! - **`models`**: Domain types: `PlanTask`, `Employee`, `WorkCalendar`,
//!   `ResolvedTask`, `CalendarPlan`, `PlanWarning`
//! - **`network`**: Precedence network with composite tasks and cycle detection
//! - **`cpm`**: Forward/backward passes, reserves, critical path
//! - **`resolver`**: Calendar dates and employee assignment
//! - **`repair`**: Parent/subtask reconciliation, critical-path date enforcement
//! - **`planner`**: The whole pipeline behind one call
//! - **`validation`**: Input integrity checks (duplicate IDs, cycles, roster)
//! - **`config`**: `PlannerConfig`
//! - **`error`**: `NetworkError`, `ResolveError`
//!
//! # Architecture
//!
//! ```text
//! tasks ─► NetworkModelBuilder ─► CpmAnalyzer ─► CalendarResolver ─► ScheduleRepairPass ─► CalendarPlan
//!                                                      ▲
//!                                                  employees
//! ```
//!
//! Only network construction can fail. Everything downstream degrades to
//! warnings recorded in the plan.
//!
//! # References
//!
//! - Kelley & Walker (1959), "Critical-Path Planning and Scheduling"
//! - Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems"

pub mod config;
pub mod cpm;
pub mod error;
pub mod models;
pub mod network;
pub mod planner;
pub mod repair;
pub mod resolver;
pub mod validation;
