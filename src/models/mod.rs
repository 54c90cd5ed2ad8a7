//! Planning domain models.
//!
//! Provides the data types exchanged with the planner: the task list and
//! employee roster going in, and the calendar plan coming out.
//!
//! # Domain Mappings
//!
//! | u-planner | Project office | Construction | Software |
//! |-----------|----------------|--------------|----------|
//! | PlanTask | Work package | Trade job | Ticket |
//! | Employee | Staff member | Crew member | Engineer |
//! | WorkCalendar | Work week | Site days | Sprint days |
//! | CalendarPlan | Project plan | Site schedule | Release plan |

mod calendar;
mod employee;
mod plan;
mod task;

pub(crate) use calendar::{add_days, inclusive_span};

pub use calendar::WorkCalendar;
pub use employee::{parse_weekday, Employee};
pub use plan::{Assignee, CalendarPlan, PlanWarning, ResolvedTask, WarningKind, UNASSIGNED};
pub use task::PlanTask;
