//! Calendar resolution.
//!
//! Converts a CPM-analyzed network into concrete dates bound to employees.
//!
//! # Algorithm
//!
//! Nodes are processed in topological order. For each leaf task:
//!
//! 1. Lower bound = project start + CPM early start, pushed past the
//!    completion of every predecessor (end date + 1 day).
//! 2. For each employee holding the required position (roster order), find
//!    the earliest start on a working day that does not overlap the
//!    employee's earlier bookings, and the resulting end date.
//! 3. Pick the earliest end date; ties go to the lower workload, then to
//!    roster order.
//! 4. Without an eligible employee the task is placed at its lower bound,
//!    counted without days off, and marked unassigned.
//!
//! Composite tasks are realized as their subtasks, each placed like a leaf
//! but preferring employees who can finish inside the parent's window
//! `[anchor, anchor + aggregate duration]`. Sequential subtasks additionally
//! start no earlier than the day after the previous subtask ends. The parent
//! entry then spans its subtasks.
//!
//! Internal failures stop the run; the plan built so far is returned with an
//! `Internal` warning.
//!
//! # Complexity
//! O(n * e * b) where n=tasks, e=eligible employees, b=bookings per employee.

mod context;

use chrono::NaiveDate;
use tracing::{debug, error, info, warn};

use crate::config::PlannerConfig;
use crate::cpm::CpmAnalysis;
use crate::error::{ResolveError, ResolveResult};
use crate::models::{
    add_days, Assignee, CalendarPlan, Employee, PlanTask, PlanWarning, ResolvedTask, WorkCalendar,
};
use crate::network::NetworkNode;
use crate::repair::ScheduleRepairPass;

pub use context::{ResolverContext, RosterSlot};

/// Where and by whom a task ends up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Placement {
    employee: Option<usize>,
    start: NaiveDate,
    end: NaiveDate,
    /// Finished on or before the parent's window end (always true for leaves).
    within_window: bool,
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    idx: usize,
    start: NaiveDate,
    end: NaiveDate,
    within_window: bool,
    preferred: bool,
    workload: u32,
}

/// Greedy earliest-completion calendar resolver.
///
/// # Example
///
/// ```
/// use chrono::NaiveDate;
/// use u_planner::cpm::CpmAnalyzer;
/// use u_planner::models::{Employee, PlanTask};
/// use u_planner::network::NetworkModelBuilder;
/// use u_planner::resolver::CalendarResolver;
///
/// let tasks = vec![PlanTask::new("A").with_duration(2).with_position("Dev")];
/// let employees = vec![Employee::new("E1", "Dev")];
/// let network = NetworkModelBuilder::new().build(&tasks).unwrap();
/// let analysis = CpmAnalyzer::new().analyze(network);
///
/// let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
/// let plan = CalendarResolver::new().resolve(&analysis, &employees, start);
/// assert_eq!(plan.entry("A").unwrap().assignee.employee_id(), Some("E1"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct CalendarResolver {
    config: PlannerConfig,
}

impl CalendarResolver {
    /// Creates a resolver with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a resolver with the given configuration.
    pub fn with_config(config: PlannerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Resolves the analyzed network into a calendar plan.
    ///
    /// Never fails: anomalies become warnings, and an internal error ends
    /// the run with the entries placed so far.
    pub fn resolve(
        &self,
        analysis: &CpmAnalysis,
        employees: &[Employee],
        project_start: NaiveDate,
    ) -> CalendarPlan {
        let mut plan = CalendarPlan::new(project_start, employees.to_vec());
        plan.critical_path = analysis.critical_path.clone();
        plan.critical_path_ids = analysis.critical_path_ids.clone();
        plan.cpm_duration = analysis.project_duration;

        let mut ctx = ResolverContext::new(employees, project_start, self.config.search_horizon_days);
        for warning in ctx.roster_warnings() {
            warn!(employee = %warning.entity_id, "{}", warning.message);
            plan.add_warning(warning);
        }

        for node in analysis.network.nodes() {
            let outcome = if node.is_composite() {
                self.resolve_composite(&mut ctx, &mut plan, node)
            } else {
                self.resolve_leaf(&mut ctx, &mut plan, node)
            };
            if let Err(err) = outcome {
                error!(task = %node.id(), error = %err, "calendar resolution stopped; returning partial plan");
                plan.add_warning(PlanWarning::internal(
                    node.id(),
                    format!("resolution stopped at '{}': {err}", node.name()),
                ));
                break;
            }
        }

        plan.refresh_duration();
        info!(
            entries = plan.entry_count(),
            duration = plan.project_duration,
            warnings = plan.warnings.len(),
            "calendar resolved"
        );
        plan
    }

    /// Project start + early start, pushed past every predecessor's end.
    fn lower_bound(&self, ctx: &ResolverContext<'_>, node: &NetworkNode) -> ResolveResult<NaiveDate> {
        let mut lower = add_days(ctx.project_start, node.cpm.early_start)
            .ok_or_else(|| ResolveError::DateOverflow(node.id().to_string()))?;
        for pred in &node.task.predecessors {
            lower = lower.max(ctx.day_after(node.id(), pred)?);
        }
        Ok(lower)
    }

    fn resolve_leaf(
        &self,
        ctx: &mut ResolverContext<'_>,
        plan: &mut CalendarPlan,
        node: &NetworkNode,
    ) -> ResolveResult<()> {
        let lower = self.lower_bound(ctx, node)?;
        let placement = self.place(ctx, &node.task, lower, None, &[])?;
        if placement.employee.is_none() {
            plan.add_warning(unassigned_warning(ctx, &node.task));
        }

        ctx.record_completion(node.id(), placement.end);
        plan.tasks.push(entry_for(ctx, &node.task, node, &placement));
        Ok(())
    }

    fn resolve_composite(
        &self,
        ctx: &mut ResolverContext<'_>,
        plan: &mut CalendarPlan,
        node: &NetworkNode,
    ) -> ResolveResult<()> {
        let anchor = self.lower_bound(ctx, node)?;
        let window_end = add_days(anchor, i64::from(node.duration))
            .ok_or_else(|| ResolveError::DateOverflow(node.id().to_string()))?;
        let sequential = node.task.sequential_subtasks;

        let parent_idx = plan.tasks.len();
        plan.tasks.push(ResolvedTask {
            task_id: node.task.id.clone(),
            name: node.task.name.clone(),
            start: anchor,
            end: window_end,
            duration: node.duration,
            is_critical: node.cpm.is_critical,
            reserve: node.cpm.reserve,
            early_start: node.cpm.early_start,
            assignee: Assignee::Team { names: Vec::new() },
            position: node.task.position.clone(),
            parent_id: None,
            predecessors: node.task.predecessors.clone(),
            is_parent: true,
            sequential,
            subtask_ids: node.subtasks.iter().map(|s| s.id.clone()).collect(),
            exceeds_parent_window: false,
        });

        let mut used: Vec<usize> = Vec::new();
        let mut previous_end: Option<NaiveDate> = None;
        for sub in &node.subtasks {
            let mut lower = anchor;
            for pred in &sub.predecessors {
                lower = lower.max(ctx.day_after(&sub.id, pred)?);
            }
            if sequential {
                if let Some(end) = previous_end {
                    let next = end
                        .succ_opt()
                        .ok_or_else(|| ResolveError::DateOverflow(sub.id.clone()))?;
                    lower = lower.max(next);
                }
            }

            let avoid: &[usize] = if self.config.distinct_subtask_assignees {
                &used
            } else {
                &[]
            };
            let placement = self.place(ctx, sub, lower, Some(window_end), avoid)?;
            if let Some(idx) = placement.employee {
                used.push(idx);
            } else {
                plan.add_warning(unassigned_warning(ctx, sub));
            }
            if !placement.within_window {
                warn!(task = %sub.id, parent = %node.id(), end = %placement.end, window_end = %window_end, "subtask overruns parent window");
                plan.add_warning(PlanWarning::exceeds_parent_window(
                    &sub.id,
                    format!(
                        "'{}' ends {} after '{}' window end {}",
                        sub.name, placement.end, node.name(), window_end
                    ),
                ));
            }

            ctx.record_completion(sub.id.clone(), placement.end);
            previous_end = Some(placement.end);
            plan.tasks.push(entry_for(ctx, sub, node, &placement));
        }

        ScheduleRepairPass::aggregate_parent(plan, parent_idx);
        ctx.record_completion(node.id(), plan.tasks[parent_idx].end);
        Ok(())
    }

    /// Chooses the employee and dates for one task.
    fn place(
        &self,
        ctx: &mut ResolverContext<'_>,
        task: &PlanTask,
        lower: NaiveDate,
        window_end: Option<NaiveDate>,
        avoid: &[usize],
    ) -> ResolveResult<Placement> {
        let mut candidates: Vec<Candidate> = Vec::new();
        for idx in ctx.eligible(&task.position) {
            let Some((start, end)) = ctx.earliest_slot(idx, lower, task.duration) else {
                debug!(task = %task.id, employee = %ctx.slot(idx).employee.id, "no free slot within horizon");
                continue;
            };
            let slot = ctx.slot(idx);
            let within_window = window_end.map_or(true, |deadline| {
                slot.calendar
                    .finish_date_within(start, task.duration, deadline)
                    .is_some()
            });
            candidates.push(Candidate {
                idx,
                start,
                end,
                within_window,
                preferred: !avoid.contains(&idx),
                workload: slot.workload,
            });
        }

        let best = candidates
            .iter()
            .min_by_key(|c| (!c.within_window, !c.preferred, c.end, c.workload, c.idx))
            .copied();

        let placement = match best {
            Some(c) => {
                ctx.book(c.idx, c.start, c.end, task.duration);
                debug!(
                    task = %task.id,
                    employee = %ctx.slot(c.idx).employee.id,
                    start = %c.start,
                    end = %c.end,
                    "task placed"
                );
                Placement {
                    employee: Some(c.idx),
                    start: c.start,
                    end: c.end,
                    within_window: c.within_window,
                }
            }
            None => {
                let end = WorkCalendar::always_working()
                    .finish_date(lower, task.duration)
                    .ok_or_else(|| ResolveError::DateOverflow(task.id.clone()))?;
                Placement {
                    employee: None,
                    start: lower,
                    end,
                    within_window: window_end.map_or(true, |deadline| end <= deadline),
                }
            }
        };
        Ok(placement)
    }
}

fn unassigned_warning(ctx: &ResolverContext<'_>, task: &PlanTask) -> PlanWarning {
    let message = if ctx.eligible(&task.position).is_empty() {
        format!("no employee holds position '{}' for '{}'", task.position, task.name)
    } else {
        format!("no '{}' is free within the search horizon for '{}'", task.position, task.name)
    };
    warn!(task = %task.id, position = %task.position, "{message}");
    PlanWarning::unassigned(&task.id, message)
}

/// Builds the plan entry for a leaf or subtask; CPM fields come from `node`.
fn entry_for(
    ctx: &ResolverContext<'_>,
    task: &PlanTask,
    node: &NetworkNode,
    placement: &Placement,
) -> ResolvedTask {
    let assignee = match placement.employee {
        Some(idx) => Assignee::from_employee(ctx.slot(idx).employee),
        None => Assignee::Unassigned,
    };
    ResolvedTask {
        task_id: task.id.clone(),
        name: task.name.clone(),
        start: placement.start,
        end: placement.end,
        duration: task.duration,
        is_critical: node.cpm.is_critical,
        reserve: node.cpm.reserve,
        early_start: node.cpm.early_start,
        assignee,
        position: task.position.clone(),
        parent_id: task.parent_id.clone(),
        predecessors: task.predecessors.clone(),
        is_parent: false,
        sequential: false,
        subtask_ids: Vec::new(),
        exceeds_parent_window: !placement.within_window,
    }
}
