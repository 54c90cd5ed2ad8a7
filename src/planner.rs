//! End-to-end planning pipeline.
//!
//! # Algorithm
//!
//! 1. Build the task network (fatal on malformed input).
//! 2. Run the CPM forward/backward passes.
//! 3. Resolve calendar dates and assignees.
//! 4. Repair parent/subtask consistency.
//! 5. Optionally enforce critical-path date order.
//!
//! Steps 3 to 5 never fail; problems surface as plan warnings.

use chrono::NaiveDate;
use tracing::info;

use crate::config::PlannerConfig;
use crate::cpm::{CpmAnalysis, CpmAnalyzer};
use crate::error::NetworkResult;
use crate::models::{CalendarPlan, Employee, PlanTask};
use crate::network::{NetworkModel, NetworkModelBuilder};
use crate::repair::ScheduleRepairPass;
use crate::resolver::CalendarResolver;

/// Input container for planning.
#[derive(Debug, Clone)]
pub struct PlanRequest {
    /// Tasks to plan.
    pub tasks: Vec<PlanTask>,
    /// Available employees, in preference order.
    pub employees: Vec<Employee>,
    /// Calendar date of day 0.
    pub project_start: NaiveDate,
    pub config: PlannerConfig,
}

impl PlanRequest {
    /// Creates a new plan request with the default configuration.
    pub fn new(tasks: Vec<PlanTask>, employees: Vec<Employee>, project_start: NaiveDate) -> Self {
        Self {
            tasks,
            employees,
            project_start,
            config: PlannerConfig::default(),
        }
    }

    /// Sets the configuration.
    pub fn with_config(mut self, config: PlannerConfig) -> Self {
        self.config = config;
        self
    }

    /// Adds a task.
    pub fn with_task(mut self, task: PlanTask) -> Self {
        self.tasks.push(task);
        self
    }

    /// Adds an employee to the end of the roster.
    pub fn with_employee(mut self, employee: Employee) -> Self {
        self.employees.push(employee);
        self
    }
}

/// Runs the whole pipeline.
///
/// # Example
///
/// ```
/// use chrono::NaiveDate;
/// use u_planner::models::{Employee, PlanTask};
/// use u_planner::planner::Planner;
///
/// let tasks = vec![
///     PlanTask::new("design").with_duration(2).with_position("Dev"),
///     PlanTask::new("build").with_duration(3).with_position("Dev").with_predecessor("design"),
/// ];
/// let employees = vec![Employee::new("E1", "Dev")];
/// let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
///
/// let plan = Planner::new().plan(&tasks, &employees, start).unwrap();
/// assert_eq!(plan.critical_path, vec!["design", "build"]);
/// assert!(plan.entry("build").unwrap().start > plan.entry("design").unwrap().end);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Planner {
    config: PlannerConfig,
}

impl Planner {
    /// Creates a planner with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: PlannerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Plans `tasks` on `employees` starting at `project_start`.
    ///
    /// # Errors
    /// Any [`NetworkError`](crate::error::NetworkError) from building the
    /// network. Nothing after that step fails.
    pub fn plan(
        &self,
        tasks: &[PlanTask],
        employees: &[Employee],
        project_start: NaiveDate,
    ) -> NetworkResult<CalendarPlan> {
        let analysis = analyze_network(build_network(tasks)?);
        let mut plan =
            CalendarResolver::with_config(self.config.clone()).resolve(&analysis, employees, project_start);

        let repair = ScheduleRepairPass::new();
        repair.apply(&mut plan);
        if self.config.enforce_critical_path {
            let shifted = repair.enforce_critical_path(&mut plan);
            info!(shifted, "critical path dates enforced");
        }
        Ok(plan)
    }

    /// Plans from a request, using the request's configuration.
    pub fn plan_request(&self, request: &PlanRequest) -> NetworkResult<CalendarPlan> {
        Planner::with_config(request.config.clone()).plan(
            &request.tasks,
            &request.employees,
            request.project_start,
        )
    }
}

/// Builds the task network.
pub fn build_network(tasks: &[PlanTask]) -> NetworkResult<NetworkModel> {
    NetworkModelBuilder::new().build(tasks)
}

/// Runs CPM over a network.
pub fn analyze_network(network: NetworkModel) -> CpmAnalysis {
    CpmAnalyzer::new().analyze(network)
}

/// Resolves an analysis into a repaired calendar plan with the default
/// configuration.
pub fn resolve_calendar(
    analysis: &CpmAnalysis,
    employees: &[Employee],
    project_start: NaiveDate,
) -> CalendarPlan {
    let mut plan = CalendarResolver::new().resolve(analysis, employees, project_start);
    ScheduleRepairPass::new().apply(&mut plan);
    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NetworkError;
    use crate::models::WarningKind;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn project() -> (Vec<PlanTask>, Vec<Employee>) {
        let tasks = vec![
            PlanTask::new("analysis").with_name("Analyse requirements").with_duration(2).with_position("Analyst"),
            PlanTask::new("api")
                .with_name("Build API")
                .with_duration(4)
                .with_position("Developer")
                .with_predecessor("analysis"),
            PlanTask::new("ui")
                .with_name("Build UI")
                .with_duration(3)
                .with_position("Developer")
                .with_predecessor("analysis"),
            PlanTask::new("qa")
                .with_name("Test")
                .with_duration(2)
                .with_position("Tester")
                .with_required_employees(2)
                .with_predecessor("api")
                .with_predecessor("ui"),
            PlanTask::new("release").with_name("Release").with_sequential_subtasks().with_predecessor("qa"),
            PlanTask::new("tag")
                .with_name("1 tag")
                .with_duration(1)
                .with_position("Developer")
                .with_parent("release"),
            PlanTask::new("deploy")
                .with_name("2 deploy")
                .with_duration(1)
                .with_position("Developer")
                .with_parent("release"),
        ];
        let employees = vec![
            Employee::new("A1", "Analyst").with_name("Ann"),
            Employee::new("D1", "Developer")
                .with_name("Dan")
                .with_day_off("Saturday")
                .with_day_off("Sunday"),
            Employee::new("D2", "Developer").with_name("Dee").with_day_off("Sunday"),
            Employee::new("T1", "Tester").with_name("Tom"),
            Employee::new("T2", "Tester").with_name("Tia").with_day_off("Friday"),
        ];
        (tasks, employees)
    }

    #[test]
    fn test_end_to_end() {
        let (tasks, employees) = project();
        let start = date(2024, 1, 1);
        let plan = Planner::new().plan(&tasks, &employees, start).unwrap();

        assert_eq!(plan.cpm_duration, 2 + 4 + 2 + 3);
        assert_eq!(plan.critical_path_ids, vec!["analysis", "api", "qa", "release"]);

        // Precedence holds for every top-level edge
        for task in tasks.iter().filter(|t| t.parent_id.is_none()) {
            let entry = plan.entry(&task.id).unwrap();
            for pred in &task.predecessors {
                assert!(entry.start > plan.entry(pred).unwrap().end, "{} after {pred}", task.id);
            }
        }

        // No employee works two entries on the same day
        for e in &employees {
            let entries = plan.entries_for_employee(&e.id);
            for (i, a) in entries.iter().enumerate() {
                for b in &entries[i + 1..] {
                    assert!(!a.overlaps(b), "{} and {} overlap", a.task_id, b.task_id);
                }
            }
        }

        // Parents span their subtasks
        for parent in plan.tasks.iter().filter(|t| t.is_parent) {
            let subs = plan.subtasks_of(&parent.task_id);
            assert_eq!(parent.start, subs.iter().map(|s| s.start).min().unwrap());
            assert_eq!(parent.end, subs.iter().map(|s| s.end).max().unwrap());
        }

        let qa = plan.subtasks_of("qa");
        assert_eq!(qa.len(), 2);
        assert_ne!(qa[0].assignee.employee_id(), qa[1].assignee.employee_id());

        let release = plan.subtasks_of("release");
        assert_eq!(release[0].task_id, "tag");
        assert!(release[1].start > release[0].end);

        assert!(plan.unassigned().is_empty());
        assert!(plan.project_duration >= plan.cpm_duration);
        assert_eq!(plan.project_duration, (plan.finish_date().unwrap() - start).num_days() + 1);
    }

    #[test]
    fn test_deterministic() {
        let (tasks, employees) = project();
        let planner = Planner::new();
        let first = planner.plan(&tasks, &employees, date(2024, 1, 1)).unwrap();
        let second = planner.plan(&tasks, &employees, date(2024, 1, 1)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_cycle_is_fatal() {
        let tasks = vec![
            PlanTask::new("A").with_predecessor("B"),
            PlanTask::new("B").with_predecessor("A"),
        ];
        let err = Planner::new().plan(&tasks, &[], date(2024, 1, 1)).unwrap_err();
        assert!(matches!(err, NetworkError::CyclicDependency { .. }));
    }

    #[test]
    fn test_unstaffed_is_not_fatal() {
        let tasks = vec![PlanTask::new("A").with_duration(2).with_position("Pilot")];
        let plan = Planner::new().plan(&tasks, &[], date(2024, 1, 1)).unwrap();
        assert!(plan.entry("A").unwrap().assignee.is_unassigned());
        assert_eq!(plan.warnings[0].kind, WarningKind::Unassigned);
    }

    #[test]
    fn test_enforcement_keeps_precedence_and_bookings() {
        let dev = |id: &str, d: u32| PlanTask::new(id).with_duration(d).with_position("Dev");
        let tasks = vec![
            dev("A", 2),
            dev("B", 3).with_predecessor("A"),
            dev("D", 2).with_predecessor("B").with_predecessor("E"),
            dev("G", 1).with_predecessor("B"),
            dev("C", 1),
            dev("E", 4).with_predecessor("C"),
        ];
        let employees = vec![Employee::new("E1", "Dev"), Employee::new("E2", "Dev")];
        let config = PlannerConfig::new().with_critical_path_enforcement(true);
        let plan = Planner::with_config(config)
            .plan(&tasks, &employees, date(2024, 1, 1))
            .unwrap();

        for task in &tasks {
            let entry = plan.entry(&task.id).unwrap();
            assert_eq!(entry.span_days(), i64::from(task.duration) + 1);
            for pred in &task.predecessors {
                assert!(entry.start > plan.entry(pred).unwrap().end, "{} after {pred}", task.id);
            }
        }
        for e in &employees {
            let entries = plan.entries_for_employee(&e.id);
            for (i, a) in entries.iter().enumerate() {
                for b in &entries[i + 1..] {
                    assert!(!a.overlaps(b), "{} and {} overlap", a.task_id, b.task_id);
                }
            }
        }
    }

    #[test]
    fn test_plan_request_with_enforcement() {
        // Parallel critical branches: B is skipped as out of order
        let request = PlanRequest::new(Vec::new(), Vec::new(), date(2024, 1, 1))
            .with_task(PlanTask::new("A").with_duration(2).with_position("Dev"))
            .with_task(PlanTask::new("B").with_duration(2).with_position("Dev"))
            .with_employee(Employee::new("E1", "Dev"))
            .with_employee(Employee::new("E2", "Dev"))
            .with_config(PlannerConfig::new().with_critical_path_enforcement(true));
        let plan = Planner::new().plan_request(&request).unwrap();
        assert_eq!(plan.entry("B").unwrap().start, date(2024, 1, 1));
        assert!(plan
            .warnings
            .iter()
            .any(|w| w.kind == WarningKind::CriticalPathOutOfOrder && w.entity_id == "B"));
    }

    #[test]
    fn test_stepwise_matches_planner() {
        let (tasks, employees) = project();
        let start = date(2024, 1, 1);
        let analysis = analyze_network(build_network(&tasks).unwrap());
        let stepwise = resolve_calendar(&analysis, &employees, start);
        let planned = Planner::new().plan(&tasks, &employees, start).unwrap();
        assert_eq!(stepwise, planned);
    }
}
