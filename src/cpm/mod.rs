//! Critical Path Method analysis.
//!
//! Computes early/late start and finish times for every node of a
//! [`NetworkModel`], the float (reserve) of each task, and the critical path.
//!
//! # Algorithm
//!
//! 1. Forward pass in topological order:
//!    `ES = max(EF of predecessors)` (0 without predecessors), `EF = ES + d`.
//! 2. Project duration = `max(EF)`.
//! 3. Backward pass in reverse order:
//!    `LF = min(LS of successors)` (project duration without successors),
//!    `LS = LF - d`.
//! 4. Reserve = `LS - ES`; a task is critical iff its reserve is zero.
//!
//! The critical path is reported as every critical task ordered by early
//! start (input order on ties). With several critical branches this is a
//! merged list rather than one chain.
//!
//! # Complexity
//! O(V + E).
//!
//! # Reference
//! Kelley & Walker (1959), "Critical-Path Planning and Scheduling"

use tracing::{debug, error};

use crate::network::{CpmTimes, NetworkModel, NetworkNode};

/// Result of a CPM analysis.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CpmAnalysis {
    /// The network with `cpm` times filled in.
    pub network: NetworkModel,
    /// Critical task names, ordered by early start.
    pub critical_path: Vec<String>,
    /// Critical task IDs in the same order.
    pub critical_path_ids: Vec<String>,
    /// Longest path length (days).
    pub project_duration: i64,
}

impl CpmAnalysis {
    /// CPM times of a top-level task.
    pub fn times(&self, task_id: &str) -> Option<CpmTimes> {
        self.network.node(task_id).map(|n| n.cpm)
    }

    /// Whether a top-level task is critical.
    pub fn is_critical(&self, task_id: &str) -> bool {
        self.times(task_id).is_some_and(|t| t.is_critical)
    }

    /// Critical nodes in critical-path order.
    pub fn critical_nodes(&self) -> Vec<&NetworkNode> {
        self.critical_path_ids
            .iter()
            .filter_map(|id| self.network.node(id))
            .collect()
    }
}

/// Runs forward/backward passes over a network.
///
/// # Example
///
/// ```
/// use u_planner::cpm::CpmAnalyzer;
/// use u_planner::models::PlanTask;
/// use u_planner::network::NetworkModelBuilder;
///
/// let tasks = vec![
///     PlanTask::new("A").with_duration(3),
///     PlanTask::new("B").with_duration(2).with_predecessor("A"),
/// ];
/// let network = NetworkModelBuilder::new().build(&tasks).unwrap();
/// let analysis = CpmAnalyzer::new().analyze(network);
/// assert_eq!(analysis.project_duration, 5);
/// assert_eq!(analysis.critical_path, vec!["A", "B"]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct CpmAnalyzer;

impl CpmAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Analyzes the network. An empty network yields duration 0.
    pub fn analyze(&self, mut network: NetworkModel) -> CpmAnalysis {
        let nodes = network.nodes_mut();

        // Forward pass
        for i in 0..nodes.len() {
            let early_start = nodes[i]
                .predecessors
                .iter()
                .map(|&p| nodes[p].cpm.early_finish)
                .max()
                .unwrap_or(0);
            let duration = i64::from(nodes[i].duration);
            let cpm = &mut nodes[i].cpm;
            cpm.early_start = early_start;
            cpm.early_finish = early_start + duration;
        }

        let project_duration = nodes.iter().map(|n| n.cpm.early_finish).max().unwrap_or(0);

        // Backward pass
        for i in (0..nodes.len()).rev() {
            let late_finish = nodes[i]
                .successors
                .iter()
                .map(|&s| nodes[s].cpm.late_start)
                .min()
                .unwrap_or(project_duration);
            let duration = i64::from(nodes[i].duration);
            let cpm = &mut nodes[i].cpm;
            cpm.late_finish = late_finish;
            cpm.late_start = late_finish - duration;
            cpm.reserve = cpm.late_start - cpm.early_start;
            cpm.is_critical = cpm.reserve == 0;

            if cpm.reserve < 0 {
                error!(
                    task = %nodes[i].task.id,
                    reserve = nodes[i].cpm.reserve,
                    "negative reserve; network order is inconsistent"
                );
                debug_assert!(false, "negative reserve for {}", nodes[i].task.id);
            }
        }

        let mut critical: Vec<&NetworkNode> = nodes.iter().filter(|n| n.cpm.is_critical).collect();
        critical.sort_by_key(|n| (n.cpm.early_start, n.input_index));
        let critical_path: Vec<String> = critical.iter().map(|n| n.task.name.clone()).collect();
        let critical_path_ids: Vec<String> = critical.iter().map(|n| n.task.id.clone()).collect();

        debug!(
            duration = project_duration,
            critical = ?critical_path_ids,
            "critical path analysis complete"
        );

        CpmAnalysis {
            network,
            critical_path,
            critical_path_ids,
            project_duration,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PlanTask;
    use crate::network::NetworkModelBuilder;

    fn analyze(tasks: &[PlanTask]) -> CpmAnalysis {
        let network = NetworkModelBuilder::new().build(tasks).unwrap();
        CpmAnalyzer::new().analyze(network)
    }

    fn task(id: &str, duration: u32) -> PlanTask {
        PlanTask::new(id).with_duration(duration)
    }

    #[test]
    fn test_linear_chain_all_critical() {
        let tasks = vec![
            task("A", 3),
            task("B", 2).with_predecessor("A"),
            task("C", 1).with_predecessor("B"),
        ];
        let a = analyze(&tasks);
        assert_eq!(a.project_duration, 6);
        for id in ["A", "B", "C"] {
            let t = a.times(id).unwrap();
            assert!(t.is_critical, "{id} should be critical");
            assert_eq!(t.reserve, 0);
        }
        assert_eq!(a.critical_path, vec!["A", "B", "C"]);
        assert_eq!(a.times("C").unwrap().early_start, 5);
    }

    #[test]
    fn test_parallel_paths() {
        let tasks = vec![
            task("A", 5),
            task("B", 2),
            task("C", 1).with_predecessor("A").with_predecessor("B"),
        ];
        let a = analyze(&tasks);
        assert_eq!(a.times("C").unwrap().early_start, 5);
        assert_eq!(a.project_duration, 6);
        assert!(a.is_critical("A"));
        assert!(a.is_critical("C"));
        assert!(!a.is_critical("B"));
        assert_eq!(a.times("B").unwrap().reserve, 3);
        assert_eq!(a.critical_path_ids, vec!["A", "C"]);
    }

    #[test]
    fn test_timing_invariants() {
        let tasks = vec![
            task("A", 4),
            task("B", 3).with_predecessor("A"),
            task("C", 7),
            task("D", 2).with_predecessor("B").with_predecessor("C"),
            task("E", 1).with_predecessor("A"),
            task("F", 2).with_predecessor("E").with_predecessor("D"),
        ];
        let a = analyze(&tasks);
        for node in a.network.nodes() {
            let t = node.cpm;
            let d = i64::from(node.duration);
            assert_eq!(t.early_finish, t.early_start + d);
            assert_eq!(t.late_finish, t.late_start + d);
            assert_eq!(t.reserve, t.late_start - t.early_start);
            assert_eq!(t.reserve, t.late_finish - t.early_finish);
            assert!(t.reserve >= 0);
            assert_eq!(t.is_critical, t.reserve == 0);
        }
        assert_eq!(a.project_duration, 11);
        assert_eq!(a.critical_path_ids, vec!["A", "C", "B", "D", "F"]);
        assert_eq!(a.times("E").unwrap().reserve, 4);
    }

    #[test]
    fn test_critical_ties_use_input_order() {
        let tasks = vec![task("Z", 2), task("Y", 2)];
        let a = analyze(&tasks);
        assert_eq!(a.critical_path, vec!["Z", "Y"]);
    }

    #[test]
    fn test_composite_uses_aggregate_duration() {
        let tasks = vec![
            PlanTask::new("P").with_sequential_subtasks(),
            task("S1", 1).with_parent("P"),
            task("S2", 2).with_parent("P"),
            task("N", 1).with_predecessor("P"),
        ];
        let a = analyze(&tasks);
        // 1 + 2 plus one hand-off day
        assert_eq!(a.times("P").unwrap().early_finish, 4);
        assert_eq!(a.times("N").unwrap().early_start, 4);
        assert_eq!(a.project_duration, 5);
    }

    #[test]
    fn test_composite_sibling_chain_on_critical_path() {
        let tasks = vec![
            PlanTask::new("P"),
            task("S1", 4).with_parent("P"),
            task("S2", 3).with_parent("P").with_predecessor("S1"),
            task("N", 1).with_predecessor("P"),
            task("M", 6),
            task("Z", 1).with_predecessor("N").with_predecessor("M"),
        ];
        let a = analyze(&tasks);
        let p = a.times("P").unwrap();
        assert_eq!(p.early_finish, 8);
        assert!(p.is_critical);
        assert_eq!(a.times("Z").unwrap().early_start, 9);
        assert_eq!(a.times("M").unwrap().reserve, 3);
        assert_eq!(a.critical_path_ids, vec!["P", "N", "Z"]);
        assert_eq!(a.project_duration, 10);
    }

    #[test]
    fn test_empty_network() {
        let a = analyze(&[]);
        assert_eq!(a.project_duration, 0);
        assert!(a.critical_path.is_empty());
        assert!(a.critical_nodes().is_empty());
    }
}
