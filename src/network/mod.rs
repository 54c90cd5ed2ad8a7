//! Task network construction.
//!
//! Turns the flat task list into a precedence graph over top-level tasks
//! in a deterministic topological order. Subtasks are folded into their
//! composite parent, which appears in the network once with an aggregate
//! duration.
//!
//! # Algorithm
//! Depth-first traversal over predecessor edges with three marks
//! (unvisited, in progress, done), run iteratively with an explicit stack.
//! Roots are visited in input order, so independent tasks keep their
//! relative order. Meeting an in-progress node is a cycle.
//!
//! # Reference
//! Cormen et al. (2009), "Introduction to Algorithms", Ch. 22.4 (Topological Sort)

mod order;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{NetworkError, NetworkResult};
use crate::models::PlanTask;

pub(crate) use order::depth_first_order;

/// Critical path timings of a node, in days from project start.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpmTimes {
    pub early_start: i64,
    pub early_finish: i64,
    pub late_start: i64,
    pub late_finish: i64,
    /// Float: `late_start - early_start`.
    pub reserve: i64,
    pub is_critical: bool,
}

/// A top-level task in the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkNode {
    /// The task, with unknown predecessor references removed.
    pub task: PlanTask,
    /// Duration used by the CPM passes (aggregate for composite tasks).
    pub duration: u32,
    /// Subtasks in planning order (explicit or generated).
    pub subtasks: Vec<PlanTask>,
    /// Indices of predecessor nodes (always lower than this node's index).
    pub predecessors: Vec<usize>,
    /// Indices of successor nodes.
    pub successors: Vec<usize>,
    /// Position of the task in the caller's list.
    pub input_index: usize,
    /// Filled in by the CPM analysis.
    pub cpm: CpmTimes,
}

impl NetworkNode {
    pub fn id(&self) -> &str {
        &self.task.id
    }

    pub fn name(&self) -> &str {
        &self.task.name
    }

    /// Whether the node is realized as several subtasks.
    pub fn is_composite(&self) -> bool {
        !self.subtasks.is_empty()
    }
}

/// Top-level tasks in topological order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetworkModel {
    nodes: Vec<NetworkNode>,
    index: HashMap<String, usize>,
    /// Subtask ID → index of its parent node.
    owners: HashMap<String, usize>,
}

impl NetworkModel {
    /// Nodes in topological order.
    pub fn nodes(&self) -> &[NetworkNode] {
        &self.nodes
    }

    pub(crate) fn nodes_mut(&mut self) -> &mut [NetworkNode] {
        &mut self.nodes
    }

    /// Finds a top-level node by task ID.
    pub fn node(&self, task_id: &str) -> Option<&NetworkNode> {
        self.index.get(task_id).map(|&i| &self.nodes[i])
    }

    /// Parent node of a subtask.
    pub fn owner_of(&self, subtask_id: &str) -> Option<&NetworkNode> {
        self.owners.get(subtask_id).map(|&i| &self.nodes[i])
    }

    /// Task IDs in topological order.
    pub fn order(&self) -> Vec<&str> {
        self.nodes.iter().map(|n| n.id()).collect()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Builds [`NetworkModel`]s from task lists.
///
/// # Example
///
/// ```
/// use u_planner::models::PlanTask;
/// use u_planner::network::NetworkModelBuilder;
///
/// let tasks = vec![
///     PlanTask::new("B").with_duration(2).with_predecessor("A"),
///     PlanTask::new("A").with_duration(3),
/// ];
/// let network = NetworkModelBuilder::new().build(&tasks).unwrap();
/// assert_eq!(network.order(), vec!["A", "B"]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct NetworkModelBuilder;

impl NetworkModelBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Builds the network. Input tasks are not modified.
    ///
    /// # Errors
    /// Cycles, duplicate IDs, zero-duration leaf tasks and broken parent
    /// references are fatal. Unknown predecessor IDs are dropped with a
    /// warning.
    pub fn build(&self, tasks: &[PlanTask]) -> NetworkResult<NetworkModel> {
        let by_id = index_tasks(tasks)?;

        // Split into top-level tasks and their explicit children.
        let mut top: Vec<usize> = Vec::new();
        let mut children: HashMap<usize, Vec<usize>> = HashMap::new();
        for (i, task) in tasks.iter().enumerate() {
            match &task.parent_id {
                None => top.push(i),
                Some(parent) => {
                    let &p = by_id.get(parent.as_str()).ok_or_else(|| {
                        NetworkError::UnknownParent {
                            task: task.id.clone(),
                            parent: parent.clone(),
                        }
                    })?;
                    if tasks[p].parent_id.is_some() {
                        return Err(NetworkError::NestedSubtask {
                            task: task.id.clone(),
                            parent: parent.clone(),
                        });
                    }
                    children.entry(p).or_default().push(i);
                }
            }
        }

        for (i, task) in tasks.iter().enumerate() {
            if task.duration == 0 && !children.contains_key(&i) {
                return Err(NetworkError::ZeroDuration(task.id.clone()));
            }
        }

        let top_pos: HashMap<usize, usize> = top.iter().enumerate().map(|(k, &i)| (i, k)).collect();
        // Every task ID → top-level slot that owns it.
        let owner_slot = |input: usize| -> usize {
            let root = tasks[input]
                .parent_id
                .as_deref()
                .and_then(|p| by_id.get(p).copied())
                .unwrap_or(input);
            top_pos[&root]
        };

        let mut slot_preds: Vec<Vec<usize>> = Vec::with_capacity(top.len());
        for (slot, &i) in top.iter().enumerate() {
            let mut preds: Vec<usize> = Vec::new();
            for p in known_predecessors(&tasks[i], &by_id) {
                push_unique(&mut preds, owner_slot(by_id[p]));
            }
            for &c in children.get(&i).into_iter().flatten() {
                for p in known_predecessors(&tasks[c], &by_id) {
                    let s = owner_slot(by_id[p]);
                    if s != slot {
                        push_unique(&mut preds, s);
                    }
                }
            }
            slot_preds.push(preds);
        }

        let order = depth_first_order(0..top.len(), &slot_preds).map_err(|cycle| {
            NetworkError::CyclicDependency {
                cycle: cycle_names(&cycle, |s| tasks[top[s]].name.clone()),
            }
        })?;

        let mut new_pos = vec![0; top.len()];
        for (pos, &slot) in order.iter().enumerate() {
            new_pos[slot] = pos;
        }

        let mut nodes: Vec<NetworkNode> = Vec::with_capacity(order.len());
        for &slot in &order {
            let i = top[slot];
            let task = strip_unknown(&tasks[i], &by_id);
            let subtasks = match children.get(&i) {
                Some(kids) => order_subtasks(&task, kids, tasks, &by_id)?,
                None if task.needs_team() => generate_subtasks(&task),
                None => Vec::new(),
            };
            let duration = aggregate_duration(&task, &subtasks);
            nodes.push(NetworkNode {
                predecessors: slot_preds[slot].iter().map(|&s| new_pos[s]).collect(),
                successors: Vec::new(),
                task,
                duration,
                subtasks,
                input_index: i,
                cpm: CpmTimes::default(),
            });
        }
        for pos in 0..nodes.len() {
            for k in 0..nodes[pos].predecessors.len() {
                let pred = nodes[pos].predecessors[k];
                nodes[pred].successors.push(pos);
            }
        }

        let index: HashMap<String, usize> = nodes
            .iter()
            .enumerate()
            .map(|(pos, n)| (n.task.id.clone(), pos))
            .collect();
        let owners: HashMap<String, usize> = nodes
            .iter()
            .enumerate()
            .flat_map(|(pos, n)| n.subtasks.iter().map(move |s| (s.id.clone(), pos)))
            .collect();

        debug!(
            order = ?nodes.iter().map(|n| n.task.id.as_str()).collect::<Vec<_>>(),
            "built task network"
        );

        Ok(NetworkModel {
            nodes,
            index,
            owners,
        })
    }
}

fn index_tasks(tasks: &[PlanTask]) -> NetworkResult<HashMap<&str, usize>> {
    let mut by_id = HashMap::with_capacity(tasks.len());
    for (i, task) in tasks.iter().enumerate() {
        if by_id.insert(task.id.as_str(), i).is_some() {
            return Err(NetworkError::DuplicateTaskId(task.id.clone()));
        }
    }
    Ok(by_id)
}

/// Predecessor IDs that name an existing task; the rest are logged and skipped.
fn known_predecessors<'a>(task: &'a PlanTask, by_id: &HashMap<&str, usize>) -> Vec<&'a str> {
    task.predecessors
        .iter()
        .filter(|p| {
            let found = by_id.contains_key(p.as_str());
            if !found {
                warn!(task = %task.id, predecessor = %p, "dropping unknown predecessor");
            }
            found
        })
        .map(|p| p.as_str())
        .collect()
}

fn strip_unknown(task: &PlanTask, by_id: &HashMap<&str, usize>) -> PlanTask {
    let mut copy = task.clone();
    copy.predecessors.retain(|p| by_id.contains_key(p.as_str()));
    copy
}

fn push_unique(list: &mut Vec<usize>, value: usize) {
    if !list.contains(&value) {
        list.push(value);
    }
}

/// Names along a cycle, reordered so each task precedes the next.
fn cycle_names(cycle: &[usize], name: impl Fn(usize) -> String) -> Vec<String> {
    cycle.iter().rev().map(|&i| name(i)).collect()
}

/// Orders explicit subtasks: sibling dependencies first, then name order for
/// sequential parents or input order otherwise.
fn order_subtasks(
    parent: &PlanTask,
    kids: &[usize],
    tasks: &[PlanTask],
    by_id: &HashMap<&str, usize>,
) -> NetworkResult<Vec<PlanTask>> {
    let mut base: Vec<usize> = kids.to_vec();
    if parent.sequential_subtasks {
        base.sort_by(|&a, &b| {
            tasks[a]
                .name
                .cmp(&tasks[b].name)
                .then_with(|| tasks[a].id.cmp(&tasks[b].id))
        });
    }
    let local: HashMap<&str, usize> = base
        .iter()
        .enumerate()
        .map(|(k, &i)| (tasks[i].id.as_str(), k))
        .collect();

    let preds: Vec<Vec<usize>> = base
        .iter()
        .map(|&i| {
            let mut list = Vec::new();
            for p in &tasks[i].predecessors {
                if let Some(&k) = local.get(p.as_str()) {
                    push_unique(&mut list, k);
                }
            }
            list
        })
        .collect();

    let order = depth_first_order(0..base.len(), &preds).map_err(|cycle| {
        NetworkError::CyclicDependency {
            cycle: cycle_names(&cycle, |k| tasks[base[k]].name.clone()),
        }
    })?;

    Ok(order
        .into_iter()
        .map(|k| {
            let mut sub = strip_unknown(&tasks[base[k]], by_id);
            let parent_id = parent.id.as_str();
            sub.predecessors.retain(|p| {
                let own_parent = p == parent_id;
                if own_parent {
                    warn!(task = %sub.id, parent = %parent_id, "subtask cannot wait for its own parent");
                }
                !own_parent
            });
            sub
        })
        .collect())
}

/// One subtask per required employee, each doing the whole task.
fn generate_subtasks(parent: &PlanTask) -> Vec<PlanTask> {
    (1..=parent.required_employees)
        .map(|k| {
            PlanTask::new(format!("{}#{k}", parent.id))
                .with_name(format!("{} ({} #{k})", parent.name, parent.position))
                .with_duration(parent.duration)
                .with_position(parent.position.clone())
                .with_parent(parent.id.clone())
        })
        .collect()
}

/// Duration a composite task occupies in the CPM network.
///
/// The longest chain through the subtasks, with one hand-off day on every
/// edge between siblings. Sequential subtasks form a single chain. Sums
/// saturate at `u32::MAX`.
fn aggregate_duration(task: &PlanTask, subtasks: &[PlanTask]) -> u32 {
    if subtasks.is_empty() {
        return task.duration;
    }
    if task.sequential_subtasks {
        let hand_offs = u32::try_from(subtasks.len() - 1).unwrap_or(u32::MAX);
        return subtasks
            .iter()
            .fold(hand_offs, |total, s| total.saturating_add(s.duration));
    }

    // Subtasks are already in dependency order.
    let mut finish: HashMap<&str, u32> = HashMap::with_capacity(subtasks.len());
    let mut longest = 0;
    for sub in subtasks {
        let start = sub
            .predecessors
            .iter()
            .filter_map(|p| finish.get(p.as_str()))
            .map(|f| f.saturating_add(1))
            .max()
            .unwrap_or(0);
        let end = start.saturating_add(sub.duration);
        finish.insert(sub.id.as_str(), end);
        longest = longest.max(end);
    }
    longest
}
