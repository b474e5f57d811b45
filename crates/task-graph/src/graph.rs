//! Task graph built on petgraph.
//!
//! Nodes are tasks, edges point from a needed task to the task that needs it,
//! so a topological order is an execution order.

use crate::{Error, ParallelLevels, Result, TaskNodeData, TopologicalOrder};
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::IntoNodeReferences;
use petgraph::Direction;
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::debug;

/// A node in the task graph.
#[derive(Debug, Clone)]
pub struct GraphNode<T> {
    /// Name of the task.
    pub name: String,
    /// The task data.
    pub task: T,
}

/// Task graph for need resolution and execution ordering.
///
/// Generic over any task type implementing [`TaskNodeData`]. Tasks are kept
/// in insertion order, and every ordering query breaks ties by that order so
/// results are reproducible.
pub struct TaskGraph<T: TaskNodeData> {
    graph: DiGraph<GraphNode<T>, ()>,
    name_to_node: HashMap<String, NodeIndex>,
}

impl<T: TaskNodeData> TaskGraph<T> {
    /// Create a new empty task graph.
    #[must_use]
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            name_to_node: HashMap::new(),
        }
    }

    /// Build a fully wired graph from `(name, task)` pairs.
    ///
    /// # Errors
    ///
    /// Returns an error on a duplicate name or a need that names no task.
    pub fn from_tasks<I, S>(tasks: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, T)>,
        S: AsRef<str>,
    {
        let mut graph = Self::new();
        for (name, task) in tasks {
            graph.add_task(name.as_ref(), task)?;
        }
        graph.add_dependency_edges()?;
        Ok(graph)
    }

    /// Add a single task to the graph.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateTask`] if the name is already present.
    pub fn add_task(&mut self, name: &str, task: T) -> Result<NodeIndex> {
        if self.name_to_node.contains_key(name) {
            return Err(Error::DuplicateTask {
                name: name.to_string(),
            });
        }

        let node_index = self.graph.add_node(GraphNode {
            name: name.to_string(),
            task,
        });
        self.name_to_node.insert(name.to_string(), node_index);
        debug!("Added task node '{}'", name);

        Ok(node_index)
    }

    /// Add need edges after all tasks have been added.
    ///
    /// Repeated needs collapse into a single edge.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingDependencies`] listing every need that names a
    /// task not in the graph.
    pub fn add_dependency_edges(&mut self) -> Result<()> {
        let mut missing = Vec::new();
        let mut edges_to_add = Vec::new();

        for (node_index, node) in self.graph.node_references() {
            for need in node.task.needs() {
                match self.name_to_node.get(need) {
                    Some(&need_index) => edges_to_add.push((need_index, node_index)),
                    None => missing.push((node.name.clone(), need.to_string())),
                }
            }
        }

        if !missing.is_empty() {
            return Err(Error::MissingDependencies { missing });
        }

        for (from, to) in edges_to_add {
            self.graph.update_edge(from, to, ());
        }

        Ok(())
    }

    /// Find one cycle and return the task names along it.
    ///
    /// The first and last entries are the same task. Returns `None` for an
    /// acyclic graph.
    #[must_use]
    pub fn find_cycle(&self) -> Option<Vec<String>> {
        for component in tarjan_scc(&self.graph) {
            let is_cycle = component.len() > 1
                || component
                    .first()
                    .is_some_and(|&node| self.graph.contains_edge(node, node));
            if !is_cycle {
                continue;
            }

            let members: HashSet<NodeIndex> = component.iter().copied().collect();
            let start = component.iter().copied().min()?;
            let mut path = vec![start];
            let mut visited = HashSet::from([start]);
            if self.walk_back_to(start, start, &members, &mut path, &mut visited) {
                return Some(
                    path.into_iter()
                        .map(|idx| self.graph[idx].name.clone())
                        .collect(),
                );
            }
        }
        None
    }

    fn walk_back_to(
        &self,
        current: NodeIndex,
        start: NodeIndex,
        members: &HashSet<NodeIndex>,
        path: &mut Vec<NodeIndex>,
        visited: &mut HashSet<NodeIndex>,
    ) -> bool {
        let mut successors: Vec<NodeIndex> = self
            .graph
            .neighbors_directed(current, Direction::Outgoing)
            .filter(|n| members.contains(n))
            .collect();
        successors.sort();

        for next in successors {
            if next == start {
                path.push(start);
                return true;
            }
            if visited.insert(next) {
                path.push(next);
                if self.walk_back_to(next, start, members, path, visited) {
                    return true;
                }
                path.pop();
            }
        }
        false
    }

    /// Get the tasks in execution order.
    ///
    /// Kahn's algorithm with ties broken by insertion order, so independent
    /// tasks keep the order they were declared in.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CycleDetected`] if the graph contains a cycle.
    pub fn topological_sort(&self) -> Result<TopologicalOrder<T>> {
        if let Some(cycle) = self.find_cycle() {
            return Err(Error::cycle(cycle));
        }

        let mut in_degree: HashMap<NodeIndex, usize> = self
            .graph
            .node_indices()
            .map(|idx| {
                (
                    idx,
                    self.graph
                        .neighbors_directed(idx, Direction::Incoming)
                        .count(),
                )
            })
            .collect();
        let mut ready: BTreeSet<NodeIndex> = in_degree
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(idx, _)| *idx)
            .collect();

        let mut sorted = Vec::with_capacity(self.graph.node_count());
        while let Some(idx) = ready.pop_first() {
            sorted.push(self.graph[idx].clone());
            for next in self.graph.neighbors_directed(idx, Direction::Outgoing) {
                if let Some(degree) = in_degree.get_mut(&next) {
                    *degree -= 1;
                    if *degree == 0 {
                        ready.insert(next);
                    }
                }
            }
        }

        Ok(sorted)
    }

    /// Group tasks into levels that can run concurrently.
    ///
    /// A task's level is one more than the highest level among its needs.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CycleDetected`] if the graph contains a cycle.
    pub fn parallel_levels(&self) -> Result<ParallelLevels<T>> {
        let sorted = self.topological_sort()?;

        let mut levels: ParallelLevels<T> = Vec::new();
        let mut level_of: HashMap<String, usize> = HashMap::new();

        for node in sorted {
            let level = node
                .task
                .needs()
                .filter_map(|need| level_of.get(need))
                .map(|level| level + 1)
                .max()
                .unwrap_or(0);

            if level >= levels.len() {
                levels.resize(level + 1, Vec::new());
            }
            level_of.insert(node.name.clone(), level);
            levels[level].push(node);
        }

        Ok(levels)
    }
}

impl<T: TaskNodeData> Default for TaskGraph<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, Default)]
    struct TestTask {
        needs: Vec<String>,
    }

    impl TestTask {
        fn new(needs: &[&str]) -> Self {
            Self {
                needs: needs.iter().map(|s| (*s).to_string()).collect(),
            }
        }
    }

    impl TaskNodeData for TestTask {
        fn needs(&self) -> impl Iterator<Item = &str> {
            self.needs.iter().map(String::as_str)
        }
    }

    fn names(order: &[GraphNode<TestTask>]) -> Vec<&str> {
        order.iter().map(|n| n.name.as_str()).collect()
    }

    #[test]
    fn test_add_single_task() {
        let mut graph = TaskGraph::new();
        graph.add_task("split-grid", TestTask::default()).unwrap();
        graph.add_dependency_edges().unwrap();
        assert!(graph.find_cycle().is_none());
        assert_eq!(names(&graph.topological_sort().unwrap()), vec!["split-grid"]);
    }

    #[test]
    fn test_duplicate_task_is_rejected() {
        let mut graph = TaskGraph::new();
        graph.add_task("a", TestTask::default()).unwrap();
        let err = graph.add_task("a", TestTask::default()).unwrap_err();
        assert_eq!(
            err,
            Error::DuplicateTask {
                name: "a".to_string()
            }
        );
    }

    #[test]
    fn test_needs_order_execution() {
        let graph = TaskGraph::from_tasks([
            ("post-process", TestTask::new(&["ray-trace"])),
            ("ray-trace", TestTask::new(&["split-grid"])),
            ("split-grid", TestTask::new(&[])),
        ])
        .unwrap();

        let sorted = graph.topological_sort().unwrap();
        assert_eq!(names(&sorted), vec!["split-grid", "ray-trace", "post-process"]);
    }

    #[test]
    fn test_independent_tasks_keep_declaration_order() {
        let graph = TaskGraph::from_tasks([
            ("c", TestTask::new(&[])),
            ("a", TestTask::new(&[])),
            ("b", TestTask::new(&[])),
        ])
        .unwrap();

        let sorted = graph.topological_sort().unwrap();
        assert_eq!(names(&sorted), vec!["c", "a", "b"]);
    }

    #[test]
    fn test_cycle_detection_reports_path() {
        let graph = TaskGraph::from_tasks([
            ("a", TestTask::new(&["c"])),
            ("b", TestTask::new(&["a"])),
            ("c", TestTask::new(&["b"])),
        ])
        .unwrap();

        let cycle = graph.find_cycle().unwrap();
        assert_eq!(cycle.first(), cycle.last());
        assert_eq!(cycle.len(), 4);

        let err = graph.topological_sort().unwrap_err();
        assert!(matches!(err, Error::CycleDetected { .. }));
    }

    #[test]
    fn test_self_need_is_a_cycle() {
        let graph = TaskGraph::from_tasks([("a", TestTask::new(&["a"]))]).unwrap();
        assert_eq!(graph.find_cycle(), Some(vec!["a".to_string(), "a".to_string()]));
    }

    #[test]
    fn test_missing_dependencies_are_all_reported() {
        let result = TaskGraph::from_tasks([
            ("a", TestTask::new(&["x"])),
            ("b", TestTask::new(&["y"])),
        ]);

        match result {
            Err(Error::MissingDependencies { missing }) => {
                assert_eq!(missing.len(), 2);
                assert!(missing.contains(&("a".to_string(), "x".to_string())));
                assert!(missing.contains(&("b".to_string(), "y".to_string())));
            }
            _ => panic!("expected missing dependencies"),
        }
    }

    #[test]
    fn test_parallel_levels() {
        let graph = TaskGraph::from_tasks([
            ("root", TestTask::new(&[])),
            ("left", TestTask::new(&["root"])),
            ("right", TestTask::new(&["root"])),
            ("join", TestTask::new(&["left", "right"])),
        ])
        .unwrap();

        let levels = graph.parallel_levels().unwrap();
        assert_eq!(levels.len(), 3);
        assert_eq!(names(&levels[0]), vec!["root"]);
        assert_eq!(names(&levels[1]), vec!["left", "right"]);
        assert_eq!(names(&levels[2]), vec!["join"]);
    }

    #[test]
    fn test_repeated_need_collapses_to_one_edge() {
        let graph = TaskGraph::from_tasks([
            ("a", TestTask::new(&[])),
            ("b", TestTask::new(&["a", "a"])),
        ])
        .unwrap();

        assert_eq!(names(&graph.topological_sort().unwrap()), vec!["a", "b"]);
        let levels = graph.parallel_levels().unwrap();
        assert_eq!(levels.len(), 2);
    }

    #[test]
    fn test_empty_graph() {
        let graph: TaskGraph<TestTask> = TaskGraph::new();
        assert!(graph.topological_sort().unwrap().is_empty());
        assert!(graph.parallel_levels().unwrap().is_empty());
    }
}
