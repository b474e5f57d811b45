//! Execution ordering for honeycomb task graphs.
//!
//! A compiled honeycomb graph lists its tasks together with the names of the
//! tasks each one `needs`. This crate turns that list into a petgraph
//! [`DiGraph`](petgraph::graph::DiGraph) so callers can detect cycles, report
//! missing needs, and compute a deterministic execution order.
//!
//! # Key Types
//!
//! - [`TaskGraph`]: the graph structure for building and querying task needs
//! - [`TaskNodeData`]: trait that task types implement to be stored in the graph
//! - [`GraphNode`]: a node in the graph containing the task name and data
//!
//! # Example
//!
//! ```ignore
//! use honeycomb_task_graph::{TaskGraph, TaskNodeData};
//!
//! struct Step {
//!     needs: Vec<String>,
//! }
//!
//! impl TaskNodeData for Step {
//!     fn needs(&self) -> impl Iterator<Item = &str> {
//!         self.needs.iter().map(String::as_str)
//!     }
//! }
//!
//! let mut graph = TaskGraph::new();
//! graph.add_task("split-grid", Step { needs: vec![] })?;
//! graph.add_task("ray-trace", Step { needs: vec!["split-grid".to_string()] })?;
//! graph.add_dependency_edges()?;
//!
//! let order = graph.topological_sort()?;
//! ```

mod error;
mod graph;
mod traversal;

pub use error::{Error, Result};
pub use graph::{GraphNode, TaskGraph};
pub use traversal::{ParallelLevels, TopologicalOrder};

/// Trait for task data that can be stored in a [`TaskGraph`].
pub trait TaskNodeData: Clone {
    /// Names of the tasks that must complete before this one.
    fn needs(&self) -> impl Iterator<Item = &str>;
}
