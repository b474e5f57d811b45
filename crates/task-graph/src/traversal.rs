//! Ordering types returned by task graph traversals.

use crate::GraphNode;

/// Tasks in an order where every task comes after the tasks it needs.
pub type TopologicalOrder<T> = Vec<GraphNode<T>>;

/// Tasks grouped by dependency level.
///
/// Tasks inside one level do not need each other. Every task in level N must
/// complete before any task in level N+1 starts.
pub type ParallelLevels<T> = Vec<Vec<GraphNode<T>>>;
