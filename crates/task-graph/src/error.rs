//! Error types for task graph operations.

use miette::Diagnostic;
use thiserror::Error;

/// Result type for task graph operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during task graph operations.
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum Error {
    /// A cycle was detected among task needs.
    #[error("Cycle detected in task graph: {path}")]
    #[diagnostic(
        code(honeycomb_task_graph::cycle),
        help("Remove one of the `needs` entries (or task references) along the cycle")
    )]
    CycleDetected {
        /// Task names along the cycle, joined with ` -> `.
        path: String,
    },

    /// Two tasks were added under the same name.
    #[error("Task '{name}' was added to the graph more than once")]
    #[diagnostic(code(honeycomb_task_graph::duplicate))]
    DuplicateTask {
        /// The repeated task name.
        name: String,
    },

    /// One or more tasks need tasks that are not in the graph.
    #[error("Missing dependencies: {}", format_missing(.missing))]
    #[diagnostic(code(honeycomb_task_graph::missing))]
    MissingDependencies {
        /// List of (task, missing need) pairs.
        missing: Vec<(String, String)>,
    },
}

fn format_missing(missing: &[(String, String)]) -> String {
    missing
        .iter()
        .map(|(task, dep)| format!("task '{task}' needs missing task '{dep}'"))
        .collect::<Vec<_>>()
        .join(", ")
}

impl Error {
    /// Create a cycle error from the task names along the cycle.
    #[must_use]
    pub fn cycle<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let path = names
            .into_iter()
            .map(|name| name.as_ref().to_string())
            .collect::<Vec<_>>()
            .join(" -> ");
        Self::CycleDetected { path }
    }
}
