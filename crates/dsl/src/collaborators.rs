//! Interfaces to the systems that consume compiled pipelines.

use crate::assembler::CompiledPipeline;
use crate::Result;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

/// Stores a compiled pipeline and registers it in a package index.
pub trait Publisher {
    /// Publish `pipeline` with a human-readable `description`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Publish`] when the pipeline cannot be stored.
    fn publish(&self, pipeline: &CompiledPipeline, description: &str) -> Result<()>;
}

/// Runs a compiled pipeline.
pub trait ExecutionEngine {
    /// Run `pipeline` with `inputs` inside `project`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Execution`] when the run cannot be started.
    /// Task failures are reported in the returned [`ExecutionReport`].
    fn execute(
        &self,
        pipeline: &CompiledPipeline,
        inputs: &IndexMap<String, Value>,
        project: &Path,
    ) -> Result<ExecutionReport>;
}

/// Result of one task of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskOutcome {
    /// Task name
    pub task: String,
    /// Whether it succeeded
    pub success: bool,
    /// Engine message, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Per-task results of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionReport {
    /// Outcomes in completion order
    pub outcomes: Vec<TaskOutcome>,
}

impl ExecutionReport {
    /// True when every task succeeded.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.outcomes.iter().all(|outcome| outcome.success)
    }

    /// Names of the tasks that failed.
    #[must_use]
    pub fn failed_tasks(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|outcome| !outcome.success)
            .map(|outcome| outcome.task.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_summary() {
        let report = ExecutionReport {
            outcomes: vec![
                TaskOutcome {
                    task: "a".to_string(),
                    success: true,
                    message: None,
                },
                TaskOutcome {
                    task: "b".to_string(),
                    success: false,
                    message: Some("exit code 1".to_string()),
                },
            ],
        };
        assert!(!report.succeeded());
        assert_eq!(report.failed_tasks(), vec!["b"]);
        assert!(ExecutionReport::default().succeeded());
    }
}
