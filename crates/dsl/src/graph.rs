//! Compiled task graphs.
//!
//! A [`Graph`] is the resolved form of a DAG: every argument carries a
//! [`Reference`], every task knows which tasks it needs, and every task
//! points at its target's [`TemplateDefinition`]. Graphs are immutable once
//! the builder returns them.

use crate::io::{InputSpec, OutputSpec};
use crate::package::PackageId;
use crate::reference::Reference;
use crate::template::{TemplateDefinition, TemplateKey, TemplateKind};
use crate::Result;
use honeycomb_task_graph::{TaskGraph, TaskNodeData};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// Graph annotation set on grouped graphs.
pub const GROUPED_ANNOTATION: &str = "__is_grouped__";
/// Graph annotation naming the main task of a grouped graph.
pub const GROUP_MAIN_TASK_ANNOTATION: &str = "__main_task__";
/// Task annotation marking the main task of a grouped graph.
pub const MAIN_TASK_ANNOTATION: &str = "main_task";

/// A resolved task argument.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskArgument {
    /// Parameter of the target
    pub name: String,
    /// Where the value comes from
    pub from: Reference,
    /// Path inside the source artifact, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_path: Option<String>,
}

/// An output a task hands back to its graph.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskReturn {
    /// Output of the target
    pub name: String,
    /// Description, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Destination path; set for every artifact return
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// True for file, folder and path returns
    pub artifact: bool,
}

/// A resolved task.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskNode {
    /// Task name, unique within the graph
    pub name: String,
    /// Target label: `package/function`, a same-package DAG name, or another package's name
    pub template: String,
    /// Target interface
    #[serde(skip)]
    pub target: Arc<TemplateDefinition>,
    /// Bound arguments in binding order
    pub arguments: Vec<TaskArgument>,
    /// Returned outputs
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub returns: Vec<TaskReturn>,
    /// Tasks that must finish first
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub needs: Vec<String>,
    /// Values to loop over, if the task loops
    #[serde(rename = "loop", skip_serializing_if = "Option::is_none")]
    pub loop_over: Option<Reference>,
    /// Project sub-folder the task runs in
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_folder: Option<String>,
    /// Free-form annotations
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub annotations: IndexMap<String, Value>,
}

impl TaskNode {
    /// Look up a bound argument.
    #[must_use]
    pub fn argument(&self, name: &str) -> Option<&TaskArgument> {
        self.arguments.iter().find(|arg| arg.name == name)
    }

    /// True when the task is marked as a group's main task.
    #[must_use]
    pub fn is_main_task(&self) -> bool {
        self.annotations.get(MAIN_TASK_ANNOTATION) == Some(&Value::Bool(true))
    }

    /// Every reference the task reads: arguments first, then the loop source.
    pub fn references(&self) -> impl Iterator<Item = &Reference> {
        self.arguments
            .iter()
            .map(|arg| &arg.from)
            .chain(self.loop_over.as_ref())
    }

    /// Kind of the target
    #[must_use]
    pub fn target_kind(&self) -> TemplateKind {
        self.target.kind
    }
}

impl TaskNodeData for TaskNode {
    fn needs(&self) -> impl Iterator<Item = &str> {
        self.needs.iter().map(String::as_str)
    }
}

/// A graph output and its source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphOutput {
    /// The declared output
    #[serde(flatten)]
    pub spec: OutputSpec,
    /// Where its value comes from
    pub from: Reference,
}

/// A compiled DAG.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Graph {
    /// Graph name
    pub name: String,
    /// Declaring package
    #[serde(skip)]
    pub package: PackageId,
    /// Declared inputs
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub inputs: Vec<InputSpec>,
    /// Tasks in declaration order
    pub tasks: Vec<TaskNode>,
    /// Declared outputs
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub outputs: Vec<GraphOutput>,
    /// Free-form annotations
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub annotations: IndexMap<String, Value>,
}

impl Graph {
    /// Registry key of the DAG this graph was built from
    #[must_use]
    pub fn key(&self) -> TemplateKey {
        TemplateKey {
            package: self.package.name.clone(),
            name: self.name.clone(),
        }
    }

    /// Look up a task.
    #[must_use]
    pub fn task(&self, name: &str) -> Option<&TaskNode> {
        self.tasks.iter().find(|task| task.name == name)
    }

    /// True for grouped graphs.
    #[must_use]
    pub fn is_grouped(&self) -> bool {
        self.annotations.get(GROUPED_ANNOTATION) == Some(&Value::Bool(true))
    }

    /// Main task of a grouped graph, if one is marked.
    #[must_use]
    pub fn main_task(&self) -> Option<&str> {
        self.annotations
            .get(GROUP_MAIN_TASK_ANNOTATION)
            .and_then(Value::as_str)
    }

    /// The same graph under another name.
    #[must_use]
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self.clone()
        }
    }

    fn task_graph(&self) -> Result<TaskGraph<TaskNode>> {
        Ok(TaskGraph::from_tasks(
            self.tasks.iter().map(|task| (task.name.as_str(), task.clone())),
        )?)
    }

    /// Task names in an order that respects every need.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::CyclicDependency`] if the tasks form a cycle.
    pub fn execution_order(&self) -> Result<Vec<String>> {
        Ok(self
            .task_graph()?
            .topological_sort()?
            .into_iter()
            .map(|node| node.name)
            .collect())
    }

    /// Task names grouped into levels that can run in parallel.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::CyclicDependency`] if the tasks form a cycle.
    pub fn parallel_levels(&self) -> Result<Vec<Vec<String>>> {
        Ok(self
            .task_graph()?
            .parallel_levels()?
            .into_iter()
            .map(|level| level.into_iter().map(|node| node.name).collect())
            .collect())
    }
}
