//! Structural checks on compiled graphs.
//!
//! The validator never fails fast: it reports every problem it finds, so a
//! dry run can show them all at once. The graph builder returns the first.

use crate::graph::{Graph, TaskNode};
use crate::reference::Reference;
use crate::Error;
use std::collections::HashSet;
use tracing::debug;

/// Checks a compiled graph.
#[derive(Debug, Clone, Copy)]
pub struct GraphValidator<'a> {
    graph: &'a Graph,
    grouped: bool,
}

impl<'a> GraphValidator<'a> {
    /// Validator for `graph`. Grouped rules apply when the graph is annotated as grouped.
    #[must_use]
    pub fn new(graph: &'a Graph) -> Self {
        Self {
            graph,
            grouped: graph.is_grouped(),
        }
    }

    /// Apply or skip the grouped rules regardless of annotations.
    #[must_use]
    pub const fn grouped(mut self, grouped: bool) -> Self {
        self.grouped = grouped;
        self
    }

    /// Every problem found, in task order.
    #[must_use]
    pub fn validate(&self) -> Vec<Error> {
        let mut errors = Vec::new();
        self.check_task_names(&mut errors);

        let declared: HashSet<&str> = self.graph.tasks.iter().map(|t| t.name.as_str()).collect();
        for task in &self.graph.tasks {
            check_arguments(task, &mut errors);
            check_returns(task, &mut errors);
            check_task_references(task, &declared, &mut errors);
        }
        for output in &self.graph.outputs {
            if let Reference::Task { name, .. } = &output.from {
                if !declared.contains(name.as_str()) {
                    errors.push(Error::malformed(
                        format!("output '{}' of '{}'", output.spec.name(), self.graph.name),
                        format!("task '{name}' is not declared"),
                    ));
                }
            }
        }

        if self.grouped {
            self.check_grouped(&mut errors);
        }

        debug!(graph = %self.graph.name, errors = errors.len(), "Validated graph");
        errors
    }

    fn check_task_names(&self, errors: &mut Vec<Error>) {
        let mut seen = HashSet::new();
        let mut reported = HashSet::new();
        for task in &self.graph.tasks {
            if !seen.insert(task.name.as_str()) && reported.insert(task.name.as_str()) {
                errors.push(Error::DuplicateTaskName {
                    graph: self.graph.name.clone(),
                    name: task.name.clone(),
                });
            }
        }
    }

    fn check_grouped(&self, errors: &mut Vec<Error>) {
        let graph = &self.graph.name;
        for task in &self.graph.tasks {
            if task.loop_over.is_some() {
                errors.push(Error::grouped(
                    graph,
                    format!("task '{}' loops, which grouped graphs do not allow", task.name),
                ));
            }
            for ret in task.returns.iter().filter(|ret| !ret.artifact) {
                errors.push(Error::grouped(
                    graph,
                    format!(
                        "task '{}' returns parameter '{}'; only files and folders can be returned",
                        task.name, ret.name
                    ),
                ));
            }
        }

        let mains: Vec<&str> = self
            .graph
            .tasks
            .iter()
            .filter(|task| task.is_main_task())
            .map(|task| task.name.as_str())
            .collect();
        if mains.len() > 1 {
            errors.push(Error::grouped(
                graph,
                format!("more than one main task: {}", mains.join(", ")),
            ));
        }
    }
}

fn check_arguments(task: &TaskNode, errors: &mut Vec<Error>) {
    let missing: Vec<String> = task
        .target
        .inputs
        .iter()
        .filter(|input| input.is_required() && task.argument(input.name()).is_none())
        .map(|input| input.name().to_string())
        .collect();
    if !missing.is_empty() {
        errors.push(Error::MissingArgument {
            task: task.name.clone(),
            template: task.target.name.clone(),
            arguments: missing,
        });
    }
}

fn check_returns(task: &TaskNode, errors: &mut Vec<Error>) {
    for ret in &task.returns {
        let has_path = ret.path.as_deref().is_some_and(|path| !path.trim().is_empty());
        if ret.artifact && !has_path {
            errors.push(Error::MissingReturnPath {
                task: task.name.clone(),
                output: ret.name.clone(),
            });
        }
    }
}

fn check_task_references(task: &TaskNode, declared: &HashSet<&str>, errors: &mut Vec<Error>) {
    for producer in task.references().filter_map(Reference::task_name) {
        if !declared.contains(producer) {
            errors.push(Error::malformed(
                format!("task '{}'", task.name),
                format!("task '{producer}' is not declared"),
            ));
        }
    }
    for need in &task.needs {
        if !declared.contains(need.as_str()) {
            errors.push(Error::malformed(
                format!("needs of task '{}'", task.name),
                format!("task '{need}' is not declared"),
            ));
        }
    }
}

/// Every problem found in `graph`, applying grouped rules when `grouped` is set.
#[must_use]
pub fn validate(graph: &Graph, grouped: bool) -> Vec<Error> {
    GraphValidator::new(graph).grouped(grouped).validate()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{TaskArgument, TaskReturn, MAIN_TASK_ANNOTATION};
    use crate::io::{InputSpec, OutputSpec};
    use crate::package::PackageId;
    use crate::template::{TemplateDefinition, TemplateKind};
    use indexmap::IndexMap;
    use serde_json::{json, Value};
    use std::sync::Arc;

    fn target() -> Arc<TemplateDefinition> {
        Arc::new(TemplateDefinition {
            name: "ray-trace".to_string(),
            kind: TemplateKind::Function,
            package: PackageId::new("radiance", "1.0.0"),
            description: None,
            inputs: vec![
                InputSpec::folder("octree").with_path("scene.oct"),
                InputSpec::integer("bounces").with_default(2),
                InputSpec::string("sensor"),
            ],
            outputs: vec![
                OutputSpec::folder("results").with_path("results"),
                OutputSpec::integer("count").with_path("count.txt"),
            ],
        })
    }

    fn node(name: &str) -> TaskNode {
        TaskNode {
            name: name.to_string(),
            template: "radiance/ray-trace".to_string(),
            target: target(),
            arguments: vec![
                TaskArgument {
                    name: "octree".to_string(),
                    from: Reference::Value { value: json!("scene.oct") },
                    sub_path: None,
                },
                TaskArgument {
                    name: "sensor".to_string(),
                    from: Reference::Value { value: json!("grid") },
                    sub_path: None,
                },
            ],
            returns: vec![],
            needs: vec![],
            loop_over: None,
            sub_folder: None,
            annotations: IndexMap::new(),
        }
    }

    fn graph(tasks: Vec<TaskNode>) -> Graph {
        Graph {
            name: "daylight".to_string(),
            package: PackageId::new("daylight", "0.1.0"),
            inputs: vec![],
            tasks,
            outputs: vec![],
            annotations: IndexMap::new(),
        }
    }

    #[test]
    fn test_valid_graph_has_no_errors() {
        assert!(validate(&graph(vec![node("a"), node("b")]), false).is_empty());
    }

    #[test]
    fn test_missing_arguments_are_listed_together() {
        let mut task = node("a");
        task.arguments.clear();
        let errors = validate(&graph(vec![task]), false);
        assert_eq!(
            errors,
            vec![Error::MissingArgument {
                task: "a".to_string(),
                template: "ray-trace".to_string(),
                arguments: vec!["octree".to_string(), "sensor".to_string()],
            }]
        );
    }

    #[test]
    fn test_artifact_return_needs_a_path() {
        let mut task = node("a");
        task.returns.push(TaskReturn {
            name: "results".to_string(),
            description: None,
            path: Some("  ".to_string()),
            artifact: true,
        });
        let errors = validate(&graph(vec![task]), false);
        assert!(matches!(&errors[..], [Error::MissingReturnPath { output, .. }] if output == "results"));
    }

    #[test]
    fn test_duplicates_reported_once() {
        let errors = validate(&graph(vec![node("a"), node("a"), node("a")]), false);
        assert_eq!(errors.len(), 1);
        assert!(matches!(&errors[0], Error::DuplicateTaskName { name, .. } if name == "a"));
    }

    #[test]
    fn test_unknown_producer_and_need() {
        let mut task = node("b");
        task.arguments[1].from = Reference::Task {
            name: "ghost".to_string(),
            variable: "count".to_string(),
            artifact: None,
        };
        task.needs.push("phantom".to_string());
        let errors = validate(&graph(vec![task]), false);
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().all(|e| matches!(e, Error::MalformedReference { .. })));
    }

    #[test]
    fn test_grouped_rules() {
        let mut looping = node("a");
        looping.loop_over = Some(Reference::Value { value: json!([1, 2]) });
        looping.annotations.insert(MAIN_TASK_ANNOTATION.to_string(), Value::Bool(true));

        let mut returns_param = node("b");
        returns_param.returns.push(TaskReturn {
            name: "count".to_string(),
            description: None,
            path: None,
            artifact: false,
        });
        returns_param
            .annotations
            .insert(MAIN_TASK_ANNOTATION.to_string(), Value::Bool(true));

        let g = graph(vec![looping, returns_param]);
        assert!(validate(&g, false).is_empty());

        let errors = validate(&g, true);
        assert_eq!(errors.len(), 3);
        assert!(errors
            .iter()
            .all(|e| matches!(e, Error::GroupedGraphViolation { .. })));
        assert!(errors[2].to_string().contains("a, b"));
    }
}
