//! Turn raw argument values into [`Reference`]s.

use crate::dag::{ArgValue, InputHandle};
use crate::io::{ArtifactKind, InputSpec, IoKind};
use crate::naming::{param_name, rewrite_placeholders};
use crate::reference::Reference;
use crate::template::TemplateDefinition;
use crate::{Error, Result};
use serde_json::Value;
use std::collections::HashMap;

/// Names visible while resolving the arguments of one graph.
#[derive(Debug)]
pub struct ResolveContext<'a> {
    graph: &'a str,
    inputs: HashMap<InputHandle, &'a InputSpec>,
    tasks: HashMap<&'a str, &'a TemplateDefinition>,
}

/// The argument being resolved, for error messages.
#[derive(Debug, Clone, Copy)]
pub struct Site<'a> {
    /// Task holding the argument
    pub task: &'a str,
    /// Argument name
    pub argument: &'a str,
}

impl<'a> ResolveContext<'a> {
    /// Context for graph `graph`.
    pub fn new(
        graph: &'a str,
        inputs: impl IntoIterator<Item = (InputHandle, &'a InputSpec)>,
        tasks: impl IntoIterator<Item = (&'a str, &'a TemplateDefinition)>,
    ) -> Self {
        Self {
            graph,
            inputs: inputs.into_iter().collect(),
            tasks: tasks.into_iter().collect(),
        }
    }

    /// Name of the graph being built
    #[must_use]
    pub const fn graph(&self) -> &str {
        self.graph
    }

    /// Resolve a raw argument value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnresolvedInput`] for a handle from another DAG and
    /// [`Error::MalformedReference`] for a task or output that does not exist.
    pub fn resolve(&self, raw: &ArgValue, site: Site<'_>) -> Result<Reference> {
        match raw {
            ArgValue::Value(value) => Ok(Reference::Value {
                value: rewrite_value(value),
            }),
            ArgValue::Input(handle) => {
                let input = self
                    .inputs
                    .get(handle)
                    .ok_or_else(|| Error::UnresolvedInput {
                        graph: self.graph.to_string(),
                        task: site.task.to_string(),
                        argument: site.argument.to_string(),
                    })?;
                Ok(Reference::Input {
                    variable: input.name().to_string(),
                    artifact: input.kind().artifact_kind(),
                })
            }
            ArgValue::TaskOutput { task, output } => self.task_output(task, output, site),
            ArgValue::LoopItem(field) => Ok(Reference::Item {
                variable: field.clone(),
            }),
        }
    }

    /// Resolve an output of a task in this graph.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedReference`] if the task is not declared or
    /// its target has no such output.
    pub fn task_output(&self, task: &str, output: &str, site: Site<'_>) -> Result<Reference> {
        let task = param_name(task);
        let output = param_name(output);
        let location = format!("task '{}' argument '{}'", site.task, site.argument);

        let target = self.tasks.get(task.as_str()).ok_or_else(|| {
            Error::malformed(
                &location,
                format!("task '{task}' is not declared in '{}'", self.graph),
            )
        })?;
        let spec = target.output(&output).ok_or_else(|| {
            Error::malformed(
                &location,
                format!(
                    "'{output}' is not an output of '{}' used by task '{task}'",
                    target.name
                ),
            )
        })?;

        Ok(Reference::Task {
            name: task,
            variable: output,
            artifact: spec.kind().artifact_kind(),
        })
    }
}

/// Check a resolved reference against the parameter it binds.
///
/// A literal string bound to an artifact parameter becomes a literal artifact
/// path: a folder for folder parameters, a file otherwise.
///
/// # Errors
///
/// Returns [`Error::ArtifactMismatch`] when an artifact is bound to a
/// parameter or a parameter to an artifact.
pub fn bind(reference: Reference, parameter: &InputSpec, site: Site<'_>) -> Result<Reference> {
    let expected = parameter.kind().artifact_kind();
    let mismatch = |found: &Reference| Error::ArtifactMismatch {
        task: site.task.to_string(),
        argument: site.argument.to_string(),
        expected: describe_kind(parameter.kind()),
        found: found.describe(),
    };

    match (expected, reference) {
        (Some(kind), Reference::Value { value: Value::String(path) }) => {
            let kind = if kind == ArtifactKind::Folder {
                ArtifactKind::Folder
            } else {
                ArtifactKind::File
            };
            Ok(Reference::ValueArtifact { kind, path })
        }
        (Some(_), reference) if !reference.is_artifact() => Err(mismatch(&reference)),
        (None, reference) if reference.is_artifact() => Err(mismatch(&reference)),
        (_, reference) => Ok(reference),
    }
}

fn describe_kind(kind: IoKind) -> String {
    match kind.artifact_kind() {
        Some(artifact) => format!("a {artifact}"),
        None => format!("a {kind} parameter"),
    }
}

/// Rewrite placeholders in every string inside a literal.
fn rewrite_value(value: &Value) -> Value {
    match value {
        Value::String(text) => Value::String(rewrite_placeholders(text)),
        Value::Array(items) => Value::Array(items.iter().map(rewrite_value).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, item)| (key.clone(), rewrite_value(item)))
                .collect(),
        ),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::DagTemplate;
    use crate::io::OutputSpec;
    use crate::package::PackageId;
    use crate::template::TemplateKind;
    use serde_json::json;

    const SITE: Site<'static> = Site {
        task: "consumer",
        argument: "value",
    };

    fn producer() -> TemplateDefinition {
        TemplateDefinition {
            name: "producer".to_string(),
            kind: TemplateKind::Function,
            package: PackageId::new("pkg", "1.0.0"),
            description: None,
            inputs: vec![],
            outputs: vec![
                OutputSpec::integer("count").with_path("count.txt"),
                OutputSpec::folder("grids").with_path("grids"),
            ],
        }
    }

    #[test]
    fn test_literal_placeholders_are_rewritten() {
        let ctx = ResolveContext::new("g", [], []);
        let reference = ctx
            .resolve(&ArgValue::from(json!({"cmd": ["{{self.a_b}}"]})), SITE)
            .unwrap();
        assert_eq!(
            reference,
            Reference::Value {
                value: json!({"cmd": ["{{inputs.a-b}}"]})
            }
        );
    }

    #[test]
    fn test_foreign_handle_is_unresolved() {
        let mut other = DagTemplate::builder("Other", PackageId::new("pkg", "1.0.0"));
        let foreign = other.input(InputSpec::string("name"));

        let ctx = ResolveContext::new("main", [], []);
        let err = ctx.resolve(&ArgValue::Input(foreign), SITE).unwrap_err();
        assert!(matches!(err, Error::UnresolvedInput { ref graph, .. } if graph == "main"));
    }

    #[test]
    fn test_task_output_resolution() {
        let producer = producer();
        let ctx = ResolveContext::new("g", [], [("make-grids", &producer)]);

        let reference = ctx.task_output("make_grids", "grids", SITE).unwrap();
        assert_eq!(reference.task_name(), Some("make-grids"));
        assert_eq!(reference.artifact_kind(), Some(ArtifactKind::Folder));

        assert!(matches!(
            ctx.task_output("make-grids", "missing", SITE),
            Err(Error::MalformedReference { .. })
        ));
        assert!(matches!(
            ctx.task_output("nobody", "count", SITE),
            Err(Error::MalformedReference { .. })
        ));
    }

    #[test]
    fn test_bind_string_to_artifact() {
        let folder = InputSpec::folder("model").with_path("model");
        let bound = bind(
            Reference::Value {
                value: json!("./model"),
            },
            &folder,
            SITE,
        )
        .unwrap();
        assert_eq!(
            bound,
            Reference::ValueArtifact {
                kind: ArtifactKind::Folder,
                path: "./model".to_string()
            }
        );

        let path = InputSpec::path("source").with_path("src");
        let bound = bind(Reference::Value { value: json!("a.txt") }, &path, SITE).unwrap();
        assert_eq!(bound.artifact_kind(), Some(ArtifactKind::File));
    }

    #[test]
    fn test_bind_rejects_mismatches() {
        let file = InputSpec::file("grid").with_path("grid.pts");
        let err = bind(Reference::Value { value: json!(3) }, &file, SITE).unwrap_err();
        assert!(matches!(err, Error::ArtifactMismatch { .. }));

        let number = InputSpec::integer("count");
        let artifact = Reference::Input {
            variable: "grid".to_string(),
            artifact: Some(ArtifactKind::File),
        };
        assert!(bind(artifact, &number, SITE).is_err());

        let item = Reference::Item { variable: None };
        assert!(bind(item.clone(), &file, SITE).is_err());
        assert_eq!(bind(item.clone(), &number, SITE).unwrap(), item);
    }
}
