//! Build a [`Graph`] from a [`DagTemplate`].
//!
//! Building runs in three passes: register every task and its target,
//! resolve arguments, returns and needs of each task, then check the
//! finished graph for cycles and structural problems.

use crate::dag::{ArgValue, DagOutput, DagTemplate, OutputSource, TaskDeclaration};
use crate::graph::{
    Graph, GraphOutput, TaskArgument, TaskNode, TaskReturn, GROUPED_ANNOTATION,
    GROUP_MAIN_TASK_ANNOTATION,
};
use crate::io::ArtifactKind;
use crate::naming::rewrite_placeholders;
use crate::options::{CompilerOptions, NeedsPolicy};
use crate::reference::Reference;
use crate::registry::TemplateRegistry;
use crate::resolver::{bind, ResolveContext, Site};
use crate::template::{TemplateDefinition, TemplateKind};
use crate::validator::GraphValidator;
use crate::{Error, Result};
use honeycomb_task_graph::TaskGraph;
use indexmap::IndexMap;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Resolves DAG templates into compiled graphs.
#[derive(Debug, Clone, Copy)]
pub struct GraphBuilder<'a> {
    registry: &'a TemplateRegistry,
    policy: NeedsPolicy,
    warn_single_task_group: bool,
}

impl<'a> GraphBuilder<'a> {
    /// Builder with default options.
    #[must_use]
    pub const fn new(registry: &'a TemplateRegistry) -> Self {
        Self {
            registry,
            policy: NeedsPolicy::Infer,
            warn_single_task_group: true,
        }
    }

    /// Builder following `options`.
    #[must_use]
    pub const fn with_options(registry: &'a TemplateRegistry, options: &CompilerOptions) -> Self {
        Self {
            registry,
            policy: options.needs_policy,
            warn_single_task_group: options.warn_single_task_group,
        }
    }

    /// Registry templates are resolved against
    #[must_use]
    pub const fn registry(&self) -> &'a TemplateRegistry {
        self.registry
    }

    /// Needs policy in effect
    #[must_use]
    pub const fn policy(&self) -> NeedsPolicy {
        self.policy
    }

    /// Build and validate the graph of `dag`.
    ///
    /// # Errors
    ///
    /// Returns the first resolution error, or the first problem reported by
    /// the [`GraphValidator`].
    #[instrument(skip(self, dag), fields(dag = %dag.definition().name))]
    pub fn build(&self, dag: &DagTemplate) -> Result<Graph> {
        let graph = self.build_unvalidated(dag)?;
        let errors = GraphValidator::new(&graph)
            .grouped(dag.is_grouped())
            .validate();
        match errors.into_iter().next() {
            Some(error) => Err(error),
            None => Ok(graph),
        }
    }

    /// Resolve `dag` without the structural checks.
    ///
    /// Used by dry runs, which report every structural problem at once.
    ///
    /// # Errors
    ///
    /// Returns errors that prevent the graph from being built at all:
    /// duplicate task names, unknown targets, unresolvable references,
    /// artifact mismatches, undeclared needs and cycles.
    pub fn build_unvalidated(&self, dag: &DagTemplate) -> Result<Graph> {
        let definition = dag.definition();
        let graph_name = definition.name.as_str();

        let mut targets: IndexMap<&str, Arc<TemplateDefinition>> = IndexMap::new();
        for task in dag.tasks() {
            let target = Arc::clone(self.registry.definition(&task.template)?);
            if targets.insert(task.name(), target).is_some() {
                return Err(Error::DuplicateTaskName {
                    graph: graph_name.to_string(),
                    name: task.name().to_string(),
                });
            }
        }

        let ctx = ResolveContext::new(
            graph_name,
            dag.inputs_by_handle(),
            targets.iter().map(|(name, target)| (*name, &**target)),
        );

        let mut tasks = Vec::with_capacity(dag.tasks().len());
        for (task, target) in dag.tasks().iter().zip(targets.values()) {
            tasks.push(self.build_task(task, Arc::clone(target), definition, &targets, &ctx)?);
        }

        let outputs = dag
            .outputs()
            .iter()
            .map(|output| build_output(output, &ctx))
            .collect::<Result<Vec<_>>>()?;

        let mut graph = Graph {
            name: graph_name.to_string(),
            package: definition.package.clone(),
            inputs: definition.inputs.clone(),
            tasks,
            outputs,
            annotations: IndexMap::new(),
        };

        TaskGraph::from_tasks(graph.tasks.iter().map(|t| (t.name.as_str(), t.clone())))?
            .topological_sort()?;

        if dag.is_grouped() {
            self.annotate_group(&mut graph);
        }
        Ok(graph)
    }

    fn build_task(
        &self,
        task: &TaskDeclaration,
        target: Arc<TemplateDefinition>,
        graph: &TemplateDefinition,
        targets: &IndexMap<&str, Arc<TemplateDefinition>>,
        ctx: &ResolveContext<'_>,
    ) -> Result<TaskNode> {
        let mut arguments: Vec<TaskArgument> = Vec::with_capacity(task.arguments.len());
        for (name, raw) in &task.arguments {
            let site = Site {
                task: &task.name,
                argument: name,
            };
            let parameter = target.input(name).ok_or_else(|| Error::UnknownArgument {
                task: task.name.clone(),
                template: target.name.clone(),
                argument: name.clone(),
                valid: target.input_names(),
            })?;
            if arguments.iter().any(|arg| &arg.name == name) {
                return Err(Error::malformed(
                    format!("task '{}' argument '{name}'", task.name),
                    "argument is bound more than once",
                ));
            }
            let reference = bind(ctx.resolve(raw, site)?, parameter, site)?;
            arguments.push(TaskArgument {
                name: name.clone(),
                from: reference,
                sub_path: task.sub_paths.get(name).map(|p| rewrite_placeholders(p)),
            });
        }
        for argument in task.sub_paths.keys() {
            if !arguments.iter().any(|arg| &arg.name == argument) {
                warn!(
                    task = %task.name,
                    argument = %argument,
                    "Sub-path set for an argument that is not bound; ignoring it"
                );
            }
        }

        let loop_over = task
            .loop_over
            .as_ref()
            .map(|raw| resolve_loop(raw, &task.name, ctx))
            .transpose()?;
        if loop_over.is_none() {
            if let Some(arg) = arguments
                .iter()
                .find(|arg| matches!(arg.from, Reference::Item { .. }))
            {
                return Err(Error::malformed(
                    format!("task '{}' argument '{}'", task.name, arg.name),
                    "the loop item is only available to tasks that loop",
                ));
            }
        }

        let returns = task
            .returns
            .iter()
            .map(|ret| {
                let spec = target.output(&ret.output).ok_or_else(|| {
                    Error::malformed(
                        format!("returns of task '{}'", task.name),
                        format!("'{}' is not an output of '{}'", ret.output, target.name),
                    )
                })?;
                let path = ret
                    .path
                    .as_deref()
                    .map(str::trim)
                    .filter(|path| !path.is_empty());
                if spec.is_artifact() && path.is_none() {
                    return Err(Error::MissingReturnPath {
                        task: task.name.clone(),
                        output: ret.output.clone(),
                    });
                }
                if !spec.is_artifact() && path.is_some() {
                    debug!(task = %task.name, output = %ret.output, "Ignoring path of a parameter return");
                }
                Ok(TaskReturn {
                    name: spec.name().to_string(),
                    description: ret.description.clone(),
                    path: path
                        .filter(|_| spec.is_artifact())
                        .map(rewrite_placeholders),
                    artifact: spec.is_artifact(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut needs: Vec<String> = Vec::with_capacity(task.needs.len());
        for need in &task.needs {
            if !targets.contains_key(need.as_str()) {
                return Err(Error::malformed(
                    format!("needs of task '{}'", task.name),
                    format!("task '{need}' is not declared in '{}'", graph.name),
                ));
            }
            if !needs.contains(need) {
                needs.push(need.clone());
            }
        }
        let referenced: Vec<&str> = arguments
            .iter()
            .map(|arg| &arg.from)
            .chain(loop_over.as_ref())
            .filter_map(Reference::task_name)
            .collect();
        for producer in referenced {
            if needs.iter().any(|need| need == producer) {
                continue;
            }
            match self.policy {
                NeedsPolicy::Infer => {
                    debug!(task = %task.name, need = %producer, "Inferred need from reference");
                    needs.push(producer.to_string());
                }
                NeedsPolicy::Strict => {
                    return Err(Error::UndeclaredNeed {
                        task: task.name.clone(),
                        dependency: producer.to_string(),
                    });
                }
            }
        }

        Ok(TaskNode {
            name: task.name.clone(),
            template: template_label(&target, graph),
            arguments,
            returns,
            needs,
            loop_over,
            sub_folder: task.sub_folder.as_deref().map(rewrite_placeholders),
            annotations: task.annotations.clone(),
            target,
        })
    }

    fn annotate_group(&self, graph: &mut Graph) {
        graph
            .annotations
            .insert(GROUPED_ANNOTATION.to_string(), Value::Bool(true));
        if let Some(main) = graph.tasks.iter().find(|task| task.is_main_task()) {
            graph.annotations.insert(
                GROUP_MAIN_TASK_ANNOTATION.to_string(),
                Value::String(main.name.clone()),
            );
        }
        if self.warn_single_task_group && graph.tasks.len() == 1 {
            warn!(
                graph = %graph.name,
                "Grouped graph has a single task; grouping only helps when tasks share a folder"
            );
        }
    }
}

/// Label of a task's target as the engine sees it.
fn template_label(target: &TemplateDefinition, graph: &TemplateDefinition) -> String {
    match target.kind {
        TemplateKind::Function => format!("{}/{}", target.package.name, target.name),
        TemplateKind::Dag if target.package == graph.package => target.name.clone(),
        TemplateKind::Dag => target.package.name.clone(),
    }
}

fn resolve_loop(raw: &ArgValue, task: &str, ctx: &ResolveContext<'_>) -> Result<Reference> {
    let site = Site {
        task,
        argument: "loop",
    };
    let reference = file_as_parameter(ctx.resolve(raw, site)?);
    let location = format!("loop of task '{task}'");
    if let Reference::Value { value } = &reference {
        if !value.is_array() {
            return Err(Error::malformed(
                location,
                format!("a literal loop source must be a list, found {value}"),
            ));
        }
    }
    if matches!(reference, Reference::Item { .. }) {
        return Err(Error::malformed(
            location,
            "a task cannot loop over its own loop item",
        ));
    }
    if reference.is_artifact() {
        return Err(Error::ArtifactMismatch {
            task: task.to_string(),
            argument: "loop".to_string(),
            expected: "a list parameter".to_string(),
            found: reference.describe(),
        });
    }
    Ok(reference)
}

/// Read a task's file output as a parameter, e.g. a JSON list written to disk.
///
/// Only file outputs qualify; folders and paths stay artifacts.
fn file_as_parameter(reference: Reference) -> Reference {
    match reference {
        Reference::Task {
            name,
            variable,
            artifact: Some(ArtifactKind::File),
        } => {
            debug!(task = %name, output = %variable, "Reading file output as a parameter");
            Reference::Task {
                name,
                variable,
                artifact: None,
            }
        }
        other => other,
    }
}

fn build_output(output: &DagOutput, ctx: &ResolveContext<'_>) -> Result<GraphOutput> {
    let from = match &output.source {
        OutputSource::Task { task, output: name } => {
            let site = Site {
                task,
                argument: output.spec.name(),
            };
            let mut reference = ctx.task_output(task, name, site)?;
            if !output.spec.is_artifact() {
                reference = file_as_parameter(reference);
            }
            if reference.is_artifact() != output.spec.is_artifact() {
                return Err(Error::ArtifactMismatch {
                    task: ctx.graph().to_string(),
                    argument: output.spec.name().to_string(),
                    expected: format!("a {} output", output.spec.kind()),
                    found: reference.describe(),
                });
            }
            reference
        }
        OutputSource::Path(path) => Reference::ValueArtifact {
            kind: output
                .spec
                .kind()
                .artifact_kind()
                .unwrap_or(ArtifactKind::File),
            path: rewrite_placeholders(path),
        },
    };
    Ok(GraphOutput {
        spec: output.spec.clone(),
        from,
    })
}
