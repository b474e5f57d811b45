//! DAG templates.
//!
//! A DAG declares inputs, tasks and outputs. Inputs are declared on the
//! builder and hand back an [`InputHandle`]; tasks bind their arguments to
//! handles, literals, other tasks' outputs or the loop item. Nothing is
//! resolved until the graph is built, so tasks may reference templates that
//! are registered later.

use crate::builder::GraphBuilder;
use crate::graph::Graph;
use crate::io::{InputSpec, OutputSpec};
use crate::naming::{param_name, template_name};
use crate::options::NeedsPolicy;
use crate::package::PackageId;
use crate::registry::TemplateRegistry;
use crate::template::{FunctionTemplate, TemplateDefinition, TemplateKey, TemplateKind};
use crate::Result;
use indexmap::IndexMap;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use tracing::debug;

static NEXT_BUILDER_ID: AtomicU64 = AtomicU64::new(1);

/// Handle to an input declared on a [`DagTemplateBuilder`].
///
/// A handle only resolves inside the DAG whose builder created it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InputHandle {
    owner: u64,
    index: usize,
}

/// Raw value bound to a task argument, resolved when the graph is built.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    /// A literal
    Value(Value),
    /// An input of the enclosing DAG
    Input(InputHandle),
    /// An output of another task in the same DAG
    TaskOutput {
        /// Producing task
        task: String,
        /// Output name
        output: String,
    },
    /// The loop item, or one of its fields
    LoopItem(Option<String>),
}

impl ArgValue {
    /// Output `output` of task `task`.
    pub fn task_output(task: impl Into<String>, output: impl Into<String>) -> Self {
        Self::TaskOutput {
            task: task.into(),
            output: output.into(),
        }
    }

    /// The whole loop item.
    #[must_use]
    pub const fn item() -> Self {
        Self::LoopItem(None)
    }

    /// A field of the loop item.
    pub fn item_field(field: impl Into<String>) -> Self {
        Self::LoopItem(Some(field.into()))
    }
}

impl From<InputHandle> for ArgValue {
    fn from(handle: InputHandle) -> Self {
        Self::Input(handle)
    }
}

impl From<Value> for ArgValue {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<&str> for ArgValue {
    fn from(value: &str) -> Self {
        Self::Value(Value::from(value))
    }
}

impl From<String> for ArgValue {
    fn from(value: String) -> Self {
        Self::Value(Value::from(value))
    }
}

impl From<i64> for ArgValue {
    fn from(value: i64) -> Self {
        Self::Value(Value::from(value))
    }
}

impl From<f64> for ArgValue {
    fn from(value: f64) -> Self {
        Self::Value(Value::from(value))
    }
}

impl From<bool> for ArgValue {
    fn from(value: bool) -> Self {
        Self::Value(Value::from(value))
    }
}

/// One output a task returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskReturnDecl {
    /// Output of the task's template
    pub output: String,
    /// Destination path, required for artifacts
    pub path: Option<String>,
    /// Description, if any
    pub description: Option<String>,
}

/// A task as declared on a DAG, before resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskDeclaration {
    pub(crate) name: String,
    pub(crate) template: TemplateKey,
    pub(crate) arguments: Vec<(String, ArgValue)>,
    pub(crate) returns: Vec<TaskReturnDecl>,
    pub(crate) needs: Vec<String>,
    pub(crate) loop_over: Option<ArgValue>,
    pub(crate) sub_folder: Option<String>,
    pub(crate) sub_paths: IndexMap<String, String>,
    pub(crate) annotations: IndexMap<String, Value>,
}

impl TaskDeclaration {
    /// A task named `name` running `template`. The name is canonicalized.
    pub fn new(name: impl AsRef<str>, template: impl Into<TemplateKey>) -> Self {
        Self {
            name: param_name(name.as_ref()),
            template: template.into(),
            arguments: Vec::new(),
            returns: Vec::new(),
            needs: Vec::new(),
            loop_over: None,
            sub_folder: None,
            sub_paths: IndexMap::new(),
            annotations: IndexMap::new(),
        }
    }

    /// Bind argument `name`.
    #[must_use]
    pub fn arg(mut self, name: impl AsRef<str>, value: impl Into<ArgValue>) -> Self {
        self.arguments.push((param_name(name.as_ref()), value.into()));
        self
    }

    /// Return a parameter output.
    #[must_use]
    pub fn returns(mut self, output: impl AsRef<str>) -> Self {
        self.returns.push(TaskReturnDecl {
            output: param_name(output.as_ref()),
            path: None,
            description: None,
        });
        self
    }

    /// Return an output and copy it to `path`.
    #[must_use]
    pub fn returns_to(mut self, output: impl AsRef<str>, path: impl Into<String>) -> Self {
        self.returns.push(TaskReturnDecl {
            output: param_name(output.as_ref()),
            path: Some(path.into()),
            description: None,
        });
        self
    }

    /// Add a full return declaration.
    #[must_use]
    pub fn returning(mut self, declaration: TaskReturnDecl) -> Self {
        self.returns.push(TaskReturnDecl {
            output: param_name(&declaration.output),
            ..declaration
        });
        self
    }

    /// Run after task `task`.
    #[must_use]
    pub fn needs(mut self, task: impl AsRef<str>) -> Self {
        self.needs.push(param_name(task.as_ref()));
        self
    }

    /// Run once per item of `value`.
    #[must_use]
    pub fn loop_over(mut self, value: impl Into<ArgValue>) -> Self {
        self.loop_over = Some(value.into());
        self
    }

    /// Run inside `folder` of the project.
    #[must_use]
    pub fn sub_folder(mut self, folder: impl Into<String>) -> Self {
        self.sub_folder = Some(folder.into());
        self
    }

    /// Read argument `argument` from `path` inside its source.
    #[must_use]
    pub fn sub_path(mut self, argument: impl AsRef<str>, path: impl Into<String>) -> Self {
        self.sub_paths.insert(param_name(argument.as_ref()), path.into());
        self
    }

    /// Attach an annotation.
    #[must_use]
    pub fn annotate(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.annotations.insert(key.into(), value.into());
        self
    }

    /// Mark this task as the main task of a grouped DAG.
    #[must_use]
    pub fn main_task(self) -> Self {
        self.annotate(crate::graph::MAIN_TASK_ANNOTATION, true)
    }

    /// Canonical task name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Where a DAG output takes its value from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputSource {
    /// An output of one of the DAG's tasks
    Task {
        /// Producing task
        task: String,
        /// Output name
        output: String,
    },
    /// A path inside the DAG's run folder
    Path(String),
}

impl OutputSource {
    /// Output `output` of task `task`.
    pub fn task(task: impl AsRef<str>, output: impl AsRef<str>) -> Self {
        Self::Task {
            task: param_name(task.as_ref()),
            output: param_name(output.as_ref()),
        }
    }

    /// A run-folder path.
    pub fn path(path: impl Into<String>) -> Self {
        Self::Path(path.into())
    }
}

/// A declared DAG output and its source.
#[derive(Debug, Clone, PartialEq)]
pub struct DagOutput {
    /// The output
    pub spec: OutputSpec,
    /// Where its value comes from
    pub source: OutputSource,
}

/// A built graph and the id of the registry it was resolved against.
type CachedGraph = (u64, Arc<Graph>);

/// Built graphs, one slot per needs policy.
#[derive(Debug, Default)]
struct GraphCache {
    infer: OnceLock<CachedGraph>,
    strict: OnceLock<CachedGraph>,
}

impl GraphCache {
    const fn slot(&self, policy: NeedsPolicy) -> &OnceLock<CachedGraph> {
        match policy {
            NeedsPolicy::Infer => &self.infer,
            NeedsPolicy::Strict => &self.strict,
        }
    }
}

/// A DAG: inputs, tasks and outputs.
#[derive(Debug)]
pub struct DagTemplate {
    definition: Arc<TemplateDefinition>,
    handles: Vec<InputHandle>,
    tasks: Vec<TaskDeclaration>,
    outputs: Vec<DagOutput>,
    grouped: bool,
    cache: GraphCache,
}

impl DagTemplate {
    /// Start building a DAG in `package`.
    pub fn builder(name: impl AsRef<str>, package: PackageId) -> DagTemplateBuilder {
        DagTemplateBuilder {
            id: NEXT_BUILDER_ID.fetch_add(1, Ordering::Relaxed),
            name: template_name(name.as_ref()),
            package,
            description: None,
            inputs: Vec::new(),
            tasks: Vec::new(),
            outputs: Vec::new(),
            grouped: false,
        }
    }

    /// Shared interface
    #[must_use]
    pub fn definition(&self) -> &Arc<TemplateDefinition> {
        &self.definition
    }

    /// Registry key
    #[must_use]
    pub fn key(&self) -> TemplateKey {
        self.definition.key()
    }

    /// Declaring package
    #[must_use]
    pub fn package(&self) -> &PackageId {
        &self.definition.package
    }

    /// Declared tasks in declaration order
    #[must_use]
    pub fn tasks(&self) -> &[TaskDeclaration] {
        &self.tasks
    }

    /// Declared outputs
    #[must_use]
    pub fn outputs(&self) -> &[DagOutput] {
        &self.outputs
    }

    /// True when the DAG runs as one group of tasks
    #[must_use]
    pub const fn is_grouped(&self) -> bool {
        self.grouped
    }

    /// Inputs paired with the handles that reference them.
    pub(crate) fn inputs_by_handle(&self) -> impl Iterator<Item = (InputHandle, &InputSpec)> {
        self.handles.iter().copied().zip(self.definition.inputs.iter())
    }

    /// The compiled graph of this DAG, built with the default needs policy.
    ///
    /// # Errors
    ///
    /// Returns the first error found while resolving or validating the DAG.
    pub fn graph(&self, registry: &TemplateRegistry) -> Result<Arc<Graph>> {
        self.graph_with(&GraphBuilder::new(registry))
    }

    /// The compiled graph of this DAG, built by `builder`.
    ///
    /// Built at most once per needs policy, and only reused for the registry
    /// that first built it; a builder over any other registry gets a fresh,
    /// uncached graph. The single-task-group warning does not change the
    /// graph and is not part of the cache key. Failed builds are not cached.
    ///
    /// # Errors
    ///
    /// Returns the first error found while resolving or validating the DAG.
    pub fn graph_with(&self, builder: &GraphBuilder<'_>) -> Result<Arc<Graph>> {
        let registry = builder.registry().id();
        let slot = self.cache.slot(builder.policy());
        if let Some((owner, graph)) = slot.get() {
            if *owner == registry {
                return Ok(Arc::clone(graph));
            }
            debug!(dag = %self.definition.name, "Cached graph belongs to another registry; rebuilding");
            return builder.build(self).map(Arc::new);
        }

        let graph = Arc::new(builder.build(self)?);
        debug!(dag = %self.definition.name, tasks = graph.tasks.len(), "Built DAG graph");
        let (owner, cached) = slot.get_or_init(|| (registry, Arc::clone(&graph)));
        Ok(if *owner == registry {
            Arc::clone(cached)
        } else {
            graph
        })
    }
}

/// Builder for [`DagTemplate`].
#[derive(Debug)]
pub struct DagTemplateBuilder {
    id: u64,
    name: String,
    package: PackageId,
    description: Option<String>,
    inputs: Vec<InputSpec>,
    tasks: Vec<TaskDeclaration>,
    outputs: Vec<DagOutput>,
    grouped: bool,
}

impl DagTemplateBuilder {
    /// Declare an input and get a handle to bind it.
    pub fn input(&mut self, input: InputSpec) -> InputHandle {
        self.inputs.push(input);
        InputHandle {
            owner: self.id,
            index: self.inputs.len() - 1,
        }
    }

    /// Declare a task.
    pub fn task(&mut self, task: TaskDeclaration) -> &mut Self {
        self.tasks.push(task);
        self
    }

    /// Declare an output.
    pub fn output(&mut self, spec: OutputSpec, source: OutputSource) -> &mut Self {
        self.outputs.push(DagOutput { spec, source });
        self
    }

    /// Run all tasks of this DAG as one group.
    pub fn grouped(&mut self) -> &mut Self {
        self.grouped = true;
        self
    }

    /// Set a description.
    pub fn description(&mut self, description: impl Into<String>) -> &mut Self {
        self.description = Some(description.into());
        self
    }

    /// Finish the DAG. Tasks are resolved later, when the graph is built.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::DuplicateInputName`] or
    /// [`crate::Error::InvalidDefault`] for malformed inputs and outputs.
    pub fn build(self) -> Result<DagTemplate> {
        let handles = (0..self.inputs.len())
            .map(|index| InputHandle {
                owner: self.id,
                index,
            })
            .collect();
        let definition = TemplateDefinition {
            name: self.name,
            kind: TemplateKind::Dag,
            package: self.package,
            description: self.description,
            inputs: self.inputs,
            outputs: self.outputs.iter().map(|output| output.spec.clone()).collect(),
        };
        definition.check_io()?;

        Ok(DagTemplate {
            definition: Arc::new(definition),
            handles,
            tasks: self.tasks,
            outputs: self.outputs,
            grouped: self.grouped,
            cache: GraphCache::default(),
        })
    }
}

impl From<&FunctionTemplate> for TemplateKey {
    fn from(function: &FunctionTemplate) -> Self {
        function.key()
    }
}

impl From<&DagTemplate> for TemplateKey {
    fn from(dag: &DagTemplate) -> Self {
        dag.key()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    fn package() -> PackageId {
        PackageId::new("daylight", "0.3.0")
    }

    #[test]
    fn test_handles_are_scoped_to_their_builder() {
        let mut first = DagTemplate::builder("First", package());
        let mut second = DagTemplate::builder("Second", package());
        let a = first.input(InputSpec::string("name"));
        let b = second.input(InputSpec::string("name"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_declaration_names_are_canonical() {
        let task = TaskDeclaration::new("split_grid", TemplateKey::new("pkg", "SplitGrid"))
            .arg("grid_count", 3_i64)
            .needs("create_octree")
            .sub_path("input_grid", "grids/a.pts");

        assert_eq!(task.name(), "split-grid");
        assert_eq!(task.template.name, "split-grid");
        assert_eq!(task.arguments[0].0, "grid-count");
        assert_eq!(task.needs, vec!["create-octree".to_string()]);
        assert!(task.sub_paths.contains_key("input-grid"));
    }

    #[test]
    fn test_main_task_annotation() {
        let task = TaskDeclaration::new("run", TemplateKey::new("pkg", "run")).main_task();
        assert_eq!(task.annotations.get("main_task"), Some(&Value::Bool(true)));
    }

    #[test]
    fn test_duplicate_dag_inputs_rejected() {
        let mut builder = DagTemplate::builder("Dup", package());
        builder.input(InputSpec::string("model"));
        builder.input(InputSpec::string("model"));
        assert!(matches!(builder.build(), Err(Error::DuplicateInputName { .. })));
    }

    #[test]
    fn test_dag_definition_exposes_outputs() {
        let mut builder = DagTemplate::builder("Collect", package());
        builder.output(OutputSpec::folder("results"), OutputSource::path("results"));
        let dag = builder.build().unwrap();
        assert_eq!(dag.definition().kind, TemplateKind::Dag);
        assert_eq!(dag.definition().outputs[0].name(), "results");
    }
}
