//! Declare workflow recipes and compile them into validated task graphs.
//!
//! A recipe is built from two kinds of templates:
//!
//! - [`FunctionTemplate`]: one command with typed inputs and outputs
//! - [`DagTemplate`]: tasks that run functions or other DAGs, wired together
//!   through inputs, task outputs and loop items
//!
//! Templates are registered in a [`TemplateRegistry`]. The [`Compiler`]
//! resolves the entry DAG into a [`Graph`], collects the plugins, recipes
//! and nested DAGs it depends on, and assembles a [`CompiledPipeline`] ready
//! to publish or run.
//!
//! # Example
//!
//! ```ignore
//! use honeycomb_dsl::*;
//!
//! let package = PackageId::new("honeycomb-math", "0.1.0");
//! let double = FunctionTemplate::builder("DoubleNumber", package.clone())
//!     .input(InputSpec::integer("input_value"))
//!     .output(OutputSpec::integer("result").with_path("output.txt"))
//!     .command("echo $(( {{self.input_value}} * 2 )) > output.txt")
//!     .build()?;
//!
//! let mut dag = DagTemplate::builder("DoubleTwice", package);
//! let value = dag.input(InputSpec::integer("value"));
//! dag.task(TaskDeclaration::new("first", &double).arg("input_value", value).returns("result"));
//! dag.task(
//!     TaskDeclaration::new("second", &double)
//!         .arg("input_value", ArgValue::task_output("first", "result"))
//!         .returns("result"),
//! );
//!
//! let mut registry = TemplateRegistry::new();
//! registry.register_function(double)?;
//! let entry = registry.register_dag(dag.build()?)?;
//!
//! let pipeline = Compiler::new(&registry, CompilerOptions::default())
//!     .compile(&entry, &StaticMetadataProvider::new(), None)?;
//! println!("{}", pipeline.to_yaml()?);
//! ```

pub mod alias;
pub mod assembler;
pub mod builder;
pub mod collaborators;
pub mod collector;
pub mod compiler;
pub mod dag;
mod error;
pub mod graph;
pub mod io;
pub mod naming;
pub mod options;
pub mod package;
pub mod reference;
pub mod registry;
pub mod resolver;
pub mod template;
pub mod validator;

pub use alias::{AliasHandler, IoAlias};
pub use assembler::{CompiledPipeline, Dependency, DependencyKind, PipelineAssembler};
pub use builder::GraphBuilder;
pub use collaborators::{ExecutionEngine, ExecutionReport, Publisher, TaskOutcome};
pub use collector::{DependencyCollector, DependencyManifest};
pub use compiler::Compiler;
pub use dag::{
    ArgValue, DagOutput, DagTemplate, DagTemplateBuilder, InputHandle, OutputSource,
    TaskDeclaration, TaskReturnDecl,
};
pub use error::{Error, Result};
pub use graph::{Graph, GraphOutput, TaskArgument, TaskNode, TaskReturn};
pub use io::{ArtifactKind, InputSpec, IoKind, OutputSpec};
pub use options::{CompilerOptions, NeedsPolicy};
pub use package::{MetadataProvider, PackageId, PackageMetadata, StaticMetadataProvider};
pub use reference::Reference;
pub use registry::{RegistryEntry, TemplateRegistry};
pub use template::{
    FunctionBody, FunctionTemplate, FunctionTemplateBuilder, TemplateDefinition, TemplateKey,
    TemplateKind,
};
pub use validator::GraphValidator;
