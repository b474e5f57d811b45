//! Compile an entry DAG into a pipeline.

use crate::assembler::{CompiledPipeline, PipelineAssembler};
use crate::builder::GraphBuilder;
use crate::collaborators::Publisher;
use crate::collector::DependencyCollector;
use crate::options::CompilerOptions;
use crate::package::{MetadataProvider, PackageMetadata};
use crate::registry::TemplateRegistry;
use crate::template::TemplateKey;
use crate::validator::GraphValidator;
use crate::{Error, Result};
use tracing::{info, instrument};

/// Compiles recipes registered in a [`TemplateRegistry`].
#[derive(Debug, Clone)]
pub struct Compiler<'a> {
    registry: &'a TemplateRegistry,
    options: CompilerOptions,
}

impl<'a> Compiler<'a> {
    /// Compiler for `registry` with `options`.
    #[must_use]
    pub const fn new(registry: &'a TemplateRegistry, options: CompilerOptions) -> Self {
        Self { registry, options }
    }

    /// Options in effect
    #[must_use]
    pub const fn options(&self) -> &CompilerOptions {
        &self.options
    }

    fn builder(&self) -> GraphBuilder<'a> {
        GraphBuilder::with_options(self.registry, &self.options)
    }

    /// Compile the DAG registered under `entry`.
    ///
    /// `metadata` describes the recipe package. When it is `None`, the
    /// provider is asked, and the entry DAG's package identity is used if the
    /// provider knows nothing either.
    ///
    /// # Errors
    ///
    /// Returns the first error found while building, collecting or
    /// assembling. Nothing is returned on failure.
    #[instrument(skip(self, provider, metadata), fields(entry = %entry))]
    pub fn compile(
        &self,
        entry: &TemplateKey,
        provider: &dyn MetadataProvider,
        metadata: Option<PackageMetadata>,
    ) -> Result<CompiledPipeline> {
        self.options.validate()?;
        let dag = self.registry.dag(entry)?;
        let builder = self.builder();
        let graph = dag.graph_with(&builder)?;
        let manifest = DependencyCollector::new(builder).collect(&graph)?;

        let metadata = match metadata {
            Some(metadata) => metadata,
            None => provider
                .metadata(dag.package())?
                .unwrap_or_else(|| PackageMetadata::from(dag.package())),
        };
        let pipeline = PipelineAssembler::new(&self.options, provider).assemble(
            &graph,
            &manifest,
            metadata,
        )?;
        pipeline.ensure_closed()?;

        info!(
            graphs = pipeline.flow.len(),
            dependencies = pipeline.dependencies.len(),
            "Compiled pipeline"
        );
        Ok(pipeline)
    }

    /// Report every structural problem of the DAG under `entry` without compiling it.
    ///
    /// # Errors
    ///
    /// Returns an error when the DAG cannot be resolved at all, for example
    /// when it references an unknown template or contains a cycle.
    pub fn dry_validate(&self, entry: &TemplateKey) -> Result<Vec<Error>> {
        let dag = self.registry.dag(entry)?;
        let graph = self.builder().build_unvalidated(dag)?;
        Ok(GraphValidator::new(&graph)
            .grouped(dag.is_grouped())
            .validate())
    }

    /// Compile `entry` and hand the result to `publisher`.
    ///
    /// # Errors
    ///
    /// Returns compilation errors, or the publisher's error.
    pub fn publish(
        &self,
        entry: &TemplateKey,
        provider: &dyn MetadataProvider,
        publisher: &dyn Publisher,
        description: &str,
    ) -> Result<CompiledPipeline> {
        let pipeline = self.compile(entry, provider, None)?;
        publisher.publish(&pipeline, description)?;
        info!(pipeline = %pipeline.metadata.name, "Published pipeline");
        Ok(pipeline)
    }
}
