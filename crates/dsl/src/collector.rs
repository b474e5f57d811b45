//! Collect what a compiled graph depends on.
//!
//! Functions are always external: their packages become plugin
//! dependencies. DAGs from another package become recipe dependencies. DAGs
//! from the graph's own package are compiled into the same flow, so the
//! collector builds them and walks into them too.

use crate::builder::GraphBuilder;
use crate::graph::Graph;
use crate::package::PackageId;
use crate::template::{TemplateKey, TemplateKind};
use crate::{Error, Result};
use indexmap::{IndexMap, IndexSet};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Everything a graph depends on, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DependencyManifest {
    /// Packages of the functions the graph runs
    pub plugins: IndexSet<PackageId>,
    /// Packages of the external DAGs the graph runs
    pub recipes: IndexSet<PackageId>,
    /// Same-package DAGs, compiled, keyed by name
    pub dags: IndexMap<String, Arc<Graph>>,
}

impl DependencyManifest {
    /// True when the graph has no dependencies at all
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty() && self.recipes.is_empty() && self.dags.is_empty()
    }
}

/// Walks a graph and the same-package DAGs it runs.
#[derive(Debug, Clone, Copy)]
pub struct DependencyCollector<'a> {
    builder: GraphBuilder<'a>,
}

impl<'a> DependencyCollector<'a> {
    /// Collector that builds nested DAGs with `builder`.
    #[must_use]
    pub const fn new(builder: GraphBuilder<'a>) -> Self {
        Self { builder }
    }

    /// Collect the dependencies of `graph`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CyclicDependency`] when same-package DAGs reference
    /// each other in a cycle, or any error raised while building a nested DAG.
    #[instrument(skip(self, graph), fields(graph = %graph.name))]
    pub fn collect(&self, graph: &Graph) -> Result<DependencyManifest> {
        let mut manifest = DependencyManifest::default();
        let mut stack = vec![graph.key()];
        self.visit(graph, &mut stack, &mut manifest)?;
        debug!(
            plugins = manifest.plugins.len(),
            recipes = manifest.recipes.len(),
            dags = manifest.dags.len(),
            "Collected dependencies"
        );
        Ok(manifest)
    }

    fn visit(
        &self,
        graph: &Graph,
        stack: &mut Vec<TemplateKey>,
        manifest: &mut DependencyManifest,
    ) -> Result<()> {
        for task in &graph.tasks {
            let target = &task.target;
            match target.kind {
                TemplateKind::Function => {
                    manifest.plugins.insert(target.package.clone());
                }
                TemplateKind::Dag if target.package != graph.package => {
                    manifest.recipes.insert(target.package.clone());
                }
                TemplateKind::Dag => {
                    let key = target.key();
                    if let Some(start) = stack.iter().position(|k| *k == key) {
                        let path = stack[start..]
                            .iter()
                            .map(|k| k.name.as_str())
                            .chain(std::iter::once(key.name.as_str()))
                            .collect::<Vec<_>>()
                            .join(" -> ");
                        return Err(Error::CyclicDependency { path });
                    }
                    if manifest.dags.contains_key(&key.name) {
                        continue;
                    }

                    let nested = self
                        .builder
                        .registry()
                        .dag(&key)?
                        .graph_with(&self.builder)?;
                    manifest.dags.insert(key.name.clone(), Arc::clone(&nested));
                    stack.push(key);
                    self.visit(&nested, stack, manifest)?;
                    stack.pop();
                }
            }
        }
        Ok(())
    }
}
