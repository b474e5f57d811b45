//! Assemble the final pipeline document.

use crate::collector::DependencyManifest;
use crate::graph::Graph;
use crate::options::CompilerOptions;
use crate::package::{MetadataProvider, PackageId, PackageMetadata};
use crate::template::TemplateKind;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, warn};

/// Whether a dependency provides functions or DAGs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyKind {
    /// A package of functions
    Plugin,
    /// A package of DAGs
    Recipe,
}

/// An external package the pipeline needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    /// Plugin or recipe
    pub kind: DependencyKind,
    /// Package name
    pub name: String,
    /// Version tag
    pub tag: String,
    /// Where the package is fetched from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// A compiled pipeline: metadata, external dependencies and the flow of graphs.
///
/// The first graph of the flow is the entry graph.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledPipeline {
    /// Metadata of the recipe package
    pub metadata: PackageMetadata,
    /// External packages, plugins first
    pub dependencies: Vec<Dependency>,
    /// Entry graph followed by every same-package DAG it runs
    pub flow: Vec<Graph>,
}

impl CompiledPipeline {
    /// The entry graph.
    #[must_use]
    pub fn entry(&self) -> Option<&Graph> {
        self.flow.first()
    }

    /// Look up a graph of the flow by name.
    #[must_use]
    pub fn graph(&self, name: &str) -> Option<&Graph> {
        self.flow.iter().find(|graph| graph.name == name)
    }

    /// Look up a dependency by package name.
    #[must_use]
    pub fn dependency(&self, name: &str) -> Option<&Dependency> {
        self.dependencies.iter().find(|dep| dep.name == name)
    }

    /// Check that every task target is either a graph of the flow or a listed dependency.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTemplate`] for the first target that is neither.
    pub fn ensure_closed(&self) -> Result<()> {
        let graphs: HashSet<&str> = self.flow.iter().map(|graph| graph.name.as_str()).collect();
        let packages: HashSet<(DependencyKind, &str)> = self
            .dependencies
            .iter()
            .map(|dep| (dep.kind, dep.name.as_str()))
            .collect();

        for graph in &self.flow {
            for task in &graph.tasks {
                let target = &task.target;
                let found = match target.kind {
                    TemplateKind::Function => {
                        packages.contains(&(DependencyKind::Plugin, target.package.name.as_str()))
                    }
                    TemplateKind::Dag if target.package == graph.package => {
                        graphs.contains(target.name.as_str())
                    }
                    TemplateKind::Dag => {
                        packages.contains(&(DependencyKind::Recipe, target.package.name.as_str()))
                    }
                };
                if !found {
                    return Err(Error::invalid_template(
                        &task.template,
                        format!(
                            "task '{}' of '{}' runs a template missing from the pipeline",
                            task.name, graph.name
                        ),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Pretty JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serialization`] if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::serialization(e.to_string()))
    }

    /// YAML document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serialization`] if serialization fails.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| Error::serialization(e.to_string()))
    }
}

/// Builds a [`CompiledPipeline`] from an entry graph and its dependencies.
pub struct PipelineAssembler<'a> {
    options: &'a CompilerOptions,
    provider: &'a dyn MetadataProvider,
}

impl<'a> PipelineAssembler<'a> {
    /// Assembler using `options` and looking dependency tags up in `provider`.
    #[must_use]
    pub fn new(options: &'a CompilerOptions, provider: &'a dyn MetadataProvider) -> Self {
        Self { options, provider }
    }

    /// Assemble the pipeline. The entry graph is renamed to the configured entry point.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTemplate`] when a same-package DAG is named
    /// like the entry point, or any error raised by the metadata provider.
    pub fn assemble(
        &self,
        entry: &Graph,
        manifest: &DependencyManifest,
        metadata: PackageMetadata,
    ) -> Result<CompiledPipeline> {
        let entry_point = self.options.entry_point.as_str();
        if let Some(clash) = manifest.dags.keys().find(|name| name.as_str() == entry_point) {
            return Err(Error::invalid_template(
                clash,
                format!("a nested DAG cannot share the entry point name '{entry_point}'"),
            ));
        }

        let mut flow = Vec::with_capacity(manifest.dags.len() + 1);
        flow.push(entry.renamed(entry_point));
        flow.extend(manifest.dags.values().map(|graph| graph.as_ref().clone()));

        let mut dependencies = Vec::with_capacity(manifest.plugins.len() + manifest.recipes.len());
        for package in &manifest.plugins {
            dependencies.push(self.dependency(DependencyKind::Plugin, package)?);
        }
        for package in &manifest.recipes {
            dependencies.push(self.dependency(DependencyKind::Recipe, package)?);
        }

        debug!(
            graphs = flow.len(),
            dependencies = dependencies.len(),
            "Assembled pipeline"
        );
        Ok(CompiledPipeline {
            metadata,
            dependencies,
            flow,
        })
    }

    fn dependency(&self, kind: DependencyKind, package: &PackageId) -> Result<Dependency> {
        let tag = match self.provider.metadata(package)? {
            Some(metadata) => metadata.tag,
            None => {
                warn!(
                    package = %package.name,
                    tag = %package.tag,
                    "No published metadata for dependency; using the declared tag"
                );
                package.tag.clone()
            }
        };
        Ok(Dependency {
            kind,
            name: package.name.clone(),
            tag,
            source: self.options.dependency_source.clone(),
        })
    }
}
