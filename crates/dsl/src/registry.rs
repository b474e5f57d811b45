//! Registry of functions and DAGs.

use crate::dag::DagTemplate;
use crate::template::{FunctionTemplate, TemplateDefinition, TemplateKey, TemplateKind};
use crate::{Error, Result};
use indexmap::IndexMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

static NEXT_REGISTRY_ID: AtomicU64 = AtomicU64::new(1);

/// A registered template.
#[derive(Debug, Clone)]
pub enum RegistryEntry {
    /// A function
    Function(Arc<FunctionTemplate>),
    /// A DAG
    Dag(Arc<DagTemplate>),
}

impl RegistryEntry {
    /// Shared interface of the template
    #[must_use]
    pub fn definition(&self) -> &Arc<TemplateDefinition> {
        match self {
            Self::Function(function) => function.definition(),
            Self::Dag(dag) => dag.definition(),
        }
    }

    /// Function or DAG
    #[must_use]
    pub fn kind(&self) -> TemplateKind {
        self.definition().kind
    }
}

/// Every template a recipe can reference, keyed by package and name.
///
/// Entries are never replaced once registered. Each registry, clones
/// included, carries its own id so graphs cached on a DAG are only reused
/// with the registry they were resolved against.
#[derive(Debug)]
pub struct TemplateRegistry {
    id: u64,
    entries: IndexMap<TemplateKey, RegistryEntry>,
}

impl Default for TemplateRegistry {
    fn default() -> Self {
        Self::with_entries(IndexMap::new())
    }
}

impl Clone for TemplateRegistry {
    fn clone(&self) -> Self {
        Self::with_entries(self.entries.clone())
    }
}

impl TemplateRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn with_entries(entries: IndexMap<TemplateKey, RegistryEntry>) -> Self {
        Self {
            id: NEXT_REGISTRY_ID.fetch_add(1, Ordering::Relaxed),
            entries,
        }
    }

    /// Identity of this registry instance
    pub(crate) const fn id(&self) -> u64 {
        self.id
    }

    /// Register a function.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTemplate`] if the key is already taken.
    pub fn register_function(&mut self, function: FunctionTemplate) -> Result<TemplateKey> {
        self.insert(RegistryEntry::Function(Arc::new(function)))
    }

    /// Register a DAG.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTemplate`] if the key is already taken.
    pub fn register_dag(&mut self, dag: DagTemplate) -> Result<TemplateKey> {
        self.insert(RegistryEntry::Dag(Arc::new(dag)))
    }

    fn insert(&mut self, entry: RegistryEntry) -> Result<TemplateKey> {
        let key = entry.definition().key();
        if self.entries.contains_key(&key) {
            return Err(Error::invalid_template(
                key.to_string(),
                "a template with this name is already registered in the package",
            ));
        }
        debug!(template = %key, kind = ?entry.kind(), "Registered template");
        self.entries.insert(key.clone(), entry);
        Ok(key)
    }

    /// Look up a template.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTemplate`] if nothing is registered under `key`.
    pub fn get(&self, key: &TemplateKey) -> Result<&RegistryEntry> {
        self.entries.get(key).ok_or_else(|| {
            Error::invalid_template(key.to_string(), "not a registered function or DAG")
        })
    }

    /// Interface of a registered template.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTemplate`] if nothing is registered under `key`.
    pub fn definition(&self, key: &TemplateKey) -> Result<&Arc<TemplateDefinition>> {
        self.get(key).map(RegistryEntry::definition)
    }

    /// Look up a DAG.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTemplate`] if `key` is unknown or names a function.
    pub fn dag(&self, key: &TemplateKey) -> Result<&Arc<DagTemplate>> {
        match self.get(key)? {
            RegistryEntry::Dag(dag) => Ok(dag),
            RegistryEntry::Function(_) => Err(Error::invalid_template(
                key.to_string(),
                "expected a DAG but found a function",
            )),
        }
    }

    /// Number of registered templates
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nothing is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered keys in registration order
    pub fn keys(&self) -> impl Iterator<Item = &TemplateKey> {
        self.entries.keys()
    }
}
