//! Compiler options.
//!
//! Options are plain data with defaults for every field, so an empty TOML
//! document is a valid configuration:
//!
//! ```toml
//! entry-point = "main"
//! dependency-source = "https://registry.example.com/packages"
//! needs-policy = "infer"
//! warn-single-task-group = true
//! ```

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How a task's `needs` relate to the tasks its arguments reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NeedsPolicy {
    /// Referenced tasks are added to `needs` automatically.
    #[default]
    Infer,
    /// Referencing a task missing from `needs` is an error.
    Strict,
}

/// Options controlling how recipes are compiled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct CompilerOptions {
    /// Name given to the entry graph in the compiled flow.
    pub entry_point: String,
    /// Source recorded on every external dependency.
    pub dependency_source: Option<String>,
    /// How implicit task dependencies are handled.
    pub needs_policy: NeedsPolicy,
    /// Warn when a grouped graph holds a single task.
    pub warn_single_task_group: bool,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            entry_point: "main".to_string(),
            dependency_source: None,
            needs_policy: NeedsPolicy::Infer,
            warn_single_task_group: true,
        }
    }
}

impl CompilerOptions {
    /// Parse options from a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] when the document is not valid TOML,
    /// has unknown keys, or names an empty entry point.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let options: Self = toml::from_str(source)
            .map_err(|e| Error::configuration(format!("invalid compiler options: {e}")))?;
        options.validate()?;
        Ok(options)
    }

    /// Read options from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] when the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path).map_err(|e| {
            Error::configuration(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&source)
    }

    /// Check option values.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] for an empty entry point.
    pub fn validate(&self) -> Result<()> {
        if self.entry_point.trim().is_empty() {
            return Err(Error::configuration("entry-point must not be empty"));
        }
        Ok(())
    }

    /// Set the entry point name.
    #[must_use]
    pub fn with_entry_point(mut self, name: impl Into<String>) -> Self {
        self.entry_point = name.into();
        self
    }

    /// Set the dependency source.
    #[must_use]
    pub fn with_dependency_source(mut self, source: impl Into<String>) -> Self {
        self.dependency_source = Some(source.into());
        self
    }

    /// Set the needs policy.
    #[must_use]
    pub const fn with_needs_policy(mut self, policy: NeedsPolicy) -> Self {
        self.needs_policy = policy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_document() {
        let options = CompilerOptions::from_toml_str("").unwrap();
        assert_eq!(options, CompilerOptions::default());
        assert_eq!(options.entry_point, "main");
        assert_eq!(options.needs_policy, NeedsPolicy::Infer);
        assert!(options.warn_single_task_group);
    }

    #[test]
    fn test_kebab_case_keys() {
        let options = CompilerOptions::from_toml_str(
            r#"
entry-point = "flow"
dependency-source = "https://registry.example.com"
needs-policy = "strict"
warn-single-task-group = false
"#,
        )
        .unwrap();
        assert_eq!(options.entry_point, "flow");
        assert_eq!(
            options.dependency_source.as_deref(),
            Some("https://registry.example.com")
        );
        assert_eq!(options.needs_policy, NeedsPolicy::Strict);
        assert!(!options.warn_single_task_group);
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let err = CompilerOptions::from_toml_str("entrypoint = \"x\"").unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
    }

    #[test]
    fn test_empty_entry_point_is_rejected() {
        let err = CompilerOptions::from_toml_str("entry-point = \"  \"").unwrap_err();
        assert!(err.to_string().contains("entry-point"));
    }
}
