//! Resolved argument references.
//!
//! Every task argument in a compiled graph says where its value comes from:
//! a literal, an input of the enclosing graph, an output of another task, or
//! the current loop item.

use crate::io::ArtifactKind;
use serde::Serialize;
use serde_json::Value;

/// Where an argument's value comes from.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Reference {
    /// A literal parameter value
    Value {
        /// The value, placeholders rewritten
        value: Value,
    },
    /// A literal artifact path
    ValueArtifact {
        /// File, folder or path
        kind: ArtifactKind,
        /// Source path
        path: String,
    },
    /// An input of the enclosing graph
    Input {
        /// Canonical input name
        variable: String,
        /// Set when the input is an artifact
        #[serde(skip_serializing_if = "Option::is_none")]
        artifact: Option<ArtifactKind>,
    },
    /// An output of another task in the same graph
    Task {
        /// Producing task
        name: String,
        /// Output of the producing task's template
        variable: String,
        /// Set when the output is an artifact
        #[serde(skip_serializing_if = "Option::is_none")]
        artifact: Option<ArtifactKind>,
    },
    /// The current item of the task's loop
    Item {
        /// Field of the item, or the whole item when unset
        #[serde(skip_serializing_if = "Option::is_none")]
        variable: Option<String>,
    },
}

impl Reference {
    /// Artifact kind carried by this reference. Loop items are never artifacts.
    #[must_use]
    pub const fn artifact_kind(&self) -> Option<ArtifactKind> {
        match self {
            Self::ValueArtifact { kind, .. } => Some(*kind),
            Self::Input { artifact, .. } | Self::Task { artifact, .. } => *artifact,
            Self::Value { .. } | Self::Item { .. } => None,
        }
    }

    /// True for references to files, folders and paths.
    #[must_use]
    pub const fn is_artifact(&self) -> bool {
        self.artifact_kind().is_some()
    }

    /// Producing task, for task-output references.
    #[must_use]
    pub fn task_name(&self) -> Option<&str> {
        match self {
            Self::Task { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Short description used in error messages.
    #[must_use]
    pub fn describe(&self) -> String {
        let artifact = self
            .artifact_kind()
            .map_or_else(|| "parameter".to_string(), |kind| kind.to_string());
        match self {
            Self::Value { .. } => "a literal value".to_string(),
            Self::ValueArtifact { kind, .. } => format!("a literal {kind} path"),
            Self::Input { variable, .. } => format!("{artifact} input '{variable}'"),
            Self::Task { name, variable, .. } => {
                format!("{artifact} output '{variable}' of task '{name}'")
            }
            Self::Item { .. } => "the loop item".to_string(),
        }
    }
}
