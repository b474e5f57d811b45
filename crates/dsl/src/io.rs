//! Typed inputs and outputs of functions and DAGs.
//!
//! A template's parameters are either plain values (strings, numbers, lists
//! and so on) or artifacts (files, folders, paths) that the engine moves
//! between task folders. The two are never interchangeable.

use crate::alias::IoAlias;
use crate::naming::{param_name, rewrite_placeholders};
use crate::{Error, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Kind of an input or output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IoKind {
    /// Any JSON value
    Generic,
    /// A string
    String,
    /// An integer
    Integer,
    /// A floating point number
    Number,
    /// A boolean
    Boolean,
    /// A JSON object
    Dict,
    /// A JSON array
    List,
    /// A file artifact
    File,
    /// A folder artifact
    Folder,
    /// A file or folder artifact
    Path,
    /// A value tied to an object of a client application. Only aliases use it.
    Linked,
}

impl IoKind {
    /// The artifact kind, if this is an artifact.
    #[must_use]
    pub const fn artifact_kind(self) -> Option<ArtifactKind> {
        match self {
            Self::File => Some(ArtifactKind::File),
            Self::Folder => Some(ArtifactKind::Folder),
            Self::Path => Some(ArtifactKind::Path),
            _ => None,
        }
    }

    /// True for files, folders and paths.
    #[must_use]
    pub const fn is_artifact(self) -> bool {
        self.artifact_kind().is_some()
    }

    /// Lowercase name of this kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Generic => "generic",
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Dict => "dict",
            Self::List => "list",
            Self::File => "file",
            Self::Folder => "folder",
            Self::Path => "path",
            Self::Linked => "linked",
        }
    }

    pub(crate) fn accepts(self, value: &Value) -> bool {
        match self {
            Self::Generic => true,
            Self::String | Self::File | Self::Folder | Self::Path | Self::Linked => {
                value.is_string()
            }
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::Dict => value.is_object(),
            Self::List => value.is_array(),
        }
    }
}

impl fmt::Display for IoKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    /// A single file
    File,
    /// A folder
    Folder,
    /// Either a file or a folder
    Path,
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File => f.write_str("file"),
            Self::Folder => f.write_str("folder"),
            Self::Path => f.write_str("path"),
        }
    }
}

/// A declared input of a function or DAG.
///
/// Immutable once the owning template is built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InputSpec {
    name: String,
    kind: IoKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    default: Option<Value>,
    required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<String>,
    #[serde(rename = "spec", skip_serializing_if = "Option::is_none")]
    schema: Option<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    extensions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    items_type: Option<IoKind>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    alias: Vec<IoAlias>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    annotations: IndexMap<String, Value>,
}

impl InputSpec {
    /// Create an input. The name is canonicalized.
    pub fn new(name: impl AsRef<str>, kind: IoKind) -> Self {
        Self {
            name: param_name(name.as_ref()),
            kind,
            description: None,
            default: None,
            required: true,
            path: None,
            schema: None,
            extensions: Vec::new(),
            items_type: None,
            alias: Vec::new(),
            annotations: IndexMap::new(),
        }
    }

    /// A string input
    pub fn string(name: impl AsRef<str>) -> Self {
        Self::new(name, IoKind::String)
    }

    /// An integer input
    pub fn integer(name: impl AsRef<str>) -> Self {
        Self::new(name, IoKind::Integer)
    }

    /// A number input
    pub fn number(name: impl AsRef<str>) -> Self {
        Self::new(name, IoKind::Number)
    }

    /// A boolean input
    pub fn boolean(name: impl AsRef<str>) -> Self {
        Self::new(name, IoKind::Boolean)
    }

    /// A dictionary input
    pub fn dict(name: impl AsRef<str>) -> Self {
        Self::new(name, IoKind::Dict)
    }

    /// A list input
    pub fn list(name: impl AsRef<str>) -> Self {
        Self::new(name, IoKind::List)
    }

    /// A file input
    pub fn file(name: impl AsRef<str>) -> Self {
        Self::new(name, IoKind::File)
    }

    /// A folder input
    pub fn folder(name: impl AsRef<str>) -> Self {
        Self::new(name, IoKind::Folder)
    }

    /// A file-or-folder input
    pub fn path(name: impl AsRef<str>) -> Self {
        Self::new(name, IoKind::Path)
    }

    /// Set a default. An input with a default is not required.
    #[must_use]
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self.required = false;
        self
    }

    /// Mark the input optional without giving it a default.
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Set a description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Where a function copies this artifact inside its run folder.
    #[must_use]
    pub fn with_path(mut self, path: impl AsRef<str>) -> Self {
        self.path = Some(rewrite_placeholders(path.as_ref()));
        self
    }

    /// Attach an annotation.
    #[must_use]
    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.annotations.insert(key.into(), value.into());
        self
    }

    /// JSON schema that values of this input must satisfy.
    #[must_use]
    pub fn with_schema(mut self, schema: Value) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Accepted file extensions, for file and path inputs. A leading dot is dropped.
    #[must_use]
    pub fn with_extensions<E: AsRef<str>>(mut self, extensions: impl IntoIterator<Item = E>) -> Self {
        self.extensions = extensions
            .into_iter()
            .map(|ext| ext.as_ref().trim().trim_start_matches('.').to_string())
            .collect();
        self
    }

    /// Kind of every item, for list inputs.
    #[must_use]
    pub const fn with_items_type(mut self, kind: IoKind) -> Self {
        self.items_type = Some(kind);
        self
    }

    /// Add a client platform alias.
    #[must_use]
    pub fn with_alias(mut self, alias: IoAlias) -> Self {
        self.alias.push(alias);
        self
    }

    /// Canonical name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared kind
    #[must_use]
    pub const fn kind(&self) -> IoKind {
        self.kind
    }

    /// JSON schema, if any
    #[must_use]
    pub const fn schema(&self) -> Option<&Value> {
        self.schema.as_ref()
    }

    /// Accepted file extensions, without the dot
    #[must_use]
    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    /// Item kind of a list input
    #[must_use]
    pub const fn items_type(&self) -> Option<IoKind> {
        self.items_type
    }

    /// Client platform aliases
    #[must_use]
    pub fn aliases(&self) -> &[IoAlias] {
        &self.alias
    }

    /// Default value, if any
    #[must_use]
    pub const fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    /// True when neither a default nor `optional()` was given.
    #[must_use]
    pub const fn is_required(&self) -> bool {
        self.required
    }

    /// True for file, folder and path inputs.
    #[must_use]
    pub const fn is_artifact(&self) -> bool {
        self.kind.is_artifact()
    }

    /// Run-folder path for artifact inputs of a function
    #[must_use]
    pub fn target_path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Description, if any
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Check the declaration and its default value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidIo`] for a linked input, a schema that is not
    /// an object, extensions on something other than a file or path, or an
    /// item kind on something other than a list. Returns
    /// [`Error::InvalidDefault`] when the default does not fit the kind, the
    /// item kind or the extensions. Artifact defaults must be path strings.
    pub fn validate(&self) -> Result<()> {
        check_declaration(&self.name, self.kind, self.items_type, &self.alias)?;
        if self.schema.as_ref().is_some_and(|schema| !schema.is_object()) {
            return Err(Error::invalid_io(&self.name, "a schema must be a JSON object"));
        }
        if !self.extensions.is_empty() && !matches!(self.kind, IoKind::File | IoKind::Path) {
            return Err(Error::invalid_io(
                &self.name,
                format!("extensions only apply to file and path inputs, not {}", self.kind),
            ));
        }

        let Some(default) = &self.default else {
            return Ok(());
        };
        let invalid = |reason: String| Error::InvalidDefault {
            name: self.name.clone(),
            reason,
        };
        if !self.kind.accepts(default) {
            return Err(invalid(if self.kind.is_artifact() {
                format!("a {} default must be a path string", self.kind)
            } else {
                format!("expected a {} value, found {default}", self.kind)
            }));
        }
        if let (Some(items), Some(list)) = (self.items_type, default.as_array()) {
            if let Some(item) = list.iter().find(|item| !items.accepts(item)) {
                return Err(invalid(format!("expected {items} items, found {item}")));
            }
        }
        if let (false, Some(path)) = (self.extensions.is_empty(), default.as_str()) {
            let lower = path.to_lowercase();
            if !self
                .extensions
                .iter()
                .any(|ext| lower.ends_with(&format!(".{}", ext.to_lowercase())))
            {
                return Err(invalid(format!(
                    "'{path}' does not have one of the extensions {}",
                    self.extensions.join(", ")
                )));
            }
        }
        Ok(())
    }
}

/// Checks shared by inputs and outputs.
fn check_declaration(
    name: &str,
    kind: IoKind,
    items_type: Option<IoKind>,
    aliases: &[IoAlias],
) -> Result<()> {
    if kind == IoKind::Linked {
        return Err(Error::invalid_io(name, "only aliases can be linked"));
    }
    match items_type {
        Some(_) if kind != IoKind::List => {
            return Err(Error::invalid_io(
                name,
                format!("an item kind only applies to lists, not {kind}"),
            ));
        }
        Some(IoKind::Linked) => {
            return Err(Error::invalid_io(name, "list items cannot be linked"));
        }
        _ => {}
    }
    aliases.iter().try_for_each(IoAlias::validate)
}

/// A declared output of a function or DAG.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputSpec {
    name: String,
    kind: IoKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    items_type: Option<IoKind>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    alias: Vec<IoAlias>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    annotations: IndexMap<String, Value>,
}

impl OutputSpec {
    /// Create a required output. The name is canonicalized.
    pub fn new(name: impl AsRef<str>, kind: IoKind) -> Self {
        Self {
            name: param_name(name.as_ref()),
            kind,
            description: None,
            required: true,
            path: None,
            items_type: None,
            alias: Vec::new(),
            annotations: IndexMap::new(),
        }
    }

    /// A string output
    pub fn string(name: impl AsRef<str>) -> Self {
        Self::new(name, IoKind::String)
    }

    /// An integer output
    pub fn integer(name: impl AsRef<str>) -> Self {
        Self::new(name, IoKind::Integer)
    }

    /// A number output
    pub fn number(name: impl AsRef<str>) -> Self {
        Self::new(name, IoKind::Number)
    }

    /// A boolean output
    pub fn boolean(name: impl AsRef<str>) -> Self {
        Self::new(name, IoKind::Boolean)
    }

    /// A dictionary output
    pub fn dict(name: impl AsRef<str>) -> Self {
        Self::new(name, IoKind::Dict)
    }

    /// A list output
    pub fn list(name: impl AsRef<str>) -> Self {
        Self::new(name, IoKind::List)
    }

    /// A file output
    pub fn file(name: impl AsRef<str>) -> Self {
        Self::new(name, IoKind::File)
    }

    /// A folder output
    pub fn folder(name: impl AsRef<str>) -> Self {
        Self::new(name, IoKind::Folder)
    }

    /// A file-or-folder output
    pub fn path(name: impl AsRef<str>) -> Self {
        Self::new(name, IoKind::Path)
    }

    /// Where the value is read from inside the run folder.
    #[must_use]
    pub fn with_path(mut self, path: impl AsRef<str>) -> Self {
        self.path = Some(rewrite_placeholders(path.as_ref()));
        self
    }

    /// Set a description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Mark the output optional: a run that does not produce it still succeeds.
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Kind of every item, for list outputs.
    #[must_use]
    pub const fn with_items_type(mut self, kind: IoKind) -> Self {
        self.items_type = Some(kind);
        self
    }

    /// Add a client platform alias.
    #[must_use]
    pub fn with_alias(mut self, alias: IoAlias) -> Self {
        self.alias.push(alias);
        self
    }

    /// Attach an annotation.
    #[must_use]
    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.annotations.insert(key.into(), value.into());
        self
    }

    /// Canonical name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared kind
    #[must_use]
    pub const fn kind(&self) -> IoKind {
        self.kind
    }

    /// True unless `optional()` was called.
    #[must_use]
    pub const fn is_required(&self) -> bool {
        self.required
    }

    /// Item kind of a list output
    #[must_use]
    pub const fn items_type(&self) -> Option<IoKind> {
        self.items_type
    }

    /// Client platform aliases
    #[must_use]
    pub fn aliases(&self) -> &[IoAlias] {
        &self.alias
    }

    /// Check the declaration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidIo`] for a linked output or an item kind on
    /// something other than a list, and any error of its aliases.
    pub fn validate(&self) -> Result<()> {
        check_declaration(&self.name, self.kind, self.items_type, &self.alias)
    }

    /// True for file, folder and path outputs.
    #[must_use]
    pub const fn is_artifact(&self) -> bool {
        self.kind.is_artifact()
    }

    /// Run-folder path, if any
    #[must_use]
    pub fn target_path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Description, if any
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_names_are_canonical() {
        assert_eq!(InputSpec::string("input_value").name(), "input-value");
        assert_eq!(OutputSpec::file("result_file").name(), "result-file");
    }

    #[test]
    fn test_required_follows_default_and_optional() {
        assert!(InputSpec::integer("x").is_required());
        assert!(!InputSpec::integer("x").with_default(3).is_required());
        assert!(!InputSpec::integer("x").optional().is_required());
    }

    #[test]
    fn test_artifact_kinds() {
        assert!(IoKind::File.is_artifact());
        assert!(IoKind::Folder.is_artifact());
        assert!(IoKind::Path.is_artifact());
        assert!(!IoKind::String.is_artifact());
        assert!(!IoKind::Linked.is_artifact());
        assert_eq!(IoKind::Folder.artifact_kind(), Some(ArtifactKind::Folder));
    }

    #[test]
    fn test_artifact_default_must_be_a_string() {
        let ok = InputSpec::folder("model").with_default("./model");
        assert!(ok.validate().is_ok());

        let bad = InputSpec::folder("model").with_default(json!({"path": "model"}));
        assert!(matches!(bad.validate(), Err(Error::InvalidDefault { name, .. }) if name == "model"));
    }

    #[test]
    fn test_parameter_default_must_match_kind() {
        assert!(InputSpec::integer("count").with_default(2).validate().is_ok());
        assert!(InputSpec::number("ratio").with_default(0.5).validate().is_ok());
        assert!(InputSpec::integer("count").with_default("two").validate().is_err());
        assert!(InputSpec::list("items").with_default(json!([1, 2])).validate().is_ok());
        assert!(InputSpec::boolean("flag").with_default(json!([])).validate().is_err());
    }

    #[test]
    fn test_paths_are_rewritten() {
        let output = OutputSpec::file("grid").with_path("grids/{{self.grid_name}}.pts");
        assert_eq!(output.target_path(), Some("grids/{{inputs.grid-name}}.pts"));
    }

    #[test]
    fn test_output_required_flag() {
        assert!(OutputSpec::folder("results").is_required());
        let optional = OutputSpec::folder("results").optional();
        assert!(!optional.is_required());
        assert_eq!(serde_json::to_value(&optional).unwrap()["required"], json!(false));
    }

    #[test]
    fn test_extensions_apply_to_files() {
        let grid = InputSpec::file("grid").with_extensions([".pts", "csv"]);
        assert_eq!(grid.extensions(), ["pts", "csv"]);
        assert!(grid.clone().with_default("room.PTS").validate().is_ok());
        assert!(matches!(
            grid.with_default("room.txt").validate(),
            Err(Error::InvalidDefault { .. })
        ));
        assert!(matches!(
            InputSpec::folder("model").with_extensions(["hbjson"]).validate(),
            Err(Error::InvalidIo { .. })
        ));
    }

    #[test]
    fn test_items_type_applies_to_lists() {
        let names = InputSpec::list("names").with_items_type(IoKind::String);
        assert!(names.clone().with_default(json!(["a", "b"])).validate().is_ok());
        assert!(names.with_default(json!(["a", 2])).validate().is_err());
        assert!(matches!(
            OutputSpec::string("name").with_items_type(IoKind::String).validate(),
            Err(Error::InvalidIo { .. })
        ));
        assert!(OutputSpec::list("grids").with_items_type(IoKind::Dict).validate().is_ok());
    }

    #[test]
    fn test_schema_is_serialized_as_spec() {
        let input = InputSpec::integer("count").with_schema(json!({"minimum": 1}));
        assert!(input.validate().is_ok());
        assert_eq!(serde_json::to_value(&input).unwrap()["spec"], json!({"minimum": 1}));
        assert!(InputSpec::integer("count").with_schema(json!(1)).validate().is_err());
    }

    #[test]
    fn test_linked_kind_is_alias_only() {
        use crate::alias::AliasHandler;

        assert!(matches!(
            InputSpec::new("model", IoKind::Linked).validate(),
            Err(Error::InvalidIo { .. })
        ));
        let alias = IoAlias::linked("Model", ["grasshopper"])
            .with_handler(AliasHandler::new("python", "handlers", "model_to_folder"));
        let model = InputSpec::folder("model").with_alias(alias);
        assert!(model.validate().is_ok());
        assert_eq!(model.aliases()[0].kind(), IoKind::Linked);

        let broken = OutputSpec::file("result").with_alias(IoAlias::linked("Result", ["revit"]));
        assert!(matches!(broken.validate(), Err(Error::InvalidIo { .. })));
    }

    #[test]
    fn test_input_serializes_required_flag() {
        let value = serde_json::to_value(InputSpec::string("name").with_default("a")).unwrap();
        assert_eq!(value["required"], json!(false));
        assert_eq!(value["kind"], json!("string"));
        assert_eq!(value["default"], json!("a"));
    }
}
