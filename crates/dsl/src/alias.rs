//! Platform aliases for graph inputs and outputs.
//!
//! A client application often collects an input in its own shape, such as
//! a model object picked in a CAD tool, and has to convert it before a run
//! can use it. An alias tells such a client which platforms it applies to
//! and which handler functions do the conversion. The engine never reads
//! aliases; they travel with the compiled graph for the clients' benefit.

use crate::io::IoKind;
use crate::{Error, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A function that converts a value between a client platform and a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasHandler {
    /// Language of the handler, e.g. `python` or `csharp`
    pub language: String,
    /// Module holding the function
    pub module: String,
    /// Function name
    pub function: String,
    /// Order among the handlers of one alias
    #[serde(default)]
    pub index: u32,
}

impl AliasHandler {
    /// Handler at index 0.
    pub fn new(
        language: impl Into<String>,
        module: impl Into<String>,
        function: impl Into<String>,
    ) -> Self {
        Self {
            language: language.into(),
            module: module.into(),
            function: function.into(),
            index: 0,
        }
    }

    /// Set the handler's position.
    #[must_use]
    pub const fn at_index(mut self, index: u32) -> Self {
        self.index = index;
        self
    }
}

/// How one input or output appears on a set of client platforms.
///
/// Alias names are kept verbatim; they are shown to users, not matched
/// against graph names.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IoAlias {
    name: String,
    kind: IoKind,
    platform: Vec<String>,
    handler: Vec<AliasHandler>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    default: Option<Value>,
    required: bool,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    annotations: IndexMap<String, Value>,
}

impl IoAlias {
    /// Alias of kind `kind` used by `platforms`.
    pub fn new<P: Into<String>>(
        name: impl Into<String>,
        kind: IoKind,
        platforms: impl IntoIterator<Item = P>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            platform: platforms.into_iter().map(Into::into).collect(),
            handler: Vec::new(),
            description: None,
            default: None,
            required: true,
            annotations: IndexMap::new(),
        }
    }

    /// Alias whose value is linked to an object of the client application.
    pub fn linked<P: Into<String>>(
        name: impl Into<String>,
        platforms: impl IntoIterator<Item = P>,
    ) -> Self {
        Self::new(name, IoKind::Linked, platforms)
    }

    /// Add a conversion handler.
    #[must_use]
    pub fn with_handler(mut self, handler: AliasHandler) -> Self {
        self.handler.push(handler);
        self
    }

    /// Set a default. An alias with a default is not required.
    #[must_use]
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self.required = false;
        self
    }

    /// Set a description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Attach an annotation.
    #[must_use]
    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.annotations.insert(key.into(), value.into());
        self
    }

    /// Alias name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared kind
    #[must_use]
    pub const fn kind(&self) -> IoKind {
        self.kind
    }

    /// Platforms the alias applies to
    #[must_use]
    pub fn platforms(&self) -> &[String] {
        &self.platform
    }

    /// Conversion handlers
    #[must_use]
    pub fn handlers(&self) -> &[AliasHandler] {
        &self.handler
    }

    /// True unless a default was given.
    #[must_use]
    pub const fn is_required(&self) -> bool {
        self.required
    }

    /// Check platforms, handlers and the default.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidIo`] for an alias without platforms or
    /// handlers, and [`Error::InvalidDefault`] for a default its kind does
    /// not accept.
    pub fn validate(&self) -> Result<()> {
        if self.platform.iter().all(|p| p.trim().is_empty()) {
            return Err(Error::invalid_io(
                &self.name,
                "an alias must name at least one platform",
            ));
        }
        if self.handler.is_empty() {
            return Err(Error::invalid_io(
                &self.name,
                "an alias needs at least one handler",
            ));
        }
        match &self.default {
            Some(default) if !self.kind.accepts(default) => Err(Error::InvalidDefault {
                name: self.name.clone(),
                reason: format!("expected a {} value, found {default}", self.kind),
            }),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn handler() -> AliasHandler {
        AliasHandler::new("python", "recipe_handlers.model", "model_to_json")
    }

    #[test]
    fn test_linked_alias() {
        let alias = IoAlias::linked("Model", ["grasshopper", "revit"]).with_handler(handler());
        assert_eq!(alias.kind(), IoKind::Linked);
        assert_eq!(alias.platforms(), ["grasshopper", "revit"]);
        assert!(alias.is_required());
        assert!(alias.validate().is_ok());
    }

    #[test]
    fn test_alias_needs_platform_and_handler() {
        let no_handler = IoAlias::linked("Model", ["grasshopper"]);
        assert!(matches!(no_handler.validate(), Err(Error::InvalidIo { .. })));

        let no_platform = IoAlias::new("Model", IoKind::String, Vec::<String>::new())
            .with_handler(handler());
        assert!(matches!(no_platform.validate(), Err(Error::InvalidIo { .. })));
    }

    #[test]
    fn test_alias_default_is_checked() {
        let bad = IoAlias::new("count", IoKind::Integer, ["grasshopper"])
            .with_handler(handler())
            .with_default("three");
        assert!(matches!(bad.validate(), Err(Error::InvalidDefault { .. })));
    }

    #[test]
    fn test_serialized_shape() {
        let alias = IoAlias::linked("Model", ["grasshopper"])
            .with_handler(handler().at_index(1))
            .with_default("model-id");
        assert_eq!(
            serde_json::to_value(&alias).unwrap(),
            json!({
                "name": "Model",
                "kind": "linked",
                "platform": ["grasshopper"],
                "handler": [{
                    "language": "python",
                    "module": "recipe_handlers.model",
                    "function": "model_to_json",
                    "index": 1
                }],
                "default": "model-id",
                "required": false
            })
        );
    }
}
