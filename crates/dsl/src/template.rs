//! Template definitions and function templates.
//!
//! A template is either a function (one command run in one container) or a
//! DAG (a set of tasks, see [`crate::dag`]). Both expose the same
//! [`TemplateDefinition`]: a canonical name, a package and typed inputs and
//! outputs.

use crate::io::{InputSpec, OutputSpec};
use crate::naming::{rewrite_placeholders, template_name};
use crate::package::PackageId;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Whether a template is a function or a DAG.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateKind {
    /// A single command
    Function,
    /// A graph of tasks
    Dag,
}

/// Registry key of a template: package name plus canonical template name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TemplateKey {
    /// Declaring package name
    pub package: String,
    /// Canonical template name
    pub name: String,
}

impl TemplateKey {
    /// Create a key. The template name is canonicalized.
    pub fn new(package: impl Into<String>, name: impl AsRef<str>) -> Self {
        Self {
            package: package.into(),
            name: template_name(name.as_ref()),
        }
    }
}

impl fmt::Display for TemplateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.package, self.name)
    }
}

/// The interface shared by functions and DAGs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemplateDefinition {
    /// Canonical name
    pub name: String,
    /// Function or DAG
    pub kind: TemplateKind,
    /// Declaring package
    pub package: PackageId,
    /// Description, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Declared inputs in declaration order
    pub inputs: Vec<InputSpec>,
    /// Declared outputs in declaration order
    pub outputs: Vec<OutputSpec>,
}

impl TemplateDefinition {
    /// Registry key of this template
    #[must_use]
    pub fn key(&self) -> TemplateKey {
        TemplateKey {
            package: self.package.name.clone(),
            name: self.name.clone(),
        }
    }

    /// Look up an input by canonical name.
    #[must_use]
    pub fn input(&self, name: &str) -> Option<&InputSpec> {
        self.inputs.iter().find(|input| input.name() == name)
    }

    /// Look up an output by canonical name.
    #[must_use]
    pub fn output(&self, name: &str) -> Option<&OutputSpec> {
        self.outputs.iter().find(|output| output.name() == name)
    }

    /// Canonical names of all inputs
    #[must_use]
    pub fn input_names(&self) -> Vec<String> {
        self.inputs.iter().map(|input| input.name().to_string()).collect()
    }

    /// Reject duplicate names, bad defaults and bad declarations.
    pub(crate) fn check_io(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for input in &self.inputs {
            if !seen.insert(input.name()) {
                return Err(Error::DuplicateInputName {
                    template: self.name.clone(),
                    name: input.name().to_string(),
                });
            }
            input.validate()?;
        }

        let mut seen = HashSet::new();
        for output in &self.outputs {
            if !seen.insert(output.name()) {
                return Err(Error::DuplicateInputName {
                    template: self.name.clone(),
                    name: output.name().to_string(),
                });
            }
            output.validate()?;
        }
        Ok(())
    }
}

/// What a function runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FunctionBody {
    /// A shell command
    Command(String),
    /// A script source
    Script(String),
}

/// A function: one command with typed inputs and outputs.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionTemplate {
    definition: Arc<TemplateDefinition>,
    body: FunctionBody,
}

impl FunctionTemplate {
    /// Start building a function in `package`.
    pub fn builder(name: impl AsRef<str>, package: PackageId) -> FunctionTemplateBuilder {
        FunctionTemplateBuilder {
            name: template_name(name.as_ref()),
            package,
            description: None,
            inputs: Vec::new(),
            outputs: Vec::new(),
            command: None,
            script: None,
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

    /// The command or script, placeholders already rewritten
    #[must_use]
    pub const fn body(&self) -> &FunctionBody {
        &self.body
    }
}

/// Builder for [`FunctionTemplate`].
#[derive(Debug)]
pub struct FunctionTemplateBuilder {
    name: String,
    package: PackageId,
    description: Option<String>,
    inputs: Vec<InputSpec>,
    outputs: Vec<OutputSpec>,
    command: Option<String>,
    script: Option<String>,
}

impl FunctionTemplateBuilder {
    /// Set a description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Declare an input.
    #[must_use]
    pub fn input(mut self, input: InputSpec) -> Self {
        self.inputs.push(input);
        self
    }

    /// Declare an output.
    #[must_use]
    pub fn output(mut self, output: OutputSpec) -> Self {
        self.outputs.push(output);
        self
    }

    /// Run a shell command.
    #[must_use]
    pub fn command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    /// Run a script.
    #[must_use]
    pub fn script(mut self, script: impl Into<String>) -> Self {
        self.script = Some(script.into());
        self
    }

    /// Finish the function.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTemplate`] when the function has no outputs,
    /// when it sets neither or both of a command and a script, when an
    /// artifact input has no path, or when an output has no path. Duplicate
    /// names and bad defaults are rejected too.
    pub fn build(self) -> Result<FunctionTemplate> {
        let body = match (self.command, self.script) {
            (Some(command), None) => FunctionBody::Command(rewrite_placeholders(command.trim())),
            (None, Some(script)) => FunctionBody::Script(rewrite_placeholders(&script)),
            (Some(_), Some(_)) => {
                return Err(Error::invalid_template(
                    &self.name,
                    "a function has either a command or a script, not both",
                ));
            }
            (None, None) => {
                return Err(Error::invalid_template(
                    &self.name,
                    "a function needs a command or a script",
                ));
            }
        };

        if self.outputs.is_empty() {
            return Err(Error::invalid_template(
                &self.name,
                "a function must declare at least one output",
            ));
        }
        if let Some(input) = self
            .inputs
            .iter()
            .find(|input| input.is_artifact() && input.target_path().is_none())
        {
            return Err(Error::invalid_template(
                &self.name,
                format!("{} input '{}' needs a path", input.kind(), input.name()),
            ));
        }
        if let Some(output) = self.outputs.iter().find(|output| output.target_path().is_none()) {
            return Err(Error::invalid_template(
                &self.name,
                format!("output '{}' needs a path", output.name()),
            ));
        }

        let definition = TemplateDefinition {
            name: self.name,
            kind: TemplateKind::Function,
            package: self.package,
            description: self.description,
            inputs: self.inputs,
            outputs: self.outputs,
        };
        definition.check_io()?;

        Ok(FunctionTemplate {
            definition: Arc::new(definition),
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn package() -> PackageId {
        PackageId::new("honeycomb-math", "0.1.0")
    }

    #[test]
    fn test_function_build() {
        let function = FunctionTemplate::builder("DoubleNumber", package())
            .input(InputSpec::integer("input_value"))
            .output(OutputSpec::integer("result").with_path("output.txt"))
            .command("echo $(( {{self.input_value}} * 2 )) > output.txt")
            .build()
            .unwrap();

        assert_eq!(function.definition().name, "double-number");
        assert_eq!(function.key().to_string(), "honeycomb-math/double-number");
        assert_eq!(
            function.body(),
            &FunctionBody::Command("echo $(( {{inputs.input-value}} * 2 )) > output.txt".to_string())
        );
    }

    #[test]
    fn test_function_needs_an_output() {
        let err = FunctionTemplate::builder("Noop", package())
            .command("true")
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidTemplate { .. }));
    }

    #[test]
    fn test_function_needs_exactly_one_body() {
        let neither = FunctionTemplate::builder("Empty", package())
            .output(OutputSpec::string("out").with_path("out.txt"))
            .build();
        assert!(matches!(neither, Err(Error::InvalidTemplate { .. })));

        let both = FunctionTemplate::builder("Both", package())
            .output(OutputSpec::string("out").with_path("out.txt"))
            .command("echo")
            .script("print()")
            .build();
        assert!(matches!(both, Err(Error::InvalidTemplate { .. })));
    }

    #[test]
    fn test_artifact_input_needs_path() {
        let err = FunctionTemplate::builder("CopyGrid", package())
            .input(InputSpec::file("grid"))
            .output(OutputSpec::file("copy").with_path("copy.pts"))
            .command("cp grid.pts copy.pts")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("file input 'grid' needs a path"));
    }

    #[test]
    fn test_duplicate_input_rejected() {
        let err = FunctionTemplate::builder("Dup", package())
            .input(InputSpec::string("name"))
            .input(InputSpec::string("name"))
            .output(OutputSpec::string("out").with_path("out.txt"))
            .command("echo")
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateInputName { name, .. } if name == "name"));
    }

    #[test]
    fn test_key_canonicalizes_name() {
        assert_eq!(TemplateKey::new("pkg", "RayTrace"), TemplateKey::new("pkg", "ray-trace"));
    }
}
