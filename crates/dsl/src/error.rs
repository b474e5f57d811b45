//! Error types for recipe compilation.
//!
//! Every error is detected while a recipe is compiled, never while the
//! compiled pipeline runs.

use miette::Diagnostic;
use thiserror::Error;

/// Main error type for honeycomb-dsl operations
#[derive(Error, Debug, Clone, PartialEq, Diagnostic)]
pub enum Error {
    /// An argument references an input that was never declared on the graph.
    #[error(
        "Task '{task}' argument '{argument}' references an input that is not declared on '{graph}'"
    )]
    #[diagnostic(
        code(honeycomb::reference::unresolved_input),
        help("Pass the handle returned by `input()` on the same DAG builder")
    )]
    UnresolvedInput {
        /// Graph being built
        graph: String,
        /// Task holding the argument
        task: String,
        /// Argument name
        argument: String,
    },

    /// A reference names a task or an output that does not exist.
    #[error("Invalid reference in {location}: {reason}")]
    #[diagnostic(code(honeycomb::reference::malformed))]
    MalformedReference {
        /// Where the reference was found
        location: String,
        /// What is wrong with it
        reason: String,
    },

    /// Required parameters of a task's target are unbound.
    #[error(
        "Missing value for argument(s) in task '{task}' -> {}. All required arguments of '{template}' must be bound",
        .arguments.join(", ")
    )]
    #[diagnostic(code(honeycomb::task::missing_argument))]
    MissingArgument {
        /// Task name
        task: String,
        /// Target template name
        template: String,
        /// Every unbound required parameter
        arguments: Vec<String>,
    },

    /// An artifact return has no destination path.
    #[error("Missing destination path for return '{output}' of task '{task}'")]
    #[diagnostic(
        code(honeycomb::task::missing_return_path),
        help("All file and folder returns must provide a target path")
    )]
    MissingReturnPath {
        /// Task name
        task: String,
        /// Returned output name
        output: String,
    },

    /// A task target is not a registered function or DAG, or a template is malformed.
    #[error("Invalid template '{template}': {reason}")]
    #[diagnostic(code(honeycomb::template::invalid))]
    InvalidTemplate {
        /// Template name or key
        template: String,
        /// Why it was rejected
        reason: String,
    },

    /// Two tasks in the same graph share a name.
    #[error("Task name '{name}' is used more than once in '{graph}'")]
    #[diagnostic(code(honeycomb::task::duplicate_name))]
    DuplicateTaskName {
        /// Graph name
        graph: String,
        /// Repeated task name
        name: String,
    },

    /// A reference cycle among sub-pipelines or among tasks.
    #[error("Cyclic dependency: {path}")]
    #[diagnostic(code(honeycomb::graph::cycle))]
    CyclicDependency {
        /// Names along the cycle, joined with ` -> `
        path: String,
    },

    /// A grouped graph breaks one of its structural rules.
    #[error("Grouped graph '{graph}' is invalid: {reason}")]
    #[diagnostic(
        code(honeycomb::graph::grouped),
        help("Grouped graphs cannot loop, can only return files or folders, and have at most one main task")
    )]
    GroupedGraphViolation {
        /// Graph name
        graph: String,
        /// What is wrong with it
        reason: String,
    },

    /// An argument name is not a parameter of the task's target.
    #[error(
        "'{argument}' is not a valid argument for '{template}' in task '{task}'. Valid arguments are: {}",
        .valid.join(", ")
    )]
    #[diagnostic(code(honeycomb::task::unknown_argument))]
    UnknownArgument {
        /// Task name
        task: String,
        /// Target template name
        template: String,
        /// The offending argument
        argument: String,
        /// Parameters the target accepts
        valid: Vec<String>,
    },

    /// A reference's artifact-ness disagrees with the parameter it binds.
    #[error("Task '{task}' argument '{argument}' expects {expected} but is bound to {found}")]
    #[diagnostic(code(honeycomb::task::artifact_mismatch))]
    ArtifactMismatch {
        /// Task name
        task: String,
        /// Argument name
        argument: String,
        /// What the parameter accepts
        expected: String,
        /// What the argument resolved to
        found: String,
    },

    /// Under the strict needs policy, a task references a task it does not list in `needs`.
    #[error("Task '{task}' references task '{dependency}' which is not listed in its needs")]
    #[diagnostic(
        code(honeycomb::task::undeclared_need),
        help("Add '{dependency}' to the task's needs or use the `infer` needs policy")
    )]
    UndeclaredNeed {
        /// Task holding the reference
        task: String,
        /// Referenced task
        dependency: String,
    },

    /// Two inputs (or outputs) of one template share a name.
    #[error("Name '{name}' is declared more than once on '{template}'")]
    #[diagnostic(code(honeycomb::template::duplicate_name))]
    DuplicateInputName {
        /// Template name
        template: String,
        /// Repeated name
        name: String,
    },

    /// A default value does not fit the declared kind.
    #[error("Invalid default for '{name}': {reason}")]
    #[diagnostic(code(honeycomb::io::invalid_default))]
    InvalidDefault {
        /// Input name
        name: String,
        /// Why the default was rejected
        reason: String,
    },

    /// An input, output or alias is declared in a way its kind does not allow.
    #[error("Invalid declaration of '{name}': {reason}")]
    #[diagnostic(code(honeycomb::io::invalid))]
    InvalidIo {
        /// Input, output or alias name
        name: String,
        /// What is wrong with it
        reason: String,
    },

    /// Compiler configuration error
    #[error("Configuration error: {message}")]
    #[diagnostic(code(honeycomb::config::invalid))]
    Configuration {
        /// The error message describing the configuration issue
        message: String,
    },

    /// Serialization error
    #[error("Serialization error: {message}")]
    #[diagnostic(code(honeycomb::serialization))]
    Serialization {
        /// The error message describing the serialization issue
        message: String,
    },

    /// A publisher failed to store a compiled pipeline.
    #[error("Publishing failed: {message}")]
    #[diagnostic(code(honeycomb::publish))]
    Publish {
        /// The error message reported by the publisher
        message: String,
    },

    /// An execution engine failed to run a compiled pipeline.
    #[error("Execution failed: {message}")]
    #[diagnostic(code(honeycomb::execution))]
    Execution {
        /// The error message reported by the engine
        message: String,
    },
}

impl Error {
    /// Create a malformed reference error
    pub fn malformed(location: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedReference {
            location: location.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid template error
    pub fn invalid_template(template: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidTemplate {
            template: template.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid input or output error
    pub fn invalid_io(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidIo {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create a grouped graph violation
    pub fn grouped(graph: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::GroupedGraphViolation {
            graph: graph.into(),
            reason: reason.into(),
        }
    }

    /// Create a configuration error with a message
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Create a publishing error
    pub fn publish(message: impl Into<String>) -> Self {
        Self::Publish {
            message: message.into(),
        }
    }

    /// Create an execution error
    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution {
            message: message.into(),
        }
    }
}

impl From<honeycomb_task_graph::Error> for Error {
    fn from(err: honeycomb_task_graph::Error) -> Self {
        match err {
            honeycomb_task_graph::Error::CycleDetected { path } => Self::CyclicDependency { path },
            honeycomb_task_graph::Error::DuplicateTask { name } => Self::DuplicateTaskName {
                graph: String::new(),
                name,
            },
            honeycomb_task_graph::Error::MissingDependencies { missing } => {
                let (task, dependency) = missing.into_iter().next().unwrap_or_default();
                Self::malformed(
                    format!("needs of task '{task}'"),
                    format!("task '{dependency}' is not declared in the graph"),
                )
            }
        }
    }
}

/// Result type for honeycomb-dsl operations
pub type Result<T> = std::result::Result<T, Error>;
