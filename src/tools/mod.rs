//! Tool registry and the tools exposed to the model.
//!
//! Every tool implements [`Tool`]. The [`ToolRegistry`] owns the set of
//! tools, exposes their schemas to the model service and dispatches
//! invocations. Tool failures never escape the registry: they come back as a
//! [`ToolOutcome::Error`] and are reported to the model as data.

mod files;
mod terminal;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::confirm::{ConfirmationGate, Decision};

pub use files::{CreateFile, EditFile, ListFiles, ReadFile};
pub use terminal::RunBash;

/// Payload returned to the model when the operator declines a command.
pub const CANCELLED_OUTPUT: &str = "Command cancelled by the operator; it was not executed.";

/// Parsed tool arguments.
pub type ToolArgs = Map<String, Value>;

/// Errors a tool call can end in. All of them are reported back to the model.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("missing required argument '{0}'")]
    MissingArgument(String),

    #[error("invalid argument '{name}': {reason}")]
    InvalidArgument { name: String, reason: String },

    #[error("{} does not exist", .0.display())]
    NotFound(PathBuf),

    #[error("{} already exists; use edit_file to change it", .0.display())]
    AlreadyExists(PathBuf),

    #[error("text to replace was not found in {}; file left unchanged", .0.display())]
    NoMatch(PathBuf),

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("command failed ({status}): {stderr}")]
    Execution { status: String, stderr: String },

    #[error("could not parse arguments: {0}")]
    ArgumentParse(String),

    #[error("unknown tool '{0}'")]
    UnknownTool(String),
}

impl ToolError {
    /// Map an I/O error on `path`, singling out a missing file.
    pub fn from_io(path: &Path, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound(path.to_path_buf())
        } else {
            Self::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    }

    /// Stable identifier for the error category.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingArgument(_) => "missing_argument",
            Self::InvalidArgument { .. } => "invalid_argument",
            Self::NotFound(_) => "not_found",
            Self::AlreadyExists(_) => "already_exists",
            Self::NoMatch(_) => "no_match",
            Self::Io { .. } => "io",
            Self::Execution { .. } => "execution",
            Self::ArgumentParse(_) => "argument_parse",
            Self::UnknownTool(_) => "unknown_tool",
        }
    }
}

/// Result of one tool call. Always turned into exactly one tool-call result.
#[derive(Debug)]
pub enum ToolOutcome {
    Success(String),
    Error(ToolError),
}

impl ToolOutcome {
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// Text handed back to the model.
    pub fn into_output(self) -> String {
        match self {
            Self::Success(output) => output,
            Self::Error(err) => json!({
                "error": {
                    "kind": err.kind(),
                    "message": err.to_string(),
                }
            })
            .to_string(),
        }
    }
}

impl From<Result<String, ToolError>> for ToolOutcome {
    fn from(result: Result<String, ToolError>) -> Self {
        match result {
            Ok(output) => Self::Success(output),
            Err(err) => Self::Error(err),
        }
    }
}

/// A tool name plus its parsed arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolInvocation {
    pub name: String,
    pub args: ToolArgs,
}

impl ToolInvocation {
    /// Parse the raw argument text the model sent with a tool call.
    ///
    /// Whitespace-only text counts as an empty argument object.
    pub fn parse(name: &str, raw_arguments: &str) -> Result<Self, ToolError> {
        let args = if raw_arguments.trim().is_empty() {
            Map::new()
        } else {
            match serde_json::from_str::<Value>(raw_arguments) {
                Ok(Value::Object(map)) => map,
                Ok(other) => {
                    return Err(ToolError::ArgumentParse(format!(
                        "expected a JSON object, got {}",
                        json_type_name(&other)
                    )))
                }
                Err(e) => return Err(ToolError::ArgumentParse(e.to_string())),
            }
        };

        Ok(Self {
            name: name.to_string(),
            args,
        })
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Fetch a required string argument.
pub fn required_str<'a>(args: &'a ToolArgs, name: &str) -> Result<&'a str, ToolError> {
    optional_str(args, name)?.ok_or_else(|| ToolError::MissingArgument(name.to_string()))
}

/// Fetch an optional string argument. `null` counts as absent.
pub fn optional_str<'a>(args: &'a ToolArgs, name: &str) -> Result<Option<&'a str>, ToolError> {
    match args.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(other) => Err(ToolError::InvalidArgument {
            name: name.to_string(),
            reason: format!("expected a string, got {}", json_type_name(other)),
        }),
    }
}

/// A capability the model can invoke.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique tool name.
    fn name(&self) -> &str;

    /// Description shown to the model.
    fn description(&self) -> &str;

    /// JSON Schema for the arguments object.
    fn parameters_schema(&self) -> Value;

    /// Text the operator must approve before the call runs, if any.
    ///
    /// Tools with irreversible effects return `Some`; the registry routes
    /// those calls through the confirmation gate.
    fn confirmation_subject(&self, _args: &ToolArgs) -> Result<Option<String>, ToolError> {
        Ok(None)
    }

    async fn execute(&self, args: &ToolArgs, workspace: &Path) -> Result<String, ToolError>;
}

/// Name and description of a registered tool.
#[derive(Debug, Clone)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
}

/// Tool schema entry sent to the model service.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Registry of available tools, keyed by name and kept in registration order.
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    by_name: HashMap<String, usize>,
}

impl ToolRegistry {
    /// Registry with the standard tool set, running shell commands through `bash`.
    pub fn new() -> Self {
        Self::with_shell("bash")
    }

    /// Registry with the standard tool set and a custom shell program.
    pub fn with_shell(shell: impl Into<String>) -> Self {
        let mut registry = Self::empty();
        registry.register(Arc::new(ListFiles));
        registry.register(Arc::new(ReadFile));
        registry.register(Arc::new(CreateFile));
        registry.register(Arc::new(EditFile));
        registry.register(Arc::new(RunBash::new(shell)));
        registry
    }

    pub fn empty() -> Self {
        Self {
            tools: Vec::new(),
            by_name: HashMap::new(),
        }
    }

    /// Add a tool. A tool with the same name replaces the earlier one.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        match self.by_name.get(&name) {
            Some(&idx) => self.tools[idx] = tool,
            None => {
                self.by_name.insert(name, self.tools.len());
                self.tools.push(tool);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.by_name.get(name).map(|&idx| &self.tools[idx])
    }

    pub fn list_tools(&self) -> Vec<ToolInfo> {
        self.tools
            .iter()
            .map(|t| ToolInfo {
                name: t.name().to_string(),
                description: t.description().to_string(),
            })
            .collect()
    }

    pub fn get_tool_schemas(&self) -> Vec<ToolSpec> {
        self.tools
            .iter()
            .map(|t| ToolSpec {
                name: t.name().to_string(),
                description: t.description().to_string(),
                parameters: t.parameters_schema(),
            })
            .collect()
    }

    /// Run one invocation, asking the gate first when the tool requires it.
    pub async fn dispatch(
        &self,
        invocation: &ToolInvocation,
        gate: &dyn ConfirmationGate,
        workspace: &Path,
    ) -> ToolOutcome {
        let Some(tool) = self.get(&invocation.name) else {
            return ToolOutcome::Error(ToolError::UnknownTool(invocation.name.clone()));
        };

        match tool.confirmation_subject(&invocation.args) {
            Ok(Some(subject)) => {
                if gate.confirm(&subject).await == Decision::Decline {
                    tracing::warn!(tool = %invocation.name, "Operator declined: {}", subject);
                    return ToolOutcome::Success(CANCELLED_OUTPUT.to_string());
                }
            }
            Ok(None) => {}
            Err(e) => return ToolOutcome::Error(e),
        }

        tool.execute(&invocation.args, workspace).await.into()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
