//! Named operations over the task store, invoked with a JSON argument bag.

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

pub mod args;
pub mod task_tools;

pub use task_tools::TaskTools;

/// Argument key every project-scoped operation carries
pub const PROJECT_NAME_ARG: &str = "project_name";

/// A single operation invocation
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    pub name: String,
    pub args: Map<String, Value>,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, args: Map<String, Value>) -> Self {
        ToolCall {
            name: name.into(),
            args,
        }
    }

    /// Build from a JSON value; anything but an object yields no arguments
    pub fn from_value(name: impl Into<String>, args: Value) -> Self {
        let args = match args {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        ToolCall::new(name, args)
    }

    /// The non-empty `project_name` argument, if present
    pub fn project_name(&self) -> Option<&str> {
        self.args
            .get(PROJECT_NAME_ARG)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }
}

/// Success payload of an operation
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    Json(Value),
    Text(String),
}

impl ToolOutput {
    /// Render for display: pretty JSON or the text as-is
    pub fn render(&self) -> String {
        match self {
            ToolOutput::Json(value) => {
                serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
            }
            ToolOutput::Text(text) => text.clone(),
        }
    }
}

/// Failure of a named operation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{operation}: {message}")]
pub struct ToolError {
    pub operation: String,
    pub message: String,
}

impl ToolError {
    pub fn new(operation: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        ToolError {
            operation: operation.into(),
            message: cause.to_string(),
        }
    }
}

/// The dispatch boundary: anything that can execute a [`ToolCall`]
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(
        &self,
        call: &ToolCall,
        cancel: &CancellationToken,
    ) -> Result<ToolOutput, ToolError>;
}
