//! Tool invocation types and structures
//!
//! Core types for tool dispatch, results, and the error payloads fed
//! back into the conversation.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;

/// Failure taxonomy for tool outcomes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolErrorKind {
    /// Unknown tool name or arguments failing the declared schema
    InvalidCall,
    /// Backing store unreachable or failing
    Unavailable,
    /// Lookup miss; surfaced to the model, not to the caller
    NotFound,
}

impl ToolErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolErrorKind::InvalidCall => "invalid_call",
            ToolErrorKind::Unavailable => "unavailable",
            ToolErrorKind::NotFound => "not_found",
        }
    }
}

/// Tool failure fed back into the conversation as a tool outcome
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{}: {detail}", .kind.as_str())]
pub struct ToolError {
    pub kind: ToolErrorKind,
    pub detail: String,
}

impl ToolError {
    pub fn invalid_call(detail: impl Into<String>) -> Self {
        Self {
            kind: ToolErrorKind::InvalidCall,
            detail: detail.into(),
        }
    }

    pub fn unavailable(detail: impl Into<String>) -> Self {
        Self {
            kind: ToolErrorKind::Unavailable,
            detail: detail.into(),
        }
    }

    pub fn not_found(detail: impl Into<String>) -> Self {
        Self {
            kind: ToolErrorKind::NotFound,
            detail: detail.into(),
        }
    }

    /// Wire form appended to the conversation so the model sees the failure
    pub fn to_feedback(&self) -> Value {
        json!({
            "error": self.kind.as_str(),
            "message": self.detail,
        })
    }
}

/// Result of a successful tool invocation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolResult {
    /// Tool name that was executed
    pub tool: String,

    /// Structured output handed back to the model
    pub output: Value,

    /// Execution duration in milliseconds
    pub duration_ms: u64,
}

impl ToolResult {
    pub fn new(tool: impl Into<String>, output: Value, duration: Duration) -> Self {
        Self {
            tool: tool.into(),
            output,
            duration_ms: duration.as_millis() as u64,
        }
    }
}

/// Declared tool contract passed verbatim to the providers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSchema {
    /// Tool name
    pub name: String,

    /// Human-readable description shown to the model
    pub description: String,

    /// JSON schema for parameters
    pub parameters: Value,

    /// Terminal tools short-circuit the run once invoked
    pub terminal: bool,
}

impl ToolSchema {
    pub fn new(name: &str, description: &str, parameters: Value, terminal: bool) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            parameters,
            terminal,
        }
    }
}

/// One recorded tool invocation, success or failure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolTrace {
    pub tool: String,
    pub arguments: Value,
    /// Exactly what was appended to the conversation
    pub outcome: Value,
    pub success: bool,
    pub duration_ms: u64,
}
