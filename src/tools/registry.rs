//! Tool registry with JSON schemas
//!
//! Maintains the registry of callable tools and mediates every
//! invocation: arguments are validated against the declared parameter
//! schema before any handler runs, and handler failures come back as
//! `ToolError` values rather than bubbling out.
//!
//! Tools:
//! - fetch_customer_data: Customer Directory lookup
//! - query_knowledge_base: Knowledge Store retrieval
//! - escalate_to_human: terminal human hand-off

use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use crate::directory::CustomerDirectory;
use crate::knowledge::KnowledgeStore;
use crate::tools::handlers::{EscalateToHuman, FetchCustomerData, QueryKnowledgeBase, TicketTool};
use crate::tools::types::{ToolError, ToolResult, ToolSchema};

/// Tool registry
#[derive(Clone)]
pub struct ToolRegistry {
    /// Map of tool name to handler
    tools: HashMap<String, Arc<dyn TicketTool>>,
}

impl ToolRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Registry with the standard triage tools wired to the leaf stores
    pub fn standard(directory: Arc<CustomerDirectory>, store: Arc<KnowledgeStore>) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(FetchCustomerData::new(directory)));
        registry.register(Arc::new(QueryKnowledgeBase::new(store)));
        registry.register(Arc::new(EscalateToHuman::new()));
        registry
    }

    /// Register a tool handler under its declared name
    pub fn register(&mut self, tool: Arc<dyn TicketTool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// Get tool handler by name
    pub fn get(&self, name: &str) -> Option<&Arc<dyn TicketTool>> {
        self.tools.get(name)
    }

    /// Check if tool exists
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Check if a tool ends the run once invoked
    pub fn is_terminal(&self, name: &str) -> bool {
        self.tools.get(name).map(|t| t.terminal()).unwrap_or(false)
    }

    /// Get all tool names, sorted for stable prompts
    pub fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// Declared schemas in name order, passed verbatim to providers
    pub fn schemas(&self) -> Vec<ToolSchema> {
        let mut schemas: Vec<ToolSchema> = self
            .tools
            .values()
            .map(|tool| ToolSchema::new(tool.name(), tool.description(), tool.parameters(), tool.terminal()))
            .collect();
        schemas.sort_by(|a, b| a.name.cmp(&b.name));
        schemas
    }

    /// Get total number of tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if registry is empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Validate and dispatch one tool call
    ///
    /// Unknown names and schema mismatches fail before any handler
    /// runs; the returned error is conversation feedback, not a crash.
    pub async fn invoke(&self, name: &str, args: &Value) -> Result<ToolResult, ToolError> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| ToolError::invalid_call(format!("Unknown tool: {}", name)))?;

        validate_args(&tool.parameters(), args)?;

        let started = Instant::now();
        let output = tool.execute(args).await?;
        Ok(ToolResult::new(name, output, started.elapsed()))
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Check arguments against a declared parameter schema
///
/// Covers what the triage schemas actually declare: an object payload,
/// required keys, and primitive property types.
fn validate_args(schema: &Value, args: &Value) -> Result<(), ToolError> {
    let obj = args
        .as_object()
        .ok_or_else(|| ToolError::invalid_call("arguments must be a JSON object"))?;

    if let Some(required) = schema.get("required").and_then(Value::as_array) {
        for key in required.iter().filter_map(Value::as_str) {
            if !obj.contains_key(key) {
                return Err(ToolError::invalid_call(format!(
                    "missing required argument '{}'",
                    key
                )));
            }
        }
    }

    if let Some(properties) = schema.get("properties").and_then(Value::as_object) {
        for (key, value) in obj {
            let Some(declared) = properties.get(key) else {
                continue;
            };
            let Some(expected) = declared.get("type").and_then(Value::as_str) else {
                continue;
            };
            let ok = match expected {
                "string" => value.is_string(),
                "integer" => value.is_i64() || value.is_u64(),
                "number" => value.is_number(),
                "boolean" => value.is_boolean(),
                "array" => value.is_array(),
                "object" => value.is_object(),
                _ => true,
            };
            if !ok {
                return Err(ToolError::invalid_call(format!(
                    "argument '{}' must be of type {}",
                    key, expected
                )));
            }
        }
    }

    Ok(())
}
