//! Provider-facing types
//!
//! The uniform variant type every provider reply is reduced to, plus the
//! attempt records kept for failover decisions and observability.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{AgentError, Result};
use crate::types::conversation::ToolCallItem;

/// Which configured provider produced an attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderRole {
    Primary,
    Fallback,
}

impl ProviderRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderRole::Primary => "primary",
            ProviderRole::Fallback => "fallback",
        }
    }
}

/// Token usage as reported by a provider
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

impl Usage {
    pub fn add(&mut self, other: &Usage) {
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
        self.total_tokens += other.total_tokens;
    }
}

/// One parsed tool call from a provider reply
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: Value,
    /// Argument string exactly as the provider sent it
    pub raw_arguments: String,
    /// Conversation index of the assistant turn that requested this call
    pub turn_index: usize,
}

impl ToolCall {
    /// Build from structured arguments, used by tests and stubs
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Value, turn_index: usize) -> Self {
        let raw_arguments = arguments.to_string();
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
            raw_arguments,
            turn_index,
        }
    }

    /// Parse the wire item's argument string; garbage is a provider fault
    pub fn from_wire(item: &ToolCallItem, turn_index: usize) -> Result<Self> {
        let arguments: Value =
            serde_json::from_str(&item.function.arguments).map_err(|e| AgentError::MalformedResponse {
                detail: format!(
                    "tool call '{}' carries unparsable arguments: {}",
                    item.function.name, e
                ),
            })?;
        Ok(Self {
            id: item.id.clone(),
            name: item.function.name.clone(),
            arguments,
            raw_arguments: item.function.arguments.clone(),
            turn_index,
        })
    }

    /// Wire item for appending the assistant turn verbatim
    pub fn to_wire(&self) -> ToolCallItem {
        ToolCallItem::function_call(self.id.clone(), self.name.clone(), self.raw_arguments.clone())
    }
}

/// Provider asked for one or more tool invocations
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallRequest {
    pub calls: Vec<ToolCall>,
    pub usage: Usage,
}

/// Provider returned its structured final payload
#[derive(Debug, Clone, PartialEq)]
pub struct FinalAnswer {
    pub raw: String,
    pub usage: Usage,
}

/// Every provider reply, regardless of backing provider
#[derive(Debug, Clone, PartialEq)]
pub enum ModelTurn {
    ToolCallRequest(ToolCallRequest),
    FinalAnswer(FinalAnswer),
}

impl ModelTurn {
    pub fn usage(&self) -> &Usage {
        match self {
            ModelTurn::ToolCallRequest(req) => &req.usage,
            ModelTurn::FinalAnswer(ans) => &ans.usage,
        }
    }
}

/// Attempt outcome kept for failover decisions and observability
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AttemptOutcome {
    Success,
    RateLimited,
    Error { kind: String },
}

/// One recorded provider call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderAttempt {
    pub role: ProviderRole,
    pub provider: String,
    pub model: String,
    #[serde(flatten)]
    pub outcome: AttemptOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
    pub timestamp: DateTime<Utc>,
}

impl ProviderAttempt {
    pub fn success(role: ProviderRole, provider: &str, model: &str, usage: Usage) -> Self {
        Self {
            role,
            provider: provider.to_string(),
            model: model.to_string(),
            outcome: AttemptOutcome::Success,
            usage: Some(usage),
            timestamp: Utc::now(),
        }
    }

    pub fn failure(role: ProviderRole, provider: &str, model: &str, error: &AgentError) -> Self {
        let outcome = match error {
            AgentError::RateLimited { .. } => AttemptOutcome::RateLimited,
            other => AttemptOutcome::Error {
                kind: other.kind().to_string(),
            },
        };
        Self {
            role,
            provider: provider.to_string(),
            model: model.to_string(),
            outcome,
            usage: None,
            timestamp: Utc::now(),
        }
    }

    pub fn succeeded(&self) -> bool {
        matches!(self.outcome, AttemptOutcome::Success)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tool_call_from_wire() {
        let item = ToolCallItem::function_call("call_1", "query_knowledge_base", r#"{"query": "login"}"#);
        let call = ToolCall::from_wire(&item, 2).unwrap();

        assert_eq!(call.name, "query_knowledge_base");
        assert_eq!(call.arguments["query"], "login");
        assert_eq!(call.turn_index, 2);
        assert_eq!(call.raw_arguments, r#"{"query": "login"}"#);
    }

    #[test]
    fn test_tool_call_bad_arguments_is_malformed_response() {
        let item = ToolCallItem::function_call("call_1", "fetch_customer_data", "{not json");
        let err = ToolCall::from_wire(&item, 0).unwrap_err();
        assert_eq!(err.kind(), "malformed_response");
    }

    #[test]
    fn test_tool_call_wire_roundtrip_keeps_raw_arguments() {
        let call = ToolCall::new("call_2", "escalate_to_human", json!({"ticket_id": "T1", "reason": "x"}), 4);
        let wire = call.to_wire();
        assert_eq!(wire.function.arguments, call.raw_arguments);
        assert_eq!(wire.id, "call_2");
    }

    #[test]
    fn test_model_turn_usage_accessor() {
        let turn = ModelTurn::FinalAnswer(FinalAnswer {
            raw: "{}".to_string(),
            usage: Usage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            },
        });
        assert_eq!(turn.usage().total_tokens, 15);
    }

    #[test]
    fn test_usage_accumulation() {
        let mut total = Usage::default();
        total.add(&Usage {
            prompt_tokens: 100,
            completion_tokens: 20,
            total_tokens: 120,
        });
        total.add(&Usage {
            prompt_tokens: 50,
            completion_tokens: 10,
            total_tokens: 60,
        });
        assert_eq!(total.prompt_tokens, 150);
        assert_eq!(total.total_tokens, 180);
    }

    #[test]
    fn test_attempt_failure_classification() {
        let rate = ProviderAttempt::failure(
            ProviderRole::Primary,
            "openai",
            "gpt-4o-mini",
            &AgentError::RateLimited {
                provider: "openai".to_string(),
            },
        );
        assert_eq!(rate.outcome, AttemptOutcome::RateLimited);
        assert!(!rate.succeeded());

        let err = ProviderAttempt::failure(
            ProviderRole::Fallback,
            "groq",
            "llama-3.1-8b-instant",
            &AgentError::Unavailable {
                source_name: "groq".to_string(),
                detail: "connection refused".to_string(),
            },
        );
        assert_eq!(
            err.outcome,
            AttemptOutcome::Error {
                kind: "unavailable".to_string()
            }
        );
    }

    #[test]
    fn test_attempt_serialization_flattens_outcome() {
        let attempt = ProviderAttempt::success(ProviderRole::Primary, "openai", "gpt-4o-mini", Usage::default());
        let value = serde_json::to_value(&attempt).unwrap();
        assert_eq!(value["outcome"], "success");
        assert_eq!(value["role"], "primary");
    }
}
