//! Final answer validation
//!
//! A decision only reaches a caller after passing through here. Syntax
//! faults and shape faults are reported as different errors because they
//! get different corrective feedback.

use serde_json::Value;

use crate::errors::{AgentError, Result};
use crate::types::{Department, TriageDecision};

/// Fields every final answer must carry
pub const REQUIRED_FIELDS: [&str; 4] = ["department", "priority_score", "reason", "escalate"];

/// Drop a surrounding markdown code fence, with or without a language tag.
/// Models under instruction to emit bare JSON still wrap it often enough
/// that rejecting fenced output would waste correction rounds.
pub fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    let body = body.strip_suffix("```").unwrap_or(body);
    body.trim()
}

/// Parse and validate a raw final answer into a usable decision
pub fn decision_from_reply(raw: &str) -> Result<TriageDecision> {
    let body = strip_code_fences(raw);
    let value: Value = serde_json::from_str(body).map_err(|e| AgentError::MalformedResponse {
        detail: format!("final answer is not valid JSON: {}", e),
    })?;
    decision_from_value(value)
}

/// Validate an already-parsed final answer
pub fn decision_from_value(value: Value) -> Result<TriageDecision> {
    let object = value.as_object().ok_or_else(|| AgentError::SchemaViolation {
        detail: "final answer must be a JSON object".to_string(),
    })?;

    for field in REQUIRED_FIELDS {
        if !object.contains_key(field) {
            return Err(AgentError::SchemaViolation {
                detail: format!("missing required field '{}'", field),
            });
        }
    }

    let department = object["department"]
        .as_str()
        .ok_or_else(|| AgentError::SchemaViolation {
            detail: "'department' must be a string".to_string(),
        })?;
    if !Department::ALL.iter().any(|d| d.as_str() == department) {
        let allowed: Vec<&str> = Department::ALL.iter().map(|d| d.as_str()).collect();
        return Err(AgentError::SchemaViolation {
            detail: format!(
                "unknown department '{}', expected one of: {}",
                department,
                allowed.join(", ")
            ),
        });
    }

    let score = object["priority_score"]
        .as_f64()
        .ok_or_else(|| AgentError::SchemaViolation {
            detail: "'priority_score' must be a number".to_string(),
        })?;
    if !(0.0..=1.0).contains(&score) {
        return Err(AgentError::SchemaViolation {
            detail: format!("'priority_score' must be between 0.0 and 1.0, got {}", score),
        });
    }

    let reason = object["reason"]
        .as_str()
        .ok_or_else(|| AgentError::SchemaViolation {
            detail: "'reason' must be a string".to_string(),
        })?;
    if reason.trim().is_empty() {
        return Err(AgentError::SchemaViolation {
            detail: "'reason' must not be empty".to_string(),
        });
    }

    if !object["escalate"].is_boolean() {
        return Err(AgentError::SchemaViolation {
            detail: "'escalate' must be a boolean".to_string(),
        });
    }

    serde_json::from_value(value).map_err(|e| AgentError::SchemaViolation {
        detail: format!("final answer did not match the expected shape: {}", e),
    })
}
