//! Per-ticket outcome envelope
//!
//! Wraps the decision (or escalation or failure) together with the run's
//! observable history: rounds used, tool traces, provider attempts, and
//! token usage.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::provider::{ProviderAttempt, Usage};
use crate::tools::ToolTrace;
use crate::types::decision::TriageDecision;

/// Terminal result of one triage run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TriageOutcome {
    /// Validated routing decision
    Decision { decision: TriageDecision },

    /// Human hand-off requested via the terminal tool
    Escalated { decision: TriageDecision },

    /// All retry budgets exhausted; code is the error taxonomy kind
    Failed { code: String, detail: String },
}

impl TriageOutcome {
    pub fn decision(&self) -> Option<&TriageDecision> {
        match self {
            TriageOutcome::Decision { decision } | TriageOutcome::Escalated { decision } => {
                Some(decision)
            }
            TriageOutcome::Failed { .. } => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TriageOutcome::Decision { .. } => "decision",
            TriageOutcome::Escalated { .. } => "escalated",
            TriageOutcome::Failed { .. } => "failed",
        }
    }
}

/// Everything the caller learns about one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriageReport {
    pub run_id: Uuid,
    pub ticket_id: String,
    pub outcome: TriageOutcome,
    pub rounds: u32,
    pub tool_traces: Vec<ToolTrace>,
    pub provider_attempts: Vec<ProviderAttempt>,
    pub usage: Usage,
    pub failed_over: bool,
    pub elapsed_ms: u64,
}

impl TriageReport {
    /// One-line rendering for batch output
    pub fn summary(&self) -> String {
        let outcome = match &self.outcome {
            TriageOutcome::Decision { decision } => decision.summary_line(),
            TriageOutcome::Escalated { decision } => format!("ESCALATED: {}", decision.reason),
            TriageOutcome::Failed { code, .. } => format!("FAILED ({})", code),
        };
        format!(
            "{}: {} [{} round(s), {} tool call(s), {} tokens, {}ms{}]",
            self.ticket_id,
            outcome,
            self.rounds,
            self.tool_traces.len(),
            self.usage.total_tokens,
            self.elapsed_ms,
            if self.failed_over { ", failover" } else { "" }
        )
    }
}
