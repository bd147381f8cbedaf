//! Triage decision output types
//!
//! `TriageDecision` is the only business output of a run. Instances reach
//! the caller exclusively through the validator, so a decision held by
//! calling code has already passed the schema checks.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed routing enum; serialized exactly as the variant names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Department {
    Technical,
    Billing,
    Account,
    Sales,
    General,
}

impl Department {
    /// All members, in declaration order
    pub const ALL: [Department; 5] = [
        Department::Technical,
        Department::Billing,
        Department::Account,
        Department::Sales,
        Department::General,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Department::Technical => "Technical",
            Department::Billing => "Billing",
            Department::Account => "Account",
            Department::Sales => "Sales",
            Department::General => "General",
        }
    }
}

impl fmt::Display for Department {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured routing decision for one ticket
///
/// Required fields mirror the decision schema the model is prompted with;
/// the optional tail carries extra context when the model supplies it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TriageDecision {
    pub department: Department,
    pub priority_score: f64,
    pub reason: String,
    pub escalate: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_reply: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub kb_articles_used: Vec<String>,
}

impl TriageDecision {
    /// Decision synthesized when `escalate_to_human` fires
    pub fn escalation(reason: impl Into<String>) -> Self {
        Self {
            department: Department::General,
            priority_score: 1.0,
            reason: reason.into(),
            escalate: true,
            summary: None,
            suggested_reply: None,
            kb_articles_used: Vec::new(),
        }
    }

    /// One-line rendering for logs and batch output
    pub fn summary_line(&self) -> String {
        format!(
            "{} (priority {:.2}{})",
            self.department,
            self.priority_score,
            if self.escalate { ", escalate" } else { "" }
        )
    }
}
