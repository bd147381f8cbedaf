//! Triage run state machine
//!
//! A deterministic finite state machine over one ticket's lifecycle:
//! - Safety: no invalid states reachable
//! - Liveness: every run ends in Done, Escalated, or Failed
//! - Determinism: unique next state per (state, event) pair
//!
//! The orchestrator drives it; tests exercise it directly.

use crate::errors::{AgentError, Result};
use serde::{Deserialize, Serialize};

/// Triage run states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TriageState {
    /// Run created, conversation not yet seeded
    Start,

    /// Mandatory context tools have not all succeeded yet
    AwaitingToolPolicy,

    /// Requested tool calls are being dispatched
    ToolExecution,

    /// Policy satisfied, waiting for the model's final answer
    ModelDecision,

    /// Final answer received, schema checks running
    Validating,

    /// Validated decision produced (terminal)
    Done,

    /// Handed to a human via the escalation tool (terminal)
    Escalated,

    /// All retry budgets exhausted (terminal)
    Failed,
}

/// Events that trigger state transitions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateEvent {
    /// Conversation seeded with system prompt and ticket
    Seeded,

    /// Provider asked for one or more tool calls
    ToolCallsRequested,

    /// Tool batch finished, mandatory tools still outstanding
    ToolsCompleted,

    /// Tool batch finished and both mandatory tools have succeeded
    PolicySatisfied,

    /// Final answer arrived before the mandatory tools ran
    PolicyRejected,

    /// Final answer accepted for validation
    FinalAnswerReceived,

    /// Decision passed schema validation
    ValidationPassed,

    /// Decision failed schema validation, corrective retry issued
    ValidationRejected,

    /// The escalation tool fired
    EscalationRequested,

    /// Budgets exhausted on both providers
    RunFailed,
}

impl TriageState {
    /// Check if this is a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, TriageState::Done | TriageState::Escalated | TriageState::Failed)
    }

    /// Attempt state transition with validation
    ///
    /// Valid transitions:
    /// ```text
    /// 1.  Start              → AwaitingToolPolicy (on: Seeded)
    /// 2.  AwaitingToolPolicy → ToolExecution      (on: ToolCallsRequested)
    /// 3.  AwaitingToolPolicy → AwaitingToolPolicy (on: PolicyRejected)
    /// 4.  ToolExecution      → AwaitingToolPolicy (on: ToolsCompleted)
    /// 5.  ToolExecution      → ModelDecision      (on: PolicySatisfied)
    /// 6.  ToolExecution      → Escalated          (on: EscalationRequested)
    /// 7.  ModelDecision      → ToolExecution      (on: ToolCallsRequested)
    /// 8.  ModelDecision      → Validating         (on: FinalAnswerReceived)
    /// 9.  Validating         → Done               (on: ValidationPassed)
    /// 10. Validating         → ModelDecision      (on: ValidationRejected)
    /// 11. *                  → Failed             (on: RunFailed)
    /// 12. terminal states self-loop
    /// ```
    pub fn transition(&self, event: StateEvent) -> Result<TriageState> {
        use StateEvent::*;
        use TriageState::*;

        // Budget exhaustion can strike from any state
        if event == RunFailed {
            return Ok(Failed);
        }

        let next_state = match (self, event) {
            // From Start
            (Start, Seeded) => AwaitingToolPolicy,

            // From AwaitingToolPolicy
            (AwaitingToolPolicy, ToolCallsRequested) => ToolExecution,
            (AwaitingToolPolicy, PolicyRejected) => AwaitingToolPolicy,

            // From ToolExecution
            (ToolExecution, ToolsCompleted) => AwaitingToolPolicy,
            (ToolExecution, PolicySatisfied) => ModelDecision,
            (ToolExecution, EscalationRequested) => Escalated,

            // From ModelDecision
            (ModelDecision, ToolCallsRequested) => ToolExecution,
            (ModelDecision, FinalAnswerReceived) => Validating,

            // From Validating
            (Validating, ValidationPassed) => Done,
            (Validating, ValidationRejected) => ModelDecision,

            // Terminal states (self-loops)
            (Done, _) => Done,
            (Escalated, _) => Escalated,
            (Failed, _) => Failed,

            // Invalid transitions
            (from, event) => {
                return Err(AgentError::InvalidTransition {
                    from: format!("{:?}", from),
                    to: format!("(via {:?})", event),
                    reason: format!("No valid transition from {:?} on {:?}", from, event),
                });
            }
        };

        Ok(next_state)
    }

    /// Get all valid events from this state
    pub fn valid_events(&self) -> Vec<StateEvent> {
        use StateEvent::*;
        use TriageState::*;

        match self {
            Start => vec![Seeded, RunFailed],
            AwaitingToolPolicy => vec![ToolCallsRequested, PolicyRejected, RunFailed],
            ToolExecution => vec![ToolsCompleted, PolicySatisfied, EscalationRequested, RunFailed],
            ModelDecision => vec![ToolCallsRequested, FinalAnswerReceived, RunFailed],
            Validating => vec![ValidationPassed, ValidationRejected, RunFailed],
            Done | Escalated | Failed => vec![RunFailed],
        }
    }

    /// Human-readable state name
    pub fn display_name(&self) -> &'static str {
        match self {
            TriageState::Start => "Starting",
            TriageState::AwaitingToolPolicy => "Gathering Context",
            TriageState::ToolExecution => "Executing Tools",
            TriageState::ModelDecision => "Awaiting Decision",
            TriageState::Validating => "Validating Decision",
            TriageState::Done => "Completed",
            TriageState::Escalated => "Escalated",
            TriageState::Failed => "Failed",
        }
    }
}
