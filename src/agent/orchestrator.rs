//! Triage run orchestrator
//!
//! Drives one ticket through the conversation loop: seed the prompt,
//! relay model tool calls to the registry, enforce the
//! retrieve-before-decide policy, validate the final decision, and
//! fail over to the fallback provider when the primary gives out. The
//! orchestrator never returns an error to the caller; every run ends
//! in a `TriageReport` whose outcome says what happened.

use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use uuid::Uuid;

use crate::agent::state::{StateEvent, TriageState};
use crate::config::Config;
use crate::errors::{AgentError, Result};
use crate::prompts;
use crate::provider::{
    ModelTurn, ProviderAttempt, ProviderClient, ProviderRole, RetryManager, ToolCall, Usage,
};
use crate::telemetry::{TelemetryCollector, TelemetryEvent};
use crate::tools::{ToolRegistry, ToolSchema, ToolTrace, FETCH_CUSTOMER_DATA, QUERY_KNOWLEDGE_BASE};
use crate::types::{
    ChatMessage, ConversationState, Ticket, TriageDecision, TriageOutcome, TriageReport,
};
use crate::validation;

/// Budgets and switches for a triage run
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Model turns allowed per provider before the run moves on
    pub max_rounds: u32,

    /// Corrective retries after a premature final answer
    pub policy_retries: u32,

    /// Corrective retries after a malformed or invalid decision
    pub schema_retries: u32,

    /// Emit state transitions and provider failures to stderr
    pub verbose: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_rounds: 5,
            policy_retries: 2,
            schema_retries: 2,
            verbose: false,
        }
    }
}

impl OrchestratorConfig {
    /// Budgets from the loaded config file
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_rounds: config.budgets.max_rounds,
            policy_retries: config.budgets.policy_retries,
            schema_retries: config.budgets.schema_retries,
            verbose: false,
        }
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

/// Per-run bookkeeping; budgets reset when the fallback takes over,
/// the conversation does not
struct RunContext {
    conversation: ConversationState,
    schemas: Vec<ToolSchema>,
    fetched_customer: bool,
    queried_knowledge: bool,
    rounds: u32,
    total_rounds: u32,
    policy_retries_left: u32,
    schema_retries_left: u32,
    failed_over: bool,
    primary_failure: Option<String>,
    escalation: Option<TriageDecision>,
    traces: Vec<ToolTrace>,
    attempts: Vec<ProviderAttempt>,
    usage: Usage,
}

impl RunContext {
    fn new(schemas: Vec<ToolSchema>, config: &OrchestratorConfig) -> Self {
        Self {
            conversation: ConversationState::new(),
            schemas,
            fetched_customer: false,
            queried_knowledge: false,
            rounds: 0,
            total_rounds: 0,
            policy_retries_left: config.policy_retries,
            schema_retries_left: config.schema_retries,
            failed_over: false,
            primary_failure: None,
            escalation: None,
            traces: Vec::new(),
            attempts: Vec::new(),
            usage: Usage::default(),
        }
    }

    fn policy_met(&self) -> bool {
        self.fetched_customer && self.queried_knowledge
    }

    fn missing_tools(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if !self.fetched_customer {
            missing.push(FETCH_CUSTOMER_DATA);
        }
        if !self.queried_knowledge {
            missing.push(QUERY_KNOWLEDGE_BASE);
        }
        missing
    }

    fn note_success(&mut self, tool: &str) {
        match tool {
            FETCH_CUSTOMER_DATA => self.fetched_customer = true,
            QUERY_KNOWLEDGE_BASE => self.queried_knowledge = true,
            _ => {}
        }
    }
}

/// Orchestrates one ticket at a time; batch runs build one per ticket
/// from shared providers and stores
pub struct TriageOrchestrator {
    state: TriageState,
    primary: Arc<dyn ProviderClient>,
    fallback: Arc<dyn ProviderClient>,
    registry: ToolRegistry,
    retry: RetryManager,
    telemetry: TelemetryCollector,
    config: OrchestratorConfig,
}

impl TriageOrchestrator {
    pub fn new(
        primary: Arc<dyn ProviderClient>,
        fallback: Arc<dyn ProviderClient>,
        registry: ToolRegistry,
        retry: RetryManager,
        telemetry: TelemetryCollector,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            state: TriageState::Start,
            primary,
            fallback,
            registry,
            retry,
            telemetry,
            config,
        }
    }

    /// Current state of the run
    pub fn state(&self) -> TriageState {
        self.state
    }

    pub fn telemetry(&self) -> &TelemetryCollector {
        &self.telemetry
    }

    /// Apply a state machine event, recording the transition
    fn transition(&mut self, event: StateEvent) -> Result<()> {
        let next = self.state.transition(event)?;
        if self.config.verbose && next != self.state {
            eprintln!("[STATE] {:?} -> {:?}", self.state, next);
        }
        self.telemetry.record(TelemetryEvent::StateTransition {
            from: format!("{:?}", self.state),
            to: format!("{:?}", next),
            timestamp: Instant::now(),
        });
        self.state = next;
        Ok(())
    }

    /// Run a single ticket to completion
    pub async fn run_ticket(&mut self, ticket: &Ticket) -> TriageReport {
        let started = Instant::now();
        let run_id = Uuid::new_v4();
        self.state = TriageState::Start;
        let mut ctx = RunContext::new(self.registry.schemas(), &self.config);

        let outcome = match self.drive(ticket, &mut ctx).await {
            Ok(outcome) => outcome,
            Err(error) => {
                if self.config.verbose {
                    eprintln!("[RUN] ticket {} failed: {}", ticket.id, error);
                }
                let _ = self.transition(StateEvent::RunFailed);
                TriageOutcome::Failed {
                    code: error.kind().to_string(),
                    detail: error.to_string(),
                }
            }
        };

        self.telemetry.record(TelemetryEvent::RunCompleted {
            ticket_id: ticket.id.clone(),
            outcome: outcome.label().to_string(),
            rounds: ctx.total_rounds,
            timestamp: Instant::now(),
        });

        TriageReport {
            run_id,
            ticket_id: ticket.id.clone(),
            outcome,
            rounds: ctx.total_rounds,
            tool_traces: ctx.traces,
            provider_attempts: ctx.attempts,
            usage: ctx.usage,
            failed_over: ctx.failed_over,
            elapsed_ms: started.elapsed().as_millis() as u64,
        }
    }

    /// Conversation loop; every exit path is a terminal outcome or an
    /// error the caller converts into one
    async fn drive(&mut self, ticket: &Ticket, ctx: &mut RunContext) -> Result<TriageOutcome> {
        ctx.conversation.push(ChatMessage::system(prompts::SYSTEM_PROMPT));
        ctx.conversation.push(ChatMessage::user(prompts::format_ticket(ticket)));
        self.transition(StateEvent::Seeded)?;

        loop {
            if ctx.rounds >= self.config.max_rounds {
                self.failover_or_fail(ctx, AgentError::RoundsExhausted { rounds: ctx.rounds })?;
                continue;
            }

            let turn = self.request_turn(ctx).await?;
            ctx.rounds += 1;
            ctx.total_rounds += 1;
            ctx.usage.add(turn.usage());

            match turn {
                ModelTurn::ToolCallRequest(request) => {
                    self.transition(StateEvent::ToolCallsRequested)?;
                    self.execute_calls(ctx, &request.calls).await;

                    if let Some(decision) = ctx.escalation.take() {
                        self.transition(StateEvent::EscalationRequested)?;
                        return Ok(TriageOutcome::Escalated { decision });
                    }

                    if ctx.policy_met() {
                        self.transition(StateEvent::PolicySatisfied)?;
                    } else {
                        self.transition(StateEvent::ToolsCompleted)?;
                    }
                }
                ModelTurn::FinalAnswer(answer) => {
                    if !ctx.policy_met() {
                        self.reject_premature_answer(ctx, &answer.raw)?;
                        continue;
                    }

                    self.transition(StateEvent::FinalAnswerReceived)?;
                    match validation::decision_from_reply(&answer.raw) {
                        Ok(decision) => {
                            self.transition(StateEvent::ValidationPassed)?;
                            return Ok(TriageOutcome::Decision { decision });
                        }
                        Err(error) => self.reject_invalid_answer(ctx, &answer.raw, error)?,
                    }
                }
            }
        }
    }

    /// One accepted model turn from the active provider, retrying
    /// transient failures and failing over when the budget is spent
    async fn request_turn(&mut self, ctx: &mut RunContext) -> Result<ModelTurn> {
        loop {
            let (client, role) = if ctx.failed_over {
                (Arc::clone(&self.fallback), ProviderRole::Fallback)
            } else {
                (Arc::clone(&self.primary), ProviderRole::Primary)
            };

            let mut attempt = 0u32;
            let provider_error = loop {
                match client.complete(&ctx.conversation, &ctx.schemas).await {
                    Ok(turn) => {
                        ctx.attempts.push(ProviderAttempt::success(
                            role,
                            client.name(),
                            client.model(),
                            *turn.usage(),
                        ));
                        self.telemetry.record(TelemetryEvent::ProviderAttempted {
                            role: role.as_str().to_string(),
                            provider: client.name().to_string(),
                            success: true,
                            error_kind: None,
                            timestamp: Instant::now(),
                        });
                        return Ok(turn);
                    }
                    Err(error) => {
                        ctx.attempts.push(ProviderAttempt::failure(
                            role,
                            client.name(),
                            client.model(),
                            &error,
                        ));
                        self.telemetry.record(TelemetryEvent::ProviderAttempted {
                            role: role.as_str().to_string(),
                            provider: client.name().to_string(),
                            success: false,
                            error_kind: Some(error.kind().to_string()),
                            timestamp: Instant::now(),
                        });
                        if self.config.verbose {
                            eprintln!("[PROVIDER] {} attempt failed: {}", client.name(), error);
                        }

                        if self.retry.is_retryable(&error) && attempt < self.retry.max_retries() {
                            let delay = self.retry.delay_for(attempt);
                            self.telemetry.record(TelemetryEvent::RetryScheduled {
                                provider: client.name().to_string(),
                                attempt: attempt + 1,
                                delay_ms: delay.as_millis() as u64,
                                timestamp: Instant::now(),
                            });
                            tokio::time::sleep(delay).await;
                            attempt += 1;
                            continue;
                        }
                        break error;
                    }
                }
            };

            if ctx.failed_over {
                let primary = ctx
                    .primary_failure
                    .clone()
                    .unwrap_or_else(|| "unknown".to_string());
                return Err(AgentError::BothProvidersFailed {
                    primary,
                    fallback: provider_error.kind().to_string(),
                });
            }
            if !self.try_failover(ctx, &provider_error) {
                return Err(provider_error);
            }
        }
    }

    /// Switch the run to the fallback provider; false when the run has
    /// already failed over
    fn try_failover(&mut self, ctx: &mut RunContext, reason: &AgentError) -> bool {
        if ctx.failed_over {
            return false;
        }
        ctx.failed_over = true;
        ctx.primary_failure = Some(reason.kind().to_string());
        ctx.rounds = 0;
        ctx.policy_retries_left = self.config.policy_retries;
        ctx.schema_retries_left = self.config.schema_retries;
        self.telemetry.record(TelemetryEvent::Failover {
            from: self.primary.name().to_string(),
            to: self.fallback.name().to_string(),
            reason: reason.kind().to_string(),
            timestamp: Instant::now(),
        });
        if self.config.verbose {
            eprintln!(
                "[FAILOVER] {} -> {} ({})",
                self.primary.name(),
                self.fallback.name(),
                reason.kind()
            );
        }
        true
    }

    fn failover_or_fail(&mut self, ctx: &mut RunContext, error: AgentError) -> Result<()> {
        if self.try_failover(ctx, &error) {
            Ok(())
        } else {
            Err(error)
        }
    }

    /// Execute a requested tool batch in order, feeding every outcome
    /// back into the conversation. Tool failures never abort the run.
    async fn execute_calls(&mut self, ctx: &mut RunContext, calls: &[ToolCall]) {
        let items = calls.iter().map(ToolCall::to_wire).collect();
        ctx.conversation.push(ChatMessage::assistant_tool_calls(items));

        for call in calls {
            self.telemetry.record(TelemetryEvent::ToolStarted {
                tool: call.name.clone(),
                timestamp: Instant::now(),
            });
            let started = Instant::now();

            match self.registry.invoke(&call.name, &call.arguments).await {
                Ok(result) => {
                    self.telemetry.record(TelemetryEvent::ToolCompleted {
                        tool: call.name.clone(),
                        duration_ms: result.duration_ms,
                        success: true,
                        error_kind: None,
                        timestamp: Instant::now(),
                    });
                    ctx.conversation.push(ChatMessage::tool_result(
                        call.id.clone(),
                        result.output.to_string(),
                    ));
                    ctx.traces.push(ToolTrace {
                        tool: call.name.clone(),
                        arguments: call.arguments.clone(),
                        outcome: result.output,
                        success: true,
                        duration_ms: result.duration_ms,
                    });
                    ctx.note_success(&call.name);

                    if self.registry.is_terminal(&call.name) {
                        let reason = call
                            .arguments
                            .get("reason")
                            .and_then(Value::as_str)
                            .unwrap_or("escalation requested")
                            .to_string();
                        ctx.escalation = Some(TriageDecision::escalation(reason));
                        break;
                    }
                }
                Err(tool_error) => {
                    let duration_ms = started.elapsed().as_millis() as u64;
                    self.telemetry.record(TelemetryEvent::ToolCompleted {
                        tool: call.name.clone(),
                        duration_ms,
                        success: false,
                        error_kind: Some(tool_error.kind.as_str().to_string()),
                        timestamp: Instant::now(),
                    });
                    let feedback = tool_error.to_feedback();
                    ctx.conversation.push(ChatMessage::tool_result(
                        call.id.clone(),
                        feedback.to_string(),
                    ));
                    ctx.traces.push(ToolTrace {
                        tool: call.name.clone(),
                        arguments: call.arguments.clone(),
                        outcome: feedback,
                        success: false,
                        duration_ms,
                    });
                }
            }
        }
    }

    /// Final answer before both required tools ran. The rejected
    /// answer stays in the conversation so the model sees what it said.
    fn reject_premature_answer(&mut self, ctx: &mut RunContext, raw: &str) -> Result<()> {
        self.transition(StateEvent::PolicyRejected)?;
        let missing = ctx.missing_tools();
        let correction = prompts::policy_correction(&missing);
        self.telemetry.record(TelemetryEvent::CorrectionIssued {
            kind: "policy".to_string(),
            detail: correction.clone(),
            timestamp: Instant::now(),
        });
        ctx.conversation.push(ChatMessage::assistant_text(raw));
        ctx.conversation.push(ChatMessage::system(correction));

        if ctx.policy_retries_left == 0 {
            return self.failover_or_fail(
                ctx,
                AgentError::PolicyViolation {
                    missing: missing.join(", "),
                },
            );
        }
        ctx.policy_retries_left -= 1;
        Ok(())
    }

    /// Final answer that failed parsing or schema validation
    fn reject_invalid_answer(
        &mut self,
        ctx: &mut RunContext,
        raw: &str,
        error: AgentError,
    ) -> Result<()> {
        self.transition(StateEvent::ValidationRejected)?;
        let correction = prompts::schema_correction(&error);
        self.telemetry.record(TelemetryEvent::CorrectionIssued {
            kind: "schema".to_string(),
            detail: correction.clone(),
            timestamp: Instant::now(),
        });
        ctx.conversation.push(ChatMessage::assistant_text(raw));
        ctx.conversation.push(ChatMessage::system(correction));

        if ctx.schema_retries_left == 0 {
            return self.failover_or_fail(ctx, error);
        }
        ctx.schema_retries_left -= 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::{CustomerDirectory, CustomerRecord, PlanKind, PlanTier};
    use crate::knowledge::{KBArticle, KnowledgeStore};
    use crate::provider::{FinalAnswer, ToolCallRequest};
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;

    struct ScriptedProvider {
        name: &'static str,
        turns: Mutex<VecDeque<Result<ModelTurn>>>,
    }

    impl ScriptedProvider {
        fn new(name: &'static str, turns: Vec<Result<ModelTurn>>) -> Arc<Self> {
            Arc::new(Self {
                name,
                turns: Mutex::new(turns.into_iter().collect()),
            })
        }
    }

    #[async_trait]
    impl ProviderClient for ScriptedProvider {
        fn name(&self) -> &str {
            self.name
        }

        fn model(&self) -> &str {
            "scripted-model"
        }

        async fn complete(
            &self,
            _conversation: &ConversationState,
            _tools: &[ToolSchema],
        ) -> Result<ModelTurn> {
            self.turns.lock().unwrap().pop_front().unwrap_or_else(|| {
                Err(AgentError::Unavailable {
                    source_name: self.name.to_string(),
                    detail: "script exhausted".to_string(),
                })
            })
        }
    }

    fn tool_turn(calls: Vec<(&str, &str, Value)>) -> Result<ModelTurn> {
        let calls = calls
            .into_iter()
            .map(|(id, name, args)| ToolCall::new(id, name, args, 0))
            .collect();
        Ok(ModelTurn::ToolCallRequest(ToolCallRequest {
            calls,
            usage: Usage::default(),
        }))
    }

    fn answer_turn(raw: &str) -> Result<ModelTurn> {
        Ok(ModelTurn::FinalAnswer(FinalAnswer {
            raw: raw.to_string(),
            usage: Usage::default(),
        }))
    }

    fn retrieval_turn() -> Result<ModelTurn> {
        tool_turn(vec![
            ("call_1", FETCH_CUSTOMER_DATA, json!({"customer_id": "C1"})),
            ("call_2", QUERY_KNOWLEDGE_BASE, json!({"query": "password reset"})),
        ])
    }

    fn valid_decision_json() -> &'static str {
        r#"{"department": "Technical", "priority_score": 0.8, "reason": "login outage", "escalate": false}"#
    }

    fn test_registry() -> ToolRegistry {
        let customers = vec![CustomerRecord {
            id: "C1".to_string(),
            name: "Acme Corp".to_string(),
            email: "it@acme.test".to_string(),
            plan: PlanKind::Enterprise,
            region: "us-east".to_string(),
            seats: 250,
            tenure_months: 30,
            previous_tickets: 4,
        }];
        let mut tiers = HashMap::new();
        tiers.insert(
            "enterprise".to_string(),
            PlanTier {
                label: "Enterprise".to_string(),
                sla_hours: Some(4),
                priority: "high".to_string(),
                support_channel: "dedicated".to_string(),
                features: vec!["sso".to_string()],
                auto_escalate: false,
            },
        );
        let directory = Arc::new(CustomerDirectory::from_parts(customers, tiers));
        let store = Arc::new(KnowledgeStore::from_articles(vec![KBArticle {
            id: "KB-1".to_string(),
            topic: "Password reset".to_string(),
            content: "Users can reset passwords from the login page.".to_string(),
            category: "Account".to_string(),
            applies_to_plans: vec![],
            guideline: Default::default(),
        }]));
        ToolRegistry::standard(directory, store)
    }

    fn test_ticket() -> Ticket {
        Ticket::new("T-100", "C1", "Cannot log in since this morning")
    }

    fn orchestrator(
        primary: Arc<dyn ProviderClient>,
        fallback: Arc<dyn ProviderClient>,
    ) -> TriageOrchestrator {
        let retry = RetryManager::new(1, 1, 2, false);
        TriageOrchestrator::new(
            primary,
            fallback,
            test_registry(),
            retry,
            TelemetryCollector::new(),
            OrchestratorConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_happy_path_decision() {
        let primary = ScriptedProvider::new(
            "openai",
            vec![retrieval_turn(), answer_turn(valid_decision_json())],
        );
        let fallback = ScriptedProvider::new("groq", vec![]);
        let mut orch = orchestrator(primary, fallback);

        let report = orch.run_ticket(&test_ticket()).await;

        let decision = report.outcome.decision().expect("expected a decision");
        assert_eq!(decision.department.as_str(), "Technical");
        assert!(!decision.escalate);
        assert_eq!(orch.state(), TriageState::Done);
        assert_eq!(report.rounds, 2);
        assert_eq!(report.tool_traces.len(), 2);
        assert!(report.tool_traces.iter().all(|t| t.success));
        assert!(!report.failed_over);
        assert_eq!(report.provider_attempts.len(), 2);
        assert!(report.provider_attempts.iter().all(|a| a.succeeded()));
    }

    #[tokio::test]
    async fn test_premature_answer_is_corrected() {
        let primary = ScriptedProvider::new(
            "openai",
            vec![
                answer_turn(valid_decision_json()),
                retrieval_turn(),
                answer_turn(valid_decision_json()),
            ],
        );
        let fallback = ScriptedProvider::new("groq", vec![]);
        let mut orch = orchestrator(primary, fallback);

        let report = orch.run_ticket(&test_ticket()).await;

        assert!(report.outcome.decision().is_some());
        assert_eq!(report.rounds, 3);
        let stats = orch.telemetry().get_stats();
        assert_eq!(stats.corrections_issued, 1);
    }

    #[tokio::test]
    async fn test_premature_answer_never_reaches_caller() {
        // Script runs out after the rejected answer; the run must fail
        // rather than surface the unvalidated decision.
        let primary = ScriptedProvider::new("openai", vec![answer_turn(valid_decision_json())]);
        let fallback = ScriptedProvider::new("groq", vec![]);
        let mut orch = orchestrator(primary, fallback);

        let report = orch.run_ticket(&test_ticket()).await;

        assert!(report.outcome.decision().is_none());
        assert_eq!(orch.state(), TriageState::Failed);
    }

    #[tokio::test]
    async fn test_schema_rejection_retries() {
        let primary = ScriptedProvider::new(
            "openai",
            vec![
                retrieval_turn(),
                answer_turn("not json at all"),
                answer_turn(valid_decision_json()),
            ],
        );
        let fallback = ScriptedProvider::new("groq", vec![]);
        let mut orch = orchestrator(primary, fallback);

        let report = orch.run_ticket(&test_ticket()).await;

        assert!(report.outcome.decision().is_some());
        assert_eq!(report.rounds, 3);
        let stats = orch.telemetry().get_stats();
        assert_eq!(stats.corrections_issued, 1);
    }

    #[tokio::test]
    async fn test_escalation_short_circuits() {
        let primary = ScriptedProvider::new(
            "openai",
            vec![tool_turn(vec![(
                "call_1",
                "escalate_to_human",
                json!({"ticket_id": "T-100", "reason": "customer threatens legal action"}),
            )])],
        );
        let fallback = ScriptedProvider::new("groq", vec![]);
        let mut orch = orchestrator(primary, fallback);

        let report = orch.run_ticket(&test_ticket()).await;

        match &report.outcome {
            TriageOutcome::Escalated { decision } => {
                assert!(decision.escalate);
                assert!(decision.reason.contains("legal action"));
            }
            other => panic!("expected escalation, got {:?}", other),
        }
        assert_eq!(orch.state(), TriageState::Escalated);
    }

    #[tokio::test]
    async fn test_rate_limited_primary_fails_over() {
        let primary = ScriptedProvider::new(
            "openai",
            vec![Err(AgentError::RateLimited {
                provider: "openai".to_string(),
            })],
        );
        let fallback = ScriptedProvider::new(
            "groq",
            vec![retrieval_turn(), answer_turn(valid_decision_json())],
        );
        let mut orch = orchestrator(primary, fallback);

        let report = orch.run_ticket(&test_ticket()).await;

        assert!(report.outcome.decision().is_some());
        assert!(report.failed_over);
        let stats = orch.telemetry().get_stats();
        assert_eq!(stats.failovers, 1);
        assert!(!report.provider_attempts[0].succeeded());
        assert!(report.provider_attempts[1..].iter().all(|a| a.succeeded()));
    }

    #[tokio::test]
    async fn test_both_providers_failing_ends_the_run() {
        let primary = ScriptedProvider::new("openai", vec![]);
        let fallback = ScriptedProvider::new("groq", vec![]);
        let mut orch = orchestrator(primary, fallback);

        let report = orch.run_ticket(&test_ticket()).await;

        match &report.outcome {
            TriageOutcome::Failed { code, .. } => {
                assert_eq!(code, "both_providers_failed");
            }
            other => panic!("expected failure, got {:?}", other),
        }
        assert_eq!(orch.state(), TriageState::Failed);
        assert!(report.failed_over);
    }

    #[tokio::test]
    async fn test_tool_failure_feeds_back_without_aborting() {
        let primary = ScriptedProvider::new(
            "openai",
            vec![
                tool_turn(vec![
                    ("call_1", FETCH_CUSTOMER_DATA, json!({"customer_id": "C404"})),
                    ("call_2", QUERY_KNOWLEDGE_BASE, json!({"query": "login"})),
                ]),
                tool_turn(vec![(
                    "call_3",
                    FETCH_CUSTOMER_DATA,
                    json!({"customer_id": "C1"}),
                )]),
                answer_turn(valid_decision_json()),
            ],
        );
        let fallback = ScriptedProvider::new("groq", vec![]);
        let mut orch = orchestrator(primary, fallback);

        let report = orch.run_ticket(&test_ticket()).await;

        assert!(report.outcome.decision().is_some());
        let failures: Vec<_> = report.tool_traces.iter().filter(|t| !t.success).collect();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].outcome["error"], "not_found");
    }

    #[tokio::test]
    async fn test_round_budget_triggers_failover_then_failure() {
        let loops: Vec<Result<ModelTurn>> = (0..10).map(|_| retrieval_turn()).collect();
        let primary = ScriptedProvider::new("openai", loops);
        let loops: Vec<Result<ModelTurn>> = (0..10).map(|_| retrieval_turn()).collect();
        let fallback = ScriptedProvider::new("groq", loops);
        let mut orch = orchestrator(primary, fallback);

        let report = orch.run_ticket(&test_ticket()).await;

        match &report.outcome {
            TriageOutcome::Failed { code, .. } => assert_eq!(code, "rounds_exhausted"),
            other => panic!("expected failure, got {:?}", other),
        }
        assert!(report.failed_over);
        assert_eq!(report.rounds, 10);
    }
}
