//! Failover behavior tests
//!
//! Primary-to-fallback handover through the public API: immediate switch
//! on rate limiting, budget resets, conversation carry-over, and the
//! both-providers-failed terminal case.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};
use triagemate::agent::{OrchestratorConfig, TriageOrchestrator};
use triagemate::directory::{CustomerDirectory, CustomerRecord, PlanKind, PlanTier};
use triagemate::knowledge::{KBArticle, KnowledgeStore};
use triagemate::provider::{
    AttemptOutcome, FinalAnswer, ModelTurn, ProviderClient, ProviderRole, RetryManager, ToolCall,
    ToolCallRequest, Usage,
};
use triagemate::telemetry::{TelemetryCollector, TelemetryEvent};
use triagemate::tools::{ToolRegistry, ToolSchema, FETCH_CUSTOMER_DATA, QUERY_KNOWLEDGE_BASE};
use triagemate::types::{ConversationState, Role, Ticket, TriageOutcome};
use triagemate::{AgentError, Result};

/// Scripted provider that also records the conversation shape it was
/// handed on every call
struct ScriptedProvider {
    name: &'static str,
    turns: Mutex<VecDeque<Result<ModelTurn>>>,
    seen: Mutex<Vec<Vec<Role>>>,
}

impl ScriptedProvider {
    fn new(name: &'static str, turns: Vec<Result<ModelTurn>>) -> Arc<Self> {
        Arc::new(Self {
            name,
            turns: Mutex::new(turns.into_iter().collect()),
            seen: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    fn first_seen_roles(&self) -> Vec<Role> {
        self.seen.lock().unwrap().first().cloned().unwrap_or_default()
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
        conversation: &ConversationState,
        _tools: &[ToolSchema],
    ) -> Result<ModelTurn> {
        self.seen.lock().unwrap().push(conversation.roles());
        self.turns.lock().unwrap().pop_front().unwrap_or_else(|| {
            Err(AgentError::Unavailable {
                source_name: self.name.to_string(),
                detail: "script exhausted".to_string(),
            })
        })
    }
}

fn rate_limited(provider: &str) -> Result<ModelTurn> {
    Err(AgentError::RateLimited {
        provider: provider.to_string(),
    })
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
        ("call_1", FETCH_CUSTOMER_DATA, json!({"customer_id": "C9"})),
        ("call_2", QUERY_KNOWLEDGE_BASE, json!({"query": "login reset"})),
    ])
}

fn valid_decision() -> &'static str {
    r#"{"department": "Technical", "priority_score": 0.8, "reason": "login outage", "escalate": false}"#
}

fn invalid_decision() -> &'static str {
    r#"{"department": "Technical", "priority_score": 2.5, "reason": "login outage", "escalate": false}"#
}

fn registry() -> ToolRegistry {
    let customers = vec![CustomerRecord {
        id: "C9".to_string(),
        name: "Lumenworks".to_string(),
        email: "it@lumenworks.test".to_string(),
        plan: PlanKind::Enterprise,
        region: "us-west".to_string(),
        seats: 240,
        tenure_months: 31,
        previous_tickets: 9,
    }];
    let mut tiers = HashMap::new();
    tiers.insert(
        "enterprise".to_string(),
        PlanTier {
            label: "Enterprise".to_string(),
            sla_hours: Some(4),
            priority: "high".to_string(),
            support_channel: "dedicated slack".to_string(),
            features: vec![],
            auto_escalate: false,
        },
    );
    let directory = Arc::new(CustomerDirectory::from_parts(customers, tiers));
    let store = Arc::new(KnowledgeStore::from_articles(vec![KBArticle {
        id: "KB-001".to_string(),
        topic: "Password reset and login failures".to_string(),
        content: "Send the reset link first.".to_string(),
        category: "troubleshooting".to_string(),
        applies_to_plans: vec![],
        guideline: Default::default(),
    }]));
    ToolRegistry::standard(directory, store)
}

fn ticket() -> Ticket {
    Ticket::new("T1", "C9", "I can't log in, I'm an Enterprise customer")
}

fn orchestrator(
    primary: &Arc<ScriptedProvider>,
    fallback: &Arc<ScriptedProvider>,
) -> TriageOrchestrator {
    TriageOrchestrator::new(
        Arc::clone(primary) as Arc<dyn ProviderClient>,
        Arc::clone(fallback) as Arc<dyn ProviderClient>,
        registry(),
        RetryManager::new(1, 1, 2, false),
        TelemetryCollector::new(),
        OrchestratorConfig::default(),
    )
}

fn failover_reason(telemetry: &TelemetryCollector) -> Option<String> {
    telemetry.recent_events(500).iter().find_map(|e| match e {
        TelemetryEvent::Failover { reason, .. } => Some(reason.clone()),
        _ => None,
    })
}

#[tokio::test]
async fn test_rate_limited_primary_switches_without_retry() {
    let primary = ScriptedProvider::new("openai", vec![rate_limited("openai")]);
    let fallback = ScriptedProvider::new(
        "groq",
        vec![retrieval_turn(), answer_turn(valid_decision())],
    );
    let mut orch = orchestrator(&primary, &fallback);

    let report = orch.run_ticket(&ticket()).await;

    assert!(matches!(report.outcome, TriageOutcome::Decision { .. }));
    assert!(report.failed_over);
    assert_eq!(primary.calls(), 1);
    assert_eq!(fallback.calls(), 2);

    let stats = orch.telemetry().get_stats();
    assert_eq!(stats.failovers, 1);
    assert_eq!(stats.retries_scheduled, 0);
    assert_eq!(failover_reason(orch.telemetry()).as_deref(), Some("rate_limited"));

    assert_eq!(report.provider_attempts.len(), 3);
    assert_eq!(report.provider_attempts[0].role, ProviderRole::Primary);
    assert_eq!(report.provider_attempts[0].outcome, AttemptOutcome::RateLimited);
    assert!(report.provider_attempts[1..].iter().all(|a| a.succeeded()));
}

#[tokio::test]
async fn test_fallback_resumes_carried_conversation() {
    // Primary completes one tool round, then hits its rate limit. The
    // fallback must see the full history including the tool results.
    let primary = ScriptedProvider::new(
        "openai",
        vec![retrieval_turn(), rate_limited("openai")],
    );
    let fallback = ScriptedProvider::new("groq", vec![answer_turn(valid_decision())]);
    let mut orch = orchestrator(&primary, &fallback);

    let report = orch.run_ticket(&ticket()).await;

    assert!(matches!(report.outcome, TriageOutcome::Decision { .. }));
    assert_eq!(
        fallback.first_seen_roles(),
        vec![Role::System, Role::User, Role::Assistant, Role::Tool, Role::Tool]
    );
    assert_eq!(orch.telemetry().get_stats().failovers, 1);
}

#[tokio::test]
async fn test_both_rate_limited_reports_both_failed() {
    let primary = ScriptedProvider::new("openai", vec![rate_limited("openai")]);
    let fallback = ScriptedProvider::new("groq", vec![rate_limited("groq")]);
    let mut orch = orchestrator(&primary, &fallback);

    let report = orch.run_ticket(&ticket()).await;

    match &report.outcome {
        TriageOutcome::Failed { code, detail } => {
            assert_eq!(code, "both_providers_failed");
            assert!(detail.contains("rate_limited"), "detail: {}", detail);
        }
        other => panic!("expected failure, got {:?}", other),
    }
    assert!(report.failed_over);
    assert_eq!(orch.telemetry().get_stats().failovers, 1);
    assert_eq!(report.provider_attempts.len(), 2);
}

#[tokio::test]
async fn test_round_exhaustion_fails_over_with_fresh_rounds() {
    // Primary keeps calling tools and never answers; after max_rounds
    // the run hands over, and the fallback answers in one turn.
    let primary = ScriptedProvider::new(
        "openai",
        vec![
            retrieval_turn(),
            retrieval_turn(),
            retrieval_turn(),
            retrieval_turn(),
            retrieval_turn(),
        ],
    );
    let fallback = ScriptedProvider::new("groq", vec![answer_turn(valid_decision())]);
    let mut orch = orchestrator(&primary, &fallback);

    let report = orch.run_ticket(&ticket()).await;

    assert!(matches!(report.outcome, TriageOutcome::Decision { .. }));
    assert!(report.failed_over);
    assert_eq!(report.rounds, 6);
    assert_eq!(primary.calls(), 5);
    assert_eq!(fallback.calls(), 1);
    assert_eq!(failover_reason(orch.telemetry()).as_deref(), Some("rounds_exhausted"));
}

#[tokio::test]
async fn test_policy_exhaustion_fails_over_with_fresh_budget() {
    // Three premature answers spend the policy budget (two retries plus
    // the exhausting rejection); the fallback starts with a full one.
    let primary = ScriptedProvider::new(
        "openai",
        vec![
            answer_turn(valid_decision()),
            answer_turn(valid_decision()),
            answer_turn(valid_decision()),
        ],
    );
    let fallback = ScriptedProvider::new(
        "groq",
        vec![retrieval_turn(), answer_turn(valid_decision())],
    );
    let mut orch = orchestrator(&primary, &fallback);

    let report = orch.run_ticket(&ticket()).await;

    assert!(matches!(report.outcome, TriageOutcome::Decision { .. }));
    assert!(report.failed_over);
    assert_eq!(failover_reason(orch.telemetry()).as_deref(), Some("policy_violation"));

    let stats = orch.telemetry().get_stats();
    assert_eq!(stats.failovers, 1);
    assert_eq!(stats.corrections_issued, 3);
}

#[tokio::test]
async fn test_schema_exhaustion_fails_over_with_fresh_budget() {
    let primary = ScriptedProvider::new(
        "openai",
        vec![
            retrieval_turn(),
            answer_turn(invalid_decision()),
            answer_turn(invalid_decision()),
            answer_turn(invalid_decision()),
        ],
    );
    let fallback = ScriptedProvider::new(
        "groq",
        vec![answer_turn(invalid_decision()), answer_turn(valid_decision())],
    );
    let mut orch = orchestrator(&primary, &fallback);

    let report = orch.run_ticket(&ticket()).await;

    let decision = report.outcome.decision().expect("expected a decision");
    assert!((decision.priority_score - 0.8).abs() < f64::EPSILON);
    assert!(report.failed_over);
    assert_eq!(failover_reason(orch.telemetry()).as_deref(), Some("schema_violation"));

    let stats = orch.telemetry().get_stats();
    assert_eq!(stats.failovers, 1);
    assert_eq!(stats.corrections_issued, 4);
}

#[tokio::test]
async fn test_unavailable_primary_retries_then_fails_over() {
    // Unavailable is transient: one retry on the primary, then the
    // switch. The fallback exhausts its script the same way, so the run
    // ends as both-providers-failed after two attempts on each side.
    let primary = ScriptedProvider::new("openai", vec![]);
    let fallback = ScriptedProvider::new("groq", vec![]);
    let mut orch = orchestrator(&primary, &fallback);

    let report = orch.run_ticket(&ticket()).await;

    match &report.outcome {
        TriageOutcome::Failed { code, .. } => assert_eq!(code, "both_providers_failed"),
        other => panic!("expected failure, got {:?}", other),
    }
    assert_eq!(primary.calls(), 2);
    assert_eq!(fallback.calls(), 2);

    let stats = orch.telemetry().get_stats();
    assert_eq!(stats.retries_scheduled, 2);
    assert_eq!(stats.provider_attempts, 4);
    assert_eq!(stats.provider_failures, 4);
}
