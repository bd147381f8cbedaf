//! Tool handlers backing the registry
//!
//! Each tool is one `TicketTool` implementation: the two leaf-store
//! adapters plus the terminal escalation tool. Handlers never panic on
//! bad input; every failure becomes a `ToolError` the model gets to see.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::directory::CustomerDirectory;
use crate::errors::AgentError;
use crate::knowledge::{KnowledgeStore, DEFAULT_TOP_K};
use crate::tools::types::ToolError;

pub const FETCH_CUSTOMER_DATA: &str = "fetch_customer_data";
pub const QUERY_KNOWLEDGE_BASE: &str = "query_knowledge_base";
pub const ESCALATE_TO_HUMAN: &str = "escalate_to_human";

/// Capability interface every tool implements
#[async_trait]
pub trait TicketTool: Send + Sync {
    /// Unique tool name as declared to the providers
    fn name(&self) -> &'static str;

    /// Description shown to the model
    fn description(&self) -> &'static str;

    /// JSON parameter schema
    fn parameters(&self) -> Value;

    /// Terminal tools short-circuit the run once invoked
    fn terminal(&self) -> bool {
        false
    }

    /// Execute with already schema-checked arguments
    async fn execute(&self, args: &Value) -> Result<Value, ToolError>;
}

fn required_str<'a>(args: &'a Value, key: &str) -> Result<&'a str, ToolError> {
    args.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| ToolError::invalid_call(format!("missing required string field '{}'", key)))
}

/// Customer profile lookup over the directory
pub struct FetchCustomerData {
    directory: Arc<CustomerDirectory>,
}

impl FetchCustomerData {
    pub fn new(directory: Arc<CustomerDirectory>) -> Self {
        Self { directory }
    }
}

#[async_trait]
impl TicketTool for FetchCustomerData {
    fn name(&self) -> &'static str {
        FETCH_CUSTOMER_DATA
    }

    fn description(&self) -> &'static str {
        "Look up the customer profile by customer id. Returns account info \
         including plan type, region, usage history, and plan tier details \
         (SLA, priority level, support channel). Always call this first to \
         understand the customer context before making triage decisions."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "customer_id": {
                    "type": "string",
                    "description": "The customer id to look up."
                }
            },
            "required": ["customer_id"]
        })
    }

    async fn execute(&self, args: &Value) -> Result<Value, ToolError> {
        let customer_id = required_str(args, "customer_id")?;

        match self.directory.get(customer_id) {
            Ok(profile) => serde_json::to_value(profile)
                .map_err(|e| ToolError::unavailable(format!("profile serialization failed: {}", e))),
            Err(AgentError::NotFound { .. }) => Err(ToolError::not_found(format!(
                "No customer found with id: {}",
                customer_id
            ))),
            Err(e) => Err(ToolError::unavailable(e.to_string())),
        }
    }
}

/// Knowledge-base retrieval over the article index
pub struct QueryKnowledgeBase {
    store: Arc<KnowledgeStore>,
}

impl QueryKnowledgeBase {
    pub fn new(store: Arc<KnowledgeStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl TicketTool for QueryKnowledgeBase {
    fn name(&self) -> &'static str {
        QUERY_KNOWLEDGE_BASE
    }

    fn description(&self) -> &'static str {
        "Search the knowledge base for relevant FAQ articles, troubleshooting \
         guides, and business guidelines. Returns matching articles with their \
         recommended actions. Use this to find the appropriate resolution and \
         action guidelines."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Natural language description of the customer's issue to search for."
                },
                "k": {
                    "type": "integer",
                    "description": "Number of passages to return.",
                    "default": DEFAULT_TOP_K,
                    "minimum": 1,
                    "maximum": 10
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, args: &Value) -> Result<Value, ToolError> {
        let query = required_str(args, "query")?;
        let k = args
            .get("k")
            .and_then(Value::as_u64)
            .map(|k| k as usize)
            .unwrap_or(DEFAULT_TOP_K);

        // Empty result set is a valid answer, not an error
        let passages = self.store.search(query, k);
        serde_json::to_value(passages)
            .map_err(|e| ToolError::unavailable(format!("passage serialization failed: {}", e)))
    }
}

/// Terminal hand-off tool; invoking it ends the run with escalate=true
pub struct EscalateToHuman;

impl EscalateToHuman {
    pub fn new() -> Self {
        Self
    }
}

impl Default for EscalateToHuman {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TicketTool for EscalateToHuman {
    fn name(&self) -> &'static str {
        ESCALATE_TO_HUMAN
    }

    fn description(&self) -> &'static str {
        "Escalate the ticket to a human agent. Use this when the issue needs \
         human judgement: legal threats, security incidents, refunds above \
         policy limits, or an Enterprise customer with auto-escalation. This \
         ends automated triage for the ticket."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "ticket_id": {
                    "type": "string",
                    "description": "The ticket being escalated."
                },
                "reason": {
                    "type": "string",
                    "description": "Why a human needs to take over."
                }
            },
            "required": ["ticket_id", "reason"]
        })
    }

    fn terminal(&self) -> bool {
        true
    }

    async fn execute(&self, args: &Value) -> Result<Value, ToolError> {
        let ticket_id = required_str(args, "ticket_id")?;
        let reason = required_str(args, "reason")?;

        Ok(json!({
            "status": "escalation_requested",
            "ticket_id": ticket_id,
            "reason": reason,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::{CustomerRecord, PlanKind};
    use crate::knowledge::{Guideline, KBArticle};
    use crate::tools::types::ToolErrorKind;
    use std::collections::HashMap;

    fn directory_with(id: &str) -> Arc<CustomerDirectory> {
        Arc::new(CustomerDirectory::from_parts(
            vec![CustomerRecord {
                id: id.to_string(),
                name: "Kai".to_string(),
                email: "kai@example.com".to_string(),
                plan: PlanKind::Pro,
                region: "us-east".to_string(),
                seats: 5,
                tenure_months: 7,
                previous_tickets: 0,
            }],
            HashMap::new(),
        ))
    }

    fn store_with_login_article() -> Arc<KnowledgeStore> {
        Arc::new(KnowledgeStore::from_articles(vec![KBArticle {
            id: "KB-001".to_string(),
            topic: "Login problems".to_string(),
            content: "Use the password reset link when login fails.".to_string(),
            category: "faq".to_string(),
            applies_to_plans: vec![],
            guideline: Guideline::default(),
        }]))
    }

    #[tokio::test]
    async fn test_fetch_customer_data_success() {
        let tool = FetchCustomerData::new(directory_with("C1"));
        let output = tool.execute(&json!({"customer_id": "C1"})).await.unwrap();

        assert_eq!(output["id"], "C1");
        assert_eq!(output["plan"], "pro");
        assert!(output["plan_details"].is_object());
    }

    #[tokio::test]
    async fn test_fetch_customer_data_not_found() {
        let tool = FetchCustomerData::new(directory_with("C1"));
        let err = tool.execute(&json!({"customer_id": "C404"})).await.unwrap_err();

        assert_eq!(err.kind, ToolErrorKind::NotFound);
        assert!(err.detail.contains("C404"));
    }

    #[tokio::test]
    async fn test_fetch_customer_data_missing_argument() {
        let tool = FetchCustomerData::new(directory_with("C1"));
        let err = tool.execute(&json!({})).await.unwrap_err();

        assert_eq!(err.kind, ToolErrorKind::InvalidCall);
    }

    #[tokio::test]
    async fn test_query_knowledge_base_default_k() {
        let tool = QueryKnowledgeBase::new(store_with_login_article());
        let output = tool.execute(&json!({"query": "login reset"})).await.unwrap();

        let hits = output.as_array().unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0]["article_id"], "KB-001");
    }

    #[tokio::test]
    async fn test_query_knowledge_base_no_match_is_empty() {
        let tool = QueryKnowledgeBase::new(store_with_login_article());
        let output = tool.execute(&json!({"query": "quantum gravity"})).await.unwrap();

        assert!(output.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_escalate_is_terminal() {
        let tool = EscalateToHuman::new();
        assert!(tool.terminal());

        let output = tool
            .execute(&json!({"ticket_id": "T3", "reason": "legal threat"}))
            .await
            .unwrap();
        assert_eq!(output["status"], "escalation_requested");
        assert_eq!(output["reason"], "legal threat");
    }

    #[test]
    fn test_leaf_tools_are_not_terminal() {
        let fetch = FetchCustomerData::new(directory_with("C1"));
        let query = QueryKnowledgeBase::new(store_with_login_article());
        assert!(!fetch.terminal());
        assert!(!query.terminal());
    }
}
