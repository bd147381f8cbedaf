//! Prompt assembly
//!
//! The system prompt carries the whole output contract; corrective
//! messages quote it back when the model strays.

use crate::errors::AgentError;
use crate::tools::{FETCH_CUSTOMER_DATA, QUERY_KNOWLEDGE_BASE};
use crate::types::Ticket;

/// Instructions sent as the opening system turn of every run
pub const SYSTEM_PROMPT: &str = r#"You are a support ticket triage agent for a SaaS product. Your job is to read one support ticket, gather context, and route it.

Before giving a final answer you MUST:
1. Call fetch_customer_data with the ticket's customer id to learn who is affected and what plan they are on.
2. Call query_knowledge_base with a short search query describing the problem to find relevant internal guidance.

Use the returned guidance and plan details when judging urgency. If the situation clearly needs a human right now (the customer threatens to cancel or take legal action, reports a security breach, or the guidance says to hand off), call escalate_to_human with a concise reason instead of answering.

When you have enough context, reply with a single JSON object and nothing else. No prose, no markdown fences. The object must have exactly these required fields:
- "department": one of "Technical", "Billing", "Account", "Sales", "General"
- "priority_score": a number between 0.0 and 1.0
- "reason": one or two sentences explaining the routing
- "escalate": true if a human should review this ticket before any reply goes out, otherwise false

You may also include optional fields "summary" (one-line restatement of the issue), "suggested_reply" (a short draft reply to the customer), and "kb_articles_used" (ids of knowledge base articles you relied on).

Priority guidance: 0.9-1.0 for outages, security incidents, or blocked Enterprise customers; 0.5-0.8 for degraded functionality or billing disputes; 0.1-0.4 for routine questions and feature requests."#;

/// Render one ticket as the opening user turn
pub fn format_ticket(ticket: &Ticket) -> String {
    let mut lines = vec![
        format!("## Support Ticket: {}", ticket.id),
        format!("**Customer ID:** {}", ticket.customer_id),
        format!("**Subject:** {}", ticket.subject.as_deref().unwrap_or("N/A")),
        String::new(),
        "### Messages (oldest to newest):".to_string(),
    ];

    for message in &ticket.messages {
        lines.push(format!("\n[{}]\n{}", message.timestamp.to_rfc3339(), message.content));
    }

    lines.join("\n")
}

/// Sent when the model answered before consulting the mandatory tools
pub fn policy_correction(missing: &[&str]) -> String {
    format!(
        "You gave a final answer before consulting the required tools. You still need to call: {}. \
         Call them now and only answer once both {} and {} have returned results.",
        missing.join(", "),
        FETCH_CUSTOMER_DATA,
        QUERY_KNOWLEDGE_BASE
    )
}

/// Sent when the final answer failed parsing or schema validation
pub fn schema_correction(error: &AgentError) -> String {
    format!(
        "Your last reply was not a valid triage decision: {}. \
         Reply again with a single JSON object containing the required fields \
         \"department\", \"priority_score\", \"reason\", and \"escalate\". \
         Do not include any text outside the JSON object.",
        error
    )
}
