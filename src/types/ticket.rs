//! Support ticket input types
//!
//! Tickets are immutable once created: the pipeline only reads them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::errors::Result;

/// One message in a ticket's thread, oldest to newest
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TicketMessage {
    pub timestamp: DateTime<Utc>,
    pub content: String,
}

/// Immutable support ticket as received from the caller
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Ticket {
    pub id: String,
    pub customer_id: String,
    #[serde(default)]
    pub subject: Option<String>,
    pub opened_at: DateTime<Utc>,
    pub messages: Vec<TicketMessage>,
}

impl Ticket {
    /// Build a single-message ticket from free text
    pub fn new(id: impl Into<String>, customer_id: impl Into<String>, body: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            customer_id: customer_id.into(),
            subject: None,
            opened_at: now,
            messages: vec![TicketMessage {
                timestamp: now,
                content: body.into(),
            }],
        }
    }

    /// Full ticket text, message contents joined in order
    pub fn body(&self) -> String {
        self.messages
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Load the sample-tickets file (JSON array of tickets)
    pub fn load_all(path: &Path) -> Result<Vec<Ticket>> {
        let raw = std::fs::read_to_string(path)?;
        let tickets: Vec<Ticket> = serde_json::from_str(&raw)?;
        Ok(tickets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_message_ticket() {
        let ticket = Ticket::new("T1", "C9", "I can't log in");
        assert_eq!(ticket.id, "T1");
        assert_eq!(ticket.customer_id, "C9");
        assert_eq!(ticket.messages.len(), 1);
        assert_eq!(ticket.body(), "I can't log in");
        assert!(ticket.subject.is_none());
    }

    #[test]
    fn test_body_joins_thread_in_order() {
        let mut ticket = Ticket::new("T2", "C1", "First message");
        ticket.messages.push(TicketMessage {
            timestamp: Utc::now(),
            content: "Second message".to_string(),
        });
        assert_eq!(ticket.body(), "First message\nSecond message");
    }

    #[test]
    fn test_ticket_deserialization() {
        let raw = r#"{
            "id": "T7",
            "customer_id": "C3",
            "subject": "Billing question",
            "opened_at": "2024-01-15T09:23:00Z",
            "messages": [
                {"timestamp": "2024-01-15T09:23:00Z", "content": "Why was I charged twice?"}
            ]
        }"#;

        let ticket: Ticket = serde_json::from_str(raw).unwrap();
        assert_eq!(ticket.id, "T7");
        assert_eq!(ticket.subject.as_deref(), Some("Billing question"));
        assert_eq!(ticket.messages.len(), 1);
    }

    #[test]
    fn test_load_all_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample_tickets.json");
        std::fs::write(
            &path,
            r#"[{
                "id": "T1",
                "customer_id": "C1",
                "opened_at": "2024-01-15T09:23:00Z",
                "messages": [{"timestamp": "2024-01-15T09:23:00Z", "content": "Help"}]
            }]"#,
        )
        .unwrap();

        let tickets = Ticket::load_all(&path).unwrap();
        assert_eq!(tickets.len(), 1);
        assert_eq!(tickets[0].id, "T1");
    }
}
