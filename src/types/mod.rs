//! Type definitions module
//!
//! Core data records flowing through the triage pipeline.

pub mod conversation;
pub mod decision;
pub mod report;
pub mod ticket;

// Re-export commonly used types
pub use conversation::{ChatMessage, ConversationState, Role, ToolCallItem};
pub use decision::{Department, TriageDecision};
pub use report::{TriageOutcome, TriageReport};
pub use ticket::{Ticket, TicketMessage};
