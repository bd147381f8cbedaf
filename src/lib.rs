//! TriageMate - Support Ticket Triage Agent
//!
//! A terminal agent that turns raw support tickets into structured routing
//! decisions by driving a tool-calling model through a bounded conversation
//! loop, with automatic failover to a second provider.
//!
//! # Architecture
//!
//! - **Core loop**: orchestrator + state machine + retrieval policy
//! - **Tool runtime**: customer directory, knowledge base, escalation
//! - **Interface**: CLI commands, interactive session, telemetry

pub mod errors;
pub mod types;
pub mod config;
pub mod prompts;
pub mod validation;
pub mod directory;
pub mod knowledge;
pub mod tools;
pub mod provider;
pub mod agent;
pub mod telemetry;
pub mod cli;
pub mod repl;

// Re-export commonly used types
pub use errors::{AgentError, Result};
