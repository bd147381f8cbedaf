//! Provider integration
//!
//! A trait seam over the chat-completions dialect, the concrete HTTP
//! client, and the retry pacing applied before failover.

pub mod client;
pub mod retry;
pub mod types;

pub use client::{ChatProviderClient, ProviderClient};
pub use retry::RetryManager;
pub use types::{
    AttemptOutcome, FinalAnswer, ModelTurn, ProviderAttempt, ProviderRole, ToolCall, ToolCallRequest,
    Usage,
};
