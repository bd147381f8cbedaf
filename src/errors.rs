//! Error types for TriageMate
//!
//! One taxonomy for the whole pipeline: tool dispatch, provider calls,
//! schema validation, and the orchestrator state machine.

use thiserror::Error;

/// Main error type for the triage agent system
#[derive(Error, Debug)]
pub enum AgentError {
    /// State machine transition errors
    #[error("Invalid state transition from {from:?} to {to:?}: {reason}")]
    InvalidTransition {
        from: String,
        to: String,
        reason: String,
    },

    /// Bad tool arguments or unknown tool name
    #[error("Invalid tool call to '{tool}': {reason}")]
    InvalidCall { tool: String, reason: String },

    /// Provider or leaf store unreachable
    #[error("{source_name} unavailable: {detail}")]
    Unavailable { source_name: String, detail: String },

    /// Provider throttling; always routes to the fallback provider
    #[error("Provider '{provider}' rate limited")]
    RateLimited { provider: String },

    /// Provider output that parses as neither a tool call nor a decision
    #[error("Malformed provider response: {detail}")]
    MalformedResponse { detail: String },

    /// Final answer failed decision-schema validation
    #[error("Decision schema violation: {detail}")]
    SchemaViolation { detail: String },

    /// Final answer offered before the mandatory tools ran
    #[error("Policy violation: final answer before required tools ({missing})")]
    PolicyViolation { missing: String },

    /// Directory or knowledge-base miss
    #[error("{entity} not found: {key}")]
    NotFound { entity: String, key: String },

    /// Timeout errors
    #[error("Operation timed out after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// Model round budget spent without an accepted decision
    #[error("Exhausted {rounds} model rounds without a valid decision")]
    RoundsExhausted { rounds: u32 },

    /// Terminal failover outcome carrying both providers' failure kinds
    #[error("Both providers failed (primary: {primary}, fallback: {fallback})")]
    BothProvidersFailed { primary: String, fallback: String },

    /// HTTP client errors
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Generic errors with context
    #[error("Agent error: {0}")]
    Generic(String),
}

impl AgentError {
    /// Short taxonomy code used in failure records and telemetry
    pub fn kind(&self) -> &'static str {
        match self {
            AgentError::InvalidTransition { .. } => "invalid_transition",
            AgentError::InvalidCall { .. } => "invalid_call",
            AgentError::Unavailable { .. } => "unavailable",
            AgentError::RateLimited { .. } => "rate_limited",
            AgentError::MalformedResponse { .. } => "malformed_response",
            AgentError::SchemaViolation { .. } => "schema_violation",
            AgentError::PolicyViolation { .. } => "policy_violation",
            AgentError::NotFound { .. } => "not_found",
            AgentError::Timeout { .. } => "timeout",
            AgentError::RoundsExhausted { .. } => "rounds_exhausted",
            AgentError::BothProvidersFailed { .. } => "both_providers_failed",
            AgentError::HttpError(_) => "http_error",
            AgentError::SerializationError(_) => "serialization_error",
            AgentError::IoError(_) => "io_error",
            AgentError::ConfigError(_) => "config_error",
            AgentError::Generic(_) => "generic",
        }
    }
}

/// Result type alias for agent operations
pub type Result<T> = std::result::Result<T, AgentError>;

/// Convert anyhow errors to AgentError
impl From<anyhow::Error> for AgentError {
    fn from(err: anyhow::Error) -> Self {
        AgentError::Generic(err.to_string())
    }
}
