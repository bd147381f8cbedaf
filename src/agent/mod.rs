//! Agent orchestration module
//!
//! The triage state machine and the orchestrator that drives it.

pub mod orchestrator;
pub mod state;

// Re-export commonly used types
pub use orchestrator::{OrchestratorConfig, TriageOrchestrator};
pub use state::{StateEvent, TriageState};
