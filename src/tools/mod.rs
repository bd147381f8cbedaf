//! Tool system module
//!
//! The registry mediates between the orchestrator and the leaf stores;
//! handlers implement the individual tool contracts.

pub mod handlers;
pub mod registry;
pub mod types;

pub use handlers::{
    EscalateToHuman, FetchCustomerData, QueryKnowledgeBase, TicketTool, ESCALATE_TO_HUMAN,
    FETCH_CUSTOMER_DATA, QUERY_KNOWLEDGE_BASE,
};
pub use registry::ToolRegistry;
pub use types::{ToolError, ToolErrorKind, ToolResult, ToolSchema, ToolTrace};
