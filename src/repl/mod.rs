//! Interactive session module
//!
//! The terminal UI for triaging tickets one at a time: ticket picker,
//! run display, and session stats.

pub mod display;
pub mod session;

pub use display::DisplayManager;
pub use session::{TriageRuntime, TriageSession};
