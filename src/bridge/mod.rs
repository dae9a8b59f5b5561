//! Bridge module for IRC-Slack message coordination.
//!
//! ## Module Structure
//!
//! - `commands`: In-band `?` command parsing and replies
//! - `orchestrator`: Main bridge orchestrator (`Bridge` struct)

pub mod commands;
pub mod orchestrator;

// Re-export main types for convenience
pub use orchestrator::{Bridge, BridgeTasks};
