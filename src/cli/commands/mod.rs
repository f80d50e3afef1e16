//! CLI command implementations
//!
//! Each command module handles argument parsing and execution for a specific CLI command.

pub mod build;
pub mod completions;
pub mod config;
pub mod explain;
pub mod search;
pub mod serve;
pub mod status;

// Re-export argument types for use in mod.rs
pub use build::BuildArgs;
pub use completions::CompletionsArgs;
pub use config::ConfigArgs;
pub use explain::ExplainArgs;
pub use search::SearchArgs;
pub use serve::ServeArgs;
pub use status::StatusArgs;
