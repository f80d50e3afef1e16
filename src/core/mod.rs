//! Core domain logic (adapter-agnostic)
//!
//! This module contains all indexing and search logic that is
//! independent of the CLI.
//!
//! # Architecture
//!
//! - **config**: Configuration loading (TOML + environment)
//! - **error**: Error types and Result alias
//! - **types**: Rows, documents and results
//! - **xdg**: XDG directory handling
//! - **schema**: Per-entity field catalogue and analyzers
//! - **source**: Row sources feeding the build
//! - **indexer**: Chunked scan, concurrent writer, build orchestration
//! - **storage**: Entity index directories, tantivy, snapshots
//! - **search**: Query parsers, search server, results writer
//! - **services**: Unified service container

pub mod config;
pub mod error;
pub mod indexer;
pub mod schema;
pub mod search;
pub mod services;
pub mod source;
pub mod storage;
pub mod types;
pub mod xdg;

// Re-export key types for convenience
pub use config::Config;
pub use error::{CatalogError, Result};
pub use services::Services;
