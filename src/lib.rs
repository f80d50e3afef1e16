//! catalog-search - per-entity full-text indexes over a relational catalogue
//!
//! Builds one tantivy index per catalogue entity (artist, label, release,
//! ...) from bulk row fetches, and serves ranked, paginated queries over
//! those indexes with live reload.
//!
//! # Architecture
//!
//! The codebase is organized into two main modules:
//!
//! - **core**: Domain logic (adapter-agnostic)
//!   - config, error, types, xdg
//!   - schema (data-driven field catalogue, analyzers)
//!   - source (row sources: in-memory, JSON-lines dumps)
//!   - indexer (chunked scan, concurrent writer, build orchestration)
//!   - storage (entity indexes, marker document, snapshots)
//!   - search (standard and dismax parsers, search server, results writer)
//!   - services (unified service container)
//!
//! - **cli**: Command-line adapter (depends on core)
//!   - build, search, explain, serve, status, config, completions
//!
//! # Key Features
//!
//! - Bounded producer/worker/committer pipeline with backpressure
//! - Per-entity failure isolation and soft row-count verification
//! - Dismax scoring computed by the crate over per-field engine scores
//! - Atomically swapped, reference-counted index snapshots

// Core domain logic (adapter-agnostic)
pub mod core;

// Command-line adapter
pub mod cli;

// Re-export commonly used types for convenience
pub use core::config::Config;
pub use core::error::{CatalogError, Result};
pub use core::services::Services;
pub use core::types::*;
