//! Storage layer for per-entity tantivy indexes.
//!
//! # Architecture
//!
//! - **IndexStore**: one directory per entity plus its build info
//! - **EntityIndex**: tantivy index wrapper (create/reset/open, marker)
//! - **TantivySink**: committer-side writer used by the build
//! - **SnapshotSource**: atomically swapped searcher snapshots for serving

mod snapshot;
mod store;
mod tantivy;

pub use snapshot::{MarkerLookup, Snapshot, SnapshotSource};
pub use store::{BuildInfo, IndexStatus, IndexStore};
pub use tantivy::{stored_text, EntityIndex, TantivySink};
