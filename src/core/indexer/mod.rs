//! Bulk index building.
//!
//! Rows flow from a [`DataSource`](crate::core::source::DataSource)
//! through the pieces of this module:
//!
//! - **chunker**: id ranges, one bulk fetch each
//! - **mapper**: row -> document, driven by the entity schema
//! - **encoder**: per-document analysis run by the workers
//! - **writer**: bounded queue, worker pool, single committer
//! - **pipeline**: per-entity state machine with soft verification

pub mod chunker;
pub mod encoder;
pub mod mapper;
pub mod pipeline;
pub mod writer;

pub use chunker::{chunk_count, ChunkRange, ChunkedRowScanner};
pub use encoder::DocumentEncoder;
pub use mapper::DocumentMapper;
pub use pipeline::{BuildReport, BuildState, IndexBuildOrchestrator};
pub use writer::{resolve_workers, ConcurrentIndexWriter, DocumentSink, FlushStats};
