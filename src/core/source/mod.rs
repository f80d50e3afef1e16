//! Row sources feeding the index build.
//!
//! The build pipeline only needs three things from the relational side:
//! the highest primary key, one bulk fetch per id range (primary rows with
//! their child collections already joined) and a row count for
//! verification.

mod jsonl;
mod memory;

pub use jsonl::JsonlSource;
pub use memory::MemorySource;

use crate::core::error::Result;
use crate::core::types::Row;

/// Relational collaborator consumed by the build orchestrator
pub trait DataSource: Send + Sync {
    /// Highest primary key of an entity (0 when empty)
    fn max_id(&self, entity: &str) -> Result<u64>;

    /// Rows with `min <= id <= max`, ordered by id, children joined
    fn fetch_range(&self, entity: &str, min: u64, max: u64) -> Result<Vec<Row>>;

    /// Number of rows with `id <= max_id`
    fn row_count(&self, entity: &str, max_id: u64) -> Result<u64>;
}
