//! Primary-key range scanning.
//!
//! The build walks an entity's id space in fixed-size inclusive ranges so
//! that each range maps to exactly one bulk fetch against the data source.
//! Ranges start at 0 and the last one is clamped to `max_id`, so together
//! they partition `[0, max_id]` with no gaps or overlaps.
//!
//! # Example
//!
//! ```
//! use catalog_search::core::indexer::ChunkedRowScanner;
//!
//! let ranges: Vec<_> = ChunkedRowScanner::new(25, 10).collect();
//! assert_eq!(ranges.len(), 3);
//! assert_eq!((ranges[2].min, ranges[2].max), (20, 25));
//! ```

/// Inclusive id range fetched in one round trip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkRange {
    pub min: u64,
    pub max: u64,
}

impl ChunkRange {
    /// Number of ids covered by the range
    pub fn width(&self) -> u64 {
        self.max - self.min + 1
    }
}

/// Iterator over the id ranges of `[0, max_id]`.
///
/// `chunk_size` must be > 0; the orchestrator rejects a zero chunk size
/// as a configuration error before any scanner is built.
#[derive(Debug, Clone)]
pub struct ChunkedRowScanner {
    next: Option<u64>,
    max_id: u64,
    chunk_size: u64,
}

impl ChunkedRowScanner {
    /// Create a scanner over `[0, max_id]`.
    ///
    /// # Arguments
    ///
    /// * `max_id` - Highest primary key to cover (inclusive)
    /// * `chunk_size` - Ids per range (a zero size is treated as 1)
    pub fn new(max_id: u64, chunk_size: u64) -> Self {
        Self {
            next: Some(0),
            max_id,
            chunk_size: chunk_size.max(1),
        }
    }

    /// Total number of ranges this scanner yields
    pub fn chunk_count(&self) -> u64 {
        chunk_count(self.max_id, self.chunk_size)
    }
}

impl Iterator for ChunkedRowScanner {
    type Item = ChunkRange;

    fn next(&mut self) -> Option<ChunkRange> {
        let min = self.next?;
        let max = min.saturating_add(self.chunk_size - 1).min(self.max_id);
        self.next = if max >= self.max_id {
            None
        } else {
            Some(max + 1)
        };
        Some(ChunkRange { min, max })
    }
}

/// `ceil((max_id + 1) / chunk_size)` without overflowing at `u64::MAX`
pub fn chunk_count(max_id: u64, chunk_size: u64) -> u64 {
    let size = chunk_size.max(1);
    max_id / size + 1
}
