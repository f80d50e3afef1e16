//! Index build orchestration.
//!
//! Drives one entity at a time through:
//!
//! ```text
//! Init -> SchemaReady -> Scanning(1..n) -> Flushing -> Verifying -> Done
//!   \________________________________________________________/
//!                              |
//!                            Failed
//! ```
//!
//! 1. Open (reset or recreate) the entity index and stage the marker
//! 2. Scan `[0, max_id]` in chunks, one bulk fetch per chunk
//! 3. Map rows and submit them to the concurrent writer
//! 4. Flush, optionally merge all segments
//! 5. Compare committed documents with the source row count
//!
//! A failure is confined to its entity: nothing is committed for it and
//! the remaining entities still build.

use chrono::Utc;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use super::chunker::ChunkedRowScanner;
use super::encoder::DocumentEncoder;
use super::mapper::DocumentMapper;
use super::writer::ConcurrentIndexWriter;
use crate::core::config::BuildConfig;
use crate::core::error::{CatalogError, Result};
use crate::core::schema::SchemaCatalog;
use crate::core::source::DataSource;
use crate::core::storage::{BuildInfo, IndexStore, TantivySink};

/// Upper bound on the writer queue regardless of chunk size
const MAX_QUEUE_BOUND: u64 = 1 << 20;

/// Per-entity build state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildState {
    Init,
    SchemaReady,
    Scanning { chunk: u64, of: u64 },
    Flushing,
    Verifying,
    Done,
    Failed,
}

impl fmt::Display for BuildState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildState::Init => write!(f, "init"),
            BuildState::SchemaReady => write!(f, "schema-ready"),
            BuildState::Scanning { chunk, of } => write!(f, "scanning {chunk}/{of}"),
            BuildState::Flushing => write!(f, "flushing"),
            BuildState::Verifying => write!(f, "verifying"),
            BuildState::Done => write!(f, "done"),
            BuildState::Failed => write!(f, "failed"),
        }
    }
}

/// Outcome of one entity build
#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    pub entity: String,

    /// `Done` or `Failed`
    pub state: BuildState,

    /// State the build was in when it failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_in: Option<BuildState>,

    /// Committed entity documents (marker excluded)
    pub documents: u64,

    /// Source row count, when verification ran
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_rows: Option<u64>,

    pub chunks: u64,

    pub duration_ms: u64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BuildReport {
    pub fn is_success(&self) -> bool {
        self.state == BuildState::Done
    }

    /// Whether the committed count matched the source row count
    pub fn verified(&self) -> bool {
        self.expected_rows == Some(self.documents)
    }
}

/// Mutable progress of one entity build
struct BuildRun<'a> {
    entity: &'a str,
    state: BuildState,
    chunks: u64,
    started: Instant,
}

impl<'a> BuildRun<'a> {
    fn new(entity: &'a str) -> Self {
        Self {
            entity,
            state: BuildState::Init,
            chunks: 0,
            started: Instant::now(),
        }
    }

    fn advance(&mut self, next: BuildState) {
        debug!("Build '{}': {} -> {}", self.entity, self.state, next);
        self.state = next;
    }

    fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }
}

/// Builds entity indexes from a data source
pub struct IndexBuildOrchestrator {
    config: BuildConfig,
    catalog: Arc<SchemaCatalog>,
    store: IndexStore,
    source: Arc<dyn DataSource>,
}

impl IndexBuildOrchestrator {
    pub fn new(
        config: BuildConfig,
        catalog: Arc<SchemaCatalog>,
        store: IndexStore,
        source: Arc<dyn DataSource>,
    ) -> Self {
        Self {
            config,
            catalog,
            store,
            source,
        }
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Build several entities one after another.
    ///
    /// The whole request is validated first: a bad chunk size or an unknown
    /// entity fails before any index is touched. After that, each entity's
    /// failure is captured in its report and the next entity still builds.
    /// An empty list means every catalogue entity.
    pub fn run_all(&self, entities: &[String]) -> Result<Vec<BuildReport>> {
        self.config.validate()?;

        let targets: Vec<String> = if entities.is_empty() {
            self.catalog
                .entity_names()
                .into_iter()
                .map(String::from)
                .collect()
        } else {
            entities.to_vec()
        };
        for entity in &targets {
            self.catalog.get(entity)?;
        }

        info!("Building {} entities: {}", targets.len(), targets.join(", "));

        let reports: Vec<BuildReport> = targets.iter().map(|e| self.build_entity(e)).collect();

        let failed = reports.iter().filter(|r| !r.is_success()).count();
        if failed > 0 {
            warn!("{} of {} entity builds failed", failed, reports.len());
        } else {
            info!("All {} entity builds completed", reports.len());
        }
        Ok(reports)
    }

    /// Build one entity, converting any failure into a `Failed` report
    pub fn build_entity(&self, entity: &str) -> BuildReport {
        let mut run = BuildRun::new(entity);

        match self.run_entity(&mut run) {
            Ok(report) => report,
            Err(e) => {
                error!("Build of '{}' failed while {}: {}", entity, run.state, e);
                BuildReport {
                    entity: entity.to_string(),
                    state: BuildState::Failed,
                    failed_in: Some(run.state),
                    documents: 0,
                    expected_rows: None,
                    chunks: run.chunks,
                    duration_ms: run.elapsed_ms(),
                    error: Some(e.to_string()),
                }
            }
        }
    }

    fn run_entity(&self, run: &mut BuildRun<'_>) -> Result<BuildReport> {
        let entity = run.entity;
        self.config.validate()?;
        let schema = self.catalog.get(entity)?;

        // Init: fresh generation with the marker staged first
        let index = self.store.open_for_rebuild(schema)?;
        let mut writer = index.writer(self.config.writer_heap_bytes())?;
        writer
            .delete_all_documents()
            .map_err(|e| CatalogError::Commit(format!("Failed to clear '{entity}': {e}")))?;
        let built_at = Utc::now();
        writer
            .add_document(index.marker_document(built_at)?)
            .map_err(|e| CatalogError::Commit(format!("Failed to add marker: {e}")))?;
        run.advance(BuildState::SchemaReady);

        // Scan
        let max_id = self.config.effective_max_id(self.source.max_id(entity)?);
        let scanner = ChunkedRowScanner::new(max_id, self.config.chunk_size);
        let total = scanner.chunk_count();
        info!(
            "Indexing '{}': ids 0..={} in {} chunks of {}{}",
            entity,
            max_id,
            total,
            self.config.chunk_size,
            if self.config.test_mode { " (test mode)" } else { "" }
        );

        let mapper = DocumentMapper::new(schema);
        let encoder = DocumentEncoder::new(entity, index.schema());
        let queue_bound = self.config.chunk_size.min(MAX_QUEUE_BOUND) as usize;
        let mut pipeline = ConcurrentIndexWriter::new(
            encoder,
            TantivySink::new(writer),
            queue_bound,
            self.config.workers,
        )?;

        for (i, range) in scanner.enumerate() {
            let chunk = i as u64 + 1;
            run.advance(BuildState::Scanning { chunk, of: total });
            run.chunks = chunk;

            let rows = self.source.fetch_range(entity, range.min, range.max)?;
            let fetched = rows.len();
            for row in &rows {
                let doc = mapper.map(row)?;
                if let Err(e) = pipeline.submit(doc) {
                    // The pipeline already failed; surface its first error
                    return Err(pipeline.flush().err().unwrap_or(e));
                }
            }

            info!(
                "'{}' chunk {}/{} (ids {}..={}): {} rows, {:.0}%",
                entity,
                chunk,
                total,
                range.min,
                range.max,
                fetched,
                chunk as f64 * 100.0 / total as f64
            );
        }

        // Flush
        run.advance(BuildState::Flushing);
        let (mut sink, stats) = pipeline.flush()?;
        if self.config.optimize {
            sink.optimize(&index)?;
        }
        sink.finish()?;

        // Verify (soft)
        run.advance(BuildState::Verifying);
        let reader = index.reader()?;
        let documents = reader.searcher().num_docs().saturating_sub(1);
        let expected = self.source.row_count(entity, max_id)?;
        if expected != documents {
            warn!(
                "Verification mismatch for '{}': {} rows in source, {} documents indexed",
                entity, expected, documents
            );
        } else {
            debug!("Verified '{}': {} documents", entity, documents);
        }

        let duration_ms = run.elapsed_ms();
        self.store.write_build_info(&BuildInfo {
            entity: entity.to_string(),
            built_at,
            max_id,
            chunk_size: self.config.chunk_size,
            documents,
            expected_rows: expected,
            optimized: self.config.optimize,
            test_mode: self.config.test_mode,
            duration_ms,
        })?;

        run.advance(BuildState::Done);
        info!(
            "Built '{}': {} documents ({} submitted) in {}ms",
            entity, documents, stats.submitted, duration_ms
        );

        Ok(BuildReport {
            entity: entity.to_string(),
            state: BuildState::Done,
            failed_in: None,
            documents,
            expected_rows: Some(expected),
            chunks: run.chunks,
            duration_ms,
            error: None,
        })
    }
}
