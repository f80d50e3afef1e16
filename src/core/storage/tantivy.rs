//! Tantivy integration for per-entity indexes.
//!
//! This module wraps the tantivy operations the build and the servers
//! need: creating or resetting an entity index, registering the shared
//! analyzers, writing the marker document and committing through a
//! [`DocumentSink`].

use chrono::{DateTime, Utc};
use std::path::Path;
use tantivy::schema::{Field, OwnedValue, Schema};
use tantivy::{
    Index, IndexReader, IndexWriter, ReloadPolicy, SegmentId, TantivyDocument,
};
use tracing::{debug, info};

use crate::core::error::{CatalogError, Result};
use crate::core::indexer::DocumentSink;
use crate::core::schema::{register_analyzers, EntitySchema, LAST_UPDATED_FIELD, META_FIELD, META_VALUE};

/// One entity's tantivy index
pub struct EntityIndex {
    entity: String,
    index: Index,
    schema: Schema,
}

impl std::fmt::Debug for EntityIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityIndex")
            .field("entity", &self.entity)
            .field("schema", &"<schema>")
            .finish()
    }
}

impl EntityIndex {
    /// Create a new, empty index at the given path
    pub fn create(index_dir: &Path, entity: &EntitySchema) -> Result<Self> {
        std::fs::create_dir_all(index_dir)?;

        let index = Index::create_in_dir(index_dir, entity.to_tantivy())
            .map_err(|e| CatalogError::StorageError(format!("Failed to create index: {e}")))?;

        Ok(Self::wrap(&entity.name, index))
    }

    /// Open an existing index
    pub fn open(index_dir: &Path, entity: &str) -> Result<Self> {
        let index = Index::open_in_dir(index_dir)
            .map_err(|e| CatalogError::StorageError(format!("Failed to open index: {e}")))?;

        Ok(Self::wrap(entity, index))
    }

    /// Open the index for a rebuild.
    ///
    /// An existing index whose schema matches the catalogue is reused so
    /// the rebuild lands as a new commit that live readers can reload.
    /// Anything else (missing, unreadable or a different schema) is
    /// recreated from scratch.
    pub fn open_for_rebuild(index_dir: &Path, entity: &EntitySchema) -> Result<Self> {
        if index_dir.join("meta.json").exists() {
            match Self::open(index_dir, &entity.name) {
                Ok(existing) if same_schema(&existing.schema, &entity.to_tantivy())? => {
                    debug!("Reusing index for '{}' at {:?}", entity.name, index_dir);
                    return Ok(existing);
                }
                Ok(_) => info!(
                    "Schema of '{}' changed, recreating {:?}",
                    entity.name, index_dir
                ),
                Err(e) => info!("Recreating unreadable index for '{}': {}", entity.name, e),
            }
            std::fs::remove_dir_all(index_dir)?;
        }

        Self::create(index_dir, entity)
    }

    fn wrap(entity: &str, index: Index) -> Self {
        register_analyzers(&index);
        let schema = index.schema();
        Self {
            entity: entity.to_string(),
            index,
            schema,
        }
    }

    /// Single-threaded writer; analysis already happened in the build workers
    pub fn writer(&self, heap_bytes: usize) -> Result<IndexWriter> {
        self.index
            .writer_with_num_threads(1, heap_bytes)
            .map_err(|e| CatalogError::StorageError(format!("Failed to create writer: {e}")))
    }

    /// Reader that only moves forward on explicit reload
    pub fn reader(&self) -> Result<IndexReader> {
        self.index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()
            .map_err(|e| CatalogError::StorageError(format!("Failed to create reader: {e}")))
    }

    /// Opstamp of the last commit on disk
    pub fn committed_opstamp(&self) -> Result<u64> {
        let metas = self
            .index
            .load_metas()
            .map_err(|e| CatalogError::StorageError(format!("Failed to read index meta: {e}")))?;
        Ok(metas.opstamp)
    }

    /// Segments currently visible to searchers
    pub fn searchable_segments(&self) -> Result<Vec<SegmentId>> {
        self.index
            .searchable_segment_ids()
            .map_err(|e| CatalogError::StorageError(format!("Failed to list segments: {e}")))
    }

    /// Build the reserved marker document stamped with `built_at`
    pub fn marker_document(&self, built_at: DateTime<Utc>) -> Result<TantivyDocument> {
        let mut doc = TantivyDocument::default();
        doc.add_text(self.field(META_FIELD)?, META_VALUE);
        doc.add_i64(self.field(LAST_UPDATED_FIELD)?, built_at.timestamp_millis());
        Ok(doc)
    }

    pub fn field(&self, name: &str) -> Result<Field> {
        self.schema
            .get_field(name)
            .map_err(|e| CatalogError::StorageError(format!("Missing {name} field: {e}")))
    }

    pub fn entity(&self) -> &str {
        &self.entity
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Get a reference to the underlying tantivy index
    pub fn index(&self) -> &Index {
        &self.index
    }
}

fn same_schema(a: &Schema, b: &Schema) -> Result<bool> {
    Ok(serde_json::to_string(a)? == serde_json::to_string(b)?)
}

/// Text form of a stored value, `None` for non-scalar values
pub fn stored_text(value: &OwnedValue) -> Option<String> {
    match value {
        OwnedValue::Str(s) => Some(s.clone()),
        OwnedValue::PreTokStr(p) => Some(p.text.clone()),
        OwnedValue::U64(n) => Some(n.to_string()),
        OwnedValue::I64(n) => Some(n.to_string()),
        OwnedValue::F64(n) => Some(n.to_string()),
        OwnedValue::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// [`DocumentSink`] over a tantivy `IndexWriter`
pub struct TantivySink {
    writer: IndexWriter,
}

impl TantivySink {
    pub fn new(writer: IndexWriter) -> Self {
        Self { writer }
    }

    /// Merge all searchable segments into one and commit the merge
    pub fn optimize(&mut self, index: &EntityIndex) -> Result<()> {
        let segments = index.searchable_segments()?;
        if segments.len() < 2 {
            return Ok(());
        }
        debug!(
            "Merging {} segments of '{}'",
            segments.len(),
            index.entity()
        );
        self.writer
            .merge(&segments)
            .wait()
            .map_err(|e| CatalogError::Commit(format!("Failed to merge segments: {e}")))?;
        Ok(())
    }

    /// Wait for background merges and release the writer lock
    pub fn finish(self) -> Result<()> {
        self.writer
            .wait_merging_threads()
            .map_err(|e| CatalogError::Commit(format!("Failed waiting for merges: {e}")))
    }
}

impl DocumentSink for TantivySink {
    fn add(&mut self, doc: TantivyDocument) -> Result<()> {
        self.writer
            .add_document(doc)
            .map_err(|e| CatalogError::Commit(format!("Failed to add document: {e}")))?;
        Ok(())
    }

    fn commit(&mut self) -> Result<u64> {
        self.writer
            .commit()
            .map_err(|e| CatalogError::Commit(format!("Failed to commit: {e}")))
    }
}
