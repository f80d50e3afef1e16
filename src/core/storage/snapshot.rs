//! Atomically swapped, reference-counted index snapshots.
//!
//! A [`Snapshot`] pins one committed generation of an entity index. Readers
//! take an `Arc<Snapshot>` and keep it for the whole request, so a request
//! never sees two generations. [`SnapshotSource::reload`] publishes a new
//! `Arc`; the old snapshot is freed when its last holder drops it.

use arc_swap::ArcSwap;
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use std::sync::Arc;
use tantivy::collector::TopDocs;
use tantivy::query::TermQuery;
use tantivy::schema::{Field, IndexRecordOption, OwnedValue, Schema};
use tantivy::{DocAddress, IndexReader, Searcher, TantivyDocument, Term};
use tracing::{info, warn};

use super::tantivy::{stored_text, EntityIndex};
use crate::core::error::{CatalogError, Result};
use crate::core::schema::{LAST_UPDATED_FIELD, META_FIELD, META_VALUE};
use crate::core::types::StoredDocument;

/// Outcome of looking up the marker document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkerLookup {
    Found(DateTime<Utc>),
    Missing,
    Duplicated(usize),
}

/// Immutable view of one committed index generation
pub struct Snapshot {
    searcher: Searcher,
    schema: Schema,
    opstamp: u64,
    version: u64,
    last_updated: Option<DateTime<Utc>>,
}

impl std::fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Snapshot")
            .field("opstamp", &self.opstamp)
            .field("version", &self.version)
            .field("last_updated", &self.last_updated)
            .finish()
    }
}

impl Snapshot {
    pub fn searcher(&self) -> &Searcher {
        &self.searcher
    }

    /// Commit opstamp this snapshot was taken at
    pub fn opstamp(&self) -> u64 {
        self.opstamp
    }

    /// Monotonic per-source version, 1 for the initial snapshot
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Build timestamp read from the marker document
    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.last_updated
    }

    /// Documents visible in this snapshot, marker included
    pub fn num_docs(&self) -> u64 {
        self.searcher.num_docs()
    }

    /// Load the stored fields of a hit, in schema order
    pub fn stored_document(&self, address: DocAddress) -> Result<StoredDocument> {
        let doc: TantivyDocument = self.searcher.doc(address).map_err(|e| {
            CatalogError::SearchFailed(format!("Failed to retrieve document: {e}"))
        })?;

        let mut stored = StoredDocument::default();
        for (field, entry) in self.schema.fields() {
            if !entry.is_stored() || entry.name() == LAST_UPDATED_FIELD {
                continue;
            }
            for value in doc.get_all(field) {
                if let Some(text) = stored_text(value) {
                    stored.push(entry.name(), text);
                }
            }
        }
        Ok(stored)
    }

    /// Find the marker document and read its timestamp
    pub fn read_marker(&self) -> Result<MarkerLookup> {
        let meta = self.field(META_FIELD)?;
        let last_updated = self.field(LAST_UPDATED_FIELD)?;

        let query = TermQuery::new(
            Term::from_field_text(meta, META_VALUE),
            IndexRecordOption::Basic,
        );
        let hits = self
            .searcher
            .search(&query, &TopDocs::with_limit(10))
            .map_err(|e| CatalogError::SearchFailed(format!("Marker lookup failed: {e}")))?;

        match hits.as_slice() {
            [] => Ok(MarkerLookup::Missing),
            [(_, address)] => {
                let doc: TantivyDocument = self.searcher.doc(*address).map_err(|e| {
                    CatalogError::SearchFailed(format!("Failed to read marker: {e}"))
                })?;
                match doc.get_first(last_updated) {
                    Some(OwnedValue::I64(ms)) => Utc
                        .timestamp_millis_opt(*ms)
                        .single()
                        .map(MarkerLookup::Found)
                        .ok_or_else(|| {
                            CatalogError::StorageError(format!("Invalid marker timestamp {ms}"))
                        }),
                    _ => Err(CatalogError::StorageError(
                        "Marker document has no timestamp".to_string(),
                    )),
                }
            }
            many => Ok(MarkerLookup::Duplicated(many.len())),
        }
    }

    fn field(&self, name: &str) -> Result<Field> {
        self.schema
            .get_field(name)
            .map_err(|e| CatalogError::StorageError(format!("Missing {name} field: {e}")))
    }
}

/// Publishes snapshots of one entity index
pub struct SnapshotSource {
    index: EntityIndex,
    reader: IndexReader,
    current: ArcSwap<Snapshot>,
    reload_lock: Mutex<()>,
}

impl SnapshotSource {
    /// Open a reader and take the initial snapshot
    pub fn open(index: EntityIndex) -> Result<Self> {
        let reader = index.reader()?;
        let mut initial = Snapshot {
            searcher: reader.searcher(),
            schema: index.schema().clone(),
            opstamp: index.committed_opstamp()?,
            version: 1,
            last_updated: None,
        };
        initial.last_updated = refresh_last_updated(index.entity(), &initial, None);

        Ok(Self {
            index,
            reader,
            current: ArcSwap::from_pointee(initial),
            reload_lock: Mutex::new(()),
        })
    }

    pub fn entity(&self) -> &str {
        self.index.entity()
    }

    pub fn index(&self) -> &EntityIndex {
        &self.index
    }

    /// Current snapshot; hold the `Arc` for the whole request
    pub fn acquire(&self) -> Arc<Snapshot> {
        self.current.load_full()
    }

    /// Swap to a newer committed generation if there is one.
    ///
    /// Returns `true` when a new snapshot was published. Concurrent reloads
    /// are serialized; readers never wait on them.
    pub fn reload(&self) -> Result<bool> {
        let _guard = self.reload_lock.lock();

        let current = self.current.load_full();
        let on_disk = self.index.committed_opstamp()?;
        if on_disk <= current.opstamp {
            return Ok(false);
        }

        self.reader
            .reload()
            .map_err(|e| CatalogError::StorageError(format!("Failed to reload reader: {e}")))?;

        let mut next = Snapshot {
            searcher: self.reader.searcher(),
            schema: current.schema.clone(),
            opstamp: on_disk,
            version: current.version + 1,
            last_updated: None,
        };
        next.last_updated = refresh_last_updated(self.entity(), &next, current.last_updated);

        info!(
            "Reloaded '{}': opstamp {} -> {} ({} docs)",
            self.entity(),
            current.opstamp,
            next.opstamp,
            next.num_docs()
        );
        self.current.store(Arc::new(next));
        Ok(true)
    }
}

/// Marker timestamp of `snapshot`, falling back to `previous` on any problem
fn refresh_last_updated(
    entity: &str,
    snapshot: &Snapshot,
    previous: Option<DateTime<Utc>>,
) -> Option<DateTime<Utc>> {
    match snapshot.read_marker() {
        Ok(MarkerLookup::Found(ts)) => Some(ts),
        Ok(MarkerLookup::Missing) => {
            warn!("No marker document in index '{}'", entity);
            previous
        }
        Ok(MarkerLookup::Duplicated(n)) => {
            warn!("{} marker documents in index '{}'", n, entity);
            previous
        }
        Err(e) => {
            warn!("Cannot read marker of '{}': {}", entity, e);
            previous
        }
    }
}
