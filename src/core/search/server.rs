//! Per-entity search server.
//!
//! Every request takes one `Arc<Snapshot>` up front and runs entirely
//! against it, so a concurrent reload never mixes two generations into one
//! answer. The `Arc` is dropped on every exit path.

use chrono::{DateTime, Utc};
use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

use super::parser::{ParserFactory, RankedHits, SearchQuery};
use super::results::{normalize, paginate};
use super::writer::{Encoding, ResultsContext, ResultsWriter, SchemaVersion};
use crate::core::config::SearchConfig;
use crate::core::error::{CatalogError, Result};
use crate::core::schema::EntitySchema;
use crate::core::storage::{EntityIndex, Snapshot, SnapshotSource};
use crate::core::types::{ResultItem, Results, StoredDocument};

/// Request bounds enforced by a server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchLimits {
    pub max_limit: usize,
    pub max_query_length: usize,
}

impl From<&SearchConfig> for SearchLimits {
    fn from(config: &SearchConfig) -> Self {
        Self {
            max_limit: config.max_limit,
            max_query_length: config.max_query_length,
        }
    }
}

/// Search, explain and reload for one entity index
pub struct SearchServer {
    schema: EntitySchema,
    source: Arc<SnapshotSource>,
    parsers: ParserFactory,
    writer: Arc<dyn ResultsWriter>,
    limits: SearchLimits,
    searches: AtomicU64,
}

impl SearchServer {
    pub fn new(
        schema: EntitySchema,
        source: Arc<SnapshotSource>,
        parsers: ParserFactory,
        writer: Arc<dyn ResultsWriter>,
        limits: SearchLimits,
    ) -> Self {
        Self {
            schema,
            source,
            parsers,
            writer,
            limits,
            searches: AtomicU64::new(0),
        }
    }

    /// Open a server over an entity index
    pub fn open(
        schema: EntitySchema,
        index: EntityIndex,
        parsers: ParserFactory,
        writer: Arc<dyn ResultsWriter>,
        limits: SearchLimits,
    ) -> Result<Self> {
        let source = Arc::new(SnapshotSource::open(index)?);
        Ok(Self::new(schema, source, parsers, writer, limits))
    }

    pub fn entity(&self) -> &str {
        &self.schema.name
    }

    /// Fields searched by unqualified terms
    pub fn default_fields(&self) -> &[String] {
        &self.schema.default_fields
    }

    pub fn parser_kind(&self) -> &'static str {
        self.parsers.kind()
    }

    /// Current snapshot
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.source.acquire()
    }

    /// Ranked page of hits starting at `offset`
    pub fn search(&self, query: &str, offset: usize, limit: usize) -> Result<Results> {
        let snapshot = self.source.acquire();
        let (_, ranked, limit) = self.retrieve(&snapshot, query, offset, limit)?;

        let raw: Vec<f32> = ranked.hits.iter().map(|(score, _)| *score).collect();
        let scored: Vec<_> = normalize(&raw)
            .into_iter()
            .zip(ranked.hits.iter().map(|(_, address)| *address))
            .collect();

        let results = paginate(scored, offset, limit)
            .into_iter()
            .map(|(score, address)| {
                Ok(ResultItem {
                    score,
                    document: snapshot.stored_document(address)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        self.searches.fetch_add(1, Ordering::Relaxed);
        debug!(
            "Search '{}' on '{}' (v{}): {} of {} hits",
            query,
            self.entity(),
            snapshot.version(),
            results.len(),
            ranked.total
        );

        Ok(Results {
            offset,
            total_hits: ranked.total,
            results,
        })
    }

    /// Same retrieval as [`search`](Self::search), rendered with a scoring
    /// breakdown per hit
    pub fn explain(&self, query: &str, offset: usize, limit: usize) -> Result<String> {
        let snapshot = self.source.acquire();
        let (parsed, ranked, limit) = self.retrieve(&snapshot, query, offset, limit)?;

        let raw: Vec<f32> = ranked.hits.iter().map(|(score, _)| *score).collect();
        let scored: Vec<_> = normalize(&raw)
            .into_iter()
            .zip(ranked.hits.iter().copied())
            .collect();

        let mut out = String::new();
        let _ = writeln!(out, "Entity: {} ({} parser)", self.entity(), self.parser_kind());
        let _ = writeln!(out, "Query: {}", parsed.describe());
        let _ = writeln!(out, "Total hits: {}", ranked.total);

        for (i, (normalized, (raw, address))) in
            paginate(scored, offset, limit).into_iter().enumerate()
        {
            let document = snapshot.stored_document(address)?;
            let _ = writeln!(out);
            let _ = writeln!(
                out,
                "{}: score {:.1}% (raw {:.4})",
                offset + i,
                normalized * 100.0,
                raw
            );
            let _ = writeln!(out, "{}", self.explain_header(&document));
            let _ = writeln!(out, "{}", parsed.explain_hit(snapshot.searcher(), address)?);
        }

        self.searches.fetch_add(1, Ordering::Relaxed);
        Ok(out)
    }

    /// Swap to a newer committed generation, if any
    pub fn reload(&self) -> Result<bool> {
        self.source.reload()
    }

    /// Build timestamp of the current snapshot
    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.source.acquire().last_updated()
    }

    /// Searches served since start
    pub fn search_count(&self) -> u64 {
        self.searches.load(Ordering::Relaxed)
    }

    /// Render results with this server's writer
    pub fn render(
        &self,
        results: &Results,
        version: SchemaVersion,
        encoding: Encoding,
    ) -> Result<String> {
        let context = ResultsContext {
            entity: self.entity(),
            last_updated: self.last_updated(),
        };
        self.writer.write(&context, results, version, encoding)
    }

    fn retrieve(
        &self,
        snapshot: &Snapshot,
        query: &str,
        offset: usize,
        limit: usize,
    ) -> Result<(SearchQuery, RankedHits, usize)> {
        if query.chars().count() > self.limits.max_query_length {
            return Err(CatalogError::InvalidQuery(format!(
                "Query exceeds {} characters",
                self.limits.max_query_length
            )));
        }
        let limit = limit.min(self.limits.max_limit);

        let mut parser = self.parsers.create(&self.schema, self.source.index())?;
        let parsed = parser.parse(query)?;
        // No page can reach past the documents in this generation
        let docs = usize::try_from(snapshot.num_docs()).unwrap_or(usize::MAX);
        let window = offset.saturating_add(limit).min(docs);
        let ranked = parsed.execute(snapshot.searcher(), window)?;
        Ok((parsed, ranked, limit))
    }

    /// Id plus the stored default fields of a hit
    fn explain_header(&self, document: &StoredDocument) -> String {
        let mut parts = vec![format!("_id={}", document.get("_id").unwrap_or("?"))];
        for field in &self.schema.default_fields {
            let values = document.get_all(field);
            if !values.is_empty() {
                parts.push(format!("{}={}", field, values.join("; ")));
            }
        }
        parts.join(" | ")
    }
}
