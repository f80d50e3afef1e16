use std::collections::BTreeMap;

use super::DataSource;
use crate::core::error::{CatalogError, Result};
use crate::core::types::Row;

pub(super) type Table = BTreeMap<u64, Row>;

/// In-memory rows keyed by entity, used for embedding and tests
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    tables: BTreeMap<String, Table>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style registration of an entity's rows
    pub fn with_rows(mut self, entity: &str, rows: impl IntoIterator<Item = Row>) -> Self {
        for row in rows {
            self.insert(entity, row);
        }
        self
    }

    /// Insert or replace a row (also registers the entity)
    pub fn insert(&mut self, entity: &str, row: Row) {
        self.tables
            .entry(entity.to_string())
            .or_default()
            .insert(row.id, row);
    }

    /// Register an entity with no rows
    pub fn register(&mut self, entity: &str) {
        self.tables.entry(entity.to_string()).or_default();
    }

    fn table(&self, entity: &str) -> Result<&Table> {
        self.tables
            .get(entity)
            .ok_or_else(|| CatalogError::data_source(entity, "no table registered"))
    }
}

pub(super) fn table_max_id(table: &Table) -> u64 {
    table.keys().next_back().copied().unwrap_or(0)
}

pub(super) fn table_range(table: &Table, min: u64, max: u64) -> Vec<Row> {
    if min > max {
        return Vec::new();
    }
    table.range(min..=max).map(|(_, row)| row.clone()).collect()
}

pub(super) fn table_count(table: &Table, max_id: u64) -> u64 {
    table.range(..=max_id).count() as u64
}

impl DataSource for MemorySource {
    fn max_id(&self, entity: &str) -> Result<u64> {
        Ok(table_max_id(self.table(entity)?))
    }

    fn fetch_range(&self, entity: &str, min: u64, max: u64) -> Result<Vec<Row>> {
        Ok(table_range(self.table(entity)?, min, max))
    }

    fn row_count(&self, entity: &str, max_id: u64) -> Result<u64> {
        Ok(table_count(self.table(entity)?, max_id))
    }
}
