//! JSON-lines dump reader.
//!
//! Each entity lives in `<dump_dir>/<entity>.jsonl`, one flat object per
//! line. `id` is the primary key, scalar values become columns and arrays
//! become child collections:
//!
//! ```text
//! {"id": 1, "name": "Warp", "labelcode": "02070", "alias": ["Warp Records"]}
//! ```

use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use super::memory::{table_count, table_max_id, table_range, Table};
use super::DataSource;
use crate::core::error::{CatalogError, Result};
use crate::core::types::Row;

/// Lazily loaded JSON-lines dump directory
#[derive(Debug)]
pub struct JsonlSource {
    dir: PathBuf,
    tables: Mutex<HashMap<String, Arc<Table>>>,
}

impl JsonlSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            tables: Mutex::new(HashMap::new()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn table(&self, entity: &str) -> Result<Arc<Table>> {
        if let Some(table) = self.tables.lock().get(entity) {
            return Ok(Arc::clone(table));
        }

        // Loaded outside the lock; a concurrent duplicate load is harmless
        let table = Arc::new(self.load(entity)?);
        self.tables
            .lock()
            .insert(entity.to_string(), Arc::clone(&table));
        Ok(table)
    }

    fn load(&self, entity: &str) -> Result<Table> {
        let path = self.dir.join(format!("{entity}.jsonl"));
        let content = std::fs::read_to_string(&path).map_err(|e| {
            CatalogError::data_source(entity, format!("cannot read {}: {e}", path.display()))
        })?;

        let mut table = Table::new();
        for (line_no, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let at = || format!("{}:{}", path.display(), line_no + 1);
            let row = parse_line(line)
                .map_err(|msg| CatalogError::data_source(entity, format!("{}: {msg}", at())))?;
            if table.contains_key(&row.id) {
                return Err(CatalogError::data_source(
                    entity,
                    format!("{}: duplicate id {}", at(), row.id),
                ));
            }
            table.insert(row.id, row);
        }

        debug!("Loaded {} rows for '{}' from {}", table.len(), entity, path.display());
        Ok(table)
    }
}

fn scalar_text(value: &Value) -> std::result::Result<Option<String>, String> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::Bool(b) => Ok(Some(b.to_string())),
        Value::Array(_) | Value::Object(_) => Err("nested value not allowed".to_string()),
    }
}

fn parse_line(line: &str) -> std::result::Result<Row, String> {
    let object: Map<String, Value> = serde_json::from_str(line).map_err(|e| e.to_string())?;

    let id = object
        .get("id")
        .and_then(Value::as_u64)
        .ok_or_else(|| "missing or non-integer 'id'".to_string())?;

    let mut row = Row::new(id);
    for (key, value) in &object {
        if key == "id" {
            continue;
        }
        match value {
            Value::Array(items) => {
                let values = row.children.entry(key.clone()).or_default();
                for item in items {
                    if let Some(text) = scalar_text(item).map_err(|e| format!("{key}: {e}"))? {
                        values.push(text);
                    }
                }
            }
            other => {
                if let Some(text) = scalar_text(other).map_err(|e| format!("{key}: {e}"))? {
                    row.columns.insert(key.clone(), text);
                }
            }
        }
    }
    Ok(row)
}

impl DataSource for JsonlSource {
    fn max_id(&self, entity: &str) -> Result<u64> {
        let table = self.table(entity)?;
        Ok(table_max_id(&table))
    }

    fn fetch_range(&self, entity: &str, min: u64, max: u64) -> Result<Vec<Row>> {
        let table = self.table(entity)?;
        Ok(table_range(&table, min, max))
    }

    fn row_count(&self, entity: &str, max_id: u64) -> Result<u64> {
        let table = self.table(entity)?;
        Ok(table_count(&table, max_id))
    }
}
