//! Core data types for catalog-search.
//!
//! Rows come out of a data source, documents go into the index writer and
//! results come back from a search server.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::schema::{Analyzer, FieldKind, Indexing};

/// One fetched primary row plus its joined child collections
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Row {
    /// Primary key
    pub id: u64,

    /// Column name -> value of the primary row
    #[serde(default)]
    pub columns: BTreeMap<String, String>,

    /// Child collection name -> values (e.g. aliases)
    #[serde(default)]
    pub children: BTreeMap<String, Vec<String>>,
}

impl Row {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }

    /// Builder-style column setter
    pub fn column(mut self, name: &str, value: impl Into<String>) -> Self {
        self.columns.insert(name.to_string(), value.into());
        self
    }

    /// Builder-style child value append
    pub fn child(mut self, collection: &str, value: impl Into<String>) -> Self {
        self.children
            .entry(collection.to_string())
            .or_default()
            .push(value.into());
        self
    }
}

/// A single field value ready for encoding
#[derive(Debug, Clone, PartialEq)]
pub struct DocField {
    pub name: String,
    pub value: String,
    pub stored: bool,
    pub indexing: Indexing,
    pub analyzer: Option<Analyzer>,
    pub kind: FieldKind,
}

/// A mapped row, consumed once by the index writer
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Id of the row this document was built from
    pub row_id: u64,

    fields: Vec<DocField>,
}

impl Document {
    pub fn new(row_id: u64) -> Self {
        Self {
            row_id,
            fields: Vec::new(),
        }
    }

    pub fn push(&mut self, field: DocField) {
        self.fields.push(field);
    }

    /// Fields in insertion order
    pub fn fields(&self) -> &[DocField] {
        &self.fields
    }

    pub fn into_fields(self) -> Vec<DocField> {
        self.fields
    }

    /// First value of a field, if present
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.value.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Stored field values of a hit, in index order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoredDocument {
    pub fields: Vec<StoredField>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredField {
    pub name: String,
    pub value: String,
}

impl StoredDocument {
    pub fn push(&mut self, name: &str, value: impl Into<String>) {
        self.fields.push(StoredField {
            name: name.to_string(),
            value: value.into(),
        });
    }

    /// First stored value of a field
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.value.as_str())
    }

    /// Every stored value of a (possibly multi-valued) field
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|f| f.name == name)
            .map(|f| f.value.as_str())
            .collect()
    }

    /// Group values by field name, keeping the first-seen field order
    pub fn grouped(&self) -> Vec<(&str, Vec<&str>)> {
        let mut groups: Vec<(&str, Vec<&str>)> = Vec::new();
        for field in &self.fields {
            match groups.iter_mut().find(|(name, _)| *name == field.name) {
                Some((_, values)) => values.push(&field.value),
                None => groups.push((&field.name, vec![&field.value])),
            }
        }
        groups
    }
}

/// One ranked hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultItem {
    /// Normalized score in [0, 1]
    pub score: f32,

    pub document: StoredDocument,
}

/// A page of ranked hits
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Results {
    pub offset: usize,

    /// Total matching documents, independent of pagination
    pub total_hits: usize,

    pub results: Vec<ResultItem>,
}
