//! Row to document mapping.

use crate::core::error::{CatalogError, Result};
use crate::core::schema::{EntitySchema, FieldSource, IndexField};
use crate::core::types::{DocField, Document, Row};

/// Converts fetched rows into documents following an entity schema.
///
/// Empty values are skipped, so optional columns never produce empty
/// fields. A `required` field without a value fails the row.
#[derive(Debug, Clone)]
pub struct DocumentMapper {
    entity: String,
    fields: Vec<IndexField>,
}

impl DocumentMapper {
    pub fn new(schema: &EntitySchema) -> Self {
        Self {
            entity: schema.name.clone(),
            fields: schema.fields.clone(),
        }
    }

    pub fn entity(&self) -> &str {
        &self.entity
    }

    /// Map one row (with its joined child rows) to a document
    pub fn map(&self, row: &Row) -> Result<Document> {
        let mut doc = Document::new(row.id);

        for field in &self.fields {
            let raw: Vec<&str> = match &field.source {
                FieldSource::Id => {
                    doc.push(self.doc_field(field, row.id.to_string()));
                    continue;
                }
                FieldSource::Column(column) => {
                    row.columns.get(column).map(String::as_str).into_iter().collect()
                }
                FieldSource::Children(collection) => row
                    .children
                    .get(collection)
                    .map(|values| values.iter().map(String::as_str).collect())
                    .unwrap_or_default(),
                FieldSource::Constant(value) => vec![value.as_str()],
            };

            let mut added = 0;
            for value in raw {
                let value = field.transform.apply(value.trim());
                if value.is_empty() {
                    continue;
                }
                doc.push(self.doc_field(field, value));
                added += 1;
            }

            if added == 0 && field.required {
                return Err(CatalogError::encoding(
                    &self.entity,
                    row.id,
                    format!("required field '{}' has no value", field.name),
                ));
            }
        }

        Ok(doc)
    }

    fn doc_field(&self, field: &IndexField, value: String) -> DocField {
        DocField {
            name: field.name.clone(),
            value,
            stored: field.stored,
            indexing: field.indexing,
            analyzer: field.effective_analyzer(),
            kind: field.kind,
        }
    }
}
