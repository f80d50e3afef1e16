//! Per-document analysis done by the writer's workers.
//!
//! Text fields are tokenized here, off the committer thread, and handed to
//! tantivy as pre-tokenized values. Numeric fields are parsed here too, so
//! a bad value is attributed to its row before anything reaches the index.

use std::collections::HashMap;
use tantivy::schema::{Field, Schema};
use tantivy::tokenizer::{PreTokenizedString, TextAnalyzer, Token, TokenStream};
use tantivy::TantivyDocument;

use crate::core::error::{CatalogError, Result};
use crate::core::schema::{Analyzer, FieldKind, Indexing};
use crate::core::types::Document;

/// Turns mapped documents into tantivy documents.
///
/// Each worker owns its own encoder: analyzers carry per-stream state and
/// are cloned rather than shared.
#[derive(Clone)]
pub struct DocumentEncoder {
    entity: String,
    fields: HashMap<String, Field>,
    analyzers: HashMap<Analyzer, TextAnalyzer>,
}

impl DocumentEncoder {
    pub fn new(entity: &str, schema: &Schema) -> Self {
        let fields = schema
            .fields()
            .map(|(field, entry)| (entry.name().to_string(), field))
            .collect();
        let analyzers = Analyzer::ALL.iter().map(|a| (*a, a.build())).collect();

        Self {
            entity: entity.to_string(),
            fields,
            analyzers,
        }
    }

    pub fn entity(&self) -> &str {
        &self.entity
    }

    /// Encode one document
    pub fn encode(&mut self, doc: Document) -> Result<TantivyDocument> {
        let row_id = doc.row_id;
        let mut out = TantivyDocument::default();

        for field in doc.into_fields() {
            let handle = *self.fields.get(&field.name).ok_or_else(|| {
                CatalogError::encoding(
                    &self.entity,
                    row_id,
                    format!("field '{}' is not in the index schema", field.name),
                )
            })?;

            match field.kind {
                FieldKind::Unsigned => {
                    let value: u64 = field.value.parse().map_err(|_| {
                        CatalogError::encoding(
                            &self.entity,
                            row_id,
                            format!("'{}' is not an unsigned number: {:?}", field.name, field.value),
                        )
                    })?;
                    out.add_u64(handle, value);
                }
                FieldKind::Text => match (field.indexing, field.analyzer) {
                    (Indexing::No, _) | (_, None) => out.add_text(handle, &field.value),
                    (_, Some(analyzer)) => {
                        let tokens = self.tokenize(analyzer, &field.value);
                        out.add_pre_tokenized_text(
                            handle,
                            PreTokenizedString {
                                text: field.value,
                                tokens,
                            },
                        );
                    }
                },
            }
        }

        Ok(out)
    }

    fn tokenize(&mut self, analyzer: Analyzer, text: &str) -> Vec<Token> {
        let analyzer = self
            .analyzers
            .entry(analyzer)
            .or_insert_with(|| analyzer.build());
        let mut stream = analyzer.token_stream(text);
        let mut tokens = Vec::new();
        while stream.advance() {
            tokens.push(stream.token().clone());
        }
        tokens
    }
}
