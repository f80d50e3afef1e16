//! Per-entity field catalogue.
//!
//! The catalogue is data, not code: a TOML table of entities, each with an
//! ordered list of field descriptors. The crate embeds a default catalogue
//! and a configuration may point at a replacement file.

use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use tantivy::schema::{
    IndexRecordOption, NumericOptions, Schema, TextFieldIndexing, TextOptions, INDEXED, STORED,
    STRING,
};

use super::analyzer::Analyzer;
use super::field::{FieldKind, IndexField, Indexing};
use crate::core::error::{CatalogError, Result};

/// Raw-indexed marker field holding [`META_VALUE`]
pub const META_FIELD: &str = "_meta";

/// Term identifying the marker document
pub const META_VALUE: &str = "_meta_value";

/// Stored build timestamp (milliseconds since epoch) on the marker document
pub const LAST_UPDATED_FIELD: &str = "_last_updated";

const BUILTIN_CATALOG: &str = include_str!("builtin_catalog.toml");

/// Field catalogue of one entity
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EntitySchema {
    pub name: String,

    /// Fields searched by unqualified query terms
    pub default_fields: Vec<String>,

    #[serde(rename = "field")]
    pub fields: Vec<IndexField>,
}

impl EntitySchema {
    /// Look up a field descriptor by name
    pub fn field(&self, name: &str) -> Option<&IndexField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Check the invariants every entity must satisfy
    pub fn validate(&self) -> Result<()> {
        if self.fields.is_empty() {
            return Err(CatalogError::ConfigError(format!(
                "Entity '{}' declares no fields",
                self.name
            )));
        }

        let mut seen = HashSet::new();
        for field in &self.fields {
            if field.name.trim().is_empty() {
                return Err(CatalogError::ConfigError(format!(
                    "Entity '{}' has a field with an empty name",
                    self.name
                )));
            }
            if field.name.starts_with(META_FIELD) || field.name.starts_with(LAST_UPDATED_FIELD) {
                return Err(CatalogError::ConfigError(format!(
                    "Field name '{}' of entity '{}' is reserved",
                    field.name, self.name
                )));
            }
            if !seen.insert(field.name.as_str()) {
                return Err(CatalogError::ConfigError(format!(
                    "Duplicate field '{}' in entity '{}'",
                    field.name, self.name
                )));
            }
            if field.kind == FieldKind::Unsigned && field.indexing == Indexing::Analyzed {
                return Err(CatalogError::ConfigError(format!(
                    "Numeric field '{}' of entity '{}' cannot be analyzed",
                    field.name, self.name
                )));
            }
        }

        if self.default_fields.is_empty() {
            return Err(CatalogError::ConfigError(format!(
                "Entity '{}' declares no default fields",
                self.name
            )));
        }
        for name in &self.default_fields {
            match self.field(name) {
                Some(f) if f.is_indexed() && f.kind == FieldKind::Text => {}
                Some(_) => {
                    return Err(CatalogError::ConfigError(format!(
                        "Default field '{}' of entity '{}' must be an indexed text field",
                        name, self.name
                    )))
                }
                None => {
                    return Err(CatalogError::ConfigError(format!(
                        "Default field '{}' of entity '{}' is not declared",
                        name, self.name
                    )))
                }
            }
        }

        Ok(())
    }

    /// Build the tantivy schema: catalogue fields plus the marker fields
    pub fn to_tantivy(&self) -> Schema {
        let mut builder = Schema::builder();

        for field in &self.fields {
            match field.kind {
                FieldKind::Text => {
                    let mut options = TextOptions::default();
                    if let Some(analyzer) = field.effective_analyzer() {
                        let record = if analyzer.is_keyword() {
                            IndexRecordOption::Basic
                        } else {
                            IndexRecordOption::WithFreqsAndPositions
                        };
                        options = options.set_indexing_options(
                            TextFieldIndexing::default()
                                .set_tokenizer(analyzer.name())
                                .set_index_option(record),
                        );
                    }
                    if field.stored {
                        options = options.set_stored();
                    }
                    builder.add_text_field(&field.name, options);
                }
                FieldKind::Unsigned => {
                    let mut options = NumericOptions::default();
                    if field.is_indexed() {
                        options = options.set_indexed();
                    }
                    if field.stored {
                        options = options.set_stored();
                    }
                    builder.add_u64_field(&field.name, options);
                }
            }
        }

        builder.add_text_field(META_FIELD, STRING);
        builder.add_i64_field(LAST_UPDATED_FIELD, STORED | INDEXED);

        builder.build()
    }

    /// Analyzer applied to a field, `None` for unknown or unindexed fields
    pub fn analyzer_of(&self, name: &str) -> Option<Analyzer> {
        self.field(name).and_then(|f| f.effective_analyzer())
    }
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(rename = "entity", default)]
    entities: Vec<EntitySchema>,
}

/// Ordered set of entity schemas
#[derive(Debug, Clone)]
pub struct SchemaCatalog {
    entities: Vec<EntitySchema>,
}

impl SchemaCatalog {
    /// Catalogue compiled into the crate
    pub fn builtin() -> Result<Self> {
        Self::from_toml_str(BUILTIN_CATALOG)
    }

    /// Load a catalogue from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CatalogError::ConfigError(format!(
                "Failed to read catalogue {}: {e}",
                path.display()
            ))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: CatalogFile = toml::from_str(content)?;
        let catalog = Self {
            entities: file.entities,
        };
        catalog.validate()?;
        Ok(catalog)
    }

    /// Load the configured catalogue, or the built-in one
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::from_file(p),
            None => Self::builtin(),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.entities.is_empty() {
            return Err(CatalogError::ConfigError(
                "Catalogue declares no entities".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for entity in &self.entities {
            if !seen.insert(entity.name.as_str()) {
                return Err(CatalogError::ConfigError(format!(
                    "Duplicate entity '{}' in catalogue",
                    entity.name
                )));
            }
            entity.validate()?;
        }
        Ok(())
    }

    /// Schema of one entity
    pub fn get(&self, entity: &str) -> Result<&EntitySchema> {
        self.entities
            .iter()
            .find(|e| e.name == entity)
            .ok_or_else(|| CatalogError::UnknownEntity(entity.to_string()))
    }

    /// Ordered field list of one entity
    pub fn fields_of(&self, entity: &str) -> Result<&[IndexField]> {
        Ok(&self.get(entity)?.fields)
    }

    pub fn contains(&self, entity: &str) -> bool {
        self.entities.iter().any(|e| e.name == entity)
    }

    /// Entity names in catalogue order
    pub fn entity_names(&self) -> Vec<&str> {
        self.entities.iter().map(|e| e.name.as_str()).collect()
    }
}
