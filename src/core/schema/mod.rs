//! Data-driven index schemas.
//!
//! An entity's schema is an ordered list of [`IndexField`] descriptors
//! loaded from a TOML catalogue. Everything downstream (document mapping,
//! tantivy schema, query parsing) is driven by that table.

pub mod analyzer;
mod catalog;
mod field;

pub use analyzer::{register_analyzers, Analyzer};
pub use catalog::{EntitySchema, SchemaCatalog, LAST_UPDATED_FIELD, META_FIELD, META_VALUE};
pub use field::{FieldKind, FieldSource, IndexField, Indexing, Transform};
