//! Error types and error handling for catalog-search.
//!
//! Build-time errors are scoped to one entity by the orchestrator and
//! serve-time errors to one request. Adapters (CLI) decide how to surface
//! them.

use thiserror::Error;

/// Result type alias for catalog-search operations
pub type Result<T> = std::result::Result<T, CatalogError>;

/// Main error type for catalog-search
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Unknown entity: {0}")]
    UnknownEntity(String),

    #[error("No index found for entity: {0}")]
    IndexNotFound(String),

    #[error("Data source error for '{entity}': {message}")]
    DataSource { entity: String, message: String },

    #[error("Cannot encode row {row_id} of '{entity}': {message}")]
    Encoding {
        entity: String,
        row_id: u64,
        message: String,
    },

    #[error("Commit failed: {0}")]
    Commit(String),

    #[error("Cannot parse query at '{token}': {message}")]
    Parse { token: String, message: String },

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Indexing failed: {0}")]
    IndexingFailed(String),

    #[error("Search failed: {0}")]
    SearchFailed(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),
}

impl CatalogError {
    /// Get user-friendly error message
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// Build a data source error for an entity
    pub fn data_source(entity: &str, message: impl Into<String>) -> Self {
        CatalogError::DataSource {
            entity: entity.to_string(),
            message: message.into(),
        }
    }

    /// Build an encoding error attributed to one row
    pub fn encoding(entity: &str, row_id: u64, message: impl Into<String>) -> Self {
        CatalogError::Encoding {
            entity: entity.to_string(),
            row_id,
            message: message.into(),
        }
    }

    /// Check if this is a "not found" type error
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            CatalogError::UnknownEntity(_) | CatalogError::IndexNotFound(_)
        )
    }

    /// Check if this is a bad request error (invalid input from a caller)
    pub fn is_bad_request(&self) -> bool {
        matches!(
            self,
            CatalogError::Parse { .. } | CatalogError::InvalidQuery(_) | CatalogError::ConfigError(_)
        )
    }

    /// Errors that must stop a whole build run before any entity starts
    pub fn is_build_fatal(&self) -> bool {
        matches!(
            self,
            CatalogError::ConfigError(_) | CatalogError::UnknownEntity(_)
        )
    }
}
