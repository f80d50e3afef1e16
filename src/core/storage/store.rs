//! Per-entity index directories.
//!
//! Layout:
//!
//! ```text
//! {index_dir}/
//! ├── artist/
//! │   ├── build.json          # Last successful build
//! │   └── tantivy/            # Tantivy index
//! │       ├── meta.json
//! │       └── [segment files]
//! └── release/
//!     └── ...
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use super::tantivy::EntityIndex;
use crate::core::error::{CatalogError, Result};
use crate::core::schema::EntitySchema;

/// Summary of the last successful build of an entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildInfo {
    pub entity: String,
    pub built_at: DateTime<Utc>,
    pub max_id: u64,
    pub chunk_size: u64,
    pub documents: u64,
    pub expected_rows: u64,
    pub optimized: bool,
    pub test_mode: bool,
    pub duration_ms: u64,
}

/// Status line for one indexed entity
#[derive(Debug, Clone, Serialize)]
pub struct IndexStatus {
    pub entity: String,
    pub path: PathBuf,
    pub size_bytes: u64,
    pub build: Option<BuildInfo>,
}

/// Root of all entity indexes
#[derive(Debug, Clone)]
pub struct IndexStore {
    root: PathBuf,
}

impl IndexStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entity_dir(&self, entity: &str) -> PathBuf {
        self.root.join(entity)
    }

    /// Tantivy directory of an entity
    pub fn tantivy_dir(&self, entity: &str) -> PathBuf {
        self.entity_dir(entity).join("tantivy")
    }

    fn build_info_path(&self, entity: &str) -> PathBuf {
        self.entity_dir(entity).join("build.json")
    }

    /// Check whether an entity has a committed index on disk
    pub fn index_exists(&self, entity: &str) -> bool {
        self.tantivy_dir(entity).join("meta.json").exists()
    }

    /// Open an entity index for serving
    pub fn open(&self, entity: &str) -> Result<EntityIndex> {
        if !self.index_exists(entity) {
            return Err(CatalogError::IndexNotFound(entity.to_string()));
        }
        EntityIndex::open(&self.tantivy_dir(entity), entity)
    }

    /// Open (reset or recreate) an entity index for a rebuild
    pub fn open_for_rebuild(&self, schema: &EntitySchema) -> Result<EntityIndex> {
        let dir = self.tantivy_dir(&schema.name);
        fs::create_dir_all(self.entity_dir(&schema.name))?;
        EntityIndex::open_for_rebuild(&dir, schema)
    }

    /// Delete an entity's index and build info
    pub fn delete(&self, entity: &str) -> Result<()> {
        let dir = self.entity_dir(entity);
        if !dir.exists() {
            return Err(CatalogError::IndexNotFound(entity.to_string()));
        }
        fs::remove_dir_all(dir)?;
        Ok(())
    }

    pub fn write_build_info(&self, info: &BuildInfo) -> Result<()> {
        let json = serde_json::to_string_pretty(info)?;
        fs::write(self.build_info_path(&info.entity), json)?;
        Ok(())
    }

    /// Last build info, `None` if the entity was never built successfully
    pub fn read_build_info(&self, entity: &str) -> Result<Option<BuildInfo>> {
        let path = self.build_info_path(entity);
        if !path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&contents)?))
    }

    /// Entities with an index on disk, sorted by name
    pub fn list(&self) -> Result<Vec<String>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let mut entities = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    if self.index_exists(name) {
                        entities.push(name.to_string());
                    }
                }
            }
        }
        entities.sort();
        Ok(entities)
    }

    /// Status of every entity with an index on disk
    pub fn status(&self) -> Result<Vec<IndexStatus>> {
        self.list()?
            .into_iter()
            .map(|entity| {
                let path = self.entity_dir(&entity);
                Ok(IndexStatus {
                    size_bytes: directory_size(&path),
                    build: self.read_build_info(&entity)?,
                    path,
                    entity,
                })
            })
            .collect()
    }
}

/// Calculate directory size recursively
fn directory_size(path: &Path) -> u64 {
    let mut total = 0;

    if let Ok(entries) = fs::read_dir(path) {
        for entry in entries.filter_map(|e| e.ok()) {
            if let Ok(metadata) = entry.metadata() {
                if metadata.is_dir() {
                    total += directory_size(&entry.path());
                } else {
                    total += metadata.len();
                }
            }
        }
    }

    total
}
