//! Configuration management for catalog-search.
//!
//! This module handles loading configuration from TOML files and
//! environment variables, with sensible defaults for all settings.

use crate::core::error::{CatalogError, Result};
use crate::core::search::DismaxConfig;
use crate::core::xdg::XdgDirs;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Smallest writer heap tantivy accepts for one indexing thread
const MIN_WRITER_HEAP_MB: usize = 15;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub build: BuildConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub schema: SchemaConfig,
}

/// Index build configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BuildConfig {
    /// Entities to build (empty = every catalogue entity)
    #[serde(default)]
    pub entities: Vec<String>,

    /// Primary-key ids per fetch; also the writer queue bound
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u64,

    /// Cap the id space at `test_limit`
    #[serde(default)]
    pub test_mode: bool,

    #[serde(default = "default_test_limit")]
    pub test_limit: u64,

    /// Analysis workers (0 = one per CPU)
    #[serde(default)]
    pub workers: usize,

    /// Tantivy writer heap in MB
    #[serde(default = "default_writer_heap_mb")]
    pub writer_heap_mb: usize,

    /// Merge all segments after the build
    #[serde(default = "default_true")]
    pub optimize: bool,
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Root directory for the per-entity indexes
    #[serde(default = "default_index_dir")]
    pub index_dir: PathBuf,
}

/// Row source configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SourceConfig {
    /// Directory holding `<entity>.jsonl` dumps
    #[serde(default = "default_dump_dir")]
    pub dump_dir: PathBuf,
}

/// Search configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchConfig {
    /// Results per page when the caller gives no limit
    #[serde(default = "default_limit")]
    pub default_limit: usize,

    /// Upper bound on a page
    #[serde(default = "default_max_limit")]
    pub max_limit: usize,

    /// Maximum query string length
    #[serde(default = "default_max_query_length")]
    pub max_query_length: usize,

    /// Seconds between reload checks in `serve`
    #[serde(default = "default_reload_interval")]
    pub reload_interval_sec: u64,

    /// Entities served through the dismax parser
    #[serde(default = "default_dismax")]
    pub dismax: BTreeMap<String, DismaxConfig>,
}

/// Field catalogue configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SchemaConfig {
    /// Replacement catalogue (built-in catalogue when unset)
    #[serde(default)]
    pub catalog_file: Option<PathBuf>,
}

// Default value functions
fn default_chunk_size() -> u64 {
    20_000
}

fn default_test_limit() -> u64 {
    50_000
}

fn default_writer_heap_mb() -> usize {
    50
}

fn default_true() -> bool {
    true
}

fn default_index_dir() -> PathBuf {
    PathBuf::from("./data/indexes")
}

fn default_dump_dir() -> PathBuf {
    PathBuf::from("./data/dumps")
}

fn default_limit() -> usize {
    25
}

fn default_max_limit() -> usize {
    100
}

fn default_max_query_length() -> usize {
    500
}

fn default_reload_interval() -> u64 {
    60
}

fn default_dismax() -> BTreeMap<String, DismaxConfig> {
    BTreeMap::from([("artist".to_string(), DismaxConfig::artist())])
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            entities: Vec::new(),
            chunk_size: default_chunk_size(),
            test_mode: false,
            test_limit: default_test_limit(),
            workers: 0,
            writer_heap_mb: default_writer_heap_mb(),
            optimize: true,
        }
    }
}

impl BuildConfig {
    /// Highest id to scan, honouring test mode
    pub fn effective_max_id(&self, max_id: u64) -> u64 {
        if self.test_mode {
            max_id.min(self.test_limit)
        } else {
            max_id
        }
    }

    pub fn writer_heap_bytes(&self) -> usize {
        self.writer_heap_mb * 1_000_000
    }

    /// Checks that must pass before any entity is built
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(CatalogError::ConfigError(
                "Chunk size must be non-zero".to_string(),
            ));
        }

        if self.test_mode && self.test_limit == 0 {
            return Err(CatalogError::ConfigError(
                "Test limit must be non-zero in test mode".to_string(),
            ));
        }

        if self.writer_heap_mb < MIN_WRITER_HEAP_MB {
            return Err(CatalogError::ConfigError(format!(
                "Writer heap must be at least {MIN_WRITER_HEAP_MB} MB"
            )));
        }

        Ok(())
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            index_dir: default_index_dir(),
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            dump_dir: default_dump_dir(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            max_limit: default_max_limit(),
            max_query_length: default_max_query_length(),
            reload_interval_sec: default_reload_interval(),
            dismax: default_dismax(),
        }
    }
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| CatalogError::ConfigError(format!("Failed to read config file: {e}")))?;

        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load config with priority: env vars > TOML > defaults
    pub fn load() -> Result<Self> {
        let xdg = XdgDirs::new();
        Self::load_with_xdg(&xdg)
    }

    /// Load config with explicit XDG directories
    ///
    /// Priority order:
    /// 1. CATALOG_SEARCH_CONFIG env var
    /// 2. XDG config file (~/.config/catalog-search/config.toml)
    /// 3. ./catalog-search.toml
    /// 4. Defaults
    pub fn load_with_xdg(xdg: &XdgDirs) -> Result<Self> {
        let mut config = if let Ok(config_path) = env::var("CATALOG_SEARCH_CONFIG") {
            Self::from_file(config_path)?
        } else {
            let xdg_config = xdg.config_file();
            if xdg_config.exists() {
                Self::from_file(xdg_config)?
            } else if Path::new("catalog-search.toml").exists() {
                Self::from_file("catalog-search.toml")?
            } else {
                Self::default()
            }
        };

        // Relative defaults move under the XDG data directory
        if config.storage.index_dir == default_index_dir() {
            config.storage.index_dir = xdg.indexes_dir();
        }
        if config.source.dump_dir == default_dump_dir() {
            config.source.dump_dir = xdg.dumps_dir();
        }

        config.merge_env();
        config.validate()?;

        Ok(config)
    }

    /// Merge configuration with environment variables
    pub fn merge_env(&mut self) {
        // Build configuration
        if let Ok(chunk_size) = env::var("CATALOG_SEARCH_CHUNK_SIZE") {
            if let Ok(size) = chunk_size.parse() {
                self.build.chunk_size = size;
            }
        }
        if let Ok(workers) = env::var("CATALOG_SEARCH_WORKERS") {
            if let Ok(w) = workers.parse() {
                self.build.workers = w;
            }
        }
        if let Ok(test_mode) = env::var("CATALOG_SEARCH_TEST_MODE") {
            if let Ok(t) = test_mode.parse() {
                self.build.test_mode = t;
            }
        }
        if let Ok(test_limit) = env::var("CATALOG_SEARCH_TEST_LIMIT") {
            if let Ok(limit) = test_limit.parse() {
                self.build.test_limit = limit;
            }
        }

        // Storage and source
        if let Ok(dir) = env::var("CATALOG_SEARCH_INDEX_DIR") {
            self.storage.index_dir = PathBuf::from(dir);
        }
        if let Ok(dir) = env::var("CATALOG_SEARCH_DUMP_DIR") {
            self.source.dump_dir = PathBuf::from(dir);
        }

        // Search configuration
        if let Ok(default_limit) = env::var("CATALOG_SEARCH_DEFAULT_LIMIT") {
            if let Ok(limit) = default_limit.parse() {
                self.search.default_limit = limit;
            }
        }
        if let Ok(max_limit) = env::var("CATALOG_SEARCH_MAX_LIMIT") {
            if let Ok(limit) = max_limit.parse() {
                self.search.max_limit = limit;
            }
        }
        if let Ok(max_query_len) = env::var("CATALOG_SEARCH_MAX_QUERY_LENGTH") {
            if let Ok(len) = max_query_len.parse() {
                self.search.max_query_length = len;
            }
        }
        if let Ok(interval) = env::var("CATALOG_SEARCH_RELOAD_INTERVAL_SEC") {
            if let Ok(secs) = interval.parse() {
                self.search.reload_interval_sec = secs;
            }
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        self.build.validate()?;

        if self.search.default_limit == 0 {
            return Err(CatalogError::ConfigError(
                "Default limit must be non-zero".to_string(),
            ));
        }

        if self.search.default_limit > self.search.max_limit {
            return Err(CatalogError::ConfigError(
                "Default limit cannot exceed max limit".to_string(),
            ));
        }

        if self.search.max_query_length == 0 {
            return Err(CatalogError::ConfigError(
                "Max query length must be non-zero".to_string(),
            ));
        }

        if self.search.reload_interval_sec == 0 {
            return Err(CatalogError::ConfigError(
                "Reload interval must be non-zero".to_string(),
            ));
        }

        for (entity, dismax) in &self.search.dismax {
            dismax.validate().map_err(|e| match e {
                CatalogError::ConfigError(msg) => {
                    CatalogError::ConfigError(format!("Dismax settings for '{entity}': {msg}"))
                }
                other => other,
            })?;
        }

        Ok(())
    }

    /// Log configuration
    pub fn log_config(&self) {
        tracing::info!("Configuration loaded:");
        if self.build.entities.is_empty() {
            tracing::info!("  Entities: all");
        } else {
            tracing::info!("  Entities: {}", self.build.entities.join(", "));
        }
        tracing::info!("  Chunk size: {} ids", self.build.chunk_size);
        tracing::info!(
            "  Test mode: {} (limit {})",
            self.build.test_mode,
            self.build.test_limit
        );
        tracing::info!("  Workers: {}", self.build.workers);
        tracing::info!("  Writer heap: {} MB", self.build.writer_heap_mb);
        tracing::info!("  Optimize: {}", self.build.optimize);
        tracing::info!("  Index dir: {:?}", self.storage.index_dir);
        tracing::info!("  Dump dir: {:?}", self.source.dump_dir);
        tracing::info!("  Default limit: {}", self.search.default_limit);
        tracing::info!("  Max limit: {}", self.search.max_limit);
        tracing::info!("  Max query length: {}", self.search.max_query_length);
        tracing::info!("  Reload interval: {}s", self.search.reload_interval_sec);
        tracing::info!(
            "  Dismax entities: {}",
            self.search.dismax.keys().cloned().collect::<Vec<_>>().join(", ")
        );
        match &self.schema.catalog_file {
            Some(path) => tracing::info!("  Catalogue: {:?}", path),
            None => tracing::info!("  Catalogue: built-in"),
        }
    }
}
