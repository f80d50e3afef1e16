//! Unified service container for catalog-search
//!
//! Provides shared access to the catalogue, the index store and one
//! search server per indexed entity.

use crate::core::config::Config;
use crate::core::error::Result;
use crate::core::indexer::IndexBuildOrchestrator;
use crate::core::schema::SchemaCatalog;
use crate::core::search::{
    MetadataResultsWriter, ParserFactory, ResultsWriter, SearchLimits, SearchServer,
};
use crate::core::source::DataSource;
use crate::core::storage::IndexStore;
use crate::core::types::Results;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Unified services container
///
/// All adapters use this same struct for service access.
#[derive(Clone)]
pub struct Services {
    /// Application configuration
    pub config: Arc<Config>,

    /// Field catalogue of every entity
    pub catalog: Arc<SchemaCatalog>,

    /// Per-entity index directories
    pub store: IndexStore,

    writer: Arc<dyn ResultsWriter>,
    servers: Arc<RwLock<BTreeMap<String, Arc<SearchServer>>>>,
}

impl Services {
    /// Create services from configuration
    pub fn new(config: Config) -> Result<Self> {
        let catalog = SchemaCatalog::load(config.schema.catalog_file.as_deref())?;
        Ok(Self::with_catalog(config, catalog))
    }

    /// Create services over an explicit catalogue
    pub fn with_catalog(config: Config, catalog: SchemaCatalog) -> Self {
        let store = IndexStore::new(config.storage.index_dir.clone());
        Self {
            config: Arc::new(config),
            catalog: Arc::new(catalog),
            store,
            writer: Arc::new(MetadataResultsWriter),
            servers: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }

    /// Create an orchestrator that reads rows from `source`
    pub fn create_orchestrator(&self, source: Arc<dyn DataSource>) -> IndexBuildOrchestrator {
        IndexBuildOrchestrator::new(
            self.config.build.clone(),
            Arc::clone(&self.catalog),
            self.store.clone(),
            source,
        )
    }

    /// Search server of an entity, opened on first use
    pub fn server(&self, entity: &str) -> Result<Arc<SearchServer>> {
        if let Some(server) = self.servers.read().get(entity) {
            return Ok(Arc::clone(server));
        }

        let schema = self.catalog.get(entity)?.clone();
        let mut servers = self.servers.write();
        if let Some(server) = servers.get(entity) {
            return Ok(Arc::clone(server));
        }

        let index = self.store.open(entity)?;
        let server = Arc::new(SearchServer::open(
            schema,
            index,
            ParserFactory::for_entity(entity, &self.config.search),
            Arc::clone(&self.writer),
            SearchLimits::from(&self.config.search),
        )?);
        info!(
            "Opened '{}' index ({} parser)",
            entity,
            server.parser_kind()
        );
        servers.insert(entity.to_string(), Arc::clone(&server));
        Ok(server)
    }

    /// Open servers for every catalogue entity that has an index on disk
    pub fn open_all(&self) -> Result<Vec<String>> {
        let mut opened = Vec::new();
        for entity in self.store.list()? {
            if !self.catalog.contains(&entity) {
                warn!("Ignoring index of unknown entity '{}'", entity);
                continue;
            }
            self.server(&entity)?;
            opened.push(entity);
        }
        Ok(opened)
    }

    /// Entities with an open server
    pub fn open_entities(&self) -> Vec<String> {
        self.servers.read().keys().cloned().collect()
    }

    /// Search one entity; `limit` falls back to the configured default
    pub fn search(
        &self,
        entity: &str,
        query: &str,
        offset: usize,
        limit: Option<usize>,
    ) -> Result<Results> {
        let limit = limit.unwrap_or(self.config.search.default_limit);
        self.server(entity)?.search(query, offset, limit)
    }

    pub fn explain(
        &self,
        entity: &str,
        query: &str,
        offset: usize,
        limit: Option<usize>,
    ) -> Result<String> {
        let limit = limit.unwrap_or(self.config.search.default_limit);
        self.server(entity)?.explain(query, offset, limit)
    }

    /// Reload one entity; `true` when a newer generation was published
    pub fn reload(&self, entity: &str) -> Result<bool> {
        self.server(entity)?.reload()
    }

    /// Reload every open server, logging failures per entity
    pub fn reload_all(&self) -> Vec<(String, Result<bool>)> {
        let servers: Vec<(String, Arc<SearchServer>)> = self
            .servers
            .read()
            .iter()
            .map(|(name, server)| (name.clone(), Arc::clone(server)))
            .collect();

        servers
            .into_iter()
            .map(|(name, server)| {
                let outcome = server.reload();
                if let Err(e) = &outcome {
                    warn!("Reload of '{}' failed: {}", name, e);
                }
                (name, outcome)
            })
            .collect()
    }
}
