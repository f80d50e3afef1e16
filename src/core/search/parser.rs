//! Query parsers.
//!
//! Parsers own analyzer state and are not shared: the [`ParserFactory`]
//! creates a fresh one for every call.

use tantivy::collector::{Count, TopDocs};
use tantivy::query::{BooleanQuery, Occur, Query, QueryParser, QueryParserError, TermQuery};
use tantivy::schema::IndexRecordOption;
use tantivy::{DocAddress, Searcher, Term};

use super::dismax::{DismaxConfig, DismaxParser, DismaxQuery};
use super::query::preprocess_query;
use super::results::rank;
use crate::core::config::SearchConfig;
use crate::core::error::{CatalogError, Result};
use crate::core::schema::{EntitySchema, META_FIELD, META_VALUE};
use crate::core::storage::EntityIndex;

/// Turns query text into a [`SearchQuery`]
pub trait EntityQueryParser {
    fn parse(&mut self, query: &str) -> Result<SearchQuery>;
}

/// A parsed query ready to run against a snapshot
#[derive(Debug)]
pub enum SearchQuery {
    /// Evaluated by tantivy
    Engine {
        query: Box<dyn Query>,
        display: String,
    },
    /// Evaluated by the crate's dismax scorer
    Dismax(DismaxQuery),
    /// Matches nothing
    MatchNone,
}

/// Top hits of one query plus the total match count
#[derive(Debug, Clone, Default)]
pub struct RankedHits {
    pub hits: Vec<(f32, DocAddress)>,
    pub total: usize,
}

impl SearchQuery {
    /// Retrieve the best `limit` hits, ranked
    pub fn execute(&self, searcher: &Searcher, limit: usize) -> Result<RankedHits> {
        match self {
            SearchQuery::Engine { query, .. } => {
                let (mut hits, total) = searcher
                    .search(query.as_ref(), &(TopDocs::with_limit(limit.max(1)), Count))
                    .map_err(|e| CatalogError::SearchFailed(format!("Search failed: {e}")))?;
                rank(&mut hits);
                hits.truncate(limit);
                Ok(RankedHits { hits, total })
            }
            SearchQuery::Dismax(query) => {
                let mut hits = query.score_all(searcher)?;
                let total = hits.len();
                hits.truncate(limit);
                Ok(RankedHits { hits, total })
            }
            SearchQuery::MatchNone => Ok(RankedHits::default()),
        }
    }

    /// Scoring breakdown of one hit
    pub fn explain_hit(&self, searcher: &Searcher, address: DocAddress) -> Result<String> {
        match self {
            SearchQuery::Engine { query, .. } => query
                .explain(searcher, address)
                .map(|explanation| explanation.to_pretty_json())
                .map_err(|e| CatalogError::SearchFailed(format!("Explain failed: {e}"))),
            SearchQuery::Dismax(query) => query.explain(searcher, address),
            SearchQuery::MatchNone => Ok(String::new()),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            SearchQuery::Engine { display, .. } => display.clone(),
            SearchQuery::Dismax(query) => query.to_string(),
            SearchQuery::MatchNone => "<match none>".to_string(),
        }
    }
}

/// Field-qualified or default-field queries through tantivy's parser
pub struct StandardParser {
    parser: QueryParser,
    known_fields: Vec<String>,
    marker: Term,
}

impl StandardParser {
    pub fn new(entity: &EntitySchema, index: &EntityIndex) -> Result<Self> {
        let default_fields = entity
            .default_fields
            .iter()
            .map(|name| index.field(name))
            .collect::<Result<Vec<_>>>()?;

        let known_fields = entity
            .fields
            .iter()
            .filter(|f| f.is_indexed())
            .map(|f| f.name.clone())
            .collect();

        Ok(Self {
            parser: QueryParser::for_index(index.index(), default_fields),
            known_fields,
            marker: Term::from_field_text(index.field(META_FIELD)?, META_VALUE),
        })
    }
}

impl EntityQueryParser for StandardParser {
    fn parse(&mut self, query: &str) -> Result<SearchQuery> {
        let known: Vec<&str> = self.known_fields.iter().map(String::as_str).collect();
        let text = preprocess_query(query, &known)?;
        if text.is_empty() {
            return Ok(SearchQuery::MatchNone);
        }

        let parsed = self
            .parser
            .parse_query(&text)
            .map_err(|e| parse_failure(&text, e))?;
        let display = format!("{parsed:?}");

        // The marker document never shows up in results
        let marker = TermQuery::new(self.marker.clone(), IndexRecordOption::Basic);
        let query = BooleanQuery::new(vec![
            (Occur::Must, parsed),
            (Occur::MustNot, Box::new(marker)),
        ]);

        Ok(SearchQuery::Engine {
            query: Box::new(query),
            display,
        })
    }
}

fn parse_failure(text: &str, error: QueryParserError) -> CatalogError {
    let token = match &error {
        QueryParserError::FieldDoesNotExist(field) => field.clone(),
        _ => text.to_string(),
    };
    CatalogError::Parse {
        token,
        message: error.to_string(),
    }
}

/// Creates one parser per call
#[derive(Debug, Clone, PartialEq)]
pub enum ParserFactory {
    Standard,
    Dismax(DismaxConfig),
}

impl ParserFactory {
    /// Dismax for entities with configured alias fields, standard otherwise
    pub fn for_entity(entity: &str, search: &SearchConfig) -> Self {
        match search.dismax.get(entity) {
            Some(config) => ParserFactory::Dismax(config.clone()),
            None => ParserFactory::Standard,
        }
    }

    pub fn create(
        &self,
        entity: &EntitySchema,
        index: &EntityIndex,
    ) -> Result<Box<dyn EntityQueryParser>> {
        match self {
            ParserFactory::Standard => Ok(Box::new(StandardParser::new(entity, index)?)),
            ParserFactory::Dismax(config) => Ok(Box::new(DismaxParser::new(
                config,
                entity,
                index.schema(),
            )?)),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ParserFactory::Standard => "standard",
            ParserFactory::Dismax(_) => "dismax",
        }
    }
}
