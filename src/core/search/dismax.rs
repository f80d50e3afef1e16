//! Disjunction-max query composition.
//!
//! The query text is analyzed once per alias field. Clause *i* holds, for
//! every field that produced an *i*-th token, a boosted term query; with two
//! or more tokens an extra clause holds boosted phrase queries over the
//! phrase-capable fields. A document's score is
//!
//! ```text
//! sum over clauses of  max(sub) + tie * (sum(sub) - max(sub))
//! ```
//!
//! where `sub` are the boosted scores of the clause's parts that matched
//! the document. The engine only supplies the per-part scores.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Write as _;
use tantivy::query::{EnableScoring, PhraseQuery, Query, Scorer, TermQuery};
use tantivy::schema::{Field, IndexRecordOption, Schema};
use tantivy::tokenizer::TextAnalyzer;
use tantivy::{DocAddress, DocSet, Searcher, Term};

use super::parser::{EntityQueryParser, SearchQuery};
use super::results::rank;
use crate::core::error::{CatalogError, Result};
use crate::core::schema::analyzer::token_texts;
use crate::core::schema::{EntitySchema, FieldKind};

fn default_tie() -> f32 {
    0.1
}

fn default_true() -> bool {
    true
}

/// One alias field of a dismax query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DismaxField {
    pub name: String,

    pub boost: f32,

    /// Take part in the phrase clause
    #[serde(default = "default_true")]
    pub phrase: bool,
}

impl DismaxField {
    pub fn new(name: &str, boost: f32, phrase: bool) -> Self {
        Self {
            name: name.to_string(),
            boost,
            phrase,
        }
    }
}

/// Alias fields and tie factor of a dismax parser
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DismaxConfig {
    /// Share of the non-best sub-scores added to a clause score
    #[serde(default = "default_tie")]
    pub tie: f32,

    pub fields: Vec<DismaxField>,
}

impl DismaxConfig {
    /// Tuning used for artist name searches
    pub fn artist() -> Self {
        Self {
            tie: 0.1,
            fields: vec![
                DismaxField::new("artistaccent", 1.4, false),
                DismaxField::new("artist", 1.2, true),
                DismaxField::new("sortname", 1.1, true),
                DismaxField::new("alias", 0.9, true),
            ],
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.tie) {
            return Err(CatalogError::ConfigError(format!(
                "tie must be within [0, 1], got {}",
                self.tie
            )));
        }
        if self.fields.is_empty() {
            return Err(CatalogError::ConfigError(
                "at least one field is required".to_string(),
            ));
        }
        for field in &self.fields {
            if field.boost <= 0.0 || !field.boost.is_finite() {
                return Err(CatalogError::ConfigError(format!(
                    "boost of '{}' must be positive, got {}",
                    field.name, field.boost
                )));
            }
        }
        Ok(())
    }
}

/// Score of one clause: best sub-score plus `tie` times the others
pub fn dismax_score(sub_scores: &[f32], tie: f32) -> f32 {
    let mut max = 0.0f32;
    let mut sum = 0.0f32;
    for &score in sub_scores {
        max = max.max(score);
        sum += score;
    }
    max + tie * (sum - max)
}

/// A boosted single-field query inside a clause
#[derive(Debug)]
pub struct DismaxPart {
    pub field: String,
    pub boost: f32,
    pub label: String,
    query: Box<dyn Query>,
}

/// Parts combined by disjunction-max
#[derive(Debug)]
pub struct DismaxClause {
    pub label: String,
    pub parts: Vec<DismaxPart>,
}

/// A parsed dismax query, evaluated by the crate
#[derive(Debug)]
pub struct DismaxQuery {
    tie: f32,
    clauses: Vec<DismaxClause>,
}

impl DismaxQuery {
    pub fn tie(&self) -> f32 {
        self.tie
    }

    pub fn clauses(&self) -> &[DismaxClause] {
        &self.clauses
    }

    /// Every matching document with its combined score, best first
    pub fn score_all(&self, searcher: &Searcher) -> Result<Vec<(f32, DocAddress)>> {
        let mut totals: HashMap<DocAddress, f32> = HashMap::new();

        for clause in &self.clauses {
            let mut subs: HashMap<DocAddress, Vec<f32>> = HashMap::new();
            for part in &clause.parts {
                for_each_match(searcher, part.query.as_ref(), &mut |address, score| {
                    subs.entry(address).or_default().push(score * part.boost);
                })?;
            }
            for (address, scores) in subs {
                *totals.entry(address).or_insert(0.0) += dismax_score(&scores, self.tie);
            }
        }

        let mut hits: Vec<(f32, DocAddress)> =
            totals.into_iter().map(|(address, score)| (score, address)).collect();
        rank(&mut hits);
        Ok(hits)
    }

    /// Per-clause, per-field score breakdown of one document
    pub fn explain(&self, searcher: &Searcher, address: DocAddress) -> Result<String> {
        let mut out = String::new();
        let mut total = 0.0f32;

        for (i, clause) in self.clauses.iter().enumerate() {
            let mut lines = String::new();
            let mut scores = Vec::new();
            for part in &clause.parts {
                if let Some(raw) = part_score(searcher, part.query.as_ref(), address)? {
                    let boosted = raw * part.boost;
                    scores.push(boosted);
                    let _ = writeln!(
                        lines,
                        "    {} = {:.4} ({:.4} x {})",
                        part.label, boosted, raw, part.boost
                    );
                }
            }
            let clause_score = dismax_score(&scores, self.tie);
            total += clause_score;
            let _ = writeln!(
                out,
                "  clause {} [{}] = {:.4}",
                i + 1,
                clause.label,
                clause_score
            );
            out.push_str(&lines);
        }

        let _ = writeln!(out, "  total = {:.4} (tie {})", total, self.tie);
        Ok(out)
    }
}

impl std::fmt::Display for DismaxQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let clauses: Vec<String> = self
            .clauses
            .iter()
            .map(|c| {
                let parts: Vec<&str> = c.parts.iter().map(|p| p.label.as_str()).collect();
                format!("({})", parts.join(" | "))
            })
            .collect();
        write!(f, "dismax[tie={}] {}", self.tie, clauses.join(" "))
    }
}

/// Feed every live document matched by `query` to `callback`
fn for_each_match(
    searcher: &Searcher,
    query: &dyn Query,
    callback: &mut dyn FnMut(DocAddress, f32),
) -> Result<()> {
    let weight = query
        .weight(EnableScoring::enabled_from_searcher(searcher))
        .map_err(|e| CatalogError::SearchFailed(format!("Failed to build weight: {e}")))?;

    for (ord, reader) in searcher.segment_readers().iter().enumerate() {
        let alive = reader.alive_bitset();
        weight
            .for_each(reader, &mut |doc, score| {
                if alive.map_or(true, |bits| bits.is_alive(doc)) {
                    callback(DocAddress::new(ord as u32, doc), score);
                }
            })
            .map_err(|e| CatalogError::SearchFailed(format!("Scoring failed: {e}")))?;
    }
    Ok(())
}

/// Unboosted score of `query` for one document, `None` if it does not match
fn part_score(searcher: &Searcher, query: &dyn Query, address: DocAddress) -> Result<Option<f32>> {
    let weight = query
        .weight(EnableScoring::enabled_from_searcher(searcher))
        .map_err(|e| CatalogError::SearchFailed(format!("Failed to build weight: {e}")))?;
    let reader = searcher.segment_reader(address.segment_ord);
    let mut scorer = weight
        .scorer(reader, 1.0)
        .map_err(|e| CatalogError::SearchFailed(format!("Failed to build scorer: {e}")))?;

    if scorer.seek(address.doc_id) == address.doc_id {
        Ok(Some(scorer.score()))
    } else {
        Ok(None)
    }
}

struct AliasField {
    name: String,
    boost: f32,
    phrase: bool,
    field: Field,
    record: IndexRecordOption,
    analyzer: TextAnalyzer,
}

/// Builds [`DismaxQuery`]s; owns one analyzer per alias field
pub struct DismaxParser {
    tie: f32,
    fields: Vec<AliasField>,
}

impl DismaxParser {
    pub fn new(config: &DismaxConfig, entity: &EntitySchema, schema: &Schema) -> Result<Self> {
        config.validate()?;

        let mut fields = Vec::with_capacity(config.fields.len());
        for alias in &config.fields {
            let declared = entity.field(&alias.name).ok_or_else(|| {
                CatalogError::ConfigError(format!(
                    "Dismax field '{}' is not declared for '{}'",
                    alias.name, entity.name
                ))
            })?;
            let analyzer = match (declared.kind, declared.effective_analyzer()) {
                (FieldKind::Text, Some(analyzer)) => analyzer,
                _ => {
                    return Err(CatalogError::ConfigError(format!(
                        "Dismax field '{}' of '{}' must be an indexed text field",
                        alias.name, entity.name
                    )))
                }
            };
            let field = schema.get_field(&alias.name).map_err(|e| {
                CatalogError::StorageError(format!("Missing {} field: {e}", alias.name))
            })?;

            fields.push(AliasField {
                name: alias.name.clone(),
                boost: alias.boost,
                phrase: alias.phrase && !analyzer.is_keyword(),
                field,
                record: if analyzer.is_keyword() {
                    IndexRecordOption::Basic
                } else {
                    IndexRecordOption::WithFreqs
                },
                analyzer: analyzer.build(),
            });
        }

        Ok(Self {
            tie: config.tie,
            fields,
        })
    }
}

impl EntityQueryParser for DismaxParser {
    fn parse(&mut self, query: &str) -> Result<SearchQuery> {
        let text = query.trim();
        if text.is_empty() {
            return Ok(SearchQuery::MatchNone);
        }

        let analyzed: Vec<Vec<String>> = self
            .fields
            .iter_mut()
            .map(|f| token_texts(&mut f.analyzer, text))
            .collect();
        let longest = analyzed.iter().map(Vec::len).max().unwrap_or(0);
        if longest == 0 {
            return Ok(SearchQuery::MatchNone);
        }

        let mut clauses = Vec::with_capacity(longest + 1);
        for i in 0..longest {
            let mut parts = Vec::new();
            let mut label = None;
            for (alias, tokens) in self.fields.iter().zip(&analyzed) {
                let Some(token) = tokens.get(i) else {
                    continue;
                };
                label.get_or_insert_with(|| token.clone());
                parts.push(DismaxPart {
                    field: alias.name.clone(),
                    boost: alias.boost,
                    label: format!("{}:{}^{}", alias.name, token, alias.boost),
                    query: Box::new(TermQuery::new(
                        Term::from_field_text(alias.field, token),
                        alias.record,
                    )),
                });
            }
            clauses.push(DismaxClause {
                label: label.unwrap_or_default(),
                parts,
            });
        }

        if longest >= 2 {
            let mut parts = Vec::new();
            for (alias, tokens) in self.fields.iter().zip(&analyzed) {
                if !alias.phrase || tokens.len() < 2 {
                    continue;
                }
                let terms: Vec<Term> = tokens
                    .iter()
                    .map(|t| Term::from_field_text(alias.field, t))
                    .collect();
                parts.push(DismaxPart {
                    field: alias.name.clone(),
                    boost: alias.boost,
                    label: format!("{}:\"{}\"^{}", alias.name, tokens.join(" "), alias.boost),
                    query: Box::new(PhraseQuery::new(terms)),
                });
            }
            if !parts.is_empty() {
                clauses.push(DismaxClause {
                    label: "phrase".to_string(),
                    parts,
                });
            }
        }

        Ok(SearchQuery::Dismax(DismaxQuery {
            tie: self.tie,
            clauses,
        }))
    }
}
