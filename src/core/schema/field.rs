//! Index field descriptors.

use serde::{Deserialize, Serialize};

use super::analyzer::Analyzer;

/// How a field is indexed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Indexing {
    /// Run through the field analyzer
    #[default]
    Analyzed,
    /// Indexed verbatim as one term
    NotAnalyzed,
    /// Not searchable
    No,
}

/// Value type carried by a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    #[default]
    Text,
    Unsigned,
}

/// Where a field's values come from in a fetched row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldSource {
    /// The row's primary key
    Id,
    /// A named column of the primary row
    Column(String),
    /// Every value of a joined child collection
    Children(String),
    /// A fixed value for every document
    Constant(String),
}

/// Value rewrite applied by the document mapper
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transform {
    #[default]
    None,
    Lowercase,
    StripLeadingZeros,
}

impl Transform {
    pub fn apply(&self, value: &str) -> String {
        match self {
            Transform::None => value.to_string(),
            Transform::Lowercase => value.to_lowercase(),
            Transform::StripLeadingZeros => value.trim_start_matches('0').to_string(),
        }
    }
}

/// One entry of an entity's field catalogue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexField {
    pub name: String,

    pub source: FieldSource,

    #[serde(default)]
    pub stored: bool,

    #[serde(default)]
    pub indexing: Indexing,

    /// Analyzer for `Analyzed` fields (defaults to `standard`)
    #[serde(default)]
    pub analyzer: Option<Analyzer>,

    #[serde(default)]
    pub kind: FieldKind,

    #[serde(default)]
    pub transform: Transform,

    /// Missing or empty values fail the row instead of being skipped
    #[serde(default)]
    pub required: bool,
}

impl IndexField {
    /// Analyzer actually applied at index and query time
    pub fn effective_analyzer(&self) -> Option<Analyzer> {
        match self.indexing {
            Indexing::Analyzed => Some(self.analyzer.unwrap_or(Analyzer::Standard)),
            Indexing::NotAnalyzed => Some(Analyzer::Keyword),
            Indexing::No => None,
        }
    }

    pub fn is_indexed(&self) -> bool {
        self.indexing != Indexing::No
    }
}
