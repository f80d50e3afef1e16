//! Named analyzers shared by indexing and querying.
//!
//! Every index registers the same analyzer set under the same names, so the
//! pre-tokenized values produced by build workers and the terms produced by
//! the query parsers always agree.

use serde::{Deserialize, Serialize};
use tantivy::tokenizer::{
    AsciiFoldingFilter, LowerCaser, RawTokenizer, RemoveLongFilter, SimpleTokenizer, TextAnalyzer,
    TokenStream,
};
use tantivy::Index;

/// Tokens longer than this are dropped by the word analyzers
const MAX_TOKEN_LEN: usize = 255;

/// Analyzer attached to an index field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Analyzer {
    /// Word tokens, lowercased, accents folded to ASCII
    Standard,
    /// Word tokens, lowercased, accents kept
    Accent,
    /// Whole value as a single token
    Keyword,
    /// Whole value as a single lowercased token
    KeywordCi,
}

impl Analyzer {
    pub const ALL: [Analyzer; 4] = [
        Analyzer::Standard,
        Analyzer::Accent,
        Analyzer::Keyword,
        Analyzer::KeywordCi,
    ];

    /// Name used in the tantivy tokenizer manager
    pub fn name(&self) -> &'static str {
        match self {
            Analyzer::Standard => "cs_standard",
            Analyzer::Accent => "cs_accent",
            Analyzer::Keyword => "cs_keyword",
            Analyzer::KeywordCi => "cs_keyword_ci",
        }
    }

    /// Keyword analyzers produce one token per value
    pub fn is_keyword(&self) -> bool {
        matches!(self, Analyzer::Keyword | Analyzer::KeywordCi)
    }

    /// Build a fresh tantivy analyzer pipeline
    pub fn build(&self) -> TextAnalyzer {
        match self {
            Analyzer::Standard => TextAnalyzer::builder(SimpleTokenizer::default())
                .filter(RemoveLongFilter::limit(MAX_TOKEN_LEN))
                .filter(LowerCaser)
                .filter(AsciiFoldingFilter)
                .build(),
            Analyzer::Accent => TextAnalyzer::builder(SimpleTokenizer::default())
                .filter(RemoveLongFilter::limit(MAX_TOKEN_LEN))
                .filter(LowerCaser)
                .build(),
            Analyzer::Keyword => TextAnalyzer::builder(RawTokenizer::default()).build(),
            Analyzer::KeywordCi => TextAnalyzer::builder(RawTokenizer::default())
                .filter(LowerCaser)
                .build(),
        }
    }
}

/// Register all analyzers on an index (tokenizers are not persisted)
pub fn register_analyzers(index: &Index) {
    for analyzer in Analyzer::ALL {
        index.tokenizers().register(analyzer.name(), analyzer.build());
    }
}

/// Run text through an analyzer and collect the token texts
pub fn token_texts(analyzer: &mut TextAnalyzer, text: &str) -> Vec<String> {
    let mut stream = analyzer.token_stream(text);
    let mut tokens = Vec::new();
    while stream.advance() {
        tokens.push(stream.token().text.clone());
    }
    tokens
}
