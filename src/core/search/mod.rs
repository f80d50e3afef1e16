//! Query serving over entity snapshots.
//!
//! - **query**: syntax check and qualifier fallback for the standard parser
//! - **parser**: parser trait, standard parser and the per-call factory
//! - **dismax**: weighted multi-field composition with its own scorer
//! - **results**: ranking, normalization and pagination
//! - **server**: per-entity search / explain / reload
//! - **writer**: results rendering in two schema versions

mod dismax;
mod parser;
mod query;
mod results;
mod server;
mod writer;

pub use dismax::{dismax_score, DismaxClause, DismaxConfig, DismaxField, DismaxParser, DismaxQuery};
pub use parser::{EntityQueryParser, ParserFactory, RankedHits, SearchQuery, StandardParser};
pub use query::{check_syntax, preprocess_query, strip_unknown_qualifiers};
pub use results::{normalize, paginate, rank};
pub use server::{SearchLimits, SearchServer};
pub use writer::{
    percent, Encoding, MetadataResultsWriter, ResultsContext, ResultsWriter, SchemaVersion,
};
