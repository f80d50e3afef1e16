//! Rendering of [`Results`] for callers.
//!
//! Two metadata-schema versions are supported and they are deliberately
//! not interchangeable:
//!
//! - **v1** nests hits under `search_results`, each hit carrying an
//!   integer percentage `score` and a `fields` map
//! - **v2** is flat: `created`, `count`, `offset` and a plural entity array
//!   (`releases`, `artists`, ...) whose items inline score and fields
//!
//! Each version renders as JSON or as plain text.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Map, Value};
use std::fmt::Write as _;
use std::str::FromStr;

use crate::core::error::Result;
use crate::core::types::{Results, StoredDocument};

/// Output metadata-schema version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchemaVersion {
    V1,
    #[default]
    V2,
}

impl FromStr for SchemaVersion {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "1" | "v1" => Ok(SchemaVersion::V1),
            "2" | "v2" => Ok(SchemaVersion::V2),
            other => Err(format!("unknown schema version '{other}' (expected v1 or v2)")),
        }
    }
}

/// Output encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    #[default]
    Json,
    Text,
}

impl FromStr for Encoding {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Encoding::Json),
            "text" | "txt" => Ok(Encoding::Text),
            other => Err(format!("unknown encoding '{other}' (expected json or text)")),
        }
    }
}

/// What a writer knows about the index the results came from
#[derive(Debug, Clone, Copy)]
pub struct ResultsContext<'a> {
    pub entity: &'a str,
    pub last_updated: Option<DateTime<Utc>>,
}

/// Renders a page of results
pub trait ResultsWriter: Send + Sync {
    fn write(
        &self,
        context: &ResultsContext<'_>,
        results: &Results,
        version: SchemaVersion,
        encoding: Encoding,
    ) -> Result<String>;
}

/// Default writer over the stored fields of each hit
#[derive(Debug, Clone, Copy, Default)]
pub struct MetadataResultsWriter;

impl ResultsWriter for MetadataResultsWriter {
    fn write(
        &self,
        context: &ResultsContext<'_>,
        results: &Results,
        version: SchemaVersion,
        encoding: Encoding,
    ) -> Result<String> {
        match (version, encoding) {
            (SchemaVersion::V1, Encoding::Json) => {
                Ok(serde_json::to_string_pretty(&v1_json(context, results))?)
            }
            (SchemaVersion::V2, Encoding::Json) => {
                Ok(serde_json::to_string_pretty(&v2_json(context, results))?)
            }
            (SchemaVersion::V1, Encoding::Text) => Ok(v1_text(context, results)),
            (SchemaVersion::V2, Encoding::Text) => Ok(v2_text(context, results)),
        }
    }
}

/// Normalized score as an integer percentage
pub fn percent(score: f32) -> u32 {
    (score.clamp(0.0, 1.0) * 100.0).round() as u32
}

fn created(context: &ResultsContext<'_>) -> Option<String> {
    context
        .last_updated
        .map(|ts| ts.to_rfc3339_opts(SecondsFormat::Secs, true))
}

fn field_map(document: &StoredDocument) -> Map<String, Value> {
    let mut map = Map::new();
    for (name, values) in document.grouped() {
        let value = match values.as_slice() {
            [single] => Value::String(single.to_string()),
            many => Value::Array(many.iter().map(|v| Value::String(v.to_string())).collect()),
        };
        map.insert(name.to_string(), value);
    }
    map
}

fn v1_json(context: &ResultsContext<'_>, results: &Results) -> Value {
    let hits: Vec<Value> = results
        .results
        .iter()
        .map(|item| {
            json!({
                "score": percent(item.score),
                "fields": field_map(&item.document),
            })
        })
        .collect();

    json!({
        "search_results": {
            "entity": context.entity,
            "offset": results.offset,
            "total": results.total_hits,
            "hits": hits,
        }
    })
}

fn v2_json(context: &ResultsContext<'_>, results: &Results) -> Value {
    let items: Vec<Value> = results
        .results
        .iter()
        .map(|item| {
            let mut map = Map::new();
            map.insert("score".to_string(), json!(percent(item.score)));
            map.extend(field_map(&item.document));
            Value::Object(map)
        })
        .collect();

    let mut root = Map::new();
    root.insert("created".to_string(), json!(created(context)));
    root.insert("count".to_string(), json!(results.total_hits));
    root.insert("offset".to_string(), json!(results.offset));
    root.insert(format!("{}s", context.entity), Value::Array(items));
    Value::Object(root)
}

fn v1_text(context: &ResultsContext<'_>, results: &Results) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} results {}-{} of {}",
        context.entity,
        results.offset.saturating_add(1),
        results.offset.saturating_add(results.results.len()),
        results.total_hits
    );
    for (i, item) in results.results.iter().enumerate() {
        let fields: Vec<String> = item
            .document
            .grouped()
            .into_iter()
            .map(|(name, values)| format!("{}={}", name, values.join("; ")))
            .collect();
        let _ = writeln!(
            out,
            "{:>4}. [{:>3}] {}",
            results.offset.saturating_add(i + 1),
            percent(item.score),
            fields.join(" | ")
        );
    }
    out
}

fn v2_text(context: &ResultsContext<'_>, results: &Results) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "created: {}",
        created(context).unwrap_or_else(|| "unknown".to_string())
    );
    let _ = writeln!(out, "count: {}", results.total_hits);
    let _ = writeln!(out, "offset: {}", results.offset);
    for item in &results.results {
        let _ = writeln!(out);
        let _ = writeln!(out, "{} (score {})", context.entity, percent(item.score));
        for (name, values) in item.document.grouped() {
            let _ = writeln!(out, "  {}: {}", name, values.join("; "));
        }
    }
    out
}
