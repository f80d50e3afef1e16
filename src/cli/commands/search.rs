//! Search command - search an entity index

use crate::cli::output::{colors, truncate};
use crate::cli::OutputFormat;
use crate::core::search::{percent, Encoding, SchemaVersion};
use crate::core::services::Services;
use crate::core::types::Results;
use clap::Args;
use std::sync::Arc;

/// Arguments for the search command
#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Entity to search (artist, release, ...)
    pub entity: String,

    /// Search query (field qualifiers, phrases, AND/OR/NOT)
    pub query: String,

    /// Number of leading hits to skip
    #[arg(long, short = 'o', default_value = "0")]
    pub offset: usize,

    /// Maximum number of results (default from config)
    #[arg(long, short = 'k')]
    pub limit: Option<usize>,

    /// Results schema version (v1 or v2)
    #[arg(long)]
    pub schema_version: Option<SchemaVersion>,

    /// Results encoding (json or text)
    #[arg(long)]
    pub encoding: Option<Encoding>,
}

/// Execute the search command
pub async fn execute(
    args: SearchArgs,
    services: &Arc<Services>,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let results = services.search(&args.entity, &args.query, args.offset, args.limit)?;

    // An explicit results contract wins over the human listing
    if format == OutputFormat::Json || args.schema_version.is_some() || args.encoding.is_some() {
        let server = services.server(&args.entity)?;
        let rendered = server.render(
            &results,
            args.schema_version.unwrap_or_default(),
            args.encoding.unwrap_or_default(),
        )?;
        println!("{rendered}");
        return Ok(());
    }

    print_human(&args, services, &results);
    Ok(())
}

fn print_human(args: &SearchArgs, services: &Services, results: &Results) {
    if results.results.is_empty() {
        println!(
            "No results found for '{}' in '{}' ({} total)",
            colors::label(&args.query),
            colors::entity(&args.entity),
            results.total_hits
        );
        return;
    }

    println!(
        "Showing {} of {} result(s) in '{}':\n",
        colors::number(&results.results.len().to_string()),
        colors::number(&results.total_hits.to_string()),
        colors::entity(&args.entity)
    );

    let defaults = services
        .catalog
        .get(&args.entity)
        .map(|schema| schema.default_fields.clone())
        .unwrap_or_default();

    for (i, item) in results.results.iter().enumerate() {
        let id = item.document.get("_id").unwrap_or("?");
        println!(
            "[{}] {} {}",
            colors::rank(&(results.offset + i + 1).to_string()),
            colors::label(id),
            colors::score(&format!("({}%)", percent(item.score)))
        );
        for (name, values) in item.document.grouped() {
            if name == "_id" {
                continue;
            }
            let line = format!("{name}: {}", truncate(&values.join("; "), 100));
            if defaults.iter().any(|f| f == name) {
                println!("    {line}");
            } else {
                println!("    {}", colors::dim(&line));
            }
        }
        println!();
    }
}
