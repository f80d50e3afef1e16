//! Status command - list built indexes

use crate::cli::output::{colors, format_bytes, format_duration_ms, format_relative_time};
use crate::cli::OutputFormat;
use crate::core::services::Services;
use crate::core::storage::IndexStatus;
use clap::Args;
use serde::Serialize;
use std::sync::Arc;

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Only show this entity
    #[arg(long, short = 'e')]
    pub entity: Option<String>,
}

/// Status response
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub index_dir: String,
    pub indexes: Vec<IndexStatus>,
    /// Catalogue entities without an index
    pub missing: Vec<String>,
}

/// Execute the status command
pub async fn execute(
    args: StatusArgs,
    services: &Arc<Services>,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(entity) = &args.entity {
        services.catalog.get(entity)?;
    }

    let indexes: Vec<IndexStatus> = services
        .store
        .status()?
        .into_iter()
        .filter(|s| args.entity.as_ref().map_or(true, |e| *e == s.entity))
        .collect();

    let missing = services
        .catalog
        .entity_names()
        .into_iter()
        .filter(|name| args.entity.as_deref().map_or(true, |e| e == *name))
        .filter(|name| !services.store.index_exists(name))
        .map(String::from)
        .collect();

    let response = StatusResponse {
        index_dir: services.store.root().display().to_string(),
        indexes,
        missing,
    };

    match format {
        OutputFormat::Human => print_human(&response),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&response)?),
    }

    Ok(())
}

fn print_human(response: &StatusResponse) {
    println!(
        "Indexes under {}:\n",
        colors::file_path(&response.index_dir)
    );

    if response.indexes.is_empty() {
        println!("  {}", colors::dim("(none)"));
    }

    for status in &response.indexes {
        println!(
            "  {} {}",
            colors::entity(&status.entity),
            colors::dim(&format_bytes(status.size_bytes))
        );
        match &status.build {
            Some(build) => {
                println!(
                    "    built {} ({}), {} documents of {} rows, max id {}",
                    build.built_at.format("%Y-%m-%d %H:%M:%S UTC"),
                    format_relative_time(&build.built_at),
                    colors::number(&build.documents.to_string()),
                    build.expected_rows,
                    build.max_id
                );
                let mut notes = vec![format!("took {}", format_duration_ms(build.duration_ms))];
                if build.test_mode {
                    notes.push("test mode".to_string());
                }
                if !build.optimized {
                    notes.push("not optimized".to_string());
                }
                if build.documents != build.expected_rows {
                    notes.push(colors::warning("count mismatch").to_string());
                }
                println!("    {}", notes.join(", "));
            }
            None => println!("    {}", colors::dim("no build summary")),
        }
    }

    if !response.missing.is_empty() {
        println!(
            "\nNot built: {}",
            colors::dim(&response.missing.join(", "))
        );
    }
}
