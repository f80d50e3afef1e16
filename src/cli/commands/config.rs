//! Config command - show current configuration

use crate::cli::OutputFormat;
use crate::core::services::Services;
use clap::Args;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Arguments for the config command
#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Also list every entity with its default fields
    #[arg(long, short = 'a')]
    pub all: bool,
}

/// Configuration response
#[derive(Debug, Serialize)]
pub struct ConfigResponse {
    pub config_file: String,
    pub config: crate::core::config::Config,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub entities: BTreeMap<String, Vec<String>>,
}

/// Execute the config command
pub async fn execute(
    args: ConfigArgs,
    services: &Arc<Services>,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = &services.config;
    let xdg = crate::core::xdg::XdgDirs::new();

    let entities = if args.all {
        services
            .catalog
            .entity_names()
            .into_iter()
            .filter_map(|name| {
                services
                    .catalog
                    .get(name)
                    .ok()
                    .map(|schema| (name.to_string(), schema.default_fields.clone()))
            })
            .collect()
    } else {
        BTreeMap::new()
    };

    let response = ConfigResponse {
        config_file: xdg.config_file().to_string_lossy().into_owned(),
        config: config.as_ref().clone(),
        entities,
    };

    match format {
        OutputFormat::Human => {
            let build = &response.config.build;
            let search = &response.config.search;
            println!("Configuration:");
            println!("  config_file: {}", response.config_file);
            println!("  build:");
            if build.entities.is_empty() {
                println!("    entities: all");
            } else {
                println!("    entities: {}", build.entities.join(", "));
            }
            println!("    chunk_size: {}", build.chunk_size);
            println!("    test_mode: {} (limit {})", build.test_mode, build.test_limit);
            println!("    workers: {}", build.workers);
            println!("    writer_heap_mb: {}", build.writer_heap_mb);
            println!("    optimize: {}", build.optimize);
            println!("  storage:");
            println!("    index_dir: {}", response.config.storage.index_dir.display());
            println!("  source:");
            println!("    dump_dir: {}", response.config.source.dump_dir.display());
            println!("  search:");
            println!("    default_limit: {}", search.default_limit);
            println!("    max_limit: {}", search.max_limit);
            println!("    max_query_length: {}", search.max_query_length);
            println!("    reload_interval_sec: {}", search.reload_interval_sec);
            for (entity, dismax) in &search.dismax {
                let fields: Vec<String> = dismax
                    .fields
                    .iter()
                    .map(|f| format!("{}^{}", f.name, f.boost))
                    .collect();
                println!(
                    "    dismax.{}: tie {} [{}]",
                    entity,
                    dismax.tie,
                    fields.join(" ")
                );
            }
            println!("  schema:");
            match &response.config.schema.catalog_file {
                Some(path) => println!("    catalog_file: {}", path.display()),
                None => println!("    catalog_file: built-in"),
            }
            if !response.entities.is_empty() {
                println!("  entities:");
                for (name, defaults) in &response.entities {
                    println!("    {}: {}", name, defaults.join(", "));
                }
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
    }

    Ok(())
}
