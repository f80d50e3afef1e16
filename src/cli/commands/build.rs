//! Build command - build entity indexes from JSON-lines dumps

use crate::cli::output::{colors, format_duration_ms, print_warning};
use crate::cli::OutputFormat;
use crate::core::indexer::{BuildReport, IndexBuildOrchestrator};
use crate::core::services::Services;
use crate::core::source::JsonlSource;
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

/// Arguments for the build command
#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Entity to build (can be specified multiple times; default: all)
    #[arg(long, short = 'e')]
    pub entity: Vec<String>,

    /// Primary-key ids per fetch
    #[arg(long)]
    pub chunk_size: Option<u64>,

    /// Only index ids up to the test limit
    #[arg(long)]
    pub test: bool,

    /// Highest id indexed in test mode
    #[arg(long, requires = "test")]
    pub test_limit: Option<u64>,

    /// Directory holding `<entity>.jsonl` dumps
    #[arg(long, short = 'd')]
    pub dump_dir: Option<PathBuf>,

    /// Analysis worker threads (0 = one per CPU)
    #[arg(long, short = 'w')]
    pub workers: Option<usize>,

    /// Skip the final segment merge
    #[arg(long)]
    pub no_optimize: bool,
}

/// Build response
#[derive(Debug, Serialize)]
pub struct BuildResponse {
    pub index_dir: String,
    pub succeeded: usize,
    pub failed: usize,
    pub reports: Vec<BuildReport>,
}

/// Execute the build command
pub async fn execute(
    args: BuildArgs,
    services: &Arc<Services>,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = services.config.build.clone();
    if let Some(chunk_size) = args.chunk_size {
        config.chunk_size = chunk_size;
    }
    if args.test {
        config.test_mode = true;
    }
    if let Some(limit) = args.test_limit {
        config.test_limit = limit;
    }
    if let Some(workers) = args.workers {
        config.workers = workers;
    }
    if args.no_optimize {
        config.optimize = false;
    }

    let dump_dir = args
        .dump_dir
        .unwrap_or_else(|| services.config.source.dump_dir.clone());
    if !dump_dir.is_dir() {
        return Err(format!(
            "Dump directory '{}' does not exist. Pass --dump-dir or set CATALOG_SEARCH_DUMP_DIR.",
            dump_dir.display()
        )
        .into());
    }

    let entities = if args.entity.is_empty() {
        config.entities.clone()
    } else {
        args.entity
    };

    let orchestrator = IndexBuildOrchestrator::new(
        config,
        Arc::clone(&services.catalog),
        services.store.clone(),
        Arc::new(JsonlSource::new(dump_dir)),
    );

    let reports =
        tokio::task::spawn_blocking(move || orchestrator.run_all(&entities)).await??;

    let failed = reports.iter().filter(|r| !r.is_success()).count();
    let response = BuildResponse {
        index_dir: services.store.root().display().to_string(),
        succeeded: reports.len() - failed,
        failed,
        reports,
    };

    match format {
        OutputFormat::Human => print_human(&response),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&response)?),
    }

    if failed > 0 {
        return Err(format!("{} of {} entity builds failed", failed, response.reports.len()).into());
    }
    Ok(())
}

fn print_human(response: &BuildResponse) {
    for report in &response.reports {
        if report.is_success() {
            println!(
                "{} {}: {} documents in {} chunks ({})",
                colors::success("ok"),
                colors::entity(&report.entity),
                colors::number(&report.documents.to_string()),
                report.chunks,
                format_duration_ms(report.duration_ms)
            );
            if let Some(expected) = report.expected_rows {
                if !report.verified() {
                    print_warning(&format!(
                        "'{}' committed {} documents but the source has {} rows",
                        report.entity, report.documents, expected
                    ));
                }
            }
        } else {
            println!(
                "{} {}: failed while {}: {}",
                colors::error("FAILED"),
                colors::entity(&report.entity),
                report
                    .failed_in
                    .map(|state| state.to_string())
                    .unwrap_or_else(|| "building".to_string()),
                report.error.as_deref().unwrap_or("unknown error")
            );
        }
    }
    println!(
        "\n{} built, {} failed under {}",
        colors::number(&response.succeeded.to_string()),
        colors::number(&response.failed.to_string()),
        colors::file_path(&response.index_dir)
    );
}
