//! Explain command - show how hits of a query were scored

use crate::cli::OutputFormat;
use crate::core::services::Services;
use clap::Args;
use serde::Serialize;
use std::sync::Arc;

/// Arguments for the explain command
#[derive(Args, Debug)]
pub struct ExplainArgs {
    /// Entity to search
    pub entity: String,

    /// Search query
    pub query: String,

    /// Number of leading hits to skip
    #[arg(long, short = 'o', default_value = "0")]
    pub offset: usize,

    /// Maximum number of hits to explain
    #[arg(long, short = 'k')]
    pub limit: Option<usize>,
}

/// Explain response
#[derive(Debug, Serialize)]
pub struct ExplainResponse {
    pub entity: String,
    pub query: String,
    pub parser: &'static str,
    pub explanation: String,
}

/// Execute the explain command
pub async fn execute(
    args: ExplainArgs,
    services: &Arc<Services>,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let explanation = services.explain(&args.entity, &args.query, args.offset, args.limit)?;

    match format {
        OutputFormat::Human => print!("{explanation}"),
        OutputFormat::Json => {
            let response = ExplainResponse {
                parser: services.server(&args.entity)?.parser_kind(),
                entity: args.entity,
                query: args.query,
                explanation,
            };
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
    }

    Ok(())
}
