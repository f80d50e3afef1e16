//! catalog-search CLI
//!
//! Builds per-entity catalogue indexes and queries them.
//!
//! # Examples
//!
//! ```bash
//! # Build every entity from JSON-lines dumps
//! catalog-search build --dump-dir ./dumps
//!
//! # Build releases only, capped at id 50000
//! catalog-search build --entity release --test
//!
//! # Search
//! catalog-search search release 'release:"Our Glorious 5 Year Plan"'
//! catalog-search search artist "sigur ros" --schema-version v1
//!
//! # Scoring breakdown
//! catalog-search explain artist "sigur ros" --limit 3
//!
//! # Line-delimited query serving with periodic reload
//! printf 'artist\tsigur ros\n' | catalog-search serve
//! ```

use clap::Parser;
use catalog_search::cli::{run, Cli};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "catalog_search=info".into());

    // stdout carries command output; logs go to stderr
    let json = std::env::var("CATALOG_SEARCH_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().compact().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() {
    init_logging();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        catalog_search::cli::output::print_error(&e.to_string());
        std::process::exit(1);
    }
}
