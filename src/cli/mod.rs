//! CLI adapter for catalog-search
//!
//! Provides the command-line interface for building entity indexes and
//! querying them.
//!
//! # Architecture
//!
//! ```text
//!              +------------------+
//!              |     core/        |
//!              |  (domain logic)  |
//!              +--------+---------+
//!                       |
//!                       v
//!              +------------------+
//!              |      cli/        |
//!              | (clap adapter)   |
//!              +------------------+
//! ```

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};

/// catalog-search - per-entity catalogue search
///
/// Build full-text indexes for catalogue entities from JSON-lines dumps
/// and query them with the standard or dismax parser.
#[derive(Parser, Debug)]
#[command(name = "catalog-search")]
#[command(version)]
#[command(about = "Per-entity catalogue search indexes", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format
    #[arg(long, global = true, default_value = "human")]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output (default)
    #[default]
    Human,
    /// JSON output for scripting
    Json,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build indexes for one or more entities
    Build(commands::BuildArgs),

    /// Search an entity index
    Search(commands::SearchArgs),

    /// Show the scoring breakdown of a search
    Explain(commands::ExplainArgs),

    /// Answer queries from stdin, reloading indexes periodically
    ///
    /// Each input line is `<entity><TAB><query>`; each answer is one line
    /// of JSON.
    Serve(commands::ServeArgs),

    /// List built indexes with their last build summary
    Status(commands::StatusArgs),

    /// Show current configuration
    #[command(name = "show-config")]
    ShowConfig(commands::ConfigArgs),

    /// Generate shell completion scripts
    ///
    /// Output completion script to stdout. To install:
    ///
    ///   bash:  catalog-search completions bash > ~/.local/share/bash-completion/completions/catalog-search
    ///   zsh:   catalog-search completions zsh > ~/.zfunc/_catalog-search
    ///   fish:  catalog-search completions fish > ~/.config/fish/completions/catalog-search.fish
    Completions(commands::CompletionsArgs),
}

/// Run the CLI with the provided arguments
pub async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    use crate::core::config::Config;
    use crate::core::services::Services;
    use crate::core::xdg::XdgDirs;
    use std::sync::Arc;

    // Handle completions command early (doesn't need services)
    if let Commands::Completions(args) = cli.command {
        return commands::completions::execute(args);
    }

    let xdg = XdgDirs::new();
    xdg.log_paths();

    let config = Config::load_with_xdg(&xdg)?;
    config.log_config();

    let services = Arc::new(Services::new(config)?);

    match cli.command {
        Commands::Build(args) => commands::build::execute(args, &services, cli.format).await,
        Commands::Search(args) => commands::search::execute(args, &services, cli.format).await,
        Commands::Explain(args) => commands::explain::execute(args, &services, cli.format).await,
        Commands::Serve(args) => commands::serve::execute(args, &services).await,
        Commands::Status(args) => commands::status::execute(args, &services, cli.format).await,
        Commands::ShowConfig(args) => commands::config::execute(args, &services, cli.format).await,
        Commands::Completions(_) => unreachable!(), // Handled above
    }
}
