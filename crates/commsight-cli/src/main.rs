//! Commsight CLI
//!
//! Retrieval-augmented answers over customer communications.

use anyhow::Result;
use clap::Parser;
use commsight_core::{CommsightError, Config};

mod app;
mod commands;
mod output;
mod progress;
mod services;

use app::{Cli, Commands};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        let code = e
            .downcast_ref::<CommsightError>()
            .map_or(commsight_core::error::exit_codes::GENERAL_ERROR, |e| {
                e.exit_code()
            });
        std::process::exit(code);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    match cli.command {
        Commands::Query(args) => commands::rag::run_query(args, &config, cli.format).await,
        Commands::Search(args) => commands::rag::run_search(args, &config, cli.format).await,
        Commands::Similar(args) => commands::rag::run_similar(args, &config, cli.format).await,
        Commands::Ask(args) => commands::rag::run_ask(args, &config, cli.format).await,
        Commands::Summarize(args) => commands::rag::run_summarize(args, &config, cli.format).await,
        Commands::Index(args) => commands::index::run(args, &config, cli.format).await,
        Commands::Enhance(args) => commands::enhance::run(args, &config, cli.format).await,
        Commands::Decompose(args) => commands::enhance::run_decompose(args, cli.format),
        Commands::Chunk(args) => commands::chunk::run(args, &config, cli.format).await,
        Commands::Trends(args) => commands::trends::run(args, &config, cli.format).await,
    }
}
