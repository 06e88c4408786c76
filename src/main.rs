// src/main.rs

use anyhow::{Context, Result};
use clap::Parser;
use repocrawl::cli::Cli;
use repocrawl::config::{request_from_cli, ConfigBuilder};
use repocrawl::git::detect_clone_capability;
use repocrawl::progress::terminal_progress;
use repocrawl::Crawler;
use std::fs;

fn main() -> Result<()> {
    // Initialize logging. RUST_LOG overrides the default directive.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(
                if cfg!(debug_assertions) {
                    "repocrawl=debug".parse()?
                } else {
                    "repocrawl=info".parse()?
                },
            ),
        )
        .init();

    log::info!("Starting repocrawl v{}...", env!("CARGO_PKG_VERSION"));

    // --- Setup ---
    let cli = Cli::parse();
    let config = ConfigBuilder::from_cli(&cli).build()?;
    let request = request_from_cli(&cli)?;
    log::debug!("Configuration: {:?}", config);
    log::debug!("Request: {:?}", request);

    let crawler = Crawler::new(config)?.with_cloner(detect_clone_capability(terminal_progress()));

    // --- Execution ---
    let result = crawler.crawl(&request);
    let json = serde_json::to_string_pretty(&result)?;

    match &cli.output_file {
        Some(path) => fs::write(path, format!("{}\n", json))
            .with_context(|| format!("Failed to write output file '{}'", path))?,
        None => println!("{}", json),
    }

    // --- Summary & Exit Code ---
    let stats = &result.stats;
    match &stats.error {
        None => {
            eprintln!(
                "repocrawl: {} files downloaded, {} skipped (source: {})",
                stats.downloaded_count, stats.skipped_count, stats.source
            );
            Ok(())
        }
        Some(error) => {
            eprintln!(
                "repocrawl: {} files downloaded, {} skipped (source: {}). Error: {}",
                stats.downloaded_count, stats.skipped_count, stats.source, error
            );
            std::process::exit(2);
        }
    }
}
