//! twinsync - keeps two UI-framework representations of one app in sync.

#![allow(dead_code)]

mod actor;
mod cache;
mod cli;
mod config;
mod conflict;
mod converter;
mod core;
mod engine;
mod freshness;
mod ir;
mod logger;
mod queue;
mod reload;
mod store;
mod utils;

use anyhow::Result;
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands};
use config::SyncConfig;

fn main() -> Result<()> {
    // Setup global Ctrl+C handler (before any blocking operations)
    core::setup_shutdown_handler()?;

    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    logger::set_verbose(cli.verbose);

    let config = SyncConfig::load(&cli)?;

    match &cli.command {
        Commands::Serve { .. } => cli::serve::serve(config),
        Commands::Sync { files } => cli::sync::run_sync(&config, files),
        Commands::Status => cli::status::run_status(&config),
        Commands::Resolve {
            component,
            strategy,
        } => cli::resolve::run_resolve(&config, component, *strategy),
    }
}
