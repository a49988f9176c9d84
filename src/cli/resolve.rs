//! `twinsync resolve COMPONENT STRATEGY` outside of serve.
//!
//! A running `serve` keeps its own conflict state; there the same command
//! is typed into the serve console instead.

use std::path::Path;

use anyhow::{Result, bail};
use owo_colors::OwoColorize;

use crate::config::SyncConfig;
use crate::conflict::{ResolutionResult, ResolutionStrategy};
use crate::core::Representation;
use crate::engine::SyncEngine;

pub fn run_resolve(config: &SyncConfig, component: &str, strategy: ResolutionStrategy) -> Result<()> {
    let mut engine = SyncEngine::open(config)?;
    let (result, _) = engine.resolve_component(component, strategy);
    print_resolution(config, component, &result);

    if !result.success {
        bail!("could not resolve {}", component);
    }
    Ok(())
}

fn print_resolution(config: &SyncConfig, component: &str, result: &ResolutionResult) {
    let show = |path: &Path| config.root_relative(path).display().to_string();

    if !result.success {
        println!("{} {} {}", "✗".red().bold(), result.strategy.label(), component);
        if let Some(error) = &result.error {
            println!("  {}", error.red());
        }
        return;
    }

    println!("{} {} {}", "✓".green(), result.strategy.label(), component);
    if let Some(version) = result.stored_version {
        println!("  stored v{version}");
    }
    for rep in [Representation::A, Representation::B] {
        if let Some(path) = result.files_regenerated.get(rep) {
            println!("  regenerated {}", show(path));
        }
    }
    for backup in &result.backups {
        println!("  backup {}", show(backup).dimmed());
    }
    if result.needs_manual_edit {
        println!(
            "  {}",
            "merge the files by hand, then save one side to sync it".yellow()
        );
    }
}
