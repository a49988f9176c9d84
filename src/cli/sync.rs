//! `twinsync sync [FILES]`: one batch, no watcher, no clients.

use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use owo_colors::OwoColorize;

use crate::config::SyncConfig;
use crate::core::Priority;
use crate::engine::{PathPairing, SyncEngine, SyncResult, SyncStatus};
use crate::queue::{ChangeKind, FileEvent, QueuedChange};

/// Sync `files`, or every component when empty.
///
/// Fails when any change failed or is left in conflict.
pub fn run_sync(config: &SyncConfig, files: &[PathBuf]) -> Result<()> {
    let mut engine = SyncEngine::open(config)?;

    let changes = if files.is_empty() {
        engine.initial_changes()
    } else {
        let cwd = std::env::current_dir()?;
        changes_for(engine.pairing(), files, &cwd)?
    };
    if changes.is_empty() {
        crate::log!("sync"; "nothing to sync");
        return Ok(());
    }

    let results = engine.process_changes(&changes);
    for result in &results {
        print_result(config, result);
    }

    let failed = results
        .iter()
        .filter(|r| matches!(r.status, SyncStatus::Failed | SyncStatus::Conflict))
        .count();
    if failed > 0 {
        bail!("{} of {} changes did not sync", failed, results.len());
    }
    Ok(())
}

/// One queued change per path; existing files are changes, missing ones deletes.
fn changes_for(pairing: &PathPairing, files: &[PathBuf], cwd: &Path) -> Result<Vec<QueuedChange>> {
    files
        .iter()
        .map(|file| {
            let path = crate::utils::path::resolve_path(file, cwd);
            let Some(paired) = pairing.pair(&path) else {
                bail!("{} is not under a sync root", file.display());
            };
            let kind = if path.exists() {
                ChangeKind::Change
            } else {
                ChangeKind::Delete
            };
            let event = FileEvent::new(kind, path, paired.representation);
            Ok(QueuedChange::new(event, Priority::High))
        })
        .collect()
}

fn print_result(config: &SyncConfig, result: &SyncResult) {
    let source = config.root_relative(&result.source_file);
    let target = result
        .target_file
        .as_ref()
        .map(|t| format!(" -> {}", config.root_relative(t).display()))
        .unwrap_or_default();
    let version = result.version.map(|v| format!(" (v{v})")).unwrap_or_default();
    let line = format!("{}{}{}", source.display(), target, version);

    match result.status {
        SyncStatus::Synced | SyncStatus::Resolved | SyncStatus::Deleted | SyncStatus::Converted => {
            println!("{} {} {}", "✓".green(), result.status.label(), line);
        }
        SyncStatus::Unchanged
        | SyncStatus::Superseded
        | SyncStatus::Disabled
        | SyncStatus::Ignored => {
            println!("{} {} {}", "-".dimmed(), result.status.label(), line.dimmed());
        }
        SyncStatus::Conflict => {
            println!("{} {} {}", "!".yellow().bold(), result.status.label(), line);
            if let Some(id) = &result.ir_id {
                println!("  resolve with: twinsync resolve {id} <use-a|use-b|manual-merge|skip>");
            }
        }
        SyncStatus::Failed => {
            println!("{} {} {}", "✗".red().bold(), result.status.label(), line);
            if let Some(error) = &result.error {
                println!("  {}", error.red());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Representation;
    use tempfile::TempDir;

    #[test]
    fn test_changes_for_resolves_and_classifies() {
        let temp = TempDir::new().unwrap();
        let a = temp.path().join("a");
        let b = temp.path().join("b");
        std::fs::create_dir_all(&a).unwrap();
        std::fs::create_dir_all(&b).unwrap();
        std::fs::write(a.join("home.dart"), "{}").unwrap();
        let pairing = PathPairing::new(a, "dart", b, "tsx");

        let changes = changes_for(
            &pairing,
            &[PathBuf::from("a/home.dart"), PathBuf::from("b/gone.tsx")],
            temp.path(),
        )
        .unwrap();

        assert_eq!(changes[0].event.kind, ChangeKind::Change);
        assert_eq!(changes[0].event.representation, Representation::A);
        assert_eq!(changes[1].event.kind, ChangeKind::Delete);
        assert_eq!(changes[1].event.representation, Representation::B);
    }

    #[test]
    fn test_changes_for_rejects_outside_roots() {
        let temp = TempDir::new().unwrap();
        let pairing = PathPairing::new(temp.path().join("a"), "dart", temp.path().join("b"), "tsx");
        let err = changes_for(&pairing, &[PathBuf::from("notes.txt")], temp.path()).unwrap_err();
        assert!(err.to_string().contains("not under a sync root"));
    }
}
