//! `twinsync status` and the serve console's `status`.

use anyhow::Result;
use chrono::{DateTime, Utc};
use owo_colors::OwoColorize;

use crate::cache::{ArtifactKind, CacheStats};
use crate::config::SyncConfig;
use crate::engine::SyncEngine;

/// One stored component.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentLine {
    pub logical_id: String,
    pub version: u64,
    pub history: usize,
    pub stored_at: Option<DateTime<Utc>>,
    pub checksum: String,
    pub conflicted: bool,
}

/// Snapshot of an engine for display.
#[derive(Debug, Clone)]
pub struct StatusReport {
    pub components: Vec<ComponentLine>,
    /// `(conflict id, logical id)` of unresolved conflicts
    pub conflicts: Vec<(String, String)>,
    pub cache: Vec<(ArtifactKind, CacheStats)>,
    pub hit_rate: f64,
}

impl StatusReport {
    pub fn collect(engine: &SyncEngine) -> Self {
        let store = engine.store();
        let detector = engine.detector();

        let components = store
            .list()
            .into_iter()
            .map(|logical_id| {
                let current = store.retrieve(&logical_id, None);
                ComponentLine {
                    version: store.current_version(&logical_id),
                    history: store.history(&logical_id).len(),
                    stored_at: current.map(|e| e.stored_at),
                    checksum: current
                        .map(|e| e.checksum.to_hex()[..12].to_string())
                        .unwrap_or_default(),
                    conflicted: detector.has_unresolved(&logical_id),
                    logical_id,
                }
            })
            .collect();

        let conflicts = detector
            .unresolved_conflicts()
            .into_iter()
            .map(|c| (c.id.clone(), c.logical_id.clone()))
            .collect();

        Self {
            components,
            conflicts,
            cache: engine.cache_stats(),
            hit_rate: engine.cache_hit_rate(),
        }
    }

    pub fn print(&self) {
        if self.components.is_empty() {
            println!("{}", "no stored components".dimmed());
        }
        for line in &self.components {
            let stored = line
                .stored_at
                .map(|t| t.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_default();
            let marker = if line.conflicted {
                "!".yellow().bold().to_string()
            } else {
                " ".to_string()
            };
            println!(
                "{} {:<32} v{:<4} {} {} {}",
                marker,
                line.logical_id,
                line.version,
                format!("({} kept)", line.history).dimmed(),
                line.checksum.dimmed(),
                stored.dimmed()
            );
        }

        if !self.conflicts.is_empty() {
            println!();
            println!("{}", "unresolved conflicts:".yellow().bold());
            for (id, logical_id) in &self.conflicts {
                println!("  {logical_id} ({id})");
            }
        }

        let lookups: u64 = self.cache.iter().map(|(_, s)| s.hits + s.misses).sum();
        if lookups > 0 {
            println!();
            for (kind, stats) in &self.cache {
                println!(
                    "cache {:<12} {} hits, {} misses, {} entries",
                    kind.label(),
                    stats.hits,
                    stats.misses,
                    stats.entries
                );
            }
            println!("cache hit rate {:.1}%", self.hit_rate * 100.0);
        }
    }
}

/// Print the status of a running engine.
pub fn print_status(engine: &SyncEngine) {
    StatusReport::collect(engine).print();
}

/// Status from the persisted store.
pub fn run_status(config: &SyncConfig) -> Result<()> {
    let engine = SyncEngine::open(config)?;
    print_status(&engine);
    Ok(())
}
