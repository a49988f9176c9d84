use std::path::PathBuf;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use rustc_hash::FxHashSet;

/// Keeps both source roots watched.
///
/// A root that does not exist yet, or is deleted and recreated, is attached
/// on a later `maintain` pass.
pub(super) struct WatchRoots {
    desired: Vec<PathBuf>,
    attached: FxHashSet<PathBuf>,
}

impl WatchRoots {
    pub(super) fn new(roots: Vec<PathBuf>) -> Self {
        Self {
            desired: roots,
            attached: FxHashSet::default(),
        }
    }

    pub(super) fn attach_existing(
        &mut self,
        watcher: &mut RecommendedWatcher,
    ) -> notify::Result<()> {
        for root in &self.desired {
            if !root.is_dir() {
                crate::log!("watch"; "{} does not exist yet", root.display());
                continue;
            }
            watcher.watch(root, RecursiveMode::Recursive)?;
            self.attached.insert(root.clone());
            crate::debug!("watch"; "watching {}", root.display());
        }
        Ok(())
    }

    pub(super) fn maintain(&mut self, watcher: &mut RecommendedWatcher) {
        self.attached.retain(|root| root.is_dir());

        for root in &self.desired {
            if self.attached.contains(root) || !root.is_dir() {
                continue;
            }
            if watcher.watch(root, RecursiveMode::Recursive).is_ok() {
                self.attached.insert(root.clone());
                crate::log!("watch"; "attached {}", root.display());
            }
        }
    }

    pub(super) fn attached_count(&self) -> usize {
        self.attached.len()
    }
}
