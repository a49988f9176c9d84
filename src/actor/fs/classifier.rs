use std::path::Path;
use std::sync::Arc;

use notify::EventKind;

use crate::core::Priority;
use crate::engine::{PairedPath, PathPairing};
use crate::queue::{ChangeKind, FileEvent};
use crate::reload::ActiveComponents;

/// Turns raw notify events into queueable file events.
///
/// Pipeline: kind mapping → temp file filter → pairing → correct_by_existence
pub(super) struct EventClassifier {
    pairing: PathPairing,
    active: Arc<ActiveComponents>,
}

impl EventClassifier {
    pub(super) fn new(pairing: PathPairing, active: Arc<ActiveComponents>) -> Self {
        Self { pairing, active }
    }

    pub(super) fn classify(&self, event: &notify::Event, now: u64) -> Vec<(FileEvent, Priority)> {
        let Some(kind) = change_kind(&event.kind) else {
            return Vec::new();
        };
        crate::debug!("watch"; "raw notify: {:?} {:?}", event.kind, event.paths);

        event
            .paths
            .iter()
            .filter(|path| !is_temp_file(path))
            .filter_map(|path| {
                let paired = self.pairing.pair(path)?;
                let kind = correct_by_existence(path, kind)?;
                let priority = self.priority(&paired);
                crate::debug!("watch"; "{} {} ({:?})", kind.label(), path.display(), priority);
                let event = FileEvent::at(kind, path, paired.representation, now);
                Some((event, priority))
            })
            .collect()
    }

    /// Components on a client's screen first, tests last.
    fn priority(&self, paired: &PairedPath) -> Priority {
        if self.active.is_active(&paired.logical_id) {
            Priority::High
        } else if paired.is_test {
            Priority::Low
        } else {
            Priority::Normal
        }
    }
}

/// Map a notify event kind, ignoring metadata-only and access events.
pub(super) fn change_kind(kind: &EventKind) -> Option<ChangeKind> {
    match kind {
        EventKind::Create(_) => Some(ChangeKind::Create),
        EventKind::Remove(_) => Some(ChangeKind::Delete),
        // mtime/chmod noise would loop with our own writes
        EventKind::Modify(notify::event::ModifyKind::Metadata(_)) => None,
        EventKind::Modify(_) => Some(ChangeKind::Change),
        _ => None,
    }
}

/// Reconcile a reported kind with what is on disk.
///
/// Atomic saves report `Remove` for a file that exists again, and a burst
/// may report `Create` for a file already gone. Directories are dropped.
pub(super) fn correct_by_existence(path: &Path, kind: ChangeKind) -> Option<ChangeKind> {
    if path.is_dir() {
        return None;
    }
    let exists = path.is_file();
    match kind {
        ChangeKind::Create | ChangeKind::Change if !exists => Some(ChangeKind::Delete),
        ChangeKind::Delete if exists => Some(ChangeKind::Change),
        kind => Some(kind),
    }
}

/// Check if path is a temp/backup file (editor artifacts, conflict backups).
pub(super) fn is_temp_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    matches!(ext, "bck" | "bak" | "backup" | "swp" | "swo" | "tmp")
        || name.ends_with('~')
        || name.starts_with('.')
}
