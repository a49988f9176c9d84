//! Concurrent edit detection.
//!
//! For every logical component the detector remembers when each
//! representation last changed. An edit that lands within the conflict
//! window of the last edit to the paired file produces a [`ConflictRecord`].
//! Until that record is resolved, every further check for the component
//! reports it.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::core::Representation;
use crate::queue::FileEvent;

/// A detected pair of concurrent edits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictRecord {
    pub id: String,
    pub logical_id: String,
    pub file_a: PathBuf,
    pub file_b: PathBuf,
    pub timestamp_a: u64,
    pub timestamp_b: u64,
    pub ir_version_at_detection: u64,
    pub detected_at: DateTime<Utc>,
    pub resolved: bool,
}

impl ConflictRecord {
    /// Representation whose edit is the more recent one, `A` on a tie.
    pub fn newest(&self) -> Representation {
        if self.timestamp_b > self.timestamp_a {
            Representation::B
        } else {
            Representation::A
        }
    }

    pub fn file(&self, rep: Representation) -> &Path {
        match rep {
            Representation::A => &self.file_a,
            Representation::B => &self.file_b,
        }
    }
}

/// Outcome of [`ConflictDetector::check_conflict`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConflictCheck {
    pub has_conflict: bool,
    pub conflict: Option<ConflictRecord>,
}

impl ConflictCheck {
    fn clear() -> Self {
        Self::default()
    }

    fn conflict(record: ConflictRecord) -> Self {
        Self {
            has_conflict: true,
            conflict: Some(record),
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct LastSeen {
    a: Option<u64>,
    b: Option<u64>,
}

impl LastSeen {
    fn get(&self, rep: Representation) -> Option<u64> {
        match rep {
            Representation::A => self.a,
            Representation::B => self.b,
        }
    }

    fn set(&mut self, rep: Representation, ts: u64) {
        match rep {
            Representation::A => self.a = Some(ts),
            Representation::B => self.b = Some(ts),
        }
    }
}

/// Resolved records kept so a repeated resolve is reported as such.
const RESOLVED_KEPT: usize = 32;

#[derive(Debug)]
pub struct ConflictDetector {
    window_ms: u64,
    last_seen: FxHashMap<String, LastSeen>,
    /// Unresolved and recently resolved records in detection order
    conflicts: Vec<ConflictRecord>,
}

impl ConflictDetector {
    pub fn new(window_ms: u64) -> Self {
        Self {
            window_ms,
            last_seen: FxHashMap::default(),
            conflicts: Vec::new(),
        }
    }

    pub fn window_ms(&self) -> u64 {
        self.window_ms
    }

    /// Record `event` and report whether it conflicts with the paired file.
    pub fn check_conflict(
        &mut self,
        event: &FileEvent,
        logical_id: &str,
        file_a: &Path,
        file_b: &Path,
        ir_version: u64,
    ) -> ConflictCheck {
        let seen = self.last_seen.entry(logical_id.to_owned()).or_default();
        let paired = seen.get(event.representation.other());
        seen.set(event.representation, event.timestamp);

        if let Some(existing) = self.unresolved_for(logical_id) {
            return ConflictCheck::conflict(existing.clone());
        }

        let Some(paired_ts) = paired else {
            return ConflictCheck::clear();
        };
        if event.timestamp.abs_diff(paired_ts) > self.window_ms {
            return ConflictCheck::clear();
        }

        let (timestamp_a, timestamp_b) = match event.representation {
            Representation::A => (event.timestamp, paired_ts),
            Representation::B => (paired_ts, event.timestamp),
        };
        let record = ConflictRecord {
            id: uuid::Uuid::new_v4().to_string(),
            logical_id: logical_id.to_owned(),
            file_a: file_a.to_path_buf(),
            file_b: file_b.to_path_buf(),
            timestamp_a,
            timestamp_b,
            ir_version_at_detection: ir_version,
            detected_at: Utc::now(),
            resolved: false,
        };

        crate::log!("conflict"; "{}: both representations changed within {}ms", logical_id, self.window_ms);
        self.conflicts.push(record.clone());
        ConflictCheck::conflict(record)
    }

    pub fn unresolved_conflicts(&self) -> Vec<&ConflictRecord> {
        self.conflicts.iter().filter(|c| !c.resolved).collect()
    }

    pub fn unresolved_for(&self, logical_id: &str) -> Option<&ConflictRecord> {
        self.conflicts
            .iter()
            .find(|c| !c.resolved && c.logical_id == logical_id)
    }

    pub fn has_unresolved(&self, logical_id: &str) -> bool {
        self.unresolved_for(logical_id).is_some()
    }

    pub fn get(&self, id: &str) -> Option<&ConflictRecord> {
        self.conflicts.iter().find(|c| c.id == id)
    }

    /// Mark a conflict resolved.
    ///
    /// Returns false for unknown or already resolved ids. The component's
    /// timestamps are forgotten so the next edit starts a fresh window.
    pub fn resolve_conflict(&mut self, id: &str) -> bool {
        let Some(record) = self.conflicts.iter_mut().find(|c| c.id == id) else {
            return false;
        };
        if record.resolved {
            return false;
        }
        record.resolved = true;
        let logical_id = record.logical_id.clone();
        self.last_seen.remove(&logical_id);
        self.prune_resolved();
        true
    }

    /// Drop the oldest resolved records beyond [`RESOLVED_KEPT`].
    fn prune_resolved(&mut self) {
        let resolved = self.conflicts.iter().filter(|c| c.resolved).count();
        let mut excess = resolved.saturating_sub(RESOLVED_KEPT);
        self.conflicts.retain(|c| {
            if excess > 0 && c.resolved {
                excess -= 1;
                return false;
            }
            true
        });
    }

    /// Drop bookkeeping for a component that no longer exists.
    pub fn forget(&mut self, logical_id: &str) {
        self.last_seen.remove(logical_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::ChangeKind;

    const WINDOW: u64 = 1_000;

    fn check(detector: &mut ConflictDetector, rep: Representation, ts: u64) -> ConflictCheck {
        let file = match rep {
            Representation::A => "a/home.dart",
            Representation::B => "b/home.tsx",
        };
        let event = FileEvent::at(ChangeKind::Change, file, rep, ts);
        detector.check_conflict(
            &event,
            "home",
            Path::new("a/home.dart"),
            Path::new("b/home.tsx"),
            3,
        )
    }

    #[test]
    fn test_conflict_within_window_inclusive() {
        let mut detector = ConflictDetector::new(WINDOW);
        assert!(!check(&mut detector, Representation::A, 10_000).has_conflict);

        let result = check(&mut detector, Representation::B, 11_000);
        assert!(result.has_conflict);
        let record = result.conflict.unwrap();
        assert_eq!(record.logical_id, "home");
        assert_eq!(record.timestamp_a, 10_000);
        assert_eq!(record.timestamp_b, 11_000);
        assert_eq!(record.ir_version_at_detection, 3);
        assert_eq!(record.newest(), Representation::B);
    }

    #[test]
    fn test_no_conflict_outside_window() {
        let mut detector = ConflictDetector::new(WINDOW);
        check(&mut detector, Representation::A, 10_000);
        assert!(!check(&mut detector, Representation::B, 11_001).has_conflict);
        assert!(detector.unresolved_conflicts().is_empty());
    }

    #[test]
    fn test_window_uses_absolute_difference() {
        let mut detector = ConflictDetector::new(WINDOW);
        check(&mut detector, Representation::A, 10_000);
        // Out-of-order timestamp still counts
        assert!(check(&mut detector, Representation::B, 9_500).has_conflict);
    }

    #[test]
    fn test_same_file_never_conflicts() {
        let mut detector = ConflictDetector::new(WINDOW);
        check(&mut detector, Representation::A, 10_000);
        assert!(!check(&mut detector, Representation::A, 10_001).has_conflict);
        assert!(!check(&mut detector, Representation::A, 10_002).has_conflict);
    }

    #[test]
    fn test_unresolved_conflict_is_sticky() {
        let mut detector = ConflictDetector::new(WINDOW);
        check(&mut detector, Representation::A, 10_000);
        let first = check(&mut detector, Representation::B, 10_100).conflict.unwrap();

        let later = check(&mut detector, Representation::A, 50_000);
        assert!(later.has_conflict);
        assert_eq!(later.conflict.unwrap().id, first.id);
        assert_eq!(detector.unresolved_conflicts().len(), 1);
    }

    #[test]
    fn test_resolve_clears_and_resets_window() {
        let mut detector = ConflictDetector::new(WINDOW);
        check(&mut detector, Representation::A, 10_000);
        let record = check(&mut detector, Representation::B, 10_100).conflict.unwrap();

        assert!(detector.resolve_conflict(&record.id));
        assert!(!detector.resolve_conflict(&record.id));
        assert!(!detector.resolve_conflict("missing"));
        assert!(!detector.has_unresolved("home"));
        assert!(detector.get(&record.id).unwrap().resolved);

        // Fresh window after resolution
        assert!(!check(&mut detector, Representation::A, 10_200).has_conflict);
    }

    #[test]
    fn test_resolved_records_are_capped() {
        let mut detector = ConflictDetector::new(WINDOW);
        let mut ids = Vec::new();
        for i in 0..RESOLVED_KEPT + 8 {
            let logical_id = format!("c{i}");
            let (a, b) = (Path::new("a/c.dart"), Path::new("b/c.tsx"));
            let first = FileEvent::at(ChangeKind::Change, a, Representation::A, 10_000);
            let second = FileEvent::at(ChangeKind::Change, b, Representation::B, 10_010);
            detector.check_conflict(&first, &logical_id, a, b, 1);
            let record = detector
                .check_conflict(&second, &logical_id, a, b, 1)
                .conflict
                .unwrap();
            assert!(detector.resolve_conflict(&record.id));
            ids.push(record.id);
        }

        // One still open alongside the resolved tail
        check(&mut detector, Representation::A, 20_000);
        let open = check(&mut detector, Representation::B, 20_010).conflict.unwrap();

        assert_eq!(detector.conflicts.len(), RESOLVED_KEPT + 1);
        assert!(detector.get(&ids[0]).is_none());
        assert!(detector.get(ids.last().unwrap()).unwrap().resolved);
        assert_eq!(detector.unresolved_conflicts()[0].id, open.id);
    }
}
