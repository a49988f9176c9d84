//! Change Queue
//!
//! Debounce buffer between the file watcher and the sync engine.
//!
//! Events are keyed by path: a newer event for the same file replaces the
//! older one (last write wins) and keeps the higher of the two priorities.
//! An entry becomes drainable once it has been quiet for the debounce window.

mod event;

use std::cmp::Reverse;
use std::path::PathBuf;
use std::time::Duration;

use rustc_hash::FxHashMap;

pub use crate::core::Priority;
pub use event::{ChangeKind, FileEvent};

// =============================================================================
// Queued Change
// =============================================================================

/// An event waiting in the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedChange {
    pub event: FileEvent,
    pub priority: Priority,
    /// Milliseconds since the Unix epoch of the latest enqueue for this path
    pub queued_at: u64,
    /// Tie-breaker for entries queued in the same millisecond
    seq: u64,
}

impl QueuedChange {
    pub fn new(event: FileEvent, priority: Priority) -> Self {
        let queued_at = event.timestamp;
        Self {
            event,
            priority,
            queued_at,
            seq: 0,
        }
    }
}

// =============================================================================
// Change Queue
// =============================================================================

#[derive(Debug, Default)]
pub struct ChangeQueue {
    pending: FxHashMap<PathBuf, QueuedChange>,
    next_seq: u64,
}

impl ChangeQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, event: FileEvent, priority: Priority) {
        self.enqueue_at(event, priority, crate::utils::time::now_ms());
    }

    pub fn enqueue_at(&mut self, event: FileEvent, priority: Priority, now: u64) {
        let seq = self.next_seq;
        self.next_seq += 1;

        let priority = match self.pending.get(&event.file_path) {
            Some(existing) => {
                crate::debug!("queue"; "collapse {} -> {}: {}", existing.event.kind.label(), event.kind.label(), event.file_path.display());
                existing.priority.max(priority)
            }
            None => priority,
        };

        self.pending.insert(
            event.file_path.clone(),
            QueuedChange {
                event,
                priority,
                queued_at: now,
                seq,
            },
        );
    }

    /// Take every entry quiet for at least `window`, highest priority first.
    pub fn drain(&mut self, window: Duration) -> Vec<QueuedChange> {
        self.drain_at(window, crate::utils::time::now_ms())
    }

    pub fn drain_at(&mut self, window: Duration, now: u64) -> Vec<QueuedChange> {
        let window_ms = window.as_millis() as u64;
        let ready: Vec<PathBuf> = self
            .pending
            .iter()
            .filter(|(_, c)| now.saturating_sub(c.queued_at) >= window_ms)
            .map(|(p, _)| p.clone())
            .collect();

        let changes = ready
            .into_iter()
            .filter_map(|p| self.pending.remove(&p))
            .collect();
        Self::ordered(changes)
    }

    /// Take everything regardless of age.
    pub fn flush(&mut self) -> Vec<QueuedChange> {
        let changes = self.pending.drain().map(|(_, c)| c).collect();
        Self::ordered(changes)
    }

    /// Time until the next entry becomes drainable, `None` when empty.
    pub fn next_ready_in(&self, window: Duration) -> Option<Duration> {
        self.next_ready_in_at(window, crate::utils::time::now_ms())
    }

    pub fn next_ready_in_at(&self, window: Duration, now: u64) -> Option<Duration> {
        let window_ms = window.as_millis() as u64;
        self.pending
            .values()
            .map(|c| (c.queued_at + window_ms).saturating_sub(now))
            .min()
            .map(Duration::from_millis)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    fn ordered(mut changes: Vec<QueuedChange>) -> Vec<QueuedChange> {
        changes.sort_by_key(|c| (Reverse(c.priority), c.queued_at, c.seq));
        changes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Representation;

    const WINDOW: Duration = Duration::from_millis(100);

    fn event(path: &str, kind: ChangeKind) -> FileEvent {
        FileEvent::at(kind, path, Representation::A, 0)
    }

    #[test]
    fn test_same_path_collapses_last_write_wins() {
        let mut queue = ChangeQueue::new();
        queue.enqueue_at(event("a.dart", ChangeKind::Create), Priority::High, 1_000);
        queue.enqueue_at(event("a.dart", ChangeKind::Change), Priority::Low, 1_050);

        assert_eq!(queue.len(), 1);
        let drained = queue.drain_at(WINDOW, 1_200);
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].event.kind, ChangeKind::Change);
        assert_eq!(drained[0].priority, Priority::High);
        assert_eq!(drained[0].queued_at, 1_050);
    }

    #[test]
    fn test_drain_waits_for_quiet_window() {
        let mut queue = ChangeQueue::new();
        queue.enqueue_at(event("a.dart", ChangeKind::Change), Priority::Normal, 1_000);
        queue.enqueue_at(event("b.dart", ChangeKind::Change), Priority::Normal, 1_080);

        let drained = queue.drain_at(WINDOW, 1_100);
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].event.file_path, PathBuf::from("a.dart"));
        assert_eq!(queue.len(), 1);

        // A newer event restarts the quiet period
        queue.enqueue_at(event("b.dart", ChangeKind::Change), Priority::Normal, 1_150);
        assert!(queue.drain_at(WINDOW, 1_200).is_empty());
        assert_eq!(queue.drain_at(WINDOW, 1_250).len(), 1);
    }

    #[test]
    fn test_drain_orders_by_priority_then_queued_at() {
        let mut queue = ChangeQueue::new();
        queue.enqueue_at(event("low.dart", ChangeKind::Change), Priority::Low, 10);
        queue.enqueue_at(event("n2.dart", ChangeKind::Change), Priority::Normal, 30);
        queue.enqueue_at(event("n1.dart", ChangeKind::Change), Priority::Normal, 20);
        queue.enqueue_at(event("high.dart", ChangeKind::Change), Priority::High, 40);

        let order: Vec<_> = queue
            .drain_at(WINDOW, 1_000)
            .into_iter()
            .map(|c| c.event.file_path)
            .collect();
        assert_eq!(
            order,
            ["high.dart", "n1.dart", "n2.dart", "low.dart"]
                .map(PathBuf::from)
                .to_vec()
        );
    }

    #[test]
    fn test_same_millisecond_keeps_enqueue_order() {
        let mut queue = ChangeQueue::new();
        queue.enqueue_at(event("b.dart", ChangeKind::Change), Priority::Normal, 5);
        queue.enqueue_at(event("a.dart", ChangeKind::Change), Priority::Normal, 5);

        let drained = queue.flush();
        assert_eq!(drained[0].event.file_path, PathBuf::from("b.dart"));
        assert_eq!(drained[1].event.file_path, PathBuf::from("a.dart"));
    }

    #[test]
    fn test_flush_ignores_window() {
        let mut queue = ChangeQueue::new();
        queue.enqueue_at(event("a.dart", ChangeKind::Delete), Priority::Normal, 1_000);
        assert!(queue.drain_at(WINDOW, 1_000).is_empty());
        assert_eq!(queue.flush().len(), 1);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_next_ready_in() {
        let mut queue = ChangeQueue::new();
        assert_eq!(queue.next_ready_in_at(WINDOW, 0), None);

        queue.enqueue_at(event("a.dart", ChangeKind::Change), Priority::Normal, 1_000);
        queue.enqueue_at(event("b.dart", ChangeKind::Change), Priority::Normal, 1_040);
        assert_eq!(
            queue.next_ready_in_at(WINDOW, 1_050),
            Some(Duration::from_millis(50))
        );
        assert_eq!(queue.next_ready_in_at(WINDOW, 2_000), Some(Duration::ZERO));
    }
}
