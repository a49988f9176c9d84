//! Active Component Tracking
//!
//! Tracks which components connected clients are showing, so the watcher
//! can queue their changes ahead of the rest. Several clients may show the
//! same component; it stays active until the last one leaves.

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

/// Components shown by connected clients, with viewer counts.
///
/// Shared between the WebSocket actor (writer) and the watcher (reader).
#[derive(Debug, Default)]
pub struct ActiveComponents {
    viewers: RwLock<FxHashMap<String, usize>>,
}

impl ActiveComponents {
    pub fn new() -> Self {
        Self::default()
    }

    /// A client started showing `component`.
    pub fn add(&self, component: &str) {
        *self.viewers.write().entry(component.to_owned()).or_default() += 1;
    }

    /// A client stopped showing `component` (navigated away or disconnected).
    pub fn remove(&self, component: &str) {
        let mut viewers = self.viewers.write();
        if let Some(count) = viewers.get_mut(component) {
            *count -= 1;
            if *count == 0 {
                viewers.remove(component);
            }
        }
    }

    /// Move one viewer from `old` to `new`.
    pub fn switch(&self, old: Option<&str>, new: Option<&str>) {
        if old == new {
            return;
        }
        if let Some(old) = old {
            self.remove(old);
        }
        if let Some(new) = new {
            self.add(new);
        }
    }

    pub fn is_active(&self, component: &str) -> bool {
        self.viewers.read().contains_key(component)
    }

    /// Active components, sorted.
    pub fn get_all(&self) -> Vec<String> {
        let mut all: Vec<_> = self.viewers.read().keys().cloned().collect();
        all.sort();
        all
    }

    pub fn clear(&self) {
        self.viewers.write().clear();
    }
}
