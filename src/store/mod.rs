//! Versioned IR store.
//!
//! Append-only per logical component: every successful [`IrStore::store`]
//! call produces version `n + 1`, even when the content is identical to the
//! latest entry. Callers use [`IrStore::has_changed`] to skip needless
//! writes. History is bounded; the oldest entry by creation is evicted first.

mod persist;

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::{ValidationError, Version};
use crate::freshness::ContentHash;
use crate::ir::{self, CURRENT_SCHEMA_VERSION, IrDocument};

/// A stored IR snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IrEntry {
    pub logical_id: String,
    pub version: u64,
    pub ir: IrDocument,
    pub checksum: ContentHash,
    pub stored_at: DateTime<Utc>,
}

/// Store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("IO error at `{0}`")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("corrupt store entry `{0}`")]
    Corrupt(PathBuf, #[source] serde_json::Error),
}

#[derive(Debug, Default)]
struct History {
    /// Highest version ever assigned (survives eviction)
    latest: u64,
    /// Retained entries, oldest first
    entries: VecDeque<IrEntry>,
}

/// Versioned, optionally persistent IR storage.
#[derive(Debug)]
pub struct IrStore {
    root: Option<PathBuf>,
    history_depth: usize,
    schema_version: Version,
    components: FxHashMap<String, History>,
}

impl IrStore {
    /// Store that lives only in memory.
    pub fn in_memory(history_depth: usize) -> Self {
        Self {
            root: None,
            history_depth: history_depth.max(1),
            schema_version: CURRENT_SCHEMA_VERSION,
            components: FxHashMap::default(),
        }
    }

    /// Open (or create) a store persisted under `root`, restoring existing entries.
    pub fn open(root: &Path, history_depth: usize) -> Result<Self, StoreError> {
        let mut store = Self::in_memory(history_depth);
        store.root = Some(root.to_path_buf());

        for entries in persist::load_all(root)? {
            let Some(last) = entries.last() else {
                continue;
            };
            let logical_id = last.logical_id.clone();
            let history = History {
                latest: last.version,
                entries: entries.into(),
            };
            store.components.insert(logical_id, history);
        }

        // Apply the configured depth to restored histories
        let ids: Vec<_> = store.components.keys().cloned().collect();
        for id in ids {
            store.evict(&id)?;
        }

        crate::debug!("store"; "restored {} components from {}", store.components.len(), root.display());
        Ok(store)
    }

    /// Require a schema version other than the crate's current one.
    pub fn with_schema_version(mut self, version: Version) -> Self {
        self.schema_version = version;
        self
    }

    pub fn schema_version(&self) -> &Version {
        &self.schema_version
    }

    /// Append a new version for `logical_id`.
    ///
    /// Rejects structurally invalid documents and documents whose schema
    /// version differs from the store's; nothing is written in that case.
    pub fn store(&mut self, logical_id: &str, ir: IrDocument) -> Result<IrEntry, StoreError> {
        if ir.schema_version != self.schema_version {
            return Err(ValidationError::SchemaVersion {
                expected: self.schema_version.to_string(),
                found: ir.schema_version.to_string(),
            }
            .into());
        }
        ir::validate(&ir)?;

        let version = self.current_version(logical_id) + 1;
        let entry = IrEntry {
            logical_id: logical_id.to_string(),
            version,
            checksum: ir::checksum(&ir),
            ir,
            stored_at: Utc::now(),
        };

        if let Some(root) = &self.root {
            persist::write_entry(&persist::component_dir(root, logical_id), &entry)?;
        }

        let history = self.components.entry(logical_id.to_string()).or_default();
        history.latest = version;
        history.entries.push_back(entry.clone());
        self.evict(logical_id)?;

        crate::debug!("store"; "{} v{} ({})", logical_id, version, entry.checksum);
        Ok(entry)
    }

    /// Entry at `version`, or the latest entry when `version` is `None`.
    pub fn retrieve(&self, logical_id: &str, version: Option<u64>) -> Option<&IrEntry> {
        let history = self.components.get(logical_id)?;
        match version {
            None => history.entries.back(),
            Some(v) => history.entries.iter().find(|e| e.version == v),
        }
    }

    /// Latest assigned version, 0 when the component is unknown.
    pub fn current_version(&self, logical_id: &str) -> u64 {
        self.components.get(logical_id).map_or(0, |h| h.latest)
    }

    /// Retained entries, oldest first.
    pub fn history(&self, logical_id: &str) -> Vec<&IrEntry> {
        self.components
            .get(logical_id)
            .map(|h| h.entries.iter().collect())
            .unwrap_or_default()
    }

    /// Remove a component and its history. Returns false if it was unknown.
    pub fn delete(&mut self, logical_id: &str) -> Result<bool, StoreError> {
        if self.components.remove(logical_id).is_none() {
            return Ok(false);
        }
        if let Some(root) = &self.root {
            persist::remove_component(&persist::component_dir(root, logical_id))?;
        }
        crate::debug!("store"; "deleted {}", logical_id);
        Ok(true)
    }

    /// Known logical ids, sorted.
    pub fn list(&self) -> Vec<String> {
        let mut ids: Vec<_> = self.components.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Whether `candidate` differs from the latest stored content.
    ///
    /// Volatile metadata (`generatedAt`) is ignored. Unknown components
    /// always count as changed.
    pub fn has_changed(&self, logical_id: &str, candidate: &IrDocument) -> bool {
        self.retrieve(logical_id, None)
            .is_none_or(|latest| latest.checksum != ir::checksum(candidate))
    }

    /// Drop entries beyond the history depth, oldest first.
    fn evict(&mut self, logical_id: &str) -> Result<(), StoreError> {
        let Some(history) = self.components.get_mut(logical_id) else {
            return Ok(());
        };
        while history.entries.len() > self.history_depth {
            let Some(evicted) = history.entries.pop_front() else {
                break;
            };
            if let Some(root) = &self.root {
                persist::remove_version(
                    &persist::component_dir(root, logical_id),
                    evicted.version,
                )?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Representation;
    use crate::ir::Node;
    use serde_json::json;
    use tempfile::TempDir;

    fn doc(text: &str) -> IrDocument {
        IrDocument::new(
            Representation::A,
            "lib/home.dart",
            vec![Node::new("title", "Text").with_prop("text", text)],
        )
    }

    #[test]
    fn test_versions_increase_by_one_per_store() {
        let mut store = IrStore::in_memory(10);
        assert_eq!(store.current_version("home"), 0);
        for expected in 1..=5 {
            let entry = store.store("home", doc("same")).unwrap();
            assert_eq!(entry.version, expected);
            assert_eq!(store.current_version("home"), expected);
        }
    }

    #[test]
    fn test_has_changed_semantics() {
        let mut store = IrStore::in_memory(10);
        let d = doc("hello");
        assert!(store.has_changed("home", &d));

        store.store("home", d.clone()).unwrap();
        assert!(!store.has_changed("home", &d));

        // Only the timestamp moved
        let mut later = d.clone();
        later.metadata.generated_at = later.metadata.generated_at + chrono::Duration::hours(1);
        assert!(!store.has_changed("home", &later));

        // Semantic change
        let mut edited = d;
        edited.nodes[0].props.insert("text".into(), json!("bye"));
        assert!(store.has_changed("home", &edited));
    }

    #[test]
    fn test_rejects_invalid_documents() {
        let mut store = IrStore::in_memory(10);
        let bad = IrDocument::new(
            Representation::A,
            "x",
            vec![Node::new("a", "View"), Node::new("a", "View")],
        );
        assert!(matches!(
            store.store("home", bad),
            Err(StoreError::Validation(ValidationError::Document(_)))
        ));
        assert_eq!(store.current_version("home"), 0);

        let mut stale = doc("x");
        stale.schema_version = Version::new(1, 0, 0);
        assert!(matches!(
            store.store("home", stale),
            Err(StoreError::Validation(ValidationError::SchemaVersion { .. }))
        ));
    }

    #[test]
    fn test_history_is_fifo_bounded() {
        let mut store = IrStore::in_memory(3);
        for i in 0..5 {
            store.store("home", doc(&i.to_string())).unwrap();
        }
        let versions: Vec<_> = store.history("home").iter().map(|e| e.version).collect();
        assert_eq!(versions, vec![3, 4, 5]);
        assert!(store.retrieve("home", Some(1)).is_none());
        assert_eq!(store.retrieve("home", Some(4)).unwrap().version, 4);
        assert_eq!(store.retrieve("home", None).unwrap().version, 5);
        assert_eq!(store.current_version("home"), 5);
    }

    #[test]
    fn test_delete_and_list() {
        let mut store = IrStore::in_memory(3);
        store.store("b", doc("1")).unwrap();
        store.store("a", doc("1")).unwrap();
        assert_eq!(store.list(), vec!["a".to_string(), "b".to_string()]);

        assert!(store.delete("a").unwrap());
        assert!(!store.delete("a").unwrap());
        assert_eq!(store.list(), vec!["b".to_string()]);
        assert_eq!(store.current_version("a"), 0);
    }

    #[test]
    fn test_persisted_store_restores() {
        let dir = TempDir::new().unwrap();
        {
            let mut store = IrStore::open(dir.path(), 2).unwrap();
            store.store("screens/home", doc("1")).unwrap();
            store.store("screens/home", doc("2")).unwrap();
            store.store("screens/home", doc("3")).unwrap();
            store.store("about", doc("a")).unwrap();
        }

        let store = IrStore::open(dir.path(), 2).unwrap();
        assert_eq!(store.list(), vec!["about".to_string(), "screens/home".to_string()]);
        assert_eq!(store.current_version("screens/home"), 3);
        let versions: Vec<_> = store
            .history("screens/home")
            .iter()
            .map(|e| e.version)
            .collect();
        assert_eq!(versions, vec![2, 3]);

        // Evicted version files are gone from disk
        let component = persist::component_dir(dir.path(), "screens/home");
        assert!(!component.join("v1.json").exists());
        assert!(component.join("v3.json").exists());
        assert!(component.join(persist::CURRENT_FILE).exists());
    }

    #[test]
    fn test_persisted_delete_removes_directory() {
        let dir = TempDir::new().unwrap();
        let mut store = IrStore::open(dir.path(), 2).unwrap();
        store.store("home", doc("1")).unwrap();
        let component = persist::component_dir(dir.path(), "home");
        assert!(component.exists());

        assert!(store.delete("home").unwrap());
        assert!(!component.exists());
        assert!(IrStore::open(dir.path(), 2).unwrap().list().is_empty());
    }
}
