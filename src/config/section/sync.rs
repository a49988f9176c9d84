//! `[sync]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [sync]
//! a_root = "flutter/lib"        # Representation A source root
//! a_extension = "dart"
//! b_root = "react/src"          # Representation B source root
//! b_extension = "tsx"
//! store_dir = ".twinsync/store" # Versioned IR store
//! history_depth = 10            # Versions kept per component
//! debounce_ms = 300             # Quiet period before a change is processed
//! conflict_window_ms = 1000     # Edits to both sides within this span conflict
//! conflict_policy = "manual"    # manual | prefer-a | prefer-b | newest | skip
//! incremental_threshold = 10    # Node changes at which a full update is sent
//! workers = 4                   # Conversion pool size, 0 = one per CPU
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::types::{ConfigDiagnostics, FieldPath};
use crate::conflict::ConflictPolicy;
use crate::core::Representation;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSectionConfig {
    pub a_root: PathBuf,
    pub a_extension: String,
    pub b_root: PathBuf,
    pub b_extension: String,

    /// Directory of the persistent IR store.
    pub store_dir: PathBuf,

    /// Versions retained per component, oldest evicted first.
    pub history_depth: usize,

    pub debounce_ms: u64,
    pub conflict_window_ms: u64,
    pub conflict_policy: ConflictPolicy,
    pub incremental_threshold: usize,

    /// Size of the conversion pool, 0 = number of CPUs.
    pub workers: usize,
}

impl Default for SyncSectionConfig {
    fn default() -> Self {
        Self {
            a_root: PathBuf::from("a"),
            a_extension: "dart".to_string(),
            b_root: PathBuf::from("b"),
            b_extension: "tsx".to_string(),
            store_dir: PathBuf::from(".twinsync/store"),
            history_depth: 10,
            debounce_ms: 300,
            conflict_window_ms: 1000,
            conflict_policy: ConflictPolicy::Manual,
            incremental_threshold: crate::reload::delta::DEFAULT_INCREMENTAL_THRESHOLD,
            workers: 4,
        }
    }
}

impl SyncSectionConfig {
    pub const A_ROOT: FieldPath = FieldPath::new("sync.a_root");
    pub const B_ROOT: FieldPath = FieldPath::new("sync.b_root");
    pub const A_EXTENSION: FieldPath = FieldPath::new("sync.a_extension");
    pub const B_EXTENSION: FieldPath = FieldPath::new("sync.b_extension");
    pub const HISTORY_DEPTH: FieldPath = FieldPath::new("sync.history_depth");
    pub const INCREMENTAL_THRESHOLD: FieldPath = FieldPath::new("sync.incremental_threshold");

    pub fn root(&self, rep: Representation) -> &Path {
        match rep {
            Representation::A => &self.a_root,
            Representation::B => &self.b_root,
        }
    }

    pub fn extension(&self, rep: Representation) -> &str {
        match rep {
            Representation::A => &self.a_extension,
            Representation::B => &self.b_extension,
        }
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn normalize(&mut self, root: &Path) {
        use crate::utils::path::resolve_path;
        self.a_root = resolve_path(&self.a_root, root);
        self.b_root = resolve_path(&self.b_root, root);
        self.store_dir = resolve_path(&self.store_dir, root);
        self.a_extension = self.a_extension.trim_start_matches('.').to_string();
        self.b_extension = self.b_extension.trim_start_matches('.').to_string();
    }

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if self.a_root == self.b_root {
            diag.error_with_hint(
                Self::B_ROOT,
                "both representations share one root directory",
                "point a_root and b_root at different directories",
            );
        } else if self.a_root.starts_with(&self.b_root) || self.b_root.starts_with(&self.a_root) {
            diag.error(Self::B_ROOT, "a_root and b_root must not contain each other");
        }
        if self.a_extension.is_empty() {
            diag.error(Self::A_EXTENSION, "extension must not be empty");
        }
        if self.b_extension.is_empty() {
            diag.error(Self::B_EXTENSION, "extension must not be empty");
        }
        if self.history_depth == 0 {
            diag.error(Self::HISTORY_DEPTH, "must keep at least one version");
        }
        if self.incremental_threshold == 0 {
            diag.error(Self::INCREMENTAL_THRESHOLD, "must be at least 1");
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::test_parse_config;
    use crate::conflict::ConflictPolicy;

    #[test]
    fn test_sync_config() {
        let config = test_parse_config(
            "[sync]\na_root = \"flutter/lib\"\nb_extension = \".jsx\"\nconflict_policy = \"newest\"\nhistory_depth = 3",
        );
        assert_eq!(config.sync.a_root, std::path::PathBuf::from("flutter/lib"));
        assert_eq!(config.sync.conflict_policy, ConflictPolicy::Newest);
        assert_eq!(config.sync.history_depth, 3);
        assert_eq!(config.sync.debounce_ms, 300);
    }

    #[test]
    fn test_sync_config_defaults() {
        let config = test_parse_config("");
        assert_eq!(config.sync.conflict_policy, ConflictPolicy::Manual);
        assert_eq!(config.sync.incremental_threshold, 10);
        assert_eq!(config.sync.conflict_window_ms, 1000);
    }

    #[test]
    fn test_normalize_strips_dot() {
        let mut config = test_parse_config("[sync]\nb_extension = \".jsx\"");
        config.sync.normalize(std::path::Path::new("/proj"));
        assert_eq!(config.sync.b_extension, "jsx");
        assert_eq!(config.sync.a_root, std::path::PathBuf::from("/proj/a"));
    }

    #[test]
    fn test_validate_rejects_shared_root() {
        let config = test_parse_config("[sync]\na_root = \"src\"\nb_root = \"src\"\nhistory_depth = 0");
        let mut diag = crate::config::types::ConfigDiagnostics::new();
        config.sync.validate(&mut diag);
        assert_eq!(diag.len(), 2);
    }
}
