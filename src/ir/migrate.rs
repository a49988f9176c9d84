//! Schema migration for IR documents.
//!
//! Migrations operate on raw JSON because an older document may lack fields
//! that the current [`IrDocument`] type requires. Each step upgrades exactly
//! one version; the migrator walks the registered chain from the document's
//! version to the target and stamps `schemaVersion` after every step.
//!
//! # Default chain
//!
//! | Step            | Backfilled defaults                                   |
//! |-----------------|-------------------------------------------------------|
//! | 1.0.0 → 1.1.0   | `metadata` → `{}`, `metadata.generatedAt` → now, `nodes` → `[]` |
//! | 1.1.0 → 1.2.0   | node `id` → fresh `node-<uuid>`, `props` → `{}`, `children` → `[]` |

use chrono::Utc;
use rustc_hash::FxHashSet;
use serde_json::{Map, Value, json};
use thiserror::Error;

use super::IrDocument;
use crate::core::{ValidationError, Version};

/// Migration errors.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// No contiguous chain of steps connects the two versions.
    #[error("no migration path from {from} to {to}")]
    PathNotFound { from: String, to: Version },

    /// The migrated document still does not decode.
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

type MigrateFn = Box<dyn Fn(Value) -> Value + Send + Sync>;

/// One `from → to` upgrade.
pub struct MigrationStep {
    pub from: Version,
    pub to: Version,
    migrate: MigrateFn,
}

impl MigrationStep {
    pub fn new(
        from: Version,
        to: Version,
        migrate: impl Fn(Value) -> Value + Send + Sync + 'static,
    ) -> Self {
        Self {
            from,
            to,
            migrate: Box::new(migrate),
        }
    }
}

impl std::fmt::Debug for MigrationStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MigrationStep({} -> {})", self.from, self.to)
    }
}

/// Registered chain of migration steps.
#[derive(Debug, Default)]
pub struct IrMigrator {
    steps: Vec<MigrationStep>,
}

impl IrMigrator {
    /// Empty migrator: only same-version documents pass.
    pub fn new() -> Self {
        Self::default()
    }

    /// Migrator with the built-in `1.0.0 → 1.1.0 → 1.2.0` chain.
    pub fn with_default_steps() -> Self {
        let mut migrator = Self::new();
        migrator
            .register(MigrationStep::new(
                Version::new(1, 0, 0),
                Version::new(1, 1, 0),
                backfill_document,
            ))
            .register(MigrationStep::new(
                Version::new(1, 1, 0),
                Version::new(1, 2, 0),
                backfill_nodes,
            ));
        migrator
    }

    /// Add a step to the chain.
    pub fn register(&mut self, step: MigrationStep) -> &mut Self {
        crate::debug!("migrate"; "registered {:?}", step);
        self.steps.push(step);
        self
    }

    /// Whether `doc` must be migrated to reach `target`.
    ///
    /// A missing or unreadable `schemaVersion` always needs migration.
    pub fn needs_migration(&self, doc: &Value, target: &Version) -> bool {
        read_version(doc).is_none_or(|v| v != *target)
    }

    /// Upgrade a raw document to `target`.
    ///
    /// A document without a version is treated as the oldest version the
    /// chain knows about.
    pub fn migrate(&self, mut doc: Value, target: &Version) -> Result<Value, MigrationError> {
        let from = match read_version(&doc) {
            Some(v) => v,
            None => self.oldest().ok_or_else(|| MigrationError::PathNotFound {
                from: "<none>".to_string(),
                to: *target,
            })?,
        };

        if from == *target {
            return Ok(doc);
        }

        let path = self
            .path(from, *target)
            .ok_or_else(|| MigrationError::PathNotFound {
                from: from.to_string(),
                to: *target,
            })?;

        for step in path {
            crate::debug!("migrate"; "{} -> {}", step.from, step.to);
            doc = (step.migrate)(doc);
            if let Some(obj) = doc.as_object_mut() {
                obj.insert("schemaVersion".into(), json!(step.to.to_string()));
            }
        }

        Ok(doc)
    }

    /// Migrate and decode into a typed document.
    pub fn migrate_document(
        &self,
        doc: Value,
        target: &Version,
    ) -> Result<IrDocument, MigrationError> {
        let migrated = self.migrate(doc, target)?;
        Ok(IrDocument::from_value(migrated)?)
    }

    fn oldest(&self) -> Option<Version> {
        self.steps.iter().map(|s| s.from).min()
    }

    /// Contiguous chain of steps from `from` to `to`.
    fn path(&self, from: Version, to: Version) -> Option<Vec<&MigrationStep>> {
        let mut path = Vec::new();
        let mut visited = FxHashSet::default();
        let mut current = from;

        while current != to {
            if !visited.insert(current) {
                return None;
            }
            let step = self
                .steps
                .iter()
                .find(|s| s.from == current && s.to <= to)?;
            path.push(step);
            current = step.to;
        }

        Some(path)
    }
}

fn read_version(doc: &Value) -> Option<Version> {
    doc.get("schemaVersion")?.as_str()?.parse().ok()
}

/// 1.0.0 → 1.1.0: document-level defaults.
fn backfill_document(mut doc: Value) -> Value {
    let Some(obj) = doc.as_object_mut() else {
        return doc;
    };

    let metadata = obj
        .entry("metadata")
        .or_insert_with(|| Value::Object(Map::new()));
    if let Some(metadata) = metadata.as_object_mut() {
        metadata
            .entry("generatedAt")
            .or_insert_with(|| json!(Utc::now().to_rfc3339()));
    }

    obj.entry("nodes").or_insert_with(|| json!([]));
    doc
}

/// 1.1.0 → 1.2.0: node-level defaults, applied through the whole forest.
fn backfill_nodes(mut doc: Value) -> Value {
    if let Some(nodes) = doc.get_mut("nodes").and_then(Value::as_array_mut) {
        nodes.iter_mut().for_each(backfill_node);
    }
    doc
}

fn backfill_node(node: &mut Value) {
    let Some(obj) = node.as_object_mut() else {
        return;
    };

    let missing_id = obj
        .get("id")
        .and_then(Value::as_str)
        .is_none_or(|id| id.is_empty());
    if missing_id {
        obj.insert("id".into(), json!(format!("node-{}", uuid::Uuid::new_v4().simple())));
    }
    obj.entry("props").or_insert_with(|| json!({}));

    let children = obj.entry("children").or_insert_with(|| json!([]));
    if let Some(children) = children.as_array_mut() {
        children.iter_mut().for_each(backfill_node);
    }
}
