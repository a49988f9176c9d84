//! Schema delta between two IR snapshots.
//!
//! Nodes are matched by top-level `id`. A change anywhere inside a subtree
//! marks its root as modified; the client replaces that subtree whole.

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ir::canonical::{VOLATILE_METADATA_KEYS, canonical_node_json, canonical_value_json};
use crate::ir::{IrDocument, Node};

/// Node count at or above which a full update is sent instead.
pub const DEFAULT_INCREMENTAL_THRESHOLD: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataChange {
    pub old: Option<Value>,
    pub new: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaDelta {
    pub added: Vec<Node>,
    pub modified: Vec<Node>,
    pub removed: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata_changes: Option<BTreeMap<String, MetadataChange>>,
}

impl SchemaDelta {
    /// Number of node-level changes.
    pub fn change_count(&self) -> usize {
        self.added.len() + self.modified.len() + self.removed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.change_count() == 0 && self.metadata_changes.is_none()
    }
}

/// Compute the delta taking `old` to `new`.
///
/// Added and modified nodes follow `new`'s order, removed ids follow `old`'s.
pub fn calculate_schema_delta(old: &IrDocument, new: &IrDocument) -> SchemaDelta {
    let old_nodes: FxHashMap<&str, &Node> =
        old.nodes.iter().map(|n| (n.id.as_str(), n)).collect();
    let new_ids: FxHashMap<&str, ()> = new.nodes.iter().map(|n| (n.id.as_str(), ())).collect();

    let mut delta = SchemaDelta::default();
    for node in &new.nodes {
        match old_nodes.get(node.id.as_str()) {
            None => delta.added.push(node.clone()),
            Some(prev) if canonical_node_json(prev) != canonical_node_json(node) => {
                delta.modified.push(node.clone());
            }
            Some(_) => {}
        }
    }
    delta.removed = old
        .nodes
        .iter()
        .filter(|n| !new_ids.contains_key(n.id.as_str()))
        .map(|n| n.id.clone())
        .collect();

    let changes = metadata_changes(old, new);
    if !changes.is_empty() {
        delta.metadata_changes = Some(changes);
    }
    delta
}

fn metadata_changes(old: &IrDocument, new: &IrDocument) -> BTreeMap<String, MetadataChange> {
    let as_map = |doc: &IrDocument| match serde_json::to_value(&doc.metadata) {
        Ok(Value::Object(map)) => map,
        _ => serde_json::Map::new(),
    };
    let old_meta = as_map(old);
    let new_meta = as_map(new);

    let mut changes = BTreeMap::new();
    for key in old_meta.keys().chain(new_meta.keys()) {
        if VOLATILE_METADATA_KEYS.contains(&key.as_str()) || changes.contains_key(key) {
            continue;
        }
        let before = old_meta.get(key);
        let after = new_meta.get(key);
        let same = match (before, after) {
            (Some(a), Some(b)) => canonical_value_json(a) == canonical_value_json(b),
            (None, None) => true,
            _ => false,
        };
        if !same {
            changes.insert(
                key.clone(),
                MetadataChange {
                    old: before.cloned(),
                    new: after.cloned(),
                },
            );
        }
    }
    changes
}

/// True iff `0 < changes < threshold`.
pub fn should_use_incremental_update(delta: &SchemaDelta, threshold: usize) -> bool {
    let n = delta.change_count();
    n > 0 && n < threshold
}
