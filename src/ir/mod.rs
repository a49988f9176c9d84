//! Intermediate representation shared by both sides of a component.
//!
//! An [`IrDocument`] is a forest of [`Node`]s plus document metadata. Node
//! identity across snapshots is decided by `id` alone, which is what makes
//! delta computation possible.
//!
//! # Module Structure
//!
//! - `canonical` - canonical form and content checksum
//! - `validate` - structural validation
//! - `migrate` - schema version migration chain

pub mod canonical;
pub mod migrate;
pub mod validate;

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::{Representation, ValidationError, Version};

pub use canonical::checksum;
pub use migrate::{IrMigrator, MigrationError};
pub use validate::validate;

/// Schema version produced by this build and required by the store.
pub const CURRENT_SCHEMA_VERSION: Version = Version::new(1, 2, 0);

/// One IR snapshot of a logical component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IrDocument {
    pub schema_version: Version,
    pub metadata: IrMetadata,
    #[serde(default)]
    pub nodes: Vec<Node>,
}

/// Document-level metadata.
///
/// Unknown fields are kept in `extra` so converters can carry their own
/// annotations through a round trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IrMetadata {
    pub source_representation: Representation,
    pub source_file: PathBuf,
    pub generated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A UI element and its subtree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub props: Map<String, Value>,
    #[serde(default)]
    pub children: Vec<Node>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub events: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lifecycle: Option<Value>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

impl IrDocument {
    /// Create a current-version document stamped with the current time.
    pub fn new(
        source_representation: Representation,
        source_file: impl Into<PathBuf>,
        nodes: Vec<Node>,
    ) -> Self {
        Self {
            schema_version: CURRENT_SCHEMA_VERSION,
            metadata: IrMetadata {
                source_representation,
                source_file: source_file.into(),
                generated_at: Utc::now(),
                extra: Map::new(),
            },
            nodes,
        }
    }

    /// Decode a raw JSON document.
    pub fn from_value(value: Value) -> Result<Self, ValidationError> {
        serde_json::from_value(value).map_err(|e| ValidationError::Document(vec![e.to_string()]))
    }

    /// Encode to a JSON value.
    pub fn to_value(&self) -> Value {
        // Serializing plain data with string keys cannot fail
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Depth-first iterator over every node of the forest.
    pub fn iter_nodes(&self) -> impl Iterator<Item = &Node> {
        let mut stack: Vec<&Node> = self.nodes.iter().rev().collect();
        std::iter::from_fn(move || {
            let node = stack.pop()?;
            stack.extend(node.children.iter().rev());
            Some(node)
        })
    }

    /// Total number of nodes, including descendants.
    pub fn node_count(&self) -> usize {
        self.iter_nodes().count()
    }

    /// Find a node anywhere in the forest.
    pub fn find(&self, id: &str) -> Option<&Node> {
        self.iter_nodes().find(|n| n.id == id)
    }
}

impl Node {
    pub fn new(id: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            props: Map::new(),
            children: Vec::new(),
            state: None,
            events: None,
            lifecycle: None,
            metadata: Map::new(),
        }
    }

    pub fn with_prop(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.props.insert(key.into(), value.into());
        self
    }

    pub fn with_child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }
}
