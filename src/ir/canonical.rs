//! Canonical form and content checksum of IR documents.
//!
//! Two documents that differ only in volatile metadata (timestamps) or in
//! object key order have the same canonical form and the same checksum.

use serde_json::{Map, Value};

use super::{IrDocument, Node};
use crate::freshness::{ContentHash, hash_bytes};

/// Metadata keys excluded from checksums and deltas.
pub const VOLATILE_METADATA_KEYS: &[&str] = &["generatedAt", "convertedAt", "storedAt"];

/// Content checksum of a document, ignoring volatile metadata.
pub fn checksum(doc: &IrDocument) -> ContentHash {
    hash_bytes(canonical_json(doc).as_bytes())
}

/// Canonical JSON text: volatile fields stripped, keys sorted, no whitespace.
pub fn canonical_json(doc: &IrDocument) -> String {
    let value = sort_keys(strip_volatile(doc.to_value()));
    serde_json::to_string(&value).unwrap_or_default()
}

/// Canonical JSON text of any value (keys sorted).
pub fn canonical_value_json(value: &Value) -> String {
    serde_json::to_string(&sort_keys(value.clone())).unwrap_or_default()
}

/// Canonical JSON text of one node subtree, volatile metadata stripped.
pub fn canonical_node_json(node: &Node) -> String {
    let mut value = serde_json::to_value(node).unwrap_or(Value::Null);
    strip_node(&mut value);
    serde_json::to_string(&sort_keys(value)).unwrap_or_default()
}

/// Remove volatile keys from document metadata and from every node's metadata.
pub fn strip_volatile(mut value: Value) -> Value {
    if let Some(metadata) = value.get_mut("metadata").and_then(Value::as_object_mut) {
        remove_volatile(metadata);
    }
    if let Some(nodes) = value.get_mut("nodes").and_then(Value::as_array_mut) {
        nodes.iter_mut().for_each(strip_node);
    }
    value
}

/// Node metadata left empty is dropped, matching how an unstamped node serializes.
fn strip_node(node: &mut Value) {
    if let Some(metadata) = node.get_mut("metadata").and_then(Value::as_object_mut) {
        remove_volatile(metadata);
        if metadata.is_empty()
            && let Some(obj) = node.as_object_mut()
        {
            obj.remove("metadata");
        }
    }
    if let Some(children) = node.get_mut("children").and_then(Value::as_array_mut) {
        children.iter_mut().for_each(strip_node);
    }
}

fn remove_volatile(map: &mut Map<String, Value>) {
    for key in VOLATILE_METADATA_KEYS {
        map.remove(*key);
    }
}

/// Rebuild every object with lexicographically sorted keys.
///
/// `serde_json` keeps insertion order here, so inserting in sorted order
/// yields a deterministic serialization.
fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.into_iter().collect();
            entries.sort_by(|(a, _), (b, _)| a.cmp(b));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, sort_keys(v)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Representation;
    use crate::ir::Node;
    use serde_json::json;

    fn doc() -> IrDocument {
        IrDocument::new(
            Representation::A,
            "lib/a.dart",
            vec![Node::new("n1", "Text").with_prop("text", "hello")],
        )
    }

    #[test]
    fn test_checksum_ignores_generated_at() {
        let a = doc();
        let mut b = a.clone();
        b.metadata.generated_at = b.metadata.generated_at + chrono::Duration::seconds(90);
        assert_eq!(checksum(&a), checksum(&b));
    }

    #[test]
    fn test_checksum_ignores_node_level_timestamps() {
        let a = doc();
        let mut b = a.clone();
        b.nodes[0]
            .metadata
            .insert("convertedAt".into(), json!("2026-01-01T00:00:00Z"));
        assert_eq!(checksum(&a), checksum(&b));
    }

    #[test]
    fn test_node_json_ignores_node_level_timestamps() {
        let plain = Node::new("n1", "Text");
        let mut stamped = plain.clone();
        stamped
            .metadata
            .insert("convertedAt".into(), json!("2026-01-01T00:00:00Z"));
        assert_eq!(canonical_node_json(&plain), canonical_node_json(&stamped));
        assert!(!canonical_node_json(&stamped).contains("metadata"));

        // Other node metadata stays
        stamped.metadata.insert("origin".into(), json!("lib"));
        assert!(canonical_node_json(&stamped).contains(r#""metadata":{"origin":"lib"}"#));
    }

    #[test]
    fn test_checksum_detects_semantic_change() {
        let a = doc();
        let mut b = a.clone();
        b.nodes[0].props.insert("text".into(), json!("bye"));
        assert_ne!(checksum(&a), checksum(&b));

        let mut c = a.clone();
        c.metadata.source_representation = Representation::B;
        assert_ne!(checksum(&a), checksum(&c));
    }

    #[test]
    fn test_checksum_ignores_key_order() {
        let a = IrDocument::new(
            Representation::A,
            "x",
            vec![Node::new("n", "Box").with_prop("w", 1).with_prop("h", 2)],
        );
        let mut b = a.clone();
        b.nodes[0].props = serde_json::Map::new();
        b.nodes[0].props.insert("h".into(), json!(2));
        b.nodes[0].props.insert("w".into(), json!(1));
        assert_eq!(checksum(&a), checksum(&b));
    }

    #[test]
    fn test_canonical_json_has_no_generated_at() {
        let text = canonical_json(&doc());
        assert!(!text.contains("generatedAt"));
        assert!(text.starts_with(r#"{"metadata":"#));
    }
}
