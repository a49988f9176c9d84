//! Structural validation of IR documents.

use rustc_hash::FxHashSet;

use super::{IrDocument, Node};
use crate::core::ValidationError;

/// Check the structural invariants of a document.
///
/// - every node has a non-empty `id` and `type`
/// - ids are unique across the whole forest
/// - `metadata.sourceFile` is set
///
/// All issues are collected so a converter author sees them in one pass.
pub fn validate(doc: &IrDocument) -> Result<(), ValidationError> {
    let mut issues = Vec::new();

    if doc.metadata.source_file.as_os_str().is_empty() {
        issues.push("metadata.sourceFile is empty".to_string());
    }

    let mut seen = FxHashSet::default();
    for (index, node) in doc.nodes.iter().enumerate() {
        check_node(node, &format!("nodes[{index}]"), &mut seen, &mut issues);
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::Document(issues))
    }
}

fn check_node<'a>(
    node: &'a Node,
    at: &str,
    seen: &mut FxHashSet<&'a str>,
    issues: &mut Vec<String>,
) {
    if node.id.trim().is_empty() {
        issues.push(format!("{at}: empty id"));
    } else if !seen.insert(node.id.as_str()) {
        issues.push(format!("{at}: duplicate id `{}`", node.id));
    }
    if node.kind.trim().is_empty() {
        issues.push(format!("{at}: empty type"));
    }
    for (index, child) in node.children.iter().enumerate() {
        check_node(child, &format!("{at}.children[{index}]"), seen, issues);
    }
}
