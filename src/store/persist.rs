//! On-disk layout of the IR store.
//!
//! ```text
//! <root>/
//! ├── screens_home-1f0c9a2b/     # one directory per logical component
//! │   ├── current.json           # copy of the latest entry
//! │   ├── v3.json
//! │   └── v4.json
//! └── ...
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::{IrEntry, StoreError};
use crate::freshness::hash_bytes;

/// Latest entry of a component.
pub(super) const CURRENT_FILE: &str = "current.json";

/// Directory name for a logical id.
///
/// Unsafe characters become `_`; the hash suffix keeps ids such as `a/b`
/// and `a_b` apart.
pub(super) fn component_dir(root: &Path, logical_id: &str) -> PathBuf {
    let sanitized: String = logical_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let suffix = &hash_bytes(logical_id.as_bytes()).to_hex()[..8];
    root.join(format!("{sanitized}-{suffix}"))
}

fn version_file(version: u64) -> String {
    format!("v{version}.json")
}

/// Write a new entry and point `current.json` at it.
pub(super) fn write_entry(dir: &Path, entry: &IrEntry) -> Result<(), StoreError> {
    fs::create_dir_all(dir).map_err(|e| StoreError::Io(dir.to_path_buf(), e))?;

    let json = serde_json::to_string_pretty(entry)
        .map_err(|e| StoreError::Corrupt(dir.to_path_buf(), e))?;

    write_atomic(&dir.join(version_file(entry.version)), &json)?;
    write_atomic(&dir.join(CURRENT_FILE), &json)
}

/// Delete an evicted version file. Missing files are not an error.
pub(super) fn remove_version(dir: &Path, version: u64) -> Result<(), StoreError> {
    let path = dir.join(version_file(version));
    match fs::remove_file(&path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(StoreError::Io(path, e)),
    }
}

/// Delete a whole component directory.
pub(super) fn remove_component(dir: &Path) -> Result<(), StoreError> {
    match fs::remove_dir_all(dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(StoreError::Io(dir.to_path_buf(), e)),
    }
}

/// Read every component under `root`, entries sorted by version.
pub(super) fn load_all(root: &Path) -> Result<Vec<Vec<IrEntry>>, StoreError> {
    if !root.exists() {
        return Ok(Vec::new());
    }

    let mut components = Vec::new();
    let dirs = fs::read_dir(root).map_err(|e| StoreError::Io(root.to_path_buf(), e))?;

    for dir in dirs {
        let dir = dir.map_err(|e| StoreError::Io(root.to_path_buf(), e))?.path();
        if !dir.is_dir() {
            continue;
        }

        let mut entries = load_component(&dir)?;
        if entries.is_empty() {
            continue;
        }
        entries.sort_by_key(|e| e.version);
        components.push(entries);
    }

    Ok(components)
}

fn load_component(dir: &Path) -> Result<Vec<IrEntry>, StoreError> {
    let mut entries = Vec::new();
    let files = fs::read_dir(dir).map_err(|e| StoreError::Io(dir.to_path_buf(), e))?;

    for file in files {
        let path = file.map_err(|e| StoreError::Io(dir.to_path_buf(), e))?.path();
        if !is_version_file(&path) {
            continue;
        }
        let json = fs::read_to_string(&path).map_err(|e| StoreError::Io(path.clone(), e))?;
        let entry: IrEntry =
            serde_json::from_str(&json).map_err(|e| StoreError::Corrupt(path.clone(), e))?;
        entries.push(entry);
    }

    Ok(entries)
}

fn is_version_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .and_then(|n| n.strip_prefix('v'))
        .and_then(|n| n.strip_suffix(".json"))
        .is_some_and(|n| n.parse::<u64>().is_ok())
}

/// Write through a temp file so a crash never leaves a half-written entry.
fn write_atomic(path: &Path, content: &str) -> Result<(), StoreError> {
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, content).map_err(|e| StoreError::Io(tmp.clone(), e))?;
    fs::rename(&tmp, path).map_err(|e| StoreError::Io(path.to_path_buf(), e))
}
