//! Resolution strategies, automatic policies and backups.

use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::ConflictRecord;
use crate::core::Representation;

/// How an operator (or policy) settles one conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolutionStrategy {
    /// Re-convert A and regenerate B from it
    UseA,
    /// Re-convert B and regenerate A from it
    UseB,
    /// Back up both files and leave the merge to a human
    ManualMerge,
    /// Mark resolved without touching anything
    Skip,
}

impl ResolutionStrategy {
    pub const fn label(self) -> &'static str {
        match self {
            Self::UseA => "use-a",
            Self::UseB => "use-b",
            Self::ManualMerge => "manual-merge",
            Self::Skip => "skip",
        }
    }

    /// The winning representation for `use-a` / `use-b`.
    pub const fn winner(self) -> Option<Representation> {
        match self {
            Self::UseA => Some(Representation::A),
            Self::UseB => Some(Representation::B),
            Self::ManualMerge | Self::Skip => None,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "use-a" | "a" => Some(Self::UseA),
            "use-b" | "b" => Some(Self::UseB),
            "manual-merge" | "manual" | "merge" => Some(Self::ManualMerge),
            "skip" => Some(Self::Skip),
            _ => None,
        }
    }
}

/// What the engine does with a freshly detected conflict.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictPolicy {
    /// Block the component until an operator resolves it
    #[default]
    Manual,
    PreferA,
    PreferB,
    /// The later edit wins
    Newest,
    Skip,
}

impl ConflictPolicy {
    /// Strategy to apply right away, `None` when an operator must decide.
    pub fn strategy_for(self, conflict: &ConflictRecord) -> Option<ResolutionStrategy> {
        match self {
            Self::Manual => None,
            Self::PreferA => Some(ResolutionStrategy::UseA),
            Self::PreferB => Some(ResolutionStrategy::UseB),
            Self::Newest => Some(match conflict.newest() {
                Representation::A => ResolutionStrategy::UseA,
                Representation::B => ResolutionStrategy::UseB,
            }),
            Self::Skip => Some(ResolutionStrategy::Skip),
        }
    }
}

/// Files written while applying a resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilesRegenerated {
    pub a: Option<PathBuf>,
    pub b: Option<PathBuf>,
}

impl FilesRegenerated {
    pub fn set(&mut self, rep: Representation, path: PathBuf) {
        match rep {
            Representation::A => self.a = Some(path),
            Representation::B => self.b = Some(path),
        }
    }

    pub fn get(&self, rep: Representation) -> Option<&PathBuf> {
        match rep {
            Representation::A => self.a.as_ref(),
            Representation::B => self.b.as_ref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionResult {
    pub conflict_id: String,
    pub strategy: ResolutionStrategy,
    pub success: bool,
    pub files_regenerated: FilesRegenerated,
    pub backups: Vec<PathBuf>,
    /// Store version written by `use-a` / `use-b`
    pub stored_version: Option<u64>,
    pub needs_manual_edit: bool,
    pub error: Option<String>,
}

impl ResolutionResult {
    pub fn new(conflict_id: impl Into<String>, strategy: ResolutionStrategy) -> Self {
        Self {
            conflict_id: conflict_id.into(),
            strategy,
            success: false,
            files_regenerated: FilesRegenerated::default(),
            backups: Vec::new(),
            stored_version: None,
            needs_manual_edit: false,
            error: None,
        }
    }

    pub fn failed(mut self, error: impl Into<String>) -> Self {
        self.success = false;
        self.error = Some(error.into());
        self
    }
}

/// Copy `path` to `<path>.<stamp>.backup`.
///
/// Returns `None` when there is nothing to back up.
pub fn backup_file(path: &Path) -> io::Result<Option<PathBuf>> {
    if !path.is_file() {
        return Ok(None);
    }
    let mut name = path.as_os_str().to_owned();
    name.push(format!(".{}.backup", crate::utils::time::file_stamp()));
    let backup = PathBuf::from(name);
    std::fs::copy(path, &backup)?;
    crate::debug!("conflict"; "backup {} -> {}", path.display(), backup.display());
    Ok(Some(backup))
}
