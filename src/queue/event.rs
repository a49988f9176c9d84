//! File change events fed into the queue.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::core::Representation;

/// What happened to a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Create,
    Change,
    Delete,
}

impl ChangeKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Create => "created",
            Self::Change => "changed",
            Self::Delete => "deleted",
        }
    }
}

/// One observed change to a source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEvent {
    pub kind: ChangeKind,
    pub file_path: PathBuf,
    pub representation: Representation,
    /// Milliseconds since the Unix epoch
    pub timestamp: u64,
}

impl FileEvent {
    pub fn new(kind: ChangeKind, file_path: impl Into<PathBuf>, representation: Representation) -> Self {
        Self::at(kind, file_path, representation, crate::utils::time::now_ms())
    }

    pub fn at(
        kind: ChangeKind,
        file_path: impl Into<PathBuf>,
        representation: Representation,
        timestamp: u64,
    ) -> Self {
        Self {
            kind,
            file_path: file_path.into(),
            representation,
            timestamp,
        }
    }
}
