//! Priority levels for change ordering.

use serde::{Deserialize, Serialize};

/// Priority level for queued changes
///
/// Higher value = higher priority (drained first)
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Background resync (initial scan, retries)
    Low = 0,
    /// Regular edit picked up by the watcher
    #[default]
    Normal = 1,
    /// Component currently viewed by a live client
    High = 2,
}

impl Priority {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Normal => "normal",
            Self::High => "high",
        }
    }
}
