//! Conflict detection and resolution types.
//!
//! Detection is pure bookkeeping over event timestamps. Applying a
//! resolution needs converters and the store, so the workflow itself lives
//! in the engine; this module only defines the vocabulary and backups.

mod detector;
mod resolve;

pub use detector::{ConflictDetector, ConflictRecord};
pub use resolve::{ConflictPolicy, ResolutionResult, ResolutionStrategy, backup_file};
