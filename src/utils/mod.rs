//! Utility modules.

pub mod exec;
pub mod path;
pub mod time;
