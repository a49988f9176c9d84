//! Core types - pure abstractions shared across the codebase.

mod error;
mod priority;
mod representation;
mod state;
mod version;

pub use error::ValidationError;
pub use priority::Priority;
pub use representation::Representation;
pub use state::{is_shutdown, register_shutdown, setup_shutdown_handler};
pub use version::Version;
