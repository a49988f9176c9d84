//! Command-line interface module.

mod args;
pub mod resolve;
pub mod serve;
pub mod status;
pub mod sync;

pub use args::{Cli, Commands};
