//! Configuration section definitions.
//!
//! Each module corresponds to a section in `twinsync.toml`:
//!
//! | Module      | TOML Section     | Purpose                              |
//! |-------------|------------------|--------------------------------------|
//! | `sync`      | `[sync]`         | Roots, store, timing, conflicts      |
//! | `cache`     | `[cache]`        | Conversion cache                     |
//! | `serve`     | `[serve]`        | Live-reload server                   |
//! | `converter` | `[converter.*]`  | External converter commands          |

mod cache;
mod converter;
mod serve;
mod sync;

pub use cache::CacheConfig;
pub use converter::{CommandConfig, ConverterSectionConfig};
pub use serve::ServeConfig;
pub use sync::SyncSectionConfig;
