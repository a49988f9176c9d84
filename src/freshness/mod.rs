//! Freshness detection: content hashes (blake3) for sources and IR.

mod hash;

pub use hash::{ContentHash, hash_bytes, hash_file, hash_parts};
