//! `[cache]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [cache]
//! enabled = true
//! max_entries = 512   # Per artifact kind
//! ttl_seconds = 3600  # 0 = never expire
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::types::{ConfigDiagnostics, FieldPath};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub max_entries: usize,
    pub ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: 512,
            ttl_seconds: 3600,
        }
    }
}

impl CacheConfig {
    pub const MAX_ENTRIES: FieldPath = FieldPath::new("cache.max_entries");

    pub fn ttl(&self) -> Option<Duration> {
        (self.ttl_seconds > 0).then(|| Duration::from_secs(self.ttl_seconds))
    }

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if self.enabled && self.max_entries == 0 {
            diag.error_with_hint(
                Self::MAX_ENTRIES,
                "an enabled cache needs room for at least one entry",
                "set `enabled = false` to turn the cache off",
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::test_parse_config;

    #[test]
    fn test_cache_config() {
        let config = test_parse_config("[cache]\nenabled = false\nttl_seconds = 0");
        assert!(!config.cache.enabled);
        assert_eq!(config.cache.ttl(), None);
        assert_eq!(config.cache.max_entries, 512);
    }

    #[test]
    fn test_cache_ttl() {
        let config = test_parse_config("[cache]\nttl_seconds = 5");
        assert_eq!(config.cache.ttl(), Some(std::time::Duration::from_secs(5)));
    }
}
