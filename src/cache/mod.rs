//! Content-addressed conversion cache.
//!
//! Keys are derived from the input bytes plus the converter identity, so a
//! hit is only possible while the source file still has exactly the bytes it
//! was converted from. Modification times are never consulted.
//!
//! Eviction is by insertion order once `max_entries` is exceeded; entries
//! older than the TTL are purged lazily on lookup.

mod stats;

use std::collections::VecDeque;
use std::io;
use std::path::Path;
use std::time::{Duration, Instant};

use rustc_hash::FxHashMap;
use serde::Serialize;
use serde_json::Value;

use crate::config::CacheConfig;
use crate::freshness::{ContentHash, hash_parts};
use crate::ir::IrDocument;

pub use stats::CacheStats;

/// What a cache holds. Counters are kept per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArtifactKind {
    /// Raw converter output before migration
    ParsedTree,
    /// Migrated and validated IR document
    Ir,
}

impl ArtifactKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::ParsedTree => "parsed-tree",
            Self::Ir => "ir",
        }
    }
}

/// Content hash of input bytes + converter identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey(ContentHash);

impl CacheKey {
    pub fn new(input: &[u8], converter_id: &str) -> Self {
        Self(hash_parts([input, converter_id.as_bytes()]))
    }

    /// Key for the current bytes of a file.
    pub fn for_file(path: &Path, converter_id: &str) -> io::Result<Self> {
        let bytes = std::fs::read(path)?;
        Ok(Self::new(&bytes, converter_id))
    }

    pub fn hash(&self) -> ContentHash {
        self.0
    }
}

/// Outcome of a lookup.
///
/// `Disabled` lets callers tell "feature off" apart from a real miss; both
/// mean "compute it yourself".
#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup<V> {
    Hit(V),
    Miss,
    Disabled,
}

impl<V> CacheLookup<V> {
    pub fn hit(self) -> Option<V> {
        match self {
            Self::Hit(v) => Some(v),
            Self::Miss | Self::Disabled => None,
        }
    }

    pub fn is_hit(&self) -> bool {
        matches!(self, Self::Hit(_))
    }
}

#[derive(Debug)]
struct CacheEntry<V> {
    value: V,
    stored_at: Instant,
}

/// Bounded TTL cache for one artifact kind.
#[derive(Debug)]
pub struct ConversionCache<V> {
    kind: ArtifactKind,
    enabled: bool,
    max_entries: usize,
    ttl: Option<Duration>,
    entries: FxHashMap<CacheKey, CacheEntry<V>>,
    /// Insertion order, oldest first
    order: VecDeque<CacheKey>,
    stats: CacheStats,
}

impl<V: Clone> ConversionCache<V> {
    pub fn new(kind: ArtifactKind, config: &CacheConfig) -> Self {
        Self {
            kind,
            enabled: config.enabled,
            max_entries: config.max_entries.max(1),
            ttl: config.ttl(),
            entries: FxHashMap::default(),
            order: VecDeque::new(),
            stats: CacheStats::default(),
        }
    }

    pub fn kind(&self) -> ArtifactKind {
        self.kind
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn get(&mut self, key: &CacheKey) -> CacheLookup<V> {
        self.get_at(key, Instant::now())
    }

    pub(crate) fn get_at(&mut self, key: &CacheKey, now: Instant) -> CacheLookup<V> {
        if !self.enabled {
            return CacheLookup::Disabled;
        }

        let expired = match self.entries.get(key) {
            None => {
                self.stats.misses += 1;
                return CacheLookup::Miss;
            }
            Some(entry) => self
                .ttl
                .is_some_and(|ttl| now.saturating_duration_since(entry.stored_at) >= ttl),
        };

        if expired {
            self.remove(key);
            self.stats.expirations += 1;
            self.stats.misses += 1;
            return CacheLookup::Miss;
        }

        self.stats.hits += 1;
        match self.entries.get(key) {
            Some(entry) => CacheLookup::Hit(entry.value.clone()),
            None => CacheLookup::Miss,
        }
    }

    pub fn set(&mut self, key: CacheKey, value: V) {
        self.set_at(key, value, Instant::now());
    }

    pub(crate) fn set_at(&mut self, key: CacheKey, value: V, now: Instant) {
        if !self.enabled {
            return;
        }

        // Re-inserting counts as a fresh insertion
        if self.entries.contains_key(&key) {
            self.order.retain(|k| k != &key);
        }
        self.entries.insert(
            key,
            CacheEntry {
                value,
                stored_at: now,
            },
        );
        self.order.push_back(key);

        while self.entries.len() > self.max_entries {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            self.entries.remove(&oldest);
            self.stats.evictions += 1;
        }
    }

    /// Drop one entry. Returns true if it was present.
    pub fn invalidate(&mut self, key: &CacheKey) -> bool {
        self.remove(key)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            ..self.stats
        }
    }

    pub fn hit_rate(&self) -> f64 {
        self.stats.hit_rate()
    }

    fn remove(&mut self, key: &CacheKey) -> bool {
        if self.entries.remove(key).is_some() {
            self.order.retain(|k| k != key);
            true
        } else {
            false
        }
    }
}

/// The engine's two caches: raw converter output and migrated IR.
#[derive(Debug)]
pub struct ConversionCaches {
    pub parsed: ConversionCache<Value>,
    pub ir: ConversionCache<IrDocument>,
}

impl ConversionCaches {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            parsed: ConversionCache::new(ArtifactKind::ParsedTree, config),
            ir: ConversionCache::new(ArtifactKind::Ir, config),
        }
    }

    /// Counters per artifact kind.
    pub fn stats(&self) -> Vec<(ArtifactKind, CacheStats)> {
        vec![
            (self.parsed.kind(), self.parsed.stats()),
            (self.ir.kind(), self.ir.stats()),
        ]
    }

    /// Combined hit rate over both kinds.
    pub fn hit_rate(&self) -> f64 {
        let total = self
            .stats()
            .into_iter()
            .fold(CacheStats::default(), |acc, (_, s)| acc.merge(&s));
        total.hit_rate()
    }

    pub fn invalidate(&mut self, key: &CacheKey) {
        self.parsed.invalidate(key);
        self.ir.invalidate(key);
    }

    pub fn clear(&mut self) {
        self.parsed.clear();
        self.ir.clear();
    }
}
