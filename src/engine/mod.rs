//! Sync Engine
//!
//! Turns debounced file changes into stored IR versions, regenerated
//! counterpart files and update messages for live clients.
//!
//! ```text
//! pair -> own-write check -> conflict check -> to_ir (cached, parallel)
//!      -> migrate -> has_changed -> store -> delta -> from_ir (parallel)
//! ```
//!
//! Only the newest change of a component in a batch is applied. Test and
//! mock files skip the IR pipeline and go through the tests converter alone.
//!
//! All store, cache and detector mutation happens on the caller's thread.
//! Only converter calls run on the conversion pool, and their results are
//! collected in input order before anything is committed.

mod pairing;
mod resolve;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rayon::prelude::*;
use rustc_hash::FxHashMap;
use serde::Serialize;
use serde_json::{Map, Value, json};
use thiserror::Error;

use crate::cache::{ArtifactKind, CacheKey, CacheStats, ConversionCaches};
use crate::config::{SyncConfig, SyncSectionConfig};
use crate::conflict::{ConflictDetector, ConflictRecord, ResolutionResult};
use crate::converter::{ConversionError, Converter, ConverterSet};
use crate::core::{Priority, Representation};
use crate::freshness::{ContentHash, hash_file};
use crate::ir::{IrDocument, IrMigrator, MigrationError};
use crate::queue::{ChangeKind, FileEvent, QueuedChange};
use crate::reload::{Message, calculate_schema_delta, should_use_incremental_update};
use crate::store::{IrEntry, IrStore, StoreError};
use crate::{debug, log};

pub use pairing::{PairedPath, PathPairing};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("failed to build conversion pool")]
    Pool(#[from] rayon::ThreadPoolBuildError),

    #[error("unknown conflict `{0}`")]
    UnknownConflict(String),

    #[error("conflict `{0}` is already resolved")]
    AlreadyResolved(String),
}

// =============================================================================
// Results
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    /// Stored and the counterpart regenerated
    Synced,
    /// Content identical to the stored version
    Unchanged,
    Deleted,
    /// Blocked by an unresolved conflict
    Conflict,
    /// Conflict settled by the configured policy
    Resolved,
    /// Test or mock file converted straight to its counterpart, outside the store
    Converted,
    /// Another change to the same component in the batch took effect
    Superseded,
    /// Test or mock file without a test converter
    Disabled,
    /// Not under either source root
    Ignored,
    Failed,
}

impl SyncStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Synced => "synced",
            Self::Unchanged => "unchanged",
            Self::Deleted => "deleted",
            Self::Conflict => "conflict",
            Self::Resolved => "resolved",
            Self::Converted => "converted",
            Self::Superseded => "superseded",
            Self::Disabled => "disabled",
            Self::Ignored => "ignored",
            Self::Failed => "failed",
        }
    }

    pub const fn is_success(self) -> bool {
        matches!(
            self,
            Self::Synced
                | Self::Unchanged
                | Self::Deleted
                | Self::Resolved
                | Self::Converted
                | Self::Superseded
                | Self::Ignored
        )
    }
}

/// Outcome of one processed change.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResult {
    pub success: bool,
    pub status: SyncStatus,
    pub source_file: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_file: Option<PathBuf>,
    /// Logical component id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ir_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update: Option<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conflict: Option<ConflictRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<ResolutionResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SyncResult {
    pub fn new(status: SyncStatus, source_file: impl Into<PathBuf>) -> Self {
        Self {
            success: status.is_success(),
            status,
            source_file: source_file.into(),
            target_file: None,
            ir_id: None,
            version: None,
            update: None,
            conflict: None,
            resolution: None,
            error: None,
        }
    }

    fn for_pair(status: SyncStatus, paired: &PairedPath) -> Self {
        let mut result = Self::new(status, paired.source());
        result.target_file = Some(paired.target().to_path_buf());
        result.ir_id = Some(paired.logical_id.clone());
        result
    }

    fn with_version(mut self, version: u64) -> Self {
        self.version = (version > 0).then_some(version);
        self
    }

    fn with_update(mut self, update: Option<Message>) -> Self {
        self.update = update;
        self
    }

    fn failed(mut self, error: impl std::fmt::Display) -> Self {
        self.status = SyncStatus::Failed;
        self.success = false;
        self.error = Some(error.to_string());
        self
    }
}

// =============================================================================
// Engine
// =============================================================================

pub struct SyncEngine {
    settings: SyncSectionConfig,
    pairing: PathPairing,
    store: IrStore,
    migrator: IrMigrator,
    caches: ConversionCaches,
    detector: ConflictDetector,
    converters: ConverterSet,
    pool: rayon::ThreadPool,
    /// Session id stamped on outbound messages; the transport rewrites it per client
    session_id: String,
    sequence: u64,
    /// Content hash of every file the engine wrote, until it changes again
    own_writes: FxHashMap<PathBuf, ContentHash>,
}

/// A change that passed pairing and the own-write check.
struct Pending {
    index: usize,
    paired: PairedPath,
    event: FileEvent,
    reader: Arc<dyn Converter>,
    writer: Arc<dyn Converter>,
}

/// Where the IR of a pending change comes from.
enum Input {
    Cached(IrDocument),
    Parsed(Value),
    Convert,
}

struct Job {
    pending: Pending,
    key: CacheKey,
    input: Input,
}

/// A counterpart file to regenerate.
struct Write {
    index: usize,
    writer: Arc<dyn Converter>,
    ir: IrDocument,
    target: PathBuf,
}

impl SyncEngine {
    pub fn new(
        config: &SyncConfig,
        store: IrStore,
        converters: ConverterSet,
    ) -> Result<Self, EngineError> {
        let settings = config.sync.clone();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(settings.workers)
            .thread_name(|i| format!("convert-{i}"))
            .build()?;

        Ok(Self {
            pairing: PathPairing::from_config(&settings),
            migrator: IrMigrator::with_default_steps(),
            caches: ConversionCaches::new(&config.cache),
            detector: ConflictDetector::new(settings.conflict_window_ms),
            session_id: format!("engine-{}", uuid::Uuid::new_v4().simple()),
            sequence: 0,
            own_writes: FxHashMap::default(),
            settings,
            store,
            converters,
            pool,
        })
    }

    /// Engine over the persistent store and the command converters of `config`.
    pub fn open(config: &SyncConfig) -> Result<Self, EngineError> {
        let store = IrStore::open(&config.sync.store_dir, config.sync.history_depth)?;
        let converters = ConverterSet::from_config(&config.converter, &config.root);
        Self::new(config, store, converters)
    }

    pub fn store(&self) -> &IrStore {
        &self.store
    }

    pub fn detector(&self) -> &ConflictDetector {
        &self.detector
    }

    pub fn pairing(&self) -> &PathPairing {
        &self.pairing
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn cache_stats(&self) -> Vec<(ArtifactKind, CacheStats)> {
        self.caches.stats()
    }

    pub fn cache_hit_rate(&self) -> f64 {
        self.caches.hit_rate()
    }

    /// Last sequence number handed out.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    fn next_sequence(&mut self) -> u64 {
        self.sequence += 1;
        self.sequence
    }

    // =========================================================================
    // Batch processing
    // =========================================================================

    /// Process a drained batch, one result per change in input order.
    ///
    /// A failing change never affects the others.
    pub fn process_changes(&mut self, changes: &[QueuedChange]) -> Vec<SyncResult> {
        let mut results: Vec<Option<SyncResult>> = (0..changes.len()).map(|_| None).collect();

        let mut pending = Vec::new();
        let mut direct = Vec::new();
        for (index, change) in changes.iter().enumerate() {
            match self.prepare(index, &change.event) {
                Ok(p) if p.paired.is_test => direct.push(p),
                Ok(p) => pending.push(p),
                Err(result) => results[index] = Some(result),
            }
        }

        let direct = latest_per_component(direct, &mut results);
        self.convert_direct(direct, &mut results);

        // Every event is recorded before any component is judged, so a pair
        // of edits within one batch is caught regardless of order.
        let mut conflicts: FxHashMap<String, ConflictRecord> = FxHashMap::default();
        for p in &pending {
            let version = self.store.current_version(&p.paired.logical_id);
            let check = self.detector.check_conflict(
                &p.event,
                &p.paired.logical_id,
                &p.paired.file_a,
                &p.paired.file_b,
                version,
            );
            if let Some(record) = check.conflict {
                conflicts.insert(p.paired.logical_id.clone(), record);
            }
        }

        let mut settled: FxHashMap<String, ResolutionResult> = FxHashMap::default();
        let mut free = Vec::new();
        for p in pending {
            match conflicts.get(&p.paired.logical_id).cloned() {
                Some(record) => results[p.index] = Some(self.blocked(&p, record, &mut settled)),
                None => free.push(p),
            }
        }

        // Both sides of one component would otherwise regenerate each other
        let mut jobs = Vec::new();
        for p in latest_per_component(free, &mut results) {
            let index = p.index;
            match self.plan(p) {
                Ok(job) => jobs.push(job),
                Err(result) => results[index] = Some(result),
            }
        }

        let converted = self.convert_all(&jobs);

        let mut writes = Vec::new();
        for (job, raw) in jobs.into_iter().zip(converted) {
            let index = job.pending.index;
            let (result, write) = self.commit(job, raw);
            results[index] = Some(result);
            writes.extend(write);
        }

        self.write_all(writes, &mut results);

        results
            .into_iter()
            .map(|r| r.unwrap_or_else(|| SyncResult::new(SyncStatus::Ignored, PathBuf::new())))
            .collect()
    }

    /// Pair, route and screen one event. `Err` carries a final result.
    fn prepare(&mut self, index: usize, event: &FileEvent) -> Result<Pending, SyncResult> {
        let Some(paired) = self.pairing.pair(&event.file_path) else {
            debug!("sync"; "ignored {}", event.file_path.display());
            return Err(SyncResult::new(SyncStatus::Ignored, &event.file_path));
        };

        let Some((reader, writer)) = self.converters_for(&paired) else {
            debug!("sync"; "no test converter for {}", paired.logical_id);
            return Err(SyncResult::for_pair(SyncStatus::Disabled, &paired));
        };

        let source = paired.source().to_path_buf();
        if !source.is_file() {
            return Err(self.remove(&paired));
        }
        if event.kind == ChangeKind::Delete {
            debug!("sync"; "{} was recreated", source.display());
        }

        let hash = hash_file(&source).map_err(|e| {
            SyncResult::for_pair(SyncStatus::Failed, &paired)
                .failed(ConversionError::Read(source.clone(), e))
        })?;
        if self.own_writes.get(&source) == Some(&hash) {
            debug!("sync"; "skip own write {}", source.display());
            let version = self.store.current_version(&paired.logical_id);
            return Err(SyncResult::for_pair(SyncStatus::Unchanged, &paired).with_version(version));
        }
        self.own_writes.remove(&source);

        let event = FileEvent::at(event.kind, source, paired.representation, event.timestamp);
        Ok(Pending {
            index,
            paired,
            event,
            reader,
            writer,
        })
    }

    /// Converters reading the source and writing the target of `paired`.
    fn converters_for(
        &self,
        paired: &PairedPath,
    ) -> Option<(Arc<dyn Converter>, Arc<dyn Converter>)> {
        if paired.is_test {
            let tests = self.converters.tests.clone()?;
            return Some((tests.clone(), tests));
        }
        let pick = |rep: Representation| match rep {
            Representation::A => Arc::clone(&self.converters.a),
            Representation::B => Arc::clone(&self.converters.b),
        };
        Some((
            pick(paired.representation),
            pick(paired.representation.other()),
        ))
    }

    /// Source file is gone: drop the component once both sides are gone.
    ///
    /// The surviving counterpart is never deleted.
    fn remove(&mut self, paired: &PairedPath) -> SyncResult {
        self.own_writes.remove(paired.source());
        let result = SyncResult::for_pair(SyncStatus::Deleted, paired);

        if paired.target().exists() {
            debug!("sync"; "{} removed, keeping {}", paired.source().display(), paired.target().display());
            let version = self.store.current_version(&paired.logical_id);
            return result.with_version(version);
        }

        match self.store.delete(&paired.logical_id) {
            Ok(true) => {
                self.detector.forget(&paired.logical_id);
                log!("sync"; "removed {}", paired.logical_id);
                let reason = format!("component `{}` deleted", paired.logical_id);
                result.with_update(Some(Message::reload(&self.session_id, reason)))
            }
            Ok(false) => result,
            Err(e) => result.failed(e),
        }
    }

    /// Result for a change of a conflicted component.
    ///
    /// With an automatic policy the first such change in a batch applies
    /// the resolution; the others only report it.
    fn blocked(
        &mut self,
        pending: &Pending,
        record: ConflictRecord,
        settled: &mut FxHashMap<String, ResolutionResult>,
    ) -> SyncResult {
        let logical_id = &pending.paired.logical_id;
        let mut result = SyncResult::for_pair(SyncStatus::Conflict, &pending.paired)
            .with_version(self.store.current_version(logical_id));

        if let Some(resolution) = settled.get(logical_id) {
            result.status = SyncStatus::Resolved;
            result.success = resolution.success;
            result.resolution = Some(resolution.clone());
            result.conflict = Some(record);
            return result;
        }

        let Some(strategy) = self.settings.conflict_policy.strategy_for(&record) else {
            result.success = false;
            result.error = Some(format!("unresolved conflict `{}`", record.id));
            result.conflict = Some(record);
            return result;
        };

        log!("conflict"; "{}: applying {}", logical_id, strategy.label());
        let (resolution, update) = self.apply_strategy(&record, strategy);
        settled.insert(logical_id.clone(), resolution.clone());

        result.status = if resolution.success {
            SyncStatus::Resolved
        } else {
            SyncStatus::Conflict
        };
        result.success = resolution.success;
        result.error = resolution.error.clone();
        result.version = resolution.stored_version.or(result.version);
        result.update = update;
        result.resolution = Some(resolution);
        result.conflict = Some(record);
        result
    }

    /// Look the source up in the caches.
    fn plan(&mut self, pending: Pending) -> Result<Job, SyncResult> {
        let source = pending.paired.source();
        let key = CacheKey::for_file(source, pending.reader.id()).map_err(|e| {
            SyncResult::for_pair(SyncStatus::Failed, &pending.paired)
                .failed(ConversionError::Read(source.to_path_buf(), e))
        })?;

        let input = if let Some(doc) = self.caches.ir.get(&key).hit() {
            Input::Cached(doc)
        } else if let Some(raw) = self.caches.parsed.get(&key).hit() {
            Input::Parsed(raw)
        } else {
            Input::Convert
        };
        Ok(Job {
            pending,
            key,
            input,
        })
    }

    /// Run `to_ir` for every cache miss on the pool.
    fn convert_all(&self, jobs: &[Job]) -> Vec<Option<Result<Value, ConversionError>>> {
        self.pool.install(|| {
            jobs.par_iter()
                .map(|job| match job.input {
                    Input::Convert => Some(job.pending.reader.to_ir(job.pending.paired.source())),
                    Input::Cached(_) | Input::Parsed(_) => None,
                })
                .collect()
        })
    }

    /// Migrate, compare and store one converted change.
    fn commit(
        &mut self,
        job: Job,
        converted: Option<Result<Value, ConversionError>>,
    ) -> (SyncResult, Option<Write>) {
        let Job {
            pending,
            key,
            input,
        } = job;
        let paired = &pending.paired;
        let result = SyncResult::for_pair(SyncStatus::Synced, paired);

        let doc = match (input, converted) {
            // Keyed by content, so the hit may come from another component
            (Input::Cached(mut doc), _) => {
                stamp_source(&mut doc, paired);
                doc
            }
            (Input::Parsed(raw), _) | (Input::Convert, Some(Ok(raw))) => {
                self.caches.parsed.set(key, raw.clone());
                match self.ingest(raw, paired) {
                    Ok(doc) => {
                        self.caches.ir.set(key, doc.clone());
                        doc
                    }
                    Err(e) => {
                        log!("sync"; "{}: {}", paired.logical_id, e);
                        return (result.failed(e), None);
                    }
                }
            }
            (Input::Convert, Some(Err(e))) => {
                log!("sync"; "{}: {}", paired.logical_id, e);
                return (result.failed(e), None);
            }
            (Input::Convert, None) => return (result.failed("conversion did not run"), None),
        };

        let previous = self.store.retrieve(&paired.logical_id, None).cloned();
        if let Some(prev) = &previous
            && !self.content_changed(prev, &doc)
        {
            let result = result.with_version(prev.version);
            if paired.target().exists() {
                debug!("sync"; "{} unchanged", paired.logical_id);
                let mut result = result;
                result.status = SyncStatus::Unchanged;
                return (result, None);
            }
            // Counterpart missing: regenerate it from what is stored
            return (result, Some(self.write_for(&pending, prev.ir.clone())));
        }

        let entry = match self.store.store(&paired.logical_id, doc) {
            Ok(entry) => entry,
            Err(e) => {
                log!("sync"; "{}: {}", paired.logical_id, e);
                return (result.failed(e), None);
            }
        };
        let update = self.update_message(previous.as_ref().map(|p| &p.ir), &entry);
        let write = self.write_for(&pending, entry.ir.clone());
        (
            result.with_version(entry.version).with_update(Some(update)),
            Some(write),
        )
    }

    fn write_for(&self, pending: &Pending, ir: IrDocument) -> Write {
        Write {
            index: pending.index,
            writer: Arc::clone(&pending.writer),
            ir,
            target: pending.paired.target().to_path_buf(),
        }
    }

    /// Run `from_ir` for every regenerated counterpart on the pool.
    fn write_all(&mut self, writes: Vec<Write>, results: &mut [Option<SyncResult>]) {
        let outcomes: Vec<Result<(), ConversionError>> = self.pool.install(|| {
            writes
                .par_iter()
                .map(|w| w.writer.from_ir(&w.ir, &w.target))
                .collect()
        });

        for (write, outcome) in writes.into_iter().zip(outcomes) {
            let Some(result) = results[write.index].as_mut() else {
                continue;
            };
            match outcome {
                Ok(()) => {
                    self.remember_write(&write.target);
                    debug!("sync"; "wrote {}", write.target.display());
                }
                Err(e) => {
                    log!("sync"; "{}", e);
                    result.status = SyncStatus::Failed;
                    result.success = false;
                    result.error = Some(e.to_string());
                }
            }
        }
    }

    /// Test and mock files: tests converter `to_ir` straight into `from_ir`.
    ///
    /// Nothing is cached, stored or pushed to clients.
    fn convert_direct(&mut self, direct: Vec<Pending>, results: &mut [Option<SyncResult>]) {
        if direct.is_empty() {
            return;
        }
        let migrator = &self.migrator;
        let schema = self.store.schema_version();
        let outcomes: Vec<Result<(), String>> = self.pool.install(|| {
            direct
                .par_iter()
                .map(|p| {
                    let raw = p.reader.to_ir(p.paired.source()).map_err(|e| e.to_string())?;
                    let mut doc = migrator
                        .migrate_document(with_source_metadata(raw, &p.paired), schema)
                        .map_err(|e| e.to_string())?;
                    stamp_source(&mut doc, &p.paired);
                    p.writer
                        .from_ir(&doc, p.paired.target())
                        .map_err(|e| e.to_string())
                })
                .collect()
        });

        for (p, outcome) in direct.into_iter().zip(outcomes) {
            let result = SyncResult::for_pair(SyncStatus::Converted, &p.paired);
            results[p.index] = Some(match outcome {
                Ok(()) => {
                    self.remember_write(p.paired.target());
                    debug!("sync"; "converted test file {}", p.paired.logical_id);
                    result
                }
                Err(e) => {
                    log!("sync"; "{}: {}", p.paired.logical_id, e);
                    result.failed(e)
                }
            });
        }
    }

    fn remember_write(&mut self, path: &Path) {
        match hash_file(path) {
            Ok(hash) => {
                self.own_writes.insert(path.to_path_buf(), hash);
            }
            Err(e) => debug!("sync"; "cannot hash {}: {}", path.display(), e),
        }
    }

    /// Turn converter output into a current-version document of `paired`.
    fn ingest(&self, raw: Value, paired: &PairedPath) -> Result<IrDocument, MigrationError> {
        let raw = with_source_metadata(raw, paired);
        let mut doc = self
            .migrator
            .migrate_document(raw, self.store.schema_version())?;
        stamp_source(&mut doc, paired);
        Ok(doc)
    }

    /// Whether `doc` differs from the stored entry in content.
    ///
    /// Which side produced a document is not content: converting the file
    /// the engine just regenerated yields the same IR with the other source.
    fn content_changed(&self, stored: &IrEntry, doc: &IrDocument) -> bool {
        let mut probe = doc.clone();
        probe.metadata.source_representation = stored.ir.metadata.source_representation;
        probe.metadata.source_file = stored.ir.metadata.source_file.clone();
        self.store.has_changed(&stored.logical_id, &probe)
    }

    /// Incremental update when the delta is small, full update otherwise.
    fn update_message(&mut self, previous: Option<&IrDocument>, entry: &IrEntry) -> Message {
        let sequence = self.next_sequence();
        let component = Some(entry.logical_id.clone());

        if let Some(old) = previous {
            let delta = calculate_schema_delta(old, &entry.ir);
            if should_use_incremental_update(&delta, self.settings.incremental_threshold) {
                debug!("sync"; "{}: incremental update #{} ({} changes)", entry.logical_id, sequence, delta.change_count());
                return Message::incremental_update(
                    &self.session_id,
                    delta,
                    sequence,
                    Some(entry.checksum),
                    component,
                );
            }
        }
        debug!("sync"; "{}: full update #{}", entry.logical_id, sequence);
        Message::full_update(&self.session_id, entry.ir.clone(), sequence, component)
    }

    // =========================================================================
    // Client support
    // =========================================================================

    /// Latest IR of `component`, sent with `connected`.
    pub fn initial_schema(&self, component: Option<&str>) -> Option<IrDocument> {
        let id = component?;
        self.store.retrieve(id, None).map(|entry| entry.ir.clone())
    }

    /// Fresh full updates for a resync: one component, or all of them.
    pub fn full_updates_for(&mut self, component: Option<&str>) -> Vec<Message> {
        let ids = match component {
            Some(id) => vec![id.to_owned()],
            None => self.store.list(),
        };
        let mut updates = Vec::with_capacity(ids.len());
        for id in ids {
            let Some(ir) = self.store.retrieve(&id, None).map(|e| e.ir.clone()) else {
                continue;
            };
            let sequence = self.next_sequence();
            updates.push(Message::full_update(&self.session_id, ir, sequence, Some(id)));
        }
        updates
    }

    /// One change per component found on disk, from the newer side.
    ///
    /// Used for the initial sync: picking one side per component keeps the
    /// startup batch free of self-inflicted conflicts.
    pub fn initial_changes(&self) -> Vec<QueuedChange> {
        let mut newest: FxHashMap<String, (Representation, PathBuf, std::time::SystemTime)> =
            FxHashMap::default();

        for rep in [Representation::A, Representation::B] {
            for path in self.pairing.scan(rep) {
                let Some(paired) = self.pairing.pair(&path) else {
                    continue;
                };
                let mtime = std::fs::metadata(&path)
                    .and_then(|m| m.modified())
                    .unwrap_or(std::time::UNIX_EPOCH);
                let replace = newest
                    .get(&paired.logical_id)
                    .is_none_or(|(_, _, seen)| mtime > *seen);
                if replace {
                    newest.insert(paired.logical_id, (rep, path, mtime));
                }
            }
        }

        let mut entries: Vec<_> = newest.into_iter().collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
            .into_iter()
            .map(|(_, (rep, path, _))| {
                QueuedChange::new(FileEvent::new(ChangeKind::Change, path, rep), Priority::Normal)
            })
            .collect()
    }
}

impl std::fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("pairing", &self.pairing)
            .field("converters", &self.converters)
            .field("sequence", &self.sequence)
            .finish_non_exhaustive()
    }
}

/// Keep the newest change of each component, reporting the rest as superseded.
///
/// Ties go to the later change in the batch.
fn latest_per_component(
    pending: Vec<Pending>,
    results: &mut [Option<SyncResult>],
) -> Vec<Pending> {
    let mut slots: FxHashMap<String, usize> = FxHashMap::default();
    let mut kept: Vec<Pending> = Vec::with_capacity(pending.len());
    for p in pending {
        let superseded = match slots.get(&p.paired.logical_id).copied() {
            Some(slot) if p.event.timestamp >= kept[slot].event.timestamp => {
                std::mem::replace(&mut kept[slot], p)
            }
            Some(_) => p,
            None => {
                slots.insert(p.paired.logical_id.clone(), kept.len());
                kept.push(p);
                continue;
            }
        };
        debug!("sync"; "{} superseded in batch", superseded.paired.source().display());
        results[superseded.index] =
            Some(SyncResult::for_pair(SyncStatus::Superseded, &superseded.paired));
    }
    kept
}

/// The document describes the file it was converted from.
fn stamp_source(doc: &mut IrDocument, paired: &PairedPath) {
    doc.metadata.source_representation = paired.representation;
    doc.metadata.source_file = paired.source().to_path_buf();
}

/// Fill in the metadata a converter may leave out.
fn with_source_metadata(mut raw: Value, paired: &PairedPath) -> Value {
    let Some(obj) = raw.as_object_mut() else {
        return raw;
    };
    let metadata = obj
        .entry("metadata")
        .or_insert_with(|| Value::Object(Map::new()));
    if let Some(metadata) = metadata.as_object_mut() {
        metadata
            .entry("sourceRepresentation")
            .or_insert_with(|| json!(paired.representation));
        metadata
            .entry("sourceFile")
            .or_insert_with(|| json!(paired.source()));
        metadata
            .entry("generatedAt")
            .or_insert_with(|| json!(chrono::Utc::now().to_rfc3339()));
    }
    raw
}

// =============================================================================
// Tests
// =============================================================================
