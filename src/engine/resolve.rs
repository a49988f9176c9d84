//! Applying conflict resolutions.

use std::path::PathBuf;

use thiserror::Error;

use super::{EngineError, SyncEngine};
use crate::conflict::{ConflictRecord, ResolutionResult, ResolutionStrategy, backup_file};
use crate::converter::ConversionError;
use crate::core::Representation;
use crate::ir::MigrationError;
use crate::reload::Message;
use crate::store::StoreError;
use crate::{debug, log};

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("cannot back up `{0}`")]
    Backup(PathBuf, #[source] std::io::Error),

    #[error("winning file `{0}` does not exist")]
    MissingWinner(PathBuf),

    #[error("no converter for test file `{0}`")]
    Disabled(PathBuf),

    #[error(transparent)]
    Conversion(#[from] ConversionError),

    #[error(transparent)]
    Migration(#[from] MigrationError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl SyncEngine {
    /// Resolve a recorded conflict.
    ///
    /// Returns the resolution and, for `use-a` / `use-b`, the full update
    /// carrying the winning IR.
    pub fn resolve_conflict(
        &mut self,
        conflict_id: &str,
        strategy: ResolutionStrategy,
    ) -> Result<(ResolutionResult, Option<Message>), EngineError> {
        let record = self
            .detector
            .get(conflict_id)
            .cloned()
            .ok_or_else(|| EngineError::UnknownConflict(conflict_id.to_owned()))?;
        if record.resolved {
            return Err(EngineError::AlreadyResolved(conflict_id.to_owned()));
        }
        Ok(self.apply_strategy(&record, strategy))
    }

    /// Resolve whatever conflict `logical_id` has.
    ///
    /// Without a recorded conflict (a fresh process) the strategy is applied
    /// to the component's current files all the same.
    pub fn resolve_component(
        &mut self,
        logical_id: &str,
        strategy: ResolutionStrategy,
    ) -> (ResolutionResult, Option<Message>) {
        let record = match self.detector.unresolved_for(logical_id) {
            Some(record) => record.clone(),
            None => {
                let now = crate::utils::time::now_ms();
                ConflictRecord {
                    id: uuid::Uuid::new_v4().to_string(),
                    logical_id: logical_id.to_owned(),
                    file_a: self.pairing.path_for(logical_id, Representation::A),
                    file_b: self.pairing.path_for(logical_id, Representation::B),
                    timestamp_a: now,
                    timestamp_b: now,
                    ir_version_at_detection: self.store.current_version(logical_id),
                    detected_at: chrono::Utc::now(),
                    resolved: false,
                }
            }
        };
        self.apply_strategy(&record, strategy)
    }

    pub(super) fn apply_strategy(
        &mut self,
        record: &ConflictRecord,
        strategy: ResolutionStrategy,
    ) -> (ResolutionResult, Option<Message>) {
        let mut result = ResolutionResult::new(&record.id, strategy);

        let update = match strategy {
            ResolutionStrategy::UseA | ResolutionStrategy::UseB => {
                let winner = match strategy.winner() {
                    Some(rep) => rep,
                    None => return (result.failed("strategy has no winner"), None),
                };
                match self.take_side(record, winner, &mut result) {
                    Ok(update) => Some(update),
                    Err(e) => {
                        log!("conflict"; "{}: {} failed: {}", record.logical_id, strategy.label(), e);
                        return (result.failed(e.to_string()), None);
                    }
                }
            }
            ResolutionStrategy::ManualMerge => {
                for path in [&record.file_a, &record.file_b] {
                    match backup_file(path) {
                        Ok(backup) => result.backups.extend(backup),
                        Err(e) => {
                            let e = ResolveError::Backup(path.clone(), e);
                            return (result.failed(e.to_string()), None);
                        }
                    }
                }
                result.needs_manual_edit = true;
                None
            }
            ResolutionStrategy::Skip => None,
        };

        result.success = true;
        self.detector.resolve_conflict(&record.id);
        log!("conflict"; "{}: resolved with {}", record.logical_id, strategy.label());
        (result, update)
    }

    /// Make `winner` authoritative: store its IR and regenerate the other file.
    fn take_side(
        &mut self,
        record: &ConflictRecord,
        winner: Representation,
        result: &mut ResolutionResult,
    ) -> Result<Message, ResolveError> {
        let paired = self.pairing.component(&record.logical_id, winner);
        let source = paired.source().to_path_buf();
        let target = paired.target().to_path_buf();
        if !source.is_file() {
            return Err(ResolveError::MissingWinner(source));
        }
        let (reader, writer) = self
            .converters_for(&paired)
            .ok_or_else(|| ResolveError::Disabled(source.clone()))?;

        let backup = backup_file(&target).map_err(|e| ResolveError::Backup(target.clone(), e))?;
        result.backups.extend(backup);

        let raw = reader.to_ir(&source)?;
        let doc = self.ingest(raw, &paired)?;
        let entry = self.store.store(&record.logical_id, doc)?;
        result.stored_version = Some(entry.version);

        writer.from_ir(&entry.ir, &target)?;
        self.remember_write(&target);
        self.own_writes.remove(&source);
        result.files_regenerated.set(winner.other(), target);
        debug!("conflict"; "{} v{} from {}", record.logical_id, entry.version, winner);

        let sequence = self.next_sequence();
        Ok(Message::full_update(
            &self.session_id,
            entry.ir,
            sequence,
            Some(record.logical_id.clone()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::Fixture;
    use super::*;
    use crate::reload::UpdatePayload;
    use serde_json::json;
    use std::fs;

    fn conflicted() -> (Fixture, String) {
        let mut fx = Fixture::new();
        fx.write(Representation::A, "home", json!([{ "id": "t", "type": "Text", "props": { "v": "a" } }]));
        fx.write(Representation::B, "home", json!([{ "id": "t", "type": "Text", "props": { "v": "b" } }]));
        let changes = vec![
            fx.change(Representation::A, "home", 1_000),
            fx.change(Representation::B, "home", 1_200),
        ];
        let results = fx.engine.process_changes(&changes);
        let id = results[1].conflict.as_ref().unwrap().id.clone();
        (fx, id)
    }

    #[test]
    fn test_use_a_regenerates_b() {
        let (mut fx, id) = conflicted();
        let (result, update) = fx
            .engine
            .resolve_conflict(&id, ResolutionStrategy::UseA)
            .unwrap();

        assert!(result.success, "{:?}", result.error);
        assert_eq!(
            result.files_regenerated.b.as_deref(),
            Some(fx.path(Representation::B, "home").as_path())
        );
        assert!(result.files_regenerated.a.is_none());
        assert_eq!(result.backups.len(), 1);
        assert!(result.backups[0].is_file());
        assert_eq!(result.stored_version, Some(1));

        let entry = fx.engine.store().retrieve("home", None).unwrap();
        assert_eq!(entry.ir.metadata.source_representation, Representation::A);
        assert_eq!(entry.ir.nodes[0].props["v"], "a");
        let b = fs::read_to_string(fx.path(Representation::B, "home")).unwrap();
        assert!(b.contains("\"a\""));

        assert!(matches!(
            update.as_ref().and_then(Message::as_update),
            Some(UpdatePayload::Full { .. })
        ));
        assert!(!fx.engine.detector().has_unresolved("home"));
    }

    #[test]
    fn test_resolution_unblocks_component() {
        let (mut fx, id) = conflicted();
        fx.engine
            .resolve_conflict(&id, ResolutionStrategy::UseB)
            .unwrap();

        // The regenerated A file is the engine's own write
        let echo = fx.sync_one(fx.change(Representation::A, "home", 1_300));
        assert_eq!(echo.status, super::super::SyncStatus::Unchanged);

        fx.write(Representation::A, "home", json!([{ "id": "t", "type": "Text", "props": { "v": "c" } }]));
        let result = fx.sync_one(fx.change(Representation::A, "home", 9_000));
        assert_eq!(result.status, super::super::SyncStatus::Synced);
        assert_eq!(result.version, Some(2));
    }

    #[test]
    fn test_manual_merge_backs_up_both() {
        let (mut fx, id) = conflicted();
        let (result, update) = fx
            .engine
            .resolve_conflict(&id, ResolutionStrategy::ManualMerge)
            .unwrap();
        assert!(result.success);
        assert!(result.needs_manual_edit);
        assert_eq!(result.backups.len(), 2);
        assert!(update.is_none());
        assert!(fx.engine.store().retrieve("home", None).is_none());
    }

    #[test]
    fn test_skip_and_double_resolve() {
        let (mut fx, id) = conflicted();
        let (result, _) = fx
            .engine
            .resolve_conflict(&id, ResolutionStrategy::Skip)
            .unwrap();
        assert!(result.success);
        assert!(result.backups.is_empty());

        let again = fx.engine.resolve_conflict(&id, ResolutionStrategy::Skip);
        assert!(matches!(again, Err(EngineError::AlreadyResolved(_))));
        let unknown = fx.engine.resolve_conflict("nope", ResolutionStrategy::Skip);
        assert!(matches!(unknown, Err(EngineError::UnknownConflict(_))));
    }

    #[test]
    fn test_resolve_component_without_record() {
        let mut fx = Fixture::new();
        fx.write(Representation::B, "card", json!([{ "id": "x", "type": "Box" }]));

        let (result, update) = fx
            .engine
            .resolve_component("card", ResolutionStrategy::UseB);
        assert!(result.success, "{:?}", result.error);
        assert!(fx.path(Representation::A, "card").is_file());
        assert!(result.backups.is_empty());
        assert!(update.is_some());
    }

    #[test]
    fn test_use_missing_winner_fails() {
        let mut fx = Fixture::new();
        fx.write(Representation::B, "card", json!([]));
        let (result, update) = fx
            .engine
            .resolve_component("card", ResolutionStrategy::UseA);
        assert!(!result.success);
        assert!(result.error.unwrap().contains("does not exist"));
        assert!(update.is_none());
    }
}
