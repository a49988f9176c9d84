use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio::sync::mpsc;

use super::classifier::{EventClassifier, change_kind, correct_by_existence, is_temp_file};
use super::dispatch;
use crate::actor::messages::SyncMsg;
use crate::core::{Priority, Representation};
use crate::engine::PathPairing;
use crate::queue::{ChangeKind, ChangeQueue, FileEvent};
use crate::reload::ActiveComponents;

fn make_event<P: AsRef<Path>>(paths: &[P], kind: notify::EventKind) -> notify::Event {
    notify::Event {
        kind,
        paths: paths.iter().map(|p| p.as_ref().to_path_buf()).collect(),
        attrs: Default::default(),
    }
}

fn modify_kind() -> notify::EventKind {
    notify::EventKind::Modify(notify::event::ModifyKind::Data(
        notify::event::DataChange::Any,
    ))
}

fn remove_kind() -> notify::EventKind {
    notify::EventKind::Remove(notify::event::RemoveKind::File)
}

fn setup() -> (TempDir, PathPairing, Arc<ActiveComponents>) {
    let temp = TempDir::new().unwrap();
    let a = temp.path().join("a");
    let b = temp.path().join("b");
    std::fs::create_dir_all(&a).unwrap();
    std::fs::create_dir_all(&b).unwrap();
    let pairing = PathPairing::new(a, "dart", b, "tsx");
    (temp, pairing, Arc::new(ActiveComponents::new()))
}

#[test]
fn test_change_kind_mapping() {
    use notify::event::{CreateKind, MetadataKind, ModifyKind};
    use notify::EventKind;

    assert_eq!(
        change_kind(&EventKind::Create(CreateKind::File)),
        Some(ChangeKind::Create)
    );
    assert_eq!(change_kind(&modify_kind()), Some(ChangeKind::Change));
    assert_eq!(change_kind(&remove_kind()), Some(ChangeKind::Delete));
    assert_eq!(
        change_kind(&EventKind::Modify(ModifyKind::Metadata(MetadataKind::WriteTime))),
        None
    );
    assert_eq!(change_kind(&EventKind::Any), None);
}

#[test]
fn test_temp_files() {
    assert!(is_temp_file(Path::new("/a/home.dart.swp")));
    assert!(is_temp_file(Path::new("/a/home.dart~")));
    assert!(is_temp_file(Path::new("/a/.home.dart")));
    assert!(is_temp_file(Path::new("/a/home.dart.20260101T000000000Z.backup")));
    assert!(!is_temp_file(Path::new("/a/home.dart")));
}

#[test]
fn test_correct_by_existence() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("home.dart");
    std::fs::write(&file, "").unwrap();
    let gone = temp.path().join("gone.dart");

    assert_eq!(correct_by_existence(&file, ChangeKind::Delete), Some(ChangeKind::Change));
    assert_eq!(correct_by_existence(&gone, ChangeKind::Change), Some(ChangeKind::Delete));
    assert_eq!(correct_by_existence(&gone, ChangeKind::Delete), Some(ChangeKind::Delete));
    assert_eq!(correct_by_existence(temp.path(), ChangeKind::Change), None);
}

#[test]
fn test_classify_pairs_and_filters() {
    let (temp, pairing, active) = setup();
    let home = temp.path().join("a/home.dart");
    let card = temp.path().join("b/card.tsx");
    let stray = temp.path().join("a/readme.md");
    for path in [&home, &card, &stray] {
        std::fs::write(path, "").unwrap();
    }

    let classifier = EventClassifier::new(pairing, active);
    let events = classifier.classify(
        &make_event(&[&home, &card, &stray], modify_kind()),
        42,
    );

    assert_eq!(events.len(), 2);
    let (first, priority) = &events[0];
    assert_eq!(first.file_path, home);
    assert_eq!(first.representation, Representation::A);
    assert_eq!(first.timestamp, 42);
    assert_eq!(*priority, Priority::Normal);
    assert_eq!(events[1].0.representation, Representation::B);
}

#[test]
fn test_classify_priority() {
    let (temp, pairing, active) = setup();
    let home = temp.path().join("a/home.dart");
    let test = temp.path().join("a/home_test.dart");
    std::fs::write(&home, "").unwrap();
    std::fs::write(&test, "").unwrap();
    active.add("home");

    let classifier = EventClassifier::new(pairing, active);
    let events = classifier.classify(&make_event(&[&home, &test], modify_kind()), 0);
    assert_eq!(events[0].1, Priority::High);
    assert_eq!(events[1].1, Priority::Low);
}

#[test]
fn test_classify_remove_of_missing_file() {
    let (temp, pairing, active) = setup();
    let gone = temp.path().join("b/gone.tsx");

    let classifier = EventClassifier::new(pairing, active);
    let events = classifier.classify(&make_event(&[&gone], remove_kind()), 0);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].0.kind, ChangeKind::Delete);
}

#[tokio::test]
async fn test_dispatch_sends_quiet_batch() {
    let (tx, mut rx) = mpsc::channel(4);
    let mut queue = ChangeQueue::new();
    let window = Duration::from_millis(50);

    queue.enqueue_at(
        FileEvent::at(ChangeKind::Change, "/a/old.dart", Representation::A, 0),
        Priority::Normal,
        0,
    );
    queue.enqueue(
        FileEvent::new(ChangeKind::Change, "/a/fresh.dart", Representation::A),
        Priority::Normal,
    );

    dispatch(&mut queue, window, &tx).await.unwrap();
    let Some(SyncMsg::Changes(batch)) = rx.recv().await else {
        panic!("expected a batch");
    };
    assert_eq!(batch.len(), 1);
    assert_eq!(batch[0].event.file_path, PathBuf::from("/a/old.dart"));
    assert_eq!(queue.len(), 1);
}

#[tokio::test]
async fn test_dispatch_fails_when_sync_actor_gone() {
    let (tx, rx) = mpsc::channel(1);
    drop(rx);
    let mut queue = ChangeQueue::new();
    queue.enqueue_at(
        FileEvent::at(ChangeKind::Change, "/a/home.dart", Representation::A, 0),
        Priority::Normal,
        0,
    );
    assert!(dispatch(&mut queue, Duration::ZERO, &tx).await.is_err());
}
