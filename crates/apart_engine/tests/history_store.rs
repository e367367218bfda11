use std::fs;

use apart_core::{FinishedJob, Message};
use apart_engine::{HistoryError, HistoryStore};
use chrono::{TimeDelta, TimeZone, Utc};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn init_logging() {
    apart_logging::initialize_for_tests();
}

fn finished_clone(id: &str, minutes: i64) -> FinishedJob {
    let start = Utc.with_ymd_and_hms(2017, 5, 3, 10, 0, 0).unwrap();
    FinishedJob::from_message(
        Message::build("clone")
            .field("id", id)
            .field("source", "/dev/sda1")
            .field(
                "destination",
                format!("/mnt/b/{id}-2017-05-03T1000.apt.ext4.gz"),
            )
            .field("start", start)
            .field("finish", start + TimeDelta::minutes(minutes))
            .field("complete", 1.0)
            .finish(),
    )
    .unwrap()
}

#[test]
fn missing_file_is_empty_history() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let store = HistoryStore::new(temp.path().join("history.yaml"));
    assert!(store.load().unwrap().is_empty());
}

#[test]
fn save_creates_directory_and_load_restores_records() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("apart-gtk").join("history.yaml");
    let store = HistoryStore::new(&path);
    let jobs = vec![finished_clone("b", 20), finished_clone("a", 10)];

    store.save(&jobs).unwrap();
    assert!(path.is_file());

    let loaded = store.load().unwrap();
    assert_eq!(loaded, jobs);
}

#[test]
fn corrupt_entries_are_skipped() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("history.yaml");
    let text = "\
- type: clone
  id: '1'
  source: /dev/sda1
  destination: /mnt/b/a-2017-05-03T1000.apt.ext4.gz
  start: 2017-05-03T10:00:00
  finish: 2017-05-03T10:05:00
- type: clone
  id: '2'
  source: /dev/sda1
- just a string
- type: restore-failed
  id: '3'
  source: /mnt/b/a-2017-05-03T1000.apt.ext4.gz
  destination: /dev/sdb1
  start: 2017-05-03T11:00:00Z
  finish: 2017-05-03T11:00:02Z
  error: No space left
";
    fs::write(&path, text).unwrap();

    let loaded = HistoryStore::new(&path).load().unwrap();
    let ids: Vec<_> = loaded.iter().map(FinishedJob::id).collect();
    assert_eq!(ids, vec!["1", "3"]);
    // Offset-less timestamps from the file are taken as UTC.
    assert_eq!(
        loaded[0].finish(),
        Utc.with_ymd_and_hms(2017, 5, 3, 10, 5, 0).unwrap()
    );
    assert_eq!(loaded[1].error(), Some("No space left"));
}

#[test]
fn unparseable_file_is_an_error() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("history.yaml");
    fs::write(&path, "type: clone\n").unwrap();
    assert!(matches!(
        HistoryStore::new(&path).load(),
        Err(HistoryError::Parse { .. })
    ));
}

#[test]
fn save_overwrites_previous_history() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let store = HistoryStore::new(temp.path().join("history.yaml"));
    store.save(&[finished_clone("a", 1), finished_clone("b", 2)]).unwrap();
    store.save(&[finished_clone("c", 3)]).unwrap();

    let ids: Vec<_> = store
        .load()
        .unwrap()
        .iter()
        .map(|job| job.id().to_owned())
        .collect();
    assert_eq!(ids, vec!["c"]);
}

#[test]
fn save_leaves_only_the_history_file_behind() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let store = HistoryStore::new(temp.path().join("history.yaml"));
    store.save(&[finished_clone("a", 1)]).unwrap();
    store.save(&[finished_clone("b", 2)]).unwrap();

    let names: Vec<_> = fs::read_dir(temp.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["history.yaml"]);
}

#[test]
fn failed_save_keeps_previous_history() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("history.yaml");
    let store = HistoryStore::new(&path);
    store.save(&[finished_clone("a", 1)]).unwrap();

    let blocker = temp.path().join("not-a-dir");
    fs::write(&blocker, "x").unwrap();
    let nested = HistoryStore::new(blocker.join("history.yaml"));
    assert!(matches!(
        nested.save(&[finished_clone("c", 3)]),
        Err(HistoryError::Write { .. })
    ));
    assert_eq!(fs::read_to_string(&blocker).unwrap(), "x");

    let ids: Vec<_> = store
        .load()
        .unwrap()
        .iter()
        .map(|job| job.id().to_owned())
        .collect();
    assert_eq!(ids, vec!["a"]);
}
