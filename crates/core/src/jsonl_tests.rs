// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use serde::{Deserialize, Serialize};
use tempfile::TempDir;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct TestRecord {
    id: u32,
    name: String,
}

fn record(id: u32, name: &str) -> TestRecord {
    TestRecord {
        id,
        name: name.into(),
    }
}

#[test]
fn append_creates_file_if_missing() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("test.jsonl");

    append(&path, &record(1, "first")).unwrap();

    assert!(path.exists());
}

#[test]
fn read_all_returns_empty_for_missing_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("missing.jsonl");

    let records: Vec<TestRecord> = read_all(&path).unwrap();
    assert!(records.is_empty());
}

#[test]
fn append_preserves_order() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("test.jsonl");

    append(&path, &record(1, "first")).unwrap();
    append(&path, &record(2, "second")).unwrap();
    append(&path, &record(3, "third")).unwrap();

    let records: Vec<TestRecord> = read_all(&path).unwrap();
    let ids: Vec<u32> = records.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
}

#[test]
fn read_all_skips_empty_lines() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("test.jsonl");

    std::fs::write(
        &path,
        "{\"id\":1,\"name\":\"a\"}\n\n   \n{\"id\":2,\"name\":\"b\"}\n",
    )
    .unwrap();

    let records: Vec<TestRecord> = read_all(&path).unwrap();
    assert_eq!(records.len(), 2);
}

#[test]
fn read_all_reports_corrupted_line_number() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("test.jsonl");

    std::fs::write(&path, "{\"id\":1,\"name\":\"a\"}\n{\"id\":\n").unwrap();

    let err = read_all::<TestRecord>(&path).unwrap_err();
    assert!(matches!(err, Error::CorruptedRecord { line: 2, .. }));
}

#[test]
fn write_all_replaces_content() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("test.jsonl");

    append(&path, &record(1, "old")).unwrap();
    write_all(&path, &[record(2, "new"), record(3, "newer")]).unwrap();

    let records: Vec<TestRecord> = read_all(&path).unwrap();
    assert_eq!(records, vec![record(2, "new"), record(3, "newer")]);
}

#[test]
fn write_all_leaves_no_temp_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("test.jsonl");

    write_all(&path, &[record(1, "a")]).unwrap();

    assert!(!dir.path().join("test.jsonl.tmp").exists());
}

#[test]
fn write_all_empty_truncates() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("test.jsonl");

    append(&path, &record(1, "a")).unwrap();
    write_all::<TestRecord>(&path, &[]).unwrap();

    let records: Vec<TestRecord> = read_all(&path).unwrap();
    assert!(records.is_empty());
}

#[test]
fn read_recovering_drops_unterminated_torn_line() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("test.jsonl");

    append(&path, &record(1, "a")).unwrap();
    let mut content = std::fs::read_to_string(&path).unwrap();
    content.push_str("{\"id\":2,\"na");
    std::fs::write(&path, content).unwrap();

    let recovered: Recovered<TestRecord> = read_recovering(&path).unwrap();
    assert_eq!(recovered.records, vec![record(1, "a")]);
    assert_eq!(recovered.torn_tail.as_deref(), Some("{\"id\":2,\"na"));
}

#[test]
fn read_recovering_keeps_unterminated_valid_line() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("test.jsonl");

    std::fs::write(&path, "{\"id\":1,\"name\":\"a\"}\n{\"id\":2,\"name\":\"b\"}").unwrap();

    let recovered: Recovered<TestRecord> = read_recovering(&path).unwrap();
    assert_eq!(recovered.records, vec![record(1, "a"), record(2, "b")]);
    assert_eq!(recovered.torn_tail, None);
}

#[test]
fn read_recovering_rejects_bad_terminated_lines() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("test.jsonl");

    // terminated last line
    std::fs::write(&path, "{\"id\":1,\"name\":\"a\"}\n{\"id\":\n").unwrap();
    let err = read_recovering::<TestRecord>(&path).unwrap_err();
    assert!(matches!(err, Error::CorruptedRecord { line: 2, .. }));

    // bad line in the middle, torn line at the end
    std::fs::write(&path, "{\"id\":\n{\"id\":1,\"name\":\"a\"}\n{\"id\"").unwrap();
    let err = read_recovering::<TestRecord>(&path).unwrap_err();
    assert!(matches!(err, Error::CorruptedRecord { line: 1, .. }));
}

#[test]
fn read_recovering_returns_empty_for_missing_file() {
    let dir = TempDir::new().unwrap();

    let recovered: Recovered<TestRecord> =
        read_recovering(&dir.path().join("missing.jsonl")).unwrap();
    assert!(recovered.records.is_empty());
    assert_eq!(recovered.torn_tail, None);
}
