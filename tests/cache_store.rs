//! Integration tests for the persistent cache
//!
//! Exercises the store across separate instances against the same backing
//! file, the way separate process runs would see it.

use serde_json::{json, Value};
use tempfile::TempDir;

use tmslack::cache::{CacheError, CacheStore};

#[test]
fn test_values_survive_reopening() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let path = temp_dir.path().join("teams.json");

    let mut store = CacheStore::open(&path).expect("Open should succeed");
    store
        .set("xoxb-42", json!({"team_id": "T123", "team": "Example"}))
        .expect("Set should succeed");
    store
        .set("count", json!(17))
        .expect("Set should succeed");
    drop(store);

    let reopened = CacheStore::open(&path).expect("Reopen should succeed");
    assert_eq!(
        reopened.get("xoxb-42"),
        Some(&json!({"team_id": "T123", "team": "Example"}))
    );
    assert_eq!(reopened.get("count"), Some(&json!(17)));
}

#[test]
fn test_each_write_replaces_the_whole_file() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let path = temp_dir.path().join("users.json");

    let mut first = CacheStore::open(&path).expect("Open should succeed");
    first.set("dan", json!("U123")).expect("Set should succeed");

    let mut second = CacheStore::open(&path).expect("Reopen should succeed");
    second.set("alice", json!("U456")).expect("Set should succeed");

    let third = CacheStore::open(&path).expect("Reopen should succeed");
    assert_eq!(third.get("dan"), Some(&json!("U123")));
    assert_eq!(third.get("alice"), Some(&json!("U456")));
}

#[test]
fn test_stores_partition_by_backing_file() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");

    let mut teams = CacheStore::open(temp_dir.path().join("teams.json"))
        .expect("Open should succeed");
    let mut users = CacheStore::open(temp_dir.path().join("T123.json"))
        .expect("Open should succeed");

    teams.set("token", json!("T123")).expect("Set should succeed");
    users.set("dan", json!("U123")).expect("Set should succeed");

    assert!(!CacheStore::open(temp_dir.path().join("teams.json"))
        .expect("Reopen should succeed")
        .contains_key("dan"));
    assert!(!CacheStore::open(temp_dir.path().join("T123.json"))
        .expect("Reopen should succeed")
        .contains_key("token"));
}

#[test]
fn test_lookup_lifecycle_across_runs() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let path = temp_dir.path().join("users.json");

    // First run: the name cannot be resolved, so nothing is written
    let mut store = CacheStore::open(&path).expect("Open should succeed");
    let miss: Result<Option<Value>, CacheError> = store.get_or_compute("dan", |_| Ok(None));
    assert_eq!(miss.expect("Lookup should succeed"), None);
    drop(store);

    // Second run: the lookup succeeds and the result is persisted
    let mut store = CacheStore::open(&path).expect("Reopen should succeed");
    assert!(!store.contains_key("dan"));
    let hit: Result<Option<Value>, CacheError> =
        store.get_or_compute("dan", |_| Ok(Some(json!("U123"))));
    assert_eq!(hit.expect("Lookup should succeed"), Some(json!("U123")));
    drop(store);

    // Third run: the cached value is served without invoking the supplier
    let mut store = CacheStore::open(&path).expect("Reopen should succeed");
    let cached: Result<Option<Value>, CacheError> = store.get_or_compute("dan", |_| {
        panic!("supplier must not run on a hit");
    });
    assert_eq!(cached.expect("Lookup should succeed"), Some(json!("U123")));
}
