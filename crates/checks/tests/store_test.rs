//! Integration tests for snapshot persistence

use checks::{Check, CheckId, CheckMethod, CheckStore, LoadReport, Payload};
use common::Error;
use serde_json::json;
use tokio_test::{assert_err, assert_ok};

fn sample_check(i: usize) -> Check {
    let mut check = Check::new(
        format!("https://service-{}.example.com/health", i),
        if i % 2 == 0 { CheckMethod::Get } else { CheckMethod::Post },
        None,
    );
    if i % 3 == 0 {
        check.payload = Some(Payload::Json(json!({"probe": i})));
    }
    if i % 4 == 0 {
        check.payload = Some(Payload::Text(format!("ping {}", i)));
    }
    if i % 5 == 0 {
        check.req_time = Some(1_000 + i as i64);
        check.res_time = Some(1_050 + i as i64);
        check.status_code = Some(200);
    }
    if i % 7 == 0 {
        check.req_time = Some(2_000);
        check.res_time = Some(7_000);
        check.err_code = Some("ETIMEDOUT".to_string());
    }
    check
}

#[tokio::test]
async fn test_snapshot_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("checks.json");

    let store = CheckStore::new();
    for i in 0..25 {
        store.insert(CheckId::generate(), sample_check(i)).unwrap();
    }
    assert_ok!(store.snapshot(&path).await);

    let reloaded = CheckStore::new();
    let report = reloaded.load(&path).await.unwrap();

    assert_eq!(report, LoadReport { loaded: 25, skipped: 0 });
    assert_eq!(reloaded.list(), store.list());
}

#[tokio::test]
async fn test_full_table_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("checks.json");

    let store = CheckStore::new();
    for i in 0..store.capacity() {
        store.insert(CheckId::generate(), sample_check(i)).unwrap();
    }
    store.snapshot(&path).await.unwrap();

    let reloaded = CheckStore::new();
    assert_eq!(reloaded.load(&path).await.unwrap().loaded, 100);
    assert_eq!(reloaded.list(), store.list());
}

#[tokio::test]
async fn test_missing_snapshot_is_empty_table() {
    let dir = tempfile::tempdir().unwrap();
    let store = CheckStore::new();
    let report = store.load(dir.path().join("absent.json")).await.unwrap();
    assert_eq!(report, LoadReport::default());
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_empty_snapshot_is_empty_table() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("checks.json");
    std::fs::write(&path, "").unwrap();

    let store = CheckStore::new();
    assert_eq!(store.load(&path).await.unwrap().loaded, 0);
}

#[tokio::test]
async fn test_load_skips_malformed_records() {
    let snapshot = json!({
        "abcdefghijklmnopqrst": {"url": "http://ok.example.com", "method": "GET"},
        "1bcdefghijklmnopqrst": {"url": "http://bad-id.example.com", "method": "GET"},
        "short": {"url": "http://short.example.com", "method": "GET"},
        "bbcdefghijklmnopqrst": {"url": "http://x.example.com", "method": "PATCH"},
        "cbcdefghijklmnopqrst": {"url": "http://x.example.com", "method": "GET", "extra": 1},
        "dbcdefghijklmnopqrst": {"method": "GET"},
        "ebcdefghijklmnopqrst": {
            "url": "http://full.example.com",
            "method": "POST",
            "payload": "hello",
            "req_time": 10,
            "res_time": 20,
            "status_code": 201,
            "err_code": null
        }
    });

    let store = CheckStore::new();
    let report = store.load_str(&snapshot.to_string()).unwrap();

    assert_eq!(report, LoadReport { loaded: 2, skipped: 5 });
    let full = store
        .get(&CheckId::parse("ebcdefghijklmnopqrst").unwrap())
        .unwrap();
    assert_eq!(full.payload, Some(Payload::Text("hello".into())));
    assert_eq!(full.status_code, Some(201));
}

#[tokio::test]
async fn test_load_over_capacity_fails() {
    let source = CheckStore::with_capacity(10);
    for i in 0..10 {
        source.insert(CheckId::generate(), sample_check(i)).unwrap();
    }
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("checks.json");
    source.snapshot(&path).await.unwrap();

    let small = CheckStore::with_capacity(5);
    let err = assert_err!(small.load(&path).await);
    assert!(matches!(err, Error::Capacity(5)));
    assert!(small.is_empty());
}

#[tokio::test]
async fn test_load_rejects_non_object() {
    let store = CheckStore::new();
    assert!(matches!(store.load_str("[1, 2, 3]"), Err(Error::Persistence(_))));
    assert!(matches!(store.load_str("{not json"), Err(Error::Persistence(_))));
}

#[tokio::test]
async fn test_snapshot_failure_leaves_table_untouched() {
    let dir = tempfile::tempdir().unwrap();
    // A regular file where a directory is expected.
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, "").unwrap();

    let store = CheckStore::new();
    let id = CheckId::generate();
    store.insert(id.clone(), sample_check(1)).unwrap();

    let err = assert_err!(store.snapshot(blocker.join("checks.json")).await);
    assert!(matches!(err, Error::Persistence(_)));
    assert_eq!(store.len(), 1);
    assert_eq!(store.get(&id), Some(sample_check(1)));
}

#[tokio::test]
async fn test_snapshot_creates_parent_directories() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join(".data").join("checks.json");

    let store = CheckStore::new();
    store.insert(CheckId::generate(), sample_check(2)).unwrap();
    assert_ok!(store.snapshot(&path).await);
    assert!(path.exists());
    assert!(!path.with_file_name("checks.json.tmp").exists());
}
