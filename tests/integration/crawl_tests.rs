//! Integration tests for scanning
//!
//! These tests run full scans against a mock listing API and check what
//! ends up in the database.

use crate::support::{client, file_json, folder_json, page_json, test_config, TOKEN};
use cloudsweep::crawler::{self, CrawlError};
use cloudsweep::remote::RemoteError;
use cloudsweep::storage::{CheckpointStore, InventoryStore, SqliteStorage};
use cloudsweep::SweepError;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::path::Path;
use tempfile::TempDir;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LIST: &str = "/2/files/list_folder";
const CONTINUE: &str = "/2/files/list_folder/continue";

fn numbered_page(page: usize, per_page: usize) -> Vec<Value> {
    (0..per_page)
        .map(|i| {
            let path = format!("/Archive/p{}/f{}.dat", page, i);
            file_json(&path, 100, &format!("h{}-{}", page, i))
        })
        .collect()
}

async fn mount_first(server: &MockServer, body: Value) {
    Mock::given(method("POST"))
        .and(path(LIST))
        .and(header("authorization", format!("Bearer {}", TOKEN).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

async fn mount_continue(server: &MockServer, cursor: &str, response: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path(CONTINUE))
        .and(body_partial_json(json!({ "cursor": cursor })))
        .respond_with(response)
        .mount(server)
        .await;
}

fn open(db: &Path) -> SqliteStorage {
    SqliteStorage::new(db).expect("database should open")
}

#[tokio::test]
async fn test_scan_records_inventory() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = test_config(&server, dir.path(), 10_000, "");
    let db = dir.path().join("sweep.db");

    mount_first(
        &server,
        page_json(
            vec![
                folder_json("/Photos"),
                file_json("/Photos/a.jpg", 10, "h1"),
                json!({".tag": "deleted", "name": "gone.txt", "path_display": "/gone.txt"}),
            ],
            "c1",
            true,
        ),
    )
    .await;
    let mut undated = file_json("/notes.txt", 3, "h2");
    undated["client_modified"] = json!("last tuesday");
    mount_continue(
        &server,
        "c1",
        ResponseTemplate::new(200).set_body_json(page_json(
            vec![file_json("/Photos/b.jpg", 20, "h1"), undated],
            "c2",
            false,
        )),
    )
    .await;

    let outcome = crawler::scan(client(&config), open(&db), &config, "hash", false, None)
        .await
        .unwrap();
    assert_eq!(outcome.files, 3);
    assert_eq!(outcome.folders, 1);
    assert_eq!(outcome.pages_fetched, 2);
    assert!(!outcome.resumed);

    let storage = open(&db);
    let scan = storage.get_latest_scan().unwrap().unwrap();
    assert_eq!(scan.id, outcome.scan_id);
    assert_eq!(scan.total_bytes, 33);
    assert_eq!(scan.config_hash, "hash");

    let entries = storage.load_entries(scan.id).unwrap();
    let paths: Vec<&str> = entries.iter().map(|e| e.path.as_str()).collect();
    assert_eq!(paths, vec!["/Photos/a.jpg", "/Photos/b.jpg", "/notes.txt"]);
    assert!(entries[0].modified_at.is_some());
    assert!(entries[2].modified_at.is_none());
    assert_eq!(entries[2].content_hash.as_deref(), Some("h2"));
    assert!(storage.load_checkpoint().unwrap().is_none());
}

#[tokio::test]
async fn test_scan_resumes_after_server_failure() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = test_config(&server, dir.path(), 3, "");
    let db = dir.path().join("sweep.db");

    // Pages P1..P5 of 3 files each; P4 fails on the first run
    mount_first(&server, page_json(numbered_page(1, 3), "c1", true)).await;
    for p in 2..=3 {
        mount_continue(
            &server,
            &format!("c{}", p - 1),
            ResponseTemplate::new(200).set_body_json(page_json(
                numbered_page(p, 3),
                &format!("c{}", p),
                true,
            )),
        )
        .await;
    }
    mount_continue(&server, "c3", ResponseTemplate::new(503)).await;

    let err = crawler::scan(client(&config), open(&db), &config, "hash", false, None)
        .await
        .unwrap_err();
    match err {
        SweepError::Crawl(CrawlError::Fetch {
            entries, resumable, ..
        }) => {
            assert_eq!(entries, 9);
            assert!(resumable);
        }
        other => panic!("expected fetch error, got {:?}", other),
    }

    let state = open(&db).load_checkpoint().unwrap().unwrap();
    assert_eq!(state.checkpoint.cursor, "c3");
    assert_eq!(state.entries.len(), 9);

    // Second run: the listing recovers and must resume from c3
    server.reset().await;
    Mock::given(method("POST"))
        .and(path(LIST))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;
    mount_continue(
        &server,
        "c3",
        ResponseTemplate::new(200).set_body_json(page_json(numbered_page(4, 3), "c4", true)),
    )
    .await;
    mount_continue(
        &server,
        "c4",
        ResponseTemplate::new(200).set_body_json(page_json(numbered_page(5, 3), "c5", false)),
    )
    .await;

    let outcome = crawler::scan(client(&config), open(&db), &config, "hash", false, None)
        .await
        .unwrap();
    assert!(outcome.resumed);
    assert_eq!(outcome.pages_fetched, 2);
    assert_eq!(outcome.files, 15);

    let storage = open(&db);
    let entries = storage.load_entries(outcome.scan_id).unwrap();
    let unique: HashSet<&str> = entries.iter().map(|e| e.path.as_str()).collect();
    assert_eq!(unique.len(), 15);
    assert_eq!(entries[0].path, "/Archive/p1/f0.dat");
    assert_eq!(entries[14].path, "/Archive/p5/f2.dat");
    assert!(storage.load_checkpoint().unwrap().is_none());
}

#[tokio::test]
async fn test_fresh_scan_ignores_checkpoint() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = test_config(&server, dir.path(), 1, "");
    let db = dir.path().join("sweep.db");

    mount_first(&server, page_json(numbered_page(1, 2), "c1", true)).await;
    mount_continue(&server, "c1", ResponseTemplate::new(503)).await;
    assert!(crawler::scan(client(&config), open(&db), &config, "hash", false, None)
        .await
        .is_err());
    assert!(open(&db).load_checkpoint().unwrap().is_some());

    server.reset().await;
    mount_first(&server, page_json(numbered_page(7, 4), "z1", false)).await;

    let outcome = crawler::scan(client(&config), open(&db), &config, "hash", true, None)
        .await
        .unwrap();
    assert!(!outcome.resumed);
    assert_eq!(outcome.files, 4);
}

#[tokio::test]
async fn test_throttled_page_is_retried() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = test_config(&server, dir.path(), 100, "");
    let db = dir.path().join("sweep.db");

    mount_first(&server, page_json(numbered_page(1, 1), "c1", true)).await;
    Mock::given(method("POST"))
        .and(path(CONTINUE))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("Retry-After", "0")
                .set_body_json(json!({"error_summary": "too_many_requests/"})),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_continue(
        &server,
        "c1",
        ResponseTemplate::new(200).set_body_json(page_json(numbered_page(2, 1), "c2", false)),
    )
    .await;

    let outcome = crawler::scan(client(&config), open(&db), &config, "hash", false, None)
        .await
        .unwrap();
    assert_eq!(outcome.files, 2);
}

#[tokio::test]
async fn test_missing_root_is_not_resumable() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = test_config(&server, dir.path(), 100, "");
    let db = dir.path().join("sweep.db");

    Mock::given(method("POST"))
        .and(path(LIST))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "error_summary": "path/not_found/..",
            "error": {".tag": "path", "path": {".tag": "not_found"}}
        })))
        .mount(&server)
        .await;

    let err = crawler::scan(client(&config), open(&db), &config, "hash", false, None)
        .await
        .unwrap_err();
    match err {
        SweepError::Crawl(CrawlError::Fetch {
            resumable, source, ..
        }) => {
            assert!(!resumable);
            assert!(matches!(source, RemoteError::NotFound(_)));
        }
        other => panic!("expected fetch error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_undecodable_page_is_malformed() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = test_config(&server, dir.path(), 100, "");
    let db = dir.path().join("sweep.db");

    Mock::given(method("POST"))
        .and(path(LIST))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = crawler::scan(client(&config), open(&db), &config, "hash", false, None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SweepError::Crawl(CrawlError::Fetch {
            source: RemoteError::Malformed { .. },
            ..
        })
    ));
}

#[tokio::test]
async fn test_bad_record_does_not_block_the_crawl() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = test_config(&server, dir.path(), 1, "");
    let db = dir.path().join("sweep.db");

    let mut sizeless = file_json("/Archive/nosize.dat", 0, "h-x");
    sizeless.as_object_mut().unwrap().remove("size");

    mount_first(&server, page_json(numbered_page(1, 1), "c1", true)).await;
    mount_continue(
        &server,
        "c1",
        ResponseTemplate::new(200).set_body_json(page_json(
            vec![
                sizeless,
                json!({".tag": "symlink", "name": "link", "path_display": "/link"}),
                file_json("/Archive/good.dat", 4, "h-g"),
            ],
            "c2",
            false,
        )),
    )
    .await;

    let outcome = crawler::scan(client(&config), open(&db), &config, "hash", false, None)
        .await
        .unwrap();
    assert_eq!(outcome.files, 3);

    let entries = open(&db).load_entries(outcome.scan_id).unwrap();
    let paths: Vec<(&str, u64)> = entries.iter().map(|e| (e.path.as_str(), e.size)).collect();
    assert_eq!(
        paths,
        vec![
            ("/Archive/p1/f0.dat", 100),
            ("/Archive/nosize.dat", 0),
            ("/Archive/good.dat", 4)
        ]
    );
}

#[tokio::test]
async fn test_checkpoint_under_other_root_is_refused() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let mut config = test_config(&server, dir.path(), 1, "");
    config.crawler.root_path = "/Old".to_string();
    let db = dir.path().join("sweep.db");

    mount_first(
        &server,
        page_json(vec![file_json("/Old/a", 1, "h1"), file_json("/Old/b", 1, "h2")], "c1", true),
    )
    .await;
    mount_continue(&server, "c1", ResponseTemplate::new(503)).await;
    assert!(crawler::scan(client(&config), open(&db), &config, "hash", false, None)
        .await
        .is_err());

    config.crawler.root_path = "/New".to_string();
    let err = crawler::scan(client(&config), open(&db), &config, "hash", false, None)
        .await
        .unwrap_err();
    match err {
        SweepError::Crawl(CrawlError::RootMismatch {
            checkpoint_root,
            configured_root,
        }) => {
            assert_eq!(checkpoint_root, "/Old");
            assert_eq!(configured_root, "/New");
        }
        other => panic!("expected root mismatch, got {:?}", other),
    }

    let storage = open(&db);
    assert!(storage.get_latest_scan().unwrap().is_none());
    let state = storage.load_checkpoint().unwrap().unwrap();
    assert_eq!(state.checkpoint.root_path, "/Old");

    server.reset().await;
    mount_first(&server, page_json(vec![file_json("/New/z", 2, "h9")], "n1", false)).await;
    let outcome = crawler::scan(client(&config), open(&db), &config, "hash", true, None)
        .await
        .unwrap();
    assert_eq!(outcome.files, 1);
    assert_eq!(open(&db).get_latest_scan().unwrap().unwrap().root_path, "/New");
}
