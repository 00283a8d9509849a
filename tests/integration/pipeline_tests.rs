//! End-to-end test: scan, plan, delete, record

use crate::support::{client, file_json, folder_json, page_json, success_json, test_config};
use cloudsweep::crawler;
use cloudsweep::dedupe::{
    duplicate_report, group_duplicates, plan_target, read_plan_file, write_plan_file,
};
use cloudsweep::deleter::{BatchDeleter, DeleteSettings};
use cloudsweep::storage::{InventoryStore, SqliteStorage};
use cloudsweep::ItemOutcome;
use serde_json::json;
use std::path::Path;
use tempfile::TempDir;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CAMERA_TARGET: &str = r#"
[[target]]
name = "camera-uploads"
prefixes = ["/Camera Uploads/"]
avoid-under = ["/Camera Uploads/"]
"#;

#[tokio::test]
async fn test_scan_plan_delete() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = test_config(&server, dir.path(), 2, CAMERA_TARGET);
    let db = Path::new(&config.output.database_path).to_path_buf();

    Mock::given(method("POST"))
        .and(path("/2/files/list_folder"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_json(
            vec![
                folder_json("/Camera Uploads"),
                file_json("/Camera Uploads/2019/a.jpg", 100, "h1"),
                file_json("/Photos/2019/a.jpg", 100, "h1"),
                file_json("/Camera Uploads/b.jpg", 50, "h2"),
            ],
            "c1",
            true,
        )))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/2/files/list_folder/continue"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_json(
            vec![
                file_json("/Camera Uploads/c.jpg", 50, "h2"),
                file_json("/Camera Uploads/d.jpg", 7, "h3"),
                file_json("/Docs/x.pdf", 9, "h4"),
                file_json("/Docs/y.pdf", 9, "h4"),
            ],
            "c2",
            false,
        )))
        .mount(&server)
        .await;

    let storage = SqliteStorage::new(&db).unwrap();
    let outcome = crawler::scan(client(&config), storage, &config, "hash", false, None)
        .await
        .unwrap();
    assert_eq!(outcome.files, 7);

    let mut storage = SqliteStorage::new(&db).unwrap();
    let scan = storage.get_latest_scan().unwrap().unwrap();
    let entries = storage.load_entries(scan.id).unwrap();

    let groups = group_duplicates(&entries);
    assert_eq!(groups.len(), 3);
    let report = duplicate_report(&groups);
    assert_eq!(report.redundant.count, 3);
    assert_eq!(report.redundant.bytes, 159);

    let target = config.target("camera-uploads").unwrap();
    let plan = plan_target(&entries, target);
    assert_eq!(
        plan.paths(),
        vec![
            "/Camera Uploads/2019/a.jpg".to_string(),
            "/Camera Uploads/c.jpg".to_string()
        ]
    );
    assert_eq!(plan.items[0].kept_path, "/Photos/2019/a.jpg");
    assert_eq!(plan.items[1].kept_path, "/Camera Uploads/b.jpg");
    assert_eq!(plan.reclaimable_bytes(), 150);

    let plan_file = dir.path().join("camera-uploads-delete.txt");
    write_plan_file(&plan_file, &plan.paths()).unwrap();
    let paths = read_plan_file(&plan_file).unwrap();
    assert_eq!(paths, plan.paths());

    Mock::given(method("POST"))
        .and(path("/2/files/delete_batch"))
        .and(body_partial_json(json!({
            "entries": [
                { "path": "/Camera Uploads/2019/a.jpg" },
                { "path": "/Camera Uploads/c.jpg" }
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            ".tag": "complete",
            "entries": [success_json(), success_json()]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let deleter = BatchDeleter::new(client(&config), DeleteSettings::from(&config.deleter));
    let summary = deleter.execute(&paths).await;
    assert!(summary.is_clean());
    assert_eq!(summary.deleted, 2);

    let run_id = storage
        .record_delete_run(&plan_file.display().to_string(), &summary.outcomes)
        .unwrap();
    let recorded = storage.load_delete_outcomes(run_id).unwrap();
    assert_eq!(recorded.len(), 2);
    assert!(recorded.iter().all(|o| o.outcome == ItemOutcome::Deleted));
    assert_eq!(recorded[0].path, "/Camera Uploads/2019/a.jpg");
}
