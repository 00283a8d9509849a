//! Integration tests for batch deletion against a mock API

use crate::support::{client, failure_json, not_found_json, success_json, test_config};
use cloudsweep::deleter::{BatchDeleter, ChunkState, DeleteSettings, DeleteSummary};
use cloudsweep::remote::DropboxClient;
use cloudsweep::ItemOutcome;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const DELETE: &str = "/2/files/delete_batch";
const CHECK: &str = "/2/files/delete_batch/check";

fn plan(paths: &[&str]) -> Vec<String> {
    paths.iter().map(|p| p.to_string()).collect()
}

async fn deleter(server: &MockServer, dir: &TempDir) -> BatchDeleter<DropboxClient> {
    let config = test_config(server, dir.path(), 100, "");
    BatchDeleter::new(client(&config), DeleteSettings::from(&config.deleter))
}

fn outcome_of<'a>(summary: &'a DeleteSummary, path: &str) -> &'a ItemOutcome {
    &summary
        .outcomes
        .iter()
        .find(|o| o.path == path)
        .unwrap_or_else(|| panic!("no outcome for {}", path))
        .outcome
}

#[tokio::test]
async fn test_sync_batch_with_mixed_results() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("POST"))
        .and(path(DELETE))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            ".tag": "complete",
            "entries": [success_json(), not_found_json()]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let summary = deleter(&server, &dir)
        .await
        .execute(&plan(&["/a.jpg", "/b.jpg"]))
        .await;

    assert_eq!(summary.deleted, 1);
    assert_eq!(summary.already_absent, 1);
    assert!(summary.is_clean());
    assert_eq!(outcome_of(&summary, "/b.jpg"), &ItemOutcome::AlreadyAbsent);
}

#[tokio::test]
async fn test_async_job_is_polled_to_completion() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("POST"))
        .and(path(DELETE))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            ".tag": "async_job_id",
            "async_job_id": "job-7"
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(CHECK))
        .and(body_partial_json(json!({ "async_job_id": "job-7" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ ".tag": "in_progress" })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(CHECK))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            ".tag": "complete",
            "entries": [success_json(), failure_json("too_many_write_operations")]
        })))
        .mount(&server)
        .await;

    let summary = deleter(&server, &dir)
        .await
        .execute(&plan(&["/a.jpg", "/b.jpg"]))
        .await;

    assert_eq!(summary.chunks, vec![ChunkState::Completed]);
    assert_eq!(outcome_of(&summary, "/a.jpg"), &ItemOutcome::Deleted);
    assert_eq!(
        outcome_of(&summary, "/b.jpg"),
        &ItemOutcome::Failed("path_write/too_many_write_operations".to_string())
    );
    assert_eq!(summary.retry_paths(), vec!["/b.jpg".to_string()]);
}

#[tokio::test]
async fn test_failed_job_fails_whole_chunk() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("POST"))
        .and(path(DELETE))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            ".tag": "async_job_id",
            "async_job_id": "job-9"
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(CHECK))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            ".tag": "failed",
            "failed": { ".tag": "too_many_files" }
        })))
        .mount(&server)
        .await;

    let summary = deleter(&server, &dir)
        .await
        .execute(&plan(&["/a.jpg", "/b.jpg"]))
        .await;

    assert_eq!(summary.chunks, vec![ChunkState::JobFailed]);
    assert_eq!(summary.failed, 2);
    assert!(!summary.is_clean());
}

#[tokio::test]
async fn test_failing_chunk_does_not_stop_the_run() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("POST"))
        .and(path(DELETE))
        .and(body_partial_json(json!({
            "entries": [{ "path": "/c.jpg" }, { "path": "/d.jpg" }]
        })))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(DELETE))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            ".tag": "complete",
            "entries": [success_json(), success_json()]
        })))
        .mount(&server)
        .await;

    let summary = deleter(&server, &dir)
        .await
        .execute(&plan(&["/a.jpg", "/b.jpg", "/c.jpg", "/d.jpg", "/e.jpg", "/f.jpg"]))
        .await;

    assert_eq!(
        summary.chunks,
        vec![
            ChunkState::Completed,
            ChunkState::SubmitFailed,
            ChunkState::Completed
        ]
    );
    assert_eq!(summary.deleted, 4);
    assert_eq!(summary.failed, 2);
    assert_eq!(
        summary.retry_paths(),
        vec!["/c.jpg".to_string(), "/d.jpg".to_string()]
    );

    let order: Vec<&str> = summary.outcomes.iter().map(|o| o.path.as_str()).collect();
    assert_eq!(order, vec!["/a.jpg", "/b.jpg", "/c.jpg", "/d.jpg", "/e.jpg", "/f.jpg"]);
}

#[tokio::test]
async fn test_stuck_job_times_out() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("POST"))
        .and(path(DELETE))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            ".tag": "async_job_id",
            "async_job_id": "job-slow"
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(CHECK))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ ".tag": "in_progress" })))
        .expect(3)
        .mount(&server)
        .await;

    let summary = deleter(&server, &dir)
        .await
        .execute(&plan(&["/a.jpg"]))
        .await;

    assert_eq!(summary.chunks, vec![ChunkState::TimedOut]);
    assert_eq!(summary.timed_out, 1);
    assert_eq!(outcome_of(&summary, "/a.jpg"), &ItemOutcome::Timeout);
    assert_eq!(summary.retry_paths(), vec!["/a.jpg".to_string()]);
}
