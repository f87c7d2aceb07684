#![cfg(feature = "storage-rocksdb")]

use assert_cmd::cargo_bin;
use serde_json::json;
use std::process::Command;
use tempfile::tempdir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_retry_count_survives_restart() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/saviynt/checkGroupStatus"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "exists": true, "status": "CREATED", "groupId": "g-1"
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/cyberark/createSafe"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "FAILED", "message": "vault read-only"
        })))
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let ledger_path = dir.path().join("ledger_db");

    let run = || {
        let output = Command::new(cargo_bin!("access-provisioner"))
            .arg("tests/fixtures/batch.json")
            .arg("--identity-url")
            .arg(server.uri())
            .arg("--vault-url")
            .arg(server.uri())
            .arg("--ticket-url")
            .arg(server.uri())
            .arg("--ledger-path")
            .arg(&ledger_path)
            .output()
            .expect("Failed to execute command");
        assert!(output.status.success());
        String::from_utf8_lossy(&output.stdout).into_owned()
    };

    // 1. First run: the safe is rejected once
    let first = run();
    assert!(first.contains("msg-1,REQ-1,retry_scheduled,retry 1"));

    // 2. Second run: the count recovered from disk keeps climbing
    let second = run();
    assert!(second.contains("msg-1,REQ-1,retry_scheduled,retry 2"));
}
