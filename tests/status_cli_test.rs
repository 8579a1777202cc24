use assert_cmd::cargo::cargo_bin_cmd;
use assert_fs::TempDir;
use assert_fs::prelude::*;
use httpmock::MockServer;
use predicates::prelude::*;
use serde_json::json;

fn anvil_audit() -> assert_cmd::Command {
    cargo_bin_cmd!("anvil-audit")
}

fn write_project(dir: &TempDir, server: &MockServer) {
    dir.child("token").write_str("test-token").unwrap();
    dir.child("anvil-audit.toml")
        .write_str(&format!(
            r#"
[anvil]
api_url = "{}"
service_account_email = "app@example.iam.gserviceaccount.com"
token_file = "token"

[audit]
snapshot = "snapshot.json"
cache_dir = "cache"
"#,
            server.base_url()
        ))
        .unwrap();
}

#[test]
fn status_reports_health_and_identity() {
    let server = MockServer::start();
    let dir = TempDir::new().unwrap();
    write_project(&dir, &server);
    server.mock(|when, then| {
        when.method("GET").path("/status");
        then.status(200).json_body(json!({
            "ok": true,
            "systems": {"Sam": {"ok": true}, "Rawls": {"ok": true}}
        }));
    });
    server.mock(|when, then| {
        when.method("GET")
            .path("/me")
            .query_param("userDetailsOnly", "true");
        then.status(200).json_body(json!({
            "userInfo": {"userEmail": "app@example.iam.gserviceaccount.com"}
        }));
    });

    anvil_audit()
        .current_dir(dir.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("All systems ok"))
        .stdout(predicate::str::contains("Sam"))
        .stdout(predicate::str::contains("app@example.iam.gserviceaccount.com"));
}

#[test]
fn status_flags_degraded_subsystems() {
    let server = MockServer::start();
    let dir = TempDir::new().unwrap();
    write_project(&dir, &server);
    server.mock(|when, then| {
        when.method("GET").path("/status");
        then.status(200).json_body(json!({
            "ok": false,
            "systems": {"Sam": {"ok": false}}
        }));
    });
    server.mock(|when, then| {
        when.method("GET").path("/me");
        then.status(200).json_body(json!({
            "userInfo": {"userEmail": "app@example.iam.gserviceaccount.com"}
        }));
    });

    anvil_audit()
        .current_dir(dir.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Some systems report problems"))
        .stdout(predicate::str::contains("Sam is down"));
}

#[test]
fn status_with_bad_token_fails() {
    let server = MockServer::start();
    let dir = TempDir::new().unwrap();
    write_project(&dir, &server);
    server.mock(|when, then| {
        when.method("GET").path("/status");
        then.status(401).json_body(json!({"message": "unauthorized"}));
    });

    anvil_audit()
        .current_dir(dir.path())
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unauthorized"));
}
