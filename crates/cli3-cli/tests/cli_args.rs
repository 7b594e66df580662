use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
use tempfile::{TempDir, tempdir};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn cli3(config_dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("cli3").unwrap();
    cmd.arg("--config-dir")
        .arg(config_dir.path())
        .env_remove("CLI3_SERVER")
        .env_remove("CLI3_PORT")
        .env_remove("CLI3_SCHEMA")
        .env_remove("CLI3_USERNAME")
        .env_remove("CLI3_PASSWORD")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_help_lists_commands() {
    let dir = tempdir().unwrap();
    cli3(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("tree"))
        .stdout(predicate::str::contains("describe"))
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("nci"));
}

#[test]
fn test_run_requires_query_id() {
    let dir = tempdir().unwrap();
    cli3(&dir)
        .arg("run")
        .assert()
        .failure()
        .stderr(predicate::str::contains("<ID>"));
}

#[test]
fn test_config_show_defaults() {
    let dir = tempdir().unwrap();
    cli3(&dir)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Server:   127.0.0.1"))
        .stdout(predicate::str::contains("Port:     8000"))
        .stdout(predicate::str::contains("http://127.0.0.1:8000/common"));
}

#[test]
fn test_config_set_persists() {
    let dir = tempdir().unwrap();
    cli3(&dir)
        .args(["config", "set", "port", "9090"])
        .assert()
        .success();

    let saved = std::fs::read_to_string(dir.path().join("config.toml")).unwrap();
    assert!(saved.contains("port = 9090"));

    cli3(&dir)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Port:     9090"));
}

#[test]
fn test_env_and_flags_override_file() {
    let dir = tempdir().unwrap();
    cli3(&dir)
        .args(["config", "set", "schema", "sales"])
        .assert()
        .success();

    cli3(&dir)
        .env("CLI3_SCHEMA", "finance")
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Schema:   finance"));

    cli3(&dir)
        .env("CLI3_SCHEMA", "finance")
        .args(["--schema", "hr", "config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Schema:   hr"));
}

#[test]
fn test_config_set_rejects_bad_values() {
    let dir = tempdir().unwrap();
    cli3(&dir)
        .args(["config", "set", "port", "99999"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("port"));
    cli3(&dir)
        .args(["config", "set", "colour", "blue"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("colour"));
    assert!(!dir.path().join("config.toml").exists());
}

#[test]
fn test_run_without_username_fails() {
    let dir = tempdir().unwrap();
    cli3(&dir)
        .args(["run", "7"])
        .assert()
        .failure()
        .stderr(predicate::str::starts_with("warning: "))
        .stderr(predicate::str::contains("Authentication required"));
}

#[test]
fn test_open_missing_document_fails() {
    let dir = tempdir().unwrap();
    cli3(&dir)
        .arg("open")
        .arg(dir.path().join("missing.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing.json"));
}

async fn reporting_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/common/api/auth/signin"))
        .and(query_param("username", "alice"))
        .and(query_param("password", "secret"))
        .respond_with(ResponseTemplate::new(200).set_body_string("OK"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/common/api/auth/signout"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/common/api/nci"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/common/api/styles"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/common/api/docs/query"))
        .and(query_param("id", "7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 7, "name": "Sales", "type": "TABLE",
            "params": [{"name": "REGION", "title": "Region", "type": "STRING", "value": "North", "input": null}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/common/api/docs/request"))
        .and(query_param("REGION", "South"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "rc": {
                "type": "cursor",
                "columns": [
                    {"name": "name", "title": "Name", "visable": true},
                    {"name": "amount", "title": "Amount", "type": "NUMBER", "visable": true}
                ],
                "data": [["Acme", "10"], ["Birch", "25.5"], ["Cedar", "3"]]
            }
        })))
        .mount(&server)
        .await;
    server
}

fn logged_in(dir: &TempDir, server: &MockServer) -> Command {
    let mut cmd = cli3(dir);
    cmd.env("CLI3_USERNAME", "alice")
        .env("CLI3_PASSWORD", "secret")
        .arg("--server")
        .arg(server.address().ip().to_string())
        .arg("--port")
        .arg(server.address().port().to_string());
    cmd
}

#[tokio::test(flavor = "multi_thread")]
async fn test_run_sorts_and_exports_csv() {
    let server = reporting_server().await;
    let dir = tempdir().unwrap();
    let cache = dir.path().join("nci");
    cli3(&dir)
        .args(["config", "set", "cache_dir"])
        .arg(&cache)
        .assert()
        .success();

    let document = dir.path().join("sales.json");
    logged_in(&dir, &server)
        .args(["run", "7", "-p", "REGION=South", "--sort", "AMOUNT:desc", "--format", "csv"])
        .arg("--save")
        .arg(&document)
        .assert()
        .success()
        .stdout(predicate::str::contains("Name,Amount\nBirch,25.5\nAcme,10\nCedar,3"));
    assert!(document.exists());

    cli3(&dir)
        .arg("open")
        .arg(&document)
        .args(["--filter", "NAME=Acme", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"Name\": \"Acme\""))
        .stdout(predicate::str::contains("Birch").not());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_run_rejects_unknown_param() {
    let server = reporting_server().await;
    let dir = tempdir().unwrap();
    logged_in(&dir, &server)
        .args(["run", "7", "-p", "YEAR=2024"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no input parameter 'YEAR'"));
}
