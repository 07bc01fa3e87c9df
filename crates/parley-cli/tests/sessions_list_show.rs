//! Integration tests for `parley sessions list|show|delete`.

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn can_bind_localhost() -> bool {
    std::net::TcpListener::bind("127.0.0.1:0").is_ok()
}

#[tokio::test]
async fn test_sessions_list_prints_each_session() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = TempDir::new().unwrap();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/sessions/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "sessions": [
                {"id": "s1", "title": "Rust questions", "timestamp": "2024-01-01T00:00:00Z", "lastMessage": "thanks"},
                {"id": 42, "title": "", "timestamp": "2024-01-02T00:00:00Z"}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    cargo_bin_cmd!("parley")
        .env("PARLEY_HOME", home.path())
        .args(["--api-url", &server.uri(), "sessions", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Rust questions  s1"))
        .stdout(predicate::str::contains("Untitled  42"));
}

#[tokio::test]
async fn test_sessions_list_empty() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = TempDir::new().unwrap();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/sessions/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"sessions": []})))
        .mount(&server)
        .await;

    cargo_bin_cmd!("parley")
        .env("PARLEY_HOME", home.path())
        .args(["--api-url", &server.uri(), "sessions", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No sessions found."));
}

#[tokio::test]
async fn test_sessions_show_prints_transcript() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = TempDir::new().unwrap();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/sessions/s1/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "session_title": "Rust questions",
            "messages": [
                {"id": 1, "content": "What is a trait?", "role": "user", "timestamp": "2024-01-01T00:00:00Z"},
                {"id": 2, "content": "A shared interface.", "role": "assistant", "timestamp": "2024-01-01T00:00:01Z"}
            ]
        })))
        .mount(&server)
        .await;

    cargo_bin_cmd!("parley")
        .env("PARLEY_HOME", home.path())
        .args(["--api-url", &server.uri(), "sessions", "show", "s1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("You: What is a trait?"))
        .stdout(predicate::str::contains("Assistant: A shared interface."));
}

#[tokio::test]
async fn test_sessions_show_unknown_session_fails() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = TempDir::new().unwrap();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/sessions/missing/"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"error": "Session not found"})))
        .mount(&server)
        .await;

    cargo_bin_cmd!("parley")
        .env("PARLEY_HOME", home.path())
        .args(["--api-url", &server.uri(), "sessions", "show", "missing"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("load session 'missing'"));
}

#[tokio::test]
async fn test_sessions_delete() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = TempDir::new().unwrap();
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/api/sessions/s1/delete/"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    cargo_bin_cmd!("parley")
        .env("PARLEY_HOME", home.path())
        .args(["--api-url", &server.uri(), "sessions", "delete", "s1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Deleted session s1"));
}

#[tokio::test]
async fn test_sessions_delete_server_error_fails() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = TempDir::new().unwrap();
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/api/sessions/s1/delete/"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"error": "boom"})))
        .mount(&server)
        .await;

    cargo_bin_cmd!("parley")
        .env("PARLEY_HOME", home.path())
        .args(["--api-url", &server.uri(), "sessions", "delete", "s1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("delete session 's1'"));
}
