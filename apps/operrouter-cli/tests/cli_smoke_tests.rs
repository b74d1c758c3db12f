#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Smoke tests for the `operrouter` binary.

use std::io::Write;
use std::process::{Command, Output, Stdio};

use httpmock::prelude::*;
use serde_json::{Value, json};

fn run_operrouter(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_operrouter"))
        .args(args)
        .env_remove("RUST_LOG")
        .env_remove("OPERROUTER__TRANSPORT")
        .env_remove("OPERROUTER__HTTP__BASE_URL")
        .env_remove("OPERROUTER__GRPC__ADDRESS")
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .expect("Failed to execute operrouter")
}

fn stdout_json(output: &Output) -> Value {
    serde_json::from_slice(&output.stdout).expect("stdout should be JSON")
}

fn mock_result(server: &MockServer, method: &str, result: Value) {
    server.mock(|when, then| {
        when.method(POST)
            .path("/jsonrpc")
            .body_includes(format!("\"method\":\"{method}\""));
        then.status(200)
            .json_body(json!({"jsonrpc": "2.0", "id": 1, "result": result}));
    });
}

#[test]
fn test_cli_help_command() {
    let output = run_operrouter(&["--help"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Usage:"));
    for word in ["ping", "datasource", "llm", "demo", "--transport", "--config"] {
        assert!(stdout.contains(word), "help should mention {word}");
    }
}

#[test]
fn test_cli_version_command() {
    let output = run_operrouter(&["--version"]);

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("operrouter"));
}

#[test]
fn test_print_config_applies_flags() {
    let output = run_operrouter(&[
        "print-config",
        "--transport",
        "grpc",
        "--address",
        "router:50051",
    ]);

    assert!(output.status.success());
    let config = stdout_json(&output);
    assert_eq!(config["transport"], "grpc");
    assert_eq!(config["grpc"]["address"], "router:50051");
    assert_eq!(config["http"]["timeout"], "30s");
}

#[test]
fn test_print_config_reads_yaml_file() {
    let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    file.write_all(b"transport: ffi\nffi:\n  library_path: /opt/liboperrouter_core_ffi.so\n")
        .unwrap();

    let output = run_operrouter(&["--config", file.path().to_str().unwrap(), "print-config"]);

    assert!(output.status.success());
    let config = stdout_json(&output);
    assert_eq!(config["transport"], "ffi");
    assert_eq!(config["ffi"]["library_path"], "/opt/liboperrouter_core_ffi.so");
}

#[test]
fn test_missing_config_file_fails() {
    let output = run_operrouter(&["--config", "/nonexistent/operrouter.yaml", "print-config"]);

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("does not exist"));
}

#[test]
fn test_unknown_transport_is_usage_error() {
    let output = run_operrouter(&["--transport", "smtp", "ping"]);

    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_ping_over_http() {
    let server = MockServer::start();
    mock_result(&server, "ping", json!({"success": true}));

    let output = run_operrouter(&["--url", &server.base_url(), "ping"]);

    assert!(output.status.success());
    assert_eq!(stdout_json(&output)["success"], true);
}

#[test]
fn test_refused_call_exits_with_refusal_code() {
    let server = MockServer::start();
    mock_result(
        &server,
        "datasource.close",
        json!({"success": false, "error": "datasource `main` not found"}),
    );

    let output = run_operrouter(&["--url", &server.base_url(), "datasource", "close", "main"]);

    assert_eq!(output.status.code(), Some(3));
    let body = stdout_json(&output);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "datasource `main` not found");
}

#[test]
fn test_unreachable_backend_fails() {
    let output = run_operrouter(&["--url", "http://127.0.0.1:1", "ping"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("transport error"));
}

#[test]
fn test_missing_native_library_fails() {
    let output = run_operrouter(&[
        "--transport",
        "ffi",
        "--ffi-path",
        "/nonexistent/liboperrouter_core_ffi.so",
        "ping",
    ]);

    assert_eq!(output.status.code(), Some(1));
}
