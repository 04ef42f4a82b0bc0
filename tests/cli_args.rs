//! Integration tests for CLI argument handling
//!
//! Runs the real binary: help output, configuration errors, and a stdio
//! handshake that never needs to reach Canvas.

use std::io::Write;
use std::process::{Command, Output, Stdio};

/// Helper to build a command with no Canvas settings inherited
fn canvas_mcp() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_canvas-mcp"));
    for var in [
        "CANVAS_BASE_URL",
        "CANVAS_API_TOKEN",
        "CANVAS_CACHE_TTL",
        "CANVAS_REQUEST_TIMEOUT",
        "CANVAS_MCP_LOG",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

/// Helper to run the CLI with given args and capture output
fn run_cli(args: &[&str]) -> Output {
    canvas_mcp()
        .args(args)
        .output()
        .expect("Failed to execute canvas-mcp")
}

#[test]
fn test_help_flag_exits_successfully() {
    let output = run_cli(&["--help"]);
    assert!(output.status.success(), "Expected --help to exit successfully");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("canvas-mcp"), "Help should mention canvas-mcp");
    assert!(stdout.contains("--api-token"), "Help should mention --api-token");
    assert!(stdout.contains("CANVAS_CACHE_TTL"), "Help should mention env vars");
}

#[test]
fn test_missing_token_prints_error_and_exits() {
    let output = run_cli(&[]);
    assert!(!output.status.success(), "Expected missing token to fail");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("CANVAS_API_TOKEN"),
        "Should explain how to supply the token: {}",
        stderr
    );
    assert!(output.stdout.is_empty(), "Nothing may be written to stdout");
}

#[test]
fn test_zero_cache_ttl_is_rejected() {
    let output = run_cli(&["--api-token", "abc", "--cache-ttl", "0"]);
    assert!(!output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("cache TTL"), "Unexpected error: {}", stderr);
}

#[test]
fn test_invalid_base_url_is_rejected() {
    let output = run_cli(&["--api-token", "abc", "--base-url", "canvas.example.edu"]);
    assert!(!output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Invalid Canvas base URL"), "Unexpected error: {}", stderr);
}

#[test]
fn test_stdio_handshake_until_eof() {
    let mut child = canvas_mcp()
        .args(["--api-token", "abc", "--base-url", "http://127.0.0.1:1"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to spawn canvas-mcp");

    {
        let mut stdin = child.stdin.take().unwrap();
        writeln!(
            stdin,
            r#"{{"jsonrpc":"2.0","id":1,"method":"initialize","params":{{}}}}"#
        )
        .unwrap();
        writeln!(stdin, r#"{{"jsonrpc":"2.0","method":"notifications/initialized"}}"#).unwrap();
        writeln!(stdin, r#"{{"jsonrpc":"2.0","id":2,"method":"tools/list"}}"#).unwrap();
    }

    let output = child.wait_with_output().unwrap();
    assert!(output.status.success(), "Server should exit cleanly at EOF");

    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<serde_json::Value> = stdout
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["result"]["serverInfo"]["name"], "canvas-mcp");
    assert!(lines[1]["result"]["tools"].as_array().unwrap().len() >= 10);
}
