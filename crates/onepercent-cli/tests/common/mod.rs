//! Common utilities for CLI E2E tests.

#![allow(dead_code)]

use std::path::Path;
use std::process::Command;

pub const EMAIL: &str = "tester@example.com";
pub const PASSWORD: &str = "Sup3r$ecret";

/// Invoke the CLI against an isolated data directory.
pub fn run_cli(data_dir: &Path, args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_onepercent"))
        .args(args)
        .env("ONEPERCENT_DATA_DIR", data_dir)
        .env_remove("ONEPERCENT_LOG")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

/// Invoke a CLI command and expect success.
pub fn run_cli_success(data_dir: &Path, args: &[&str]) -> String {
    let (stdout, stderr, code) = run_cli(data_dir, args);
    assert_eq!(code, 0, "CLI command failed: {args:?}\nstderr: {stderr}");
    stdout
}

/// Invoke a CLI command and expect failure.
pub fn run_cli_failure(data_dir: &Path, args: &[&str]) -> (String, String, i32) {
    let (stdout, stderr, code) = run_cli(data_dir, args);
    assert!(code != 0, "CLI command unexpectedly succeeded: {args:?}");
    (stdout, stderr, code)
}

/// Parse JSON output from CLI.
pub fn parse_json(json: &str) -> serde_json::Value {
    serde_json::from_str(json).expect("Failed to parse JSON output")
}

/// Create an account and sign in.
pub fn signed_in(data_dir: &Path) {
    run_cli_success(
        data_dir,
        &["auth", "signup", EMAIL, "--password", PASSWORD, "--confirm", PASSWORD],
    );
    run_cli_success(data_dir, &["auth", "signin", EMAIL, "--password", PASSWORD]);
}

/// Create a habit and return its id.
pub fn create_habit(data_dir: &Path, args: &[&str]) -> String {
    let mut full = vec!["habit", "create"];
    full.extend_from_slice(args);
    let habit = parse_json(&run_cli_success(data_dir, &full));
    habit["id"].as_str().expect("habit id").to_string()
}
