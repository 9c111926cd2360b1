//! Basic CLI E2E tests.
//!
//! Each test runs the binary with `HOME` pointed at a fresh temp directory so
//! config and ledger files never touch the real user profile.

use std::path::Path;
use std::process::Command;

const ENV_KEYS: [&str; 6] = [
    "CLOCKIFY_API_KEY",
    "WORKSPACE_ID",
    "USER_ID",
    "GOOGLE_CALENDAR_ID",
    "CLOCKCAL_DATABASE",
    "CLOCKCAL_ENV",
];

/// Run a CLI command and return (code, stdout, stderr).
fn run_cli(home: &Path, envs: &[(&str, &str)], args: &[&str]) -> (i32, String, String) {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_clockcal"));
    cmd.env("HOME", home).env("RUST_LOG", "warn");
    for key in ENV_KEYS {
        cmd.env_remove(key);
    }
    cmd.envs(envs.iter().copied()).args(args);

    let output = cmd.output().expect("Failed to execute CLI command");
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (code, stdout, stderr)
}

#[test]
fn test_sync_without_config_lists_missing_keys() {
    let home = tempfile::tempdir().unwrap();
    let (code, _, stderr) = run_cli(home.path(), &[], &["sync"]);

    assert_eq!(code, 1);
    assert!(stderr.contains("Missing required configuration"), "{stderr}");
    for key in [
        "clockify.api_key",
        "clockify.workspace_id",
        "clockify.user_id",
        "google.calendar_id",
    ] {
        assert!(stderr.contains(key), "missing {key} in: {stderr}");
    }
}

#[test]
fn test_sync_reports_only_the_keys_still_missing() {
    let home = tempfile::tempdir().unwrap();
    let (code, _, stderr) = run_cli(
        home.path(),
        &[("CLOCKIFY_API_KEY", "k"), ("WORKSPACE_ID", "ws")],
        &["sync"],
    );

    assert_eq!(code, 1);
    assert!(!stderr.contains("clockify.api_key"), "{stderr}");
    assert!(stderr.contains("clockify.user_id"), "{stderr}");
    assert!(stderr.contains("google.calendar_id"), "{stderr}");
}

#[test]
fn test_config_path_is_under_home() {
    let home = tempfile::tempdir().unwrap();
    let (code, stdout, _) = run_cli(home.path(), &[], &["config", "path"]);

    assert_eq!(code, 0);
    let expected = home.path().join(".config").join("clockcal").join("config.toml");
    assert_eq!(stdout.trim(), expected.display().to_string());
}

#[test]
fn test_config_path_dev_environment() {
    let home = tempfile::tempdir().unwrap();
    let (code, stdout, _) = run_cli(home.path(), &[("CLOCKCAL_ENV", "dev")], &["config", "path"]);

    assert_eq!(code, 0);
    assert!(stdout.contains("clockcal-dev"), "{stdout}");
}

#[test]
fn test_config_init_refuses_to_overwrite() {
    let home = tempfile::tempdir().unwrap();
    let (first, _, _) = run_cli(home.path(), &[], &["config", "init"]);
    let (second, _, stderr) = run_cli(home.path(), &[], &["config", "init"]);
    let (forced, _, _) = run_cli(home.path(), &[], &["config", "init", "--force"]);

    assert_eq!(first, 0);
    assert_eq!(second, 1);
    assert!(stderr.contains("already exists"), "{stderr}");
    assert_eq!(forced, 0);
}

#[test]
fn test_config_set_then_get() {
    let home = tempfile::tempdir().unwrap();
    let (code, _, _) = run_cli(home.path(), &[], &["config", "set", "sync.lookback_hours", "12"]);
    assert_eq!(code, 0);

    let (code, stdout, _) = run_cli(home.path(), &[], &["config", "get", "sync.lookback_hours"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "12");

    let (code, stdout, _) = run_cli(home.path(), &[], &["config", "get", "sync.write_order"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "sink_first");
}

#[test]
fn test_config_set_rejects_bad_values() {
    let home = tempfile::tempdir().unwrap();
    let (code, _, stderr) = run_cli(
        home.path(),
        &[],
        &["config", "set", "sync.write_order", "whenever"],
    );
    assert_eq!(code, 1);
    assert!(stderr.contains("sync.write_order"), "{stderr}");
}

#[test]
fn test_config_show_masks_api_key() {
    let home = tempfile::tempdir().unwrap();
    let (code, stdout, _) = run_cli(
        home.path(),
        &[("CLOCKIFY_API_KEY", "super-secret")],
        &["config", "show"],
    );

    assert_eq!(code, 0);
    assert!(!stdout.contains("super-secret"));
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(parsed["clockify"]["api_key"], "********");
}

#[test]
fn test_init_creates_ledger_file() {
    let home = tempfile::tempdir().unwrap();
    let db = home.path().join("data").join("ledger.db");
    let db_str = db.to_str().unwrap();

    let (code, stdout, _) = run_cli(home.path(), &[("CLOCKCAL_DATABASE", db_str)], &["init"]);

    assert_eq!(code, 0);
    assert!(db.exists());
    assert!(stdout.contains("0 records"), "{stdout}");
}

#[test]
fn test_status_json_on_empty_ledger() {
    let home = tempfile::tempdir().unwrap();
    let db = home.path().join("ledger.db");
    let db_str = db.to_str().unwrap();

    let (code, stdout, _) = run_cli(
        home.path(),
        &[("CLOCKCAL_DATABASE", db_str)],
        &["status", "--pending", "--json"],
    );

    assert_eq!(code, 0);
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(parsed["total"], 0);
    assert_eq!(parsed["pending_records"], serde_json::json!([]));
}

#[test]
fn test_status_plain_output() {
    let home = tempfile::tempdir().unwrap();
    let (code, stdout, _) = run_cli(home.path(), &[], &["status", "--pending"]);

    assert_eq!(code, 0);
    assert!(stdout.contains("synced"));
    assert!(stdout.contains("no pending entries"));
}

#[test]
fn test_clockify_whoami_requires_api_key() {
    let home = tempfile::tempdir().unwrap();
    let (code, _, stderr) = run_cli(home.path(), &[], &["clockify", "whoami"]);

    assert_eq!(code, 1);
    assert!(stderr.contains("clockify.api_key"), "{stderr}");
}

#[test]
fn test_clockify_whoami_saves_user_and_workspace() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("GET", "/user")
        .match_header("x-api-key", "k")
        .with_status(200)
        .with_body(r#"{"id": "user-42", "name": "Ada", "activeWorkspace": "ws-7"}"#)
        .create();

    let home = tempfile::tempdir().unwrap();
    let url = server.url();
    let (code, _, _) = run_cli(home.path(), &[], &["config", "set", "clockify.base_url", &url]);
    assert_eq!(code, 0);

    let (code, stdout, stderr) = run_cli(
        home.path(),
        &[("CLOCKIFY_API_KEY", "k")],
        &["clockify", "whoami", "--save"],
    );
    assert_eq!(code, 0, "{stderr}");
    assert!(stdout.contains("user-42"), "{stdout}");
    mock.assert();

    let (_, user_id, _) = run_cli(home.path(), &[], &["config", "get", "clockify.user_id"]);
    let (_, workspace, _) = run_cli(home.path(), &[], &["config", "get", "clockify.workspace_id"]);
    assert_eq!(user_id.trim(), "user-42");
    assert_eq!(workspace.trim(), "ws-7");

    // The key came from the environment and must not be written to the file.
    let (_, key, _) = run_cli(home.path(), &[], &["config", "get", "clockify.api_key"]);
    assert_eq!(key.trim(), "null");
}
