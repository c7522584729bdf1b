//! Integration tests for the `camscan` CLI binary.
//!
//! These tests cover argument parsing, strategy plans, scripted sessions
//! and their exit codes, and config inspection. Nothing touches a real
//! camera or the user's configuration.
#![allow(clippy::unwrap_used)]

use std::path::PathBuf;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::Value;
use tempfile::TempDir;

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `camscan` binary with env isolation.
///
/// Clears all `CAMSCAN_*` env vars and points config directories into
/// `home` so tests never read the user's real configuration.
fn camscan_cmd(home: &TempDir) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("camscan");
    cmd.env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path())
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .env_remove("CAMSCAN_CONFIG")
        .env_remove("CAMSCAN_OUTPUT")
        .env_remove("CAMSCAN_FPS")
        .env_remove("CAMSCAN_SYMBOLOGIES")
        .env_remove("CAMSCAN_STRATEGY_ORDER")
        .env_remove("CAMSCAN_BUSY_POLICY")
        .env_remove("CAMSCAN_RENDER_TARGET");
    cmd
}

fn write_file(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

fn stdout_json(output: &std::process::Output) -> Value {
    serde_json::from_slice(&output.stdout).unwrap_or_else(|e| {
        panic!(
            "stdout is not JSON ({e}):\n{}",
            String::from_utf8_lossy(&output.stdout)
        )
    })
}

const FALLBACK_SCENARIO: &str = r#"
device_class = "mobile"

devices = [
    { id = "1", label = "Front Camera" },
    { id = "2", label = "Back Camera" },
]
acquisitions = [
    { result = "fail", error = { kind = "not-readable", message = "device busy" } },
]
frames = [{ kind = "miss" }, { kind = "miss" }, { kind = "code", text = "0123456789" }]
"#;

const UNAVAILABLE_SCENARIO: &str = r#"
devices = [{ id = "2", label = "Back Camera" }]
acquisitions = [
    { result = "fail", error = { kind = "not-readable", message = "in use" } },
    { result = "fail", error = { kind = "overconstrained", message = "facingMode" } },
    { result = "fail", error = { kind = "not-readable", message = "in use" } },
]
"#;

const IDLE_STREAM_SCENARIO: &str = r#"
stop_after_ms = 50
devices = [{ id = "2", label = "Back Camera" }]
frames = [{ kind = "miss" }]
"#;

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let home = TempDir::new().unwrap();
    let output = camscan_cmd(&home).output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = String::from_utf8_lossy(&output.stderr);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    let home = TempDir::new().unwrap();
    camscan_cmd(&home).arg("--help").assert().success().stdout(
        predicate::str::contains("plan")
            .and(predicate::str::contains("simulate"))
            .and(predicate::str::contains("config")),
    );
}

#[test]
fn test_version_flag() {
    let home = TempDir::new().unwrap();
    camscan_cmd(&home)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("camscan"));
}

#[test]
fn test_completions_zsh() {
    let home = TempDir::new().unwrap();
    camscan_cmd(&home)
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

// ── plan ────────────────────────────────────────────────────────────

#[test]
fn test_plan_prefers_back_camera() {
    let home = TempDir::new().unwrap();
    let output = camscan_cmd(&home)
        .args(["-o", "json", "plan"])
        .args(["-d", "1:Front Camera", "-d", "2:Back Camera"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let plan = stdout_json(&output);
    assert_eq!(plan["candidate"]["id"], "2");
    assert_eq!(plan["order"], "device-first");
    let steps = plan["strategies"].as_array().unwrap();
    assert_eq!(steps.len(), 3);
    assert_eq!(steps[0]["strategy"], "exact-device(2)");
    assert_eq!(steps[0]["constraints"]["deviceId"]["exact"], "2");
    assert_eq!(
        steps[1]["constraints"]["facingMode"]["exact"],
        "environment"
    );
    assert_eq!(steps[2]["constraints"]["facingMode"], "environment");
}

#[test]
fn test_plan_without_devices_uses_facing_modes() {
    let home = TempDir::new().unwrap();
    let output = camscan_cmd(&home)
        .args(["-o", "json", "plan"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let plan = stdout_json(&output);
    assert!(plan["candidate"].is_null());
    assert_eq!(plan["note"], "no camera devices found");
    assert_eq!(plan["strategies"].as_array().unwrap().len(), 2);
}

#[test]
fn test_plan_webview_omits_exact_device() {
    let home = TempDir::new().unwrap();
    camscan_cmd(&home)
        .args(["-o", "plain", "plan", "--class", "webview", "-d", "2:Back Camera"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("environment-facing-exact")
                .and(predicate::str::contains("exact-device").not()),
        );
}

#[test]
fn test_plan_facing_first_order() {
    let home = TempDir::new().unwrap();
    let output = camscan_cmd(&home)
        .args(["-o", "plain", "plan", "--order", "facing-first", "-d", "7:rear"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let lines: Vec<String> = String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::to_owned)
        .collect();
    assert_eq!(
        lines,
        vec![
            "environment-facing-exact",
            "environment-facing-preferred",
            "exact-device(7)",
        ]
    );
}

#[test]
fn test_plan_order_from_config_file() {
    let home = TempDir::new().unwrap();
    let config = write_file(&home, "camscan.toml", "strategy_order = \"facing-first\"\n");
    let output = camscan_cmd(&home)
        .arg("--config")
        .arg(&config)
        .args(["-o", "json", "plan", "-d", "1:Back"])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(stdout_json(&output)["order"], "facing-first");
}

#[test]
fn test_plan_rejects_unknown_class() {
    let home = TempDir::new().unwrap();
    camscan_cmd(&home)
        .args(["plan", "--class", "tablet"])
        .assert()
        .failure()
        .code(2);
}

#[test]
fn test_plan_table_output() {
    let home = TempDir::new().unwrap();
    camscan_cmd(&home)
        .args(["plan", "-d", "2:Back Camera"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("Candidate: 2 (Back Camera)")
                .and(predicate::str::contains("Strategy"))
                .and(predicate::str::contains("{\"deviceId\":{\"exact\":\"2\"}}")),
        );
}

// ── simulate ────────────────────────────────────────────────────────

#[test]
fn test_simulate_fallback_then_decode() {
    let home = TempDir::new().unwrap();
    let scenario = write_file(&home, "fallback.toml", FALLBACK_SCENARIO);
    let output = camscan_cmd(&home)
        .args(["-o", "json", "simulate"])
        .arg(&scenario)
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(0));

    let report = stdout_json(&output);
    assert_eq!(report["outcome"]["status"], "decoded");
    assert_eq!(report["outcome"]["value"], "0123456789");
    assert_eq!(report["delivered"], "0123456789");
    assert_eq!(
        report["transitions"],
        serde_json::json!(["opening", "scanning", "stopping", "idle"])
    );
    let attempts = report["attempts"].as_array().unwrap();
    assert_eq!(attempts.len(), 2);
    assert_eq!(attempts[0]["error"]["kind"], "not-readable");
    assert!(attempts[1]["error"].is_null());

    let calls: Vec<&str> = report["calls"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(Value::as_str)
        .collect();
    assert_eq!(calls.first(), Some(&"show (full viewport)"));
    assert_eq!(calls.last(), Some(&"hide"));
}

#[test]
fn test_simulate_plain_prints_value() {
    let home = TempDir::new().unwrap();
    let scenario = write_file(&home, "fallback.toml", FALLBACK_SCENARIO);
    camscan_cmd(&home)
        .args(["-o", "plain", "simulate"])
        .arg(&scenario)
        .assert()
        .success()
        .stdout("0123456789\n");
}

#[test]
fn test_simulate_camera_unavailable_exit_code() {
    let home = TempDir::new().unwrap();
    let scenario = write_file(&home, "unavailable.toml", UNAVAILABLE_SCENARIO);
    camscan_cmd(&home)
        .args(["simulate"])
        .arg(&scenario)
        .assert()
        .code(7)
        .stdout(predicate::str::contains("camera_unavailable"))
        .stderr(predicate::str::contains("No camera could be opened after 3"));
}

#[test]
fn test_simulate_stop_after_cancels() {
    let home = TempDir::new().unwrap();
    let scenario = write_file(&home, "idle.toml", IDLE_STREAM_SCENARIO);
    let output = camscan_cmd(&home)
        .args(["-o", "json", "simulate"])
        .arg(&scenario)
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));

    let report = stdout_json(&output);
    assert_eq!(report["outcome"]["status"], "cancelled");
    assert!(report["delivered"].is_null());
    let calls = report["calls"].as_array().unwrap();
    assert_eq!(calls.iter().filter(|c| *c == "stop").count(), 1);
    assert_eq!(calls.iter().filter(|c| *c == "clear").count(), 1);
}

#[test]
fn test_simulate_class_override() {
    let home = TempDir::new().unwrap();
    let scenario = write_file(&home, "fallback.toml", FALLBACK_SCENARIO);
    let output = camscan_cmd(&home)
        .args(["-o", "json", "simulate", "--class", "webview"])
        .arg(&scenario)
        .output()
        .unwrap();
    assert!(output.status.success());

    let report = stdout_json(&output);
    assert_eq!(report["device_class"], "webview");
    let calls = report["calls"].as_array().unwrap();
    assert!(!calls.iter().any(|c| c == "enumerate"));
}

#[test]
fn test_simulate_invalid_scenario() {
    let home = TempDir::new().unwrap();
    let scenario = write_file(&home, "bad.toml", "frames = [{ kind = \"sparkle\" }]\n");
    camscan_cmd(&home)
        .args(["simulate"])
        .arg(&scenario)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Could not parse scenario"));
}

#[test]
fn test_simulate_missing_scenario() {
    let home = TempDir::new().unwrap();
    camscan_cmd(&home)
        .args(["simulate"])
        .arg(home.path().join("absent.toml"))
        .assert()
        .failure()
        .code(1);
}

// ── config ──────────────────────────────────────────────────────────

#[test]
fn test_config_path_honours_flag() {
    let home = TempDir::new().unwrap();
    let config = home.path().join("custom.toml");
    camscan_cmd(&home)
        .arg("--config")
        .arg(&config)
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("custom.toml"));
}

#[test]
fn test_config_show_defaults_without_file() {
    let home = TempDir::new().unwrap();
    let output = camscan_cmd(&home)
        .args(["-o", "json", "config", "show"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let cfg = stdout_json(&output);
    assert_eq!(cfg["fps"], 10);
    assert_eq!(
        cfg["symbologies"],
        serde_json::json!(["CODE_128", "EAN_13", "UPC_A"])
    );
    assert_eq!(cfg["busy_policy"], "reject");
    assert_eq!(cfg["render_target"], "scanner-container");
}

#[test]
fn test_config_show_env_override() {
    let home = TempDir::new().unwrap();
    let output = camscan_cmd(&home)
        .env("CAMSCAN_FPS", "24")
        .env("CAMSCAN_BUSY_POLICY", "restart")
        .args(["-o", "json", "config", "show"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let cfg = stdout_json(&output);
    assert_eq!(cfg["fps"], 24);
    assert_eq!(cfg["busy_policy"], "restart");
}

#[test]
fn test_config_show_rejects_invalid_values() {
    let home = TempDir::new().unwrap();
    let config = write_file(&home, "camscan.toml", "fps = 0\n");
    camscan_cmd(&home)
        .arg("--config")
        .arg(&config)
        .args(["config", "show"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("invalid fps"));
}
