//! Runs the built `vigil` binary.

use std::path::Path;
use std::process::{Command, Output};

fn vigil(state_path: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_vigil"))
        .args(args)
        .arg("--state-path")
        .arg(state_path)
        .env_remove("VIGIL_CONFIG")
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run vigil")
}

#[test]
fn state_show_without_state() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");

    let out = vigil(&path, &["state", "show"]);
    assert!(out.status.success());
    assert!(String::from_utf8_lossy(&out.stdout).contains("no state recorded"));
}

#[test]
fn state_show_and_reset() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    std::fs::write(
        &path,
        r#"{"last":{"finality_events_total":12.0},"last_seen":1700000000,"updated":1700000060}"#,
    )
    .unwrap();

    let out = vigil(&path, &["state", "show"]);
    assert!(out.status.success());
    let shown: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(shown["last_seen"], 1_700_000_000u64);

    let out = vigil(&path, &["state", "reset"]);
    assert!(out.status.success());
    assert!(!path.exists());
}

#[test]
fn unreachable_node_exits_with_error_and_keeps_state() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    let seeded = br#"{"last":{"finality_events_total":5.0},"last_seen":1700000000,"updated":1700000000}"#;
    std::fs::write(&path, seeded).unwrap();

    // Bind then drop a listener to get a port nothing answers on.
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let health = format!("http://127.0.0.1:{port}/healthz");
    let metrics = format!("http://127.0.0.1:{port}/metrics");

    let out = vigil(
        &path,
        &[
            "check",
            "--no-alert",
            "--format",
            "json",
            "--health-url",
            &health,
            "--metrics-url",
            &metrics,
            "--timeout-secs",
            "2",
        ],
    );

    assert_eq!(out.status.code(), Some(2));
    let report: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(report["severity"], "error");
    assert_eq!(report["stall"], "unknown");
    assert_eq!(report["state_saved"], false);
    assert_eq!(std::fs::read(&path).unwrap(), seeded.to_vec());
}

#[test]
fn invalid_config_exits_with_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");

    let out = vigil(&path, &["check", "--no-alert", "--timeout-secs", "0"]);
    assert_eq!(out.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&out.stderr).contains("timeout_secs"));
}
