#![cfg(feature = "cli")]

use std::path::Path;
use std::process::{Command, Output};

use serde_json::Value;

fn wiresession(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_wiresession"))
        .args(["--log-level", "error"])
        .args(args)
        .env_remove("WIRESESSION_CODEC")
        .env_remove("WIRESESSION_USERNAME")
        .env_remove("WIRESESSION_SESSION")
        .output()
        .expect("wiresession should run")
}

fn path_str(path: &Path) -> &str {
    path.to_str().expect("temp path should be utf-8")
}

fn inspect_json(frames: &Path, extra: &[&str]) -> Vec<Value> {
    let mut args = vec!["--format", "json", "inspect", path_str(frames)];
    args.extend_from_slice(extra);
    let output = wiresession(&args);
    assert!(
        output.status.success(),
        "inspect failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(|line| serde_json::from_str(line).expect("inspect should emit json lines"))
        .collect()
}

#[test]
fn pack_then_inspect_roundtrips_messages() {
    let dir = tempfile::tempdir().expect("temp dir");
    let frames = dir.path().join("frames.bin");
    let buffer = dir.path().join("buffer.bin");
    std::fs::write(&buffer, vec![7u8; 300]).expect("buffer file");

    let output = wiresession(&[
        "pack",
        "execute_request",
        "--content",
        r#"{"code":"print(1)"}"#,
        "--buffer",
        path_str(&buffer),
        "--identity",
        "client-7",
        "--username",
        "alice",
        "--out",
        path_str(&frames),
    ]);
    assert!(output.status.success());
    assert!(output.stdout.is_empty());

    let messages = inspect_json(&frames, &[]);
    assert_eq!(messages.len(), 1);
    let first = &messages[0];
    assert_eq!(first["kind"], "message");
    assert_eq!(first["msg_type"], "execute_request");
    assert_eq!(first["identities"], serde_json::json!(["client-7"]));
    assert_eq!(first["message"]["header"]["username"], "alice");
    assert_eq!(first["message"]["content"]["code"], "print(1)");
    assert_eq!(first["message"]["buffers"], serde_json::json!([300]));

    let parent = serde_json::to_string(&first["message"]["header"]).expect("header json");
    let output = wiresession(&[
        "pack",
        "execute_reply",
        "--content",
        r#"{"status":"ok"}"#,
        "--parent",
        &parent,
        "--header",
        r#"{"engine":2}"#,
        "--out",
        path_str(&frames),
    ]);
    assert!(output.status.success());

    let messages = inspect_json(&frames, &[]);
    assert_eq!(messages.len(), 2);
    let reply = &messages[1];
    assert_eq!(reply["parent_id"], first["msg_id"]);
    assert_eq!(reply["message"]["header"]["engine"], 2);
    assert_eq!(reply["identities"], serde_json::json!([]));

    let limited = inspect_json(&frames, &["--count", "1"]);
    assert_eq!(limited.len(), 1);
}

#[test]
fn msgpack_codec_roundtrips_and_lazy_raw_passes_content_through() {
    let dir = tempfile::tempdir().expect("temp dir");
    let frames = dir.path().join("frames.bin");

    let output = wiresession(&[
        "pack",
        "status",
        "--codec",
        "msgpack",
        "--content",
        r#"{"state":"idle"}"#,
        "--out",
        path_str(&frames),
    ]);
    assert!(output.status.success());

    let messages = inspect_json(&frames, &["--codec", "msgpack"]);
    assert_eq!(messages[0]["message"]["content"]["state"], "idle");

    let output = wiresession(&[
        "--format",
        "raw",
        "inspect",
        path_str(&frames),
        "--codec",
        "msgpack",
        "--lazy",
    ]);
    assert!(output.status.success());
    // fixmap(1) "state" "idle"
    let mut expected = vec![0x81, 0xa5];
    expected.extend_from_slice(b"state");
    expected.push(0xa4);
    expected.extend_from_slice(b"idle");
    assert_eq!(output.stdout, expected);
}

#[test]
fn truncated_input_is_data_invalid() {
    let dir = tempfile::tempdir().expect("temp dir");
    let frames = dir.path().join("frames.bin");
    let output = wiresession(&["pack", "status", "--out", path_str(&frames)]);
    assert!(output.status.success());

    let bytes = std::fs::read(&frames).expect("frames");
    std::fs::write(&frames, &bytes[..bytes.len() - 1]).expect("truncate");

    let output = wiresession(&["--format", "json", "inspect", path_str(&frames)]);
    assert_eq!(output.status.code(), Some(60));
}

#[test]
fn invalid_content_is_usage_error() {
    let dir = tempfile::tempdir().expect("temp dir");
    let frames = dir.path().join("frames.bin");
    let output = wiresession(&[
        "pack",
        "status",
        "--content",
        "[1,2,3]",
        "--out",
        path_str(&frames),
    ]);
    assert_eq!(output.status.code(), Some(64));
    assert!(!frames.exists());
}

#[test]
fn doctor_passes() {
    let output = wiresession(&["--format", "json", "doctor"]);
    assert!(output.status.success());
    let report: Value = serde_json::from_slice(&output.stdout).expect("doctor should emit json");
    assert_eq!(report["kind"], "doctor-report");
    assert_eq!(report["overall"], "pass");
}

#[test]
fn version_reports_package_version() {
    let output = wiresession(&["version"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(
        stdout.trim(),
        format!("wiresession {}", env!("CARGO_PKG_VERSION"))
    );
}
