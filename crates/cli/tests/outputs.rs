use sha2::{Digest, Sha256};
use std::path::PathBuf;
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(prefix: &str) -> PathBuf {
    let nonce = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("pinwire-tests-{}-{}", prefix, nonce));
    std::fs::create_dir_all(&dir).expect("Failed to create temp dir");
    dir
}

fn pinwire() -> Command {
    Command::new(env!("CARGO_BIN_EXE_pinwire"))
}

#[test]
fn test_cli_toggle_writes_passing_result() {
    let dir = temp_dir("toggle-pass");
    let script_path = dir.join("script.yaml");
    std::fs::write(
        &script_path,
        r#"
schema_version: "1.0"
presses:
  count: 3
assertions:
  - output_level: high
  - toggle_count: 3
  - sleeping: true
"#,
    )
    .expect("Failed to write script");
    let output_dir = dir.join("artifacts");

    let output = pinwire()
        .args([
            "toggle",
            "--script",
            script_path.to_str().unwrap(),
            "--output-dir",
            output_dir.to_str().unwrap(),
        ])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let result_path = output_dir.join("result.json");
    assert!(result_path.exists());
    let result: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&result_path).unwrap()).unwrap();

    assert_eq!(result["status"], "pass");
    assert_eq!(result["board"], "arduino-uno");
    assert_eq!(result["outcome"]["toggles"], 3);
    assert_eq!(result["outcome"]["led_high"], true);
    assert_eq!(result["outcome"]["sleeping"], "idle");
    assert_eq!(result["metrics"]["interrupts"], 3);
    let script_bytes = std::fs::read(&script_path).unwrap();
    assert_eq!(
        result["script_hash"],
        format!("{:x}", Sha256::digest(&script_bytes))
    );
    assert_eq!(result["assertions"].as_array().unwrap().len(), 3);

    // stdout carries the same document
    let stdout: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(stdout["status"], "pass");

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_cli_toggle_failing_assertion_exits_nonzero() {
    let dir = temp_dir("toggle-fail");
    let script_path = dir.join("script.yaml");
    std::fs::write(
        &script_path,
        r#"
schema_version: "1.0"
presses:
  count: 2
assertions:
  - output_level: high
"#,
    )
    .unwrap();

    let output = pinwire()
        .args(["toggle", "--script", script_path.to_str().unwrap()])
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success());
    let result: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(result["status"], "fail");
    assert_eq!(result["outcome"]["toggles"], 2);
    assert_eq!(result["assertions"][0]["passed"], false);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_cli_toggle_resolves_board_next_to_script() {
    let dir = temp_dir("toggle-board");
    std::fs::write(
        dir.join("board.yaml"),
        r#"
name: "rising-board"
toggle:
  sense: rising
"#,
    )
    .unwrap();
    let script_path = dir.join("script.yaml");
    std::fs::write(
        &script_path,
        r#"
schema_version: "1.0"
board: "board.yaml"
presses:
  count: 1
assertions:
  - toggle_count: 1
  - output_level: high
"#,
    )
    .unwrap();

    let output = pinwire()
        .args(["toggle", "--script", script_path.to_str().unwrap()])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let result: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(result["board"], "rising-board");

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_cli_rejects_sleep_mode_that_cannot_wake() {
    let dir = temp_dir("standby");
    let board_path = dir.join("board.yaml");
    std::fs::write(
        &board_path,
        r#"
name: "uno-standby"
toggle:
  sleep_mode: standby
"#,
    )
    .unwrap();
    let script_path = dir.join("script.yaml");
    std::fs::write(&script_path, "schema_version: \"1.0\"\n").unwrap();

    let output = pinwire()
        .args([
            "--config",
            board_path.to_str().unwrap(),
            "toggle",
            "--script",
            script_path.to_str().unwrap(),
        ])
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("cannot wake"), "{}", stderr);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_cli_rejects_press_train_overflow() {
    let dir = temp_dir("overflow");
    let script_path = dir.join("script.yaml");
    std::fs::write(
        &script_path,
        r#"
schema_version: "1.0"
presses:
  count: 3
  interval_ms: 9223372036854775807
  hold_ms: 10
"#,
    )
    .unwrap();

    let output = pinwire()
        .args(["toggle", "--script", script_path.to_str().unwrap()])
        .output()
        .expect("Failed to execute command");

    // An error exit, not an abort.
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("overflows"), "{}", stderr);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_cli_blink_json_measures_duty_cycle() {
    let output = pinwire()
        .args(["blink", "--cycles", "2", "--json"])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["led"], "PB5");

    let highs = report["high_ms"].as_array().unwrap();
    assert_eq!(highs.len(), 2);
    for high in highs {
        assert!((high.as_f64().unwrap() - 3000.0).abs() < 1.0);
    }
    let lows = report["low_ms"].as_array().unwrap();
    assert_eq!(lows.len(), 1);
    assert!((lows[0].as_f64().unwrap() - 500.0).abs() < 1.0);
}

#[test]
fn test_cli_blink_writes_snapshot() {
    let dir = temp_dir("snapshot");
    let snapshot_path = dir.join("snapshot.json");

    let output = pinwire()
        .args([
            "blink",
            "--cycles",
            "1",
            "--snapshot",
            snapshot_path.to_str().unwrap(),
        ])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let snapshot: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&snapshot_path).unwrap()).unwrap();
    assert_eq!(snapshot["type"], "pinwire_atmega328p");
    assert_eq!(snapshot["registers"]["DDRB"], 32);
    assert_eq!(snapshot["registers"]["PORTB"], 0);
    assert!(snapshot["clock"]["elapsed_ms"].as_f64().unwrap() >= 3500.0);

    let _ = std::fs::remove_dir_all(&dir);
}
