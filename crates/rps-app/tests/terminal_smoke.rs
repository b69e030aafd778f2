use std::process::Command;

use tempfile::tempdir;

fn binary() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_rps-app"));
    cmd.env("TERM", "xterm-256color").env("RUST_LOG", "off");
    cmd
}

#[test]
fn terminal_headless_smoke() {
    let status = binary()
        .args(["--headless", "--frames", "8", "--seed", "7", "--pieces", "30"])
        .status()
        .expect("failed to run rps-app binary");
    assert!(status.success(), "terminal headless run failed");
}

#[test]
fn headless_report_is_written() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("report.json");
    let status = binary()
        .args(["--headless", "--frames", "6", "--frame-ms", "50", "--seed", "1"])
        .arg("--report")
        .arg(&path)
        .status()
        .expect("failed to run rps-app binary");
    assert!(status.success());

    let raw = std::fs::read_to_string(&path).expect("report");
    let report: serde_json::Value = serde_json::from_str(&raw).expect("json");
    assert_eq!(report["summary"]["frame_count"], 6);
    assert_eq!(report["frames"].as_array().map(Vec::len), Some(6));
}

#[test]
fn invalid_configuration_fails() {
    let output = binary()
        .args(["--headless", "--size=-3"])
        .output()
        .expect("failed to run rps-app binary");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid simulation configuration"));
}

#[test]
fn print_config_emits_json() {
    let output = binary()
        .args(["--print-config", "--rate", "24"])
        .output()
        .expect("failed to run rps-app binary");
    assert!(output.status.success());
    let config: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("config json");
    assert_eq!(config["simulation_rate"], 24.0);
}
