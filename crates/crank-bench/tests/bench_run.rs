use serde_json::Value;
use std::path::Path;
use std::process::Command;

fn bench_binary() -> &'static str {
    env!("CARGO_BIN_EXE_crank-bench")
}

fn read_trace(path: &Path) -> Vec<Value> {
    let content = std::fs::read_to_string(path).expect("trace file should exist");
    content
        .lines()
        .map(|line| serde_json::from_str(line).expect("each trace line is JSON"))
        .collect()
}

fn event_types(entries: &[Value]) -> Vec<&str> {
    entries
        .iter()
        .map(|e| e["event_type"].as_str().unwrap_or_default())
        .collect()
}

#[test]
fn simulated_run_synchronizes_and_traces() {
    let dir = tempfile::tempdir().unwrap();
    let trace = dir.path().join("trace.jsonl");

    let status = Command::new(bench_binary())
        .args(["--duration-ms", "250", "--rpm", "1200", "--report-ms", "20"])
        .arg("--trace")
        .arg(&trace)
        .status()
        .expect("failed to start crank-bench");
    assert!(status.success());

    let entries = read_trace(&trace);
    let types = event_types(&entries);
    assert_eq!(types.first(), Some(&"session_start"));
    assert_eq!(types.last(), Some(&"session_shutdown"));

    // Starting mid-cycle, the first cam edge only arms the synchronizer.
    let count = |kind: &str| types.iter().filter(|t| **t == kind).count();
    assert_eq!(count("phase_armed"), 1);
    assert_eq!(count("phase_fault"), 0);
    let armed = types.iter().position(|t| *t == "phase_armed");
    let synced_at = types.iter().position(|t| *t == "phase_synchronized");
    assert!(armed < synced_at, "armed {armed:?} synced {synced_at:?}");

    let synced: Vec<&Value> = entries
        .iter()
        .filter(|e| e["event_type"] == "phase_synchronized")
        .collect();
    assert_eq!(synced.len(), 1);
    assert_eq!(synced[0]["details"]["angle_deg"], 0.0);

    let shutdown = entries.last().unwrap();
    assert_eq!(shutdown["details"]["phase_faults"], 0);
    let rpm = shutdown["details"]["final_rpm"].as_f64().unwrap();
    assert!((rpm - 1200.0).abs() < 36.0, "final rpm {rpm}");
}

#[test]
fn uneven_increment_is_rejected() {
    let output = Command::new(bench_binary())
        .args(["--increment", "7", "--duration-ms", "10"])
        .output()
        .expect("failed to start crank-bench");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid estimator configuration"), "{stderr}");
}

#[test]
fn help_exits_cleanly() {
    let output = Command::new(bench_binary())
        .arg("--help")
        .output()
        .expect("failed to start crank-bench");
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("--increment"));
}
