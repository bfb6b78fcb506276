use std::path::PathBuf;
use std::process::Command;

fn temp_path(label: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "swipefate-cli-{label}-{}",
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos()
    ))
}

fn kingdom() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../assets/scenarios/kingdom.json")
}

#[test]
fn cli_list_policies_writes_output() {
    let exe = env!("CARGO_BIN_EXE_swipefate-cli");
    let output_path = temp_path("list");
    let status = Command::new(exe)
        .args(["--list-policies", "--output"])
        .arg(&output_path)
        .status()
        .expect("run cli");
    assert!(status.success());
    let content = std::fs::read_to_string(&output_path).expect("read output");
    assert!(content.contains("Available policies"));
    assert!(content.contains("cautious"));
    let _ = std::fs::remove_file(output_path);
}

#[test]
fn cli_writes_json_report_and_history() {
    let exe = env!("CARGO_BIN_EXE_swipefate-cli");
    let output_path = temp_path("run.json");
    let history_dir = temp_path("history");
    let output = Command::new(exe)
        .arg("--scenario")
        .arg(kingdom())
        .args([
            "--policies",
            "greedy,random",
            "--report",
            "json",
            "--iterations",
            "1",
            "--seeds",
            "1",
            "--history-dir",
        ])
        .arg(&history_dir)
        .arg("--output")
        .arg(&output_path)
        .output()
        .expect("run cli");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("SwipeFate Autoplayer"));

    let content = std::fs::read_to_string(&output_path).expect("read output");
    let report: serde_json::Value = serde_json::from_str(&content).expect("valid json");
    assert_eq!(report["scenario"], "The Kingdom");
    assert_eq!(report["runs"].as_array().map(Vec::len), Some(2));
    assert_eq!(report["history"]["total_games"], 2);
    assert!(history_dir.join("game_history.json").is_file());

    let _ = std::fs::remove_file(output_path);
    let _ = std::fs::remove_dir_all(history_dir);
}

#[test]
fn cli_rejects_unknown_policy() {
    let exe = env!("CARGO_BIN_EXE_swipefate-cli");
    let output = Command::new(exe)
        .arg("--scenario")
        .arg(kingdom())
        .args(["--policies", "oracle", "--report", "json"])
        .output()
        .expect("run cli");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("unknown policy"));
}
