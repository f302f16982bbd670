use std::fs;
use std::path::Path;

use assert_cmd::Command;
use serde_json::Value;

fn mood_risk() -> Command {
    let mut cmd = Command::cargo_bin("mood-risk").unwrap();
    cmd.env_remove("RUST_LOG").env_remove("MOOD_RISK_REPORTS_DIR");
    cmd
}

fn write(dir: &Path, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    path
}

fn stdout_of(cmd: &mut Command) -> String {
    let output = cmd.output().unwrap();
    assert!(
        output.status.success(),
        "command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout).unwrap()
}

#[test]
fn assess_prints_json_assessment() {
    let dir = tempfile::tempdir().unwrap();
    let input = write(
        dir.path(),
        "bundle.json",
        r#"{"username": "avery", "emotions": {"sadness": 10, "worry": "8"},
            "emotion_dimensions": {"distress": 0.7, "hopelessness": 0.6}, "polarity": 0}"#,
    );

    let stdout = stdout_of(mood_risk().args(["assess", "--json", "--input"]).arg(&input));
    let assessment: Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(assessment["is_at_risk"], Value::Bool(true));
    assert_eq!(assessment["total_indicator_score"].as_f64(), Some(18.0));
    assert_eq!(assessment["threshold"].as_f64(), Some(55.0));
    assert_eq!(assessment["rule"], "distress_hopelessness");
}

#[test]
fn assess_prints_summary_for_quiet_profile() {
    let dir = tempfile::tempdir().unwrap();
    let input = write(dir.path(), "empty.json", "{}");

    let stdout = stdout_of(mood_risk().args(["assess", "--input"]).arg(&input));
    assert!(stdout.starts_with("subject: Doesn't have signs of depression"));
    assert!(stdout.contains("Total depression score: 0.0% (threshold is 55%)"));
}

#[test]
fn null_document_asks_for_analysis_first() {
    let dir = tempfile::tempdir().unwrap();
    let input = write(dir.path(), "null.json", "null");

    let output = mood_risk()
        .args(["assess", "--input"])
        .arg(&input)
        .output()
        .unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("analyze posts first"), "stderr: {stderr}");
}

#[test]
fn custom_rules_file_lowers_threshold() {
    let dir = tempfile::tempdir().unwrap();
    let input = write(dir.path(), "bundle.json", r#"{"emotion_counts": {"sadness": 20}}"#);
    let rules = write(dir.path(), "rules.json", r#"{"primary_threshold": 15}"#);

    let stdout = stdout_of(
        mood_risk()
            .args(["assess", "--json", "--input"])
            .arg(&input)
            .arg("--rules")
            .arg(&rules),
    );
    let assessment: Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(assessment["is_at_risk"], Value::Bool(true));
    assert_eq!(assessment["threshold"].as_f64(), Some(15.0));
}

#[test]
fn batch_lists_flagged_subjects_first() {
    let dir = tempfile::tempdir().unwrap();
    let csv = write(
        dir.path(),
        "subjects.csv",
        "username,distress,hopelessness,polarity,sadness,worry,empty\n\
         calm,0,0,0,2,1,0\n\
         avery,0,0,0,40,20,0\n\
         jules,0,0,-0.5,0,10,6\n",
    );

    let stdout = stdout_of(mood_risk().args(["batch", "--csv"]).arg(&csv));
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines[0], "2 of 3 subjects flagged:");
    assert_eq!(lines[1], "- avery score 60.0 (Has Early Signs of Depression)");
    assert_eq!(lines[2], "- jules score 16.0 (Has Early Signs of Depression)");
    assert_eq!(lines[3], "- calm score 3.0 (Doesn't have signs of depression)");
}

#[test]
fn report_history_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let reports = dir.path().join("reports");
    let input = write(
        dir.path(),
        "bundle.json",
        r#"{"username": "avery", "emotion_counts": {"Depression": 30, "sadness": 30},
            "results": [{"text": "long night", "created_at": "2026-01-05T22:10:00Z",
                         "prediction": "Depression", "confidence": 0.9}]}"#,
    );

    let stdout = stdout_of(
        mood_risk()
            .args(["report", "--input"])
            .arg(&input)
            .arg("--reports-dir")
            .arg(&reports),
    );
    assert!(stdout.starts_with("Report avery_"));
    let id = stdout
        .split_whitespace()
        .nth(1)
        .unwrap()
        .to_string();

    let listing = stdout_of(
        mood_risk()
            .args(["history", "--reports-dir"])
            .arg(&reports)
            .arg("list"),
    );
    assert!(listing.contains(&id));
    assert!(listing.contains("Has Early Signs of Depression"));

    let shown = stdout_of(
        mood_risk()
            .args(["history", "--reports-dir"])
            .arg(&reports)
            .args(["show", &id]),
    );
    assert!(shown.contains("# Depression Analysis Report"));
    assert!(shown.contains("Posts from Jan 05, 2026 to Jan 05, 2026"));

    stdout_of(
        mood_risk()
            .args(["history", "--reports-dir"])
            .arg(&reports)
            .args(["delete", &id]),
    );
    let listing = stdout_of(
        mood_risk()
            .args(["history", "--reports-dir"])
            .arg(&reports)
            .arg("list"),
    );
    assert!(listing.starts_with("No reports saved"));
}
