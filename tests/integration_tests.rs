//! CLI tests against the offline planning path; no external tools needed

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use tempfile::TempDir;

/// `keycut` with an isolated config file and no environment overrides
fn keycut(config_dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("keycut").unwrap();
    cmd.env("KEYCUT_CONFIG", config_dir.path().join("config.toml"))
        .env_remove("RUST_LOG")
        .env_remove("KEYCUT_OUTPUT_FORMAT")
        .env_remove("KEYCUT_OUTPUT_DIR")
        .env_remove("KEYCUT_MAX_PARALLEL")
        .args(["--log-level", "warn"]);
    cmd
}

fn plan_json(dir: &TempDir, extra: &[&str]) -> Value {
    let out_dir = dir.path().to_string_lossy().to_string();
    let output = keycut(dir)
        .args([
            "plan",
            "-i",
            "clip.mp4",
            "--duration",
            "10",
            "--keyframes",
            "0,2,4,6,8",
            "--output-dir",
            &out_dir,
            "--print",
            "json",
        ])
        .args(extra)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "plan failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).unwrap()
}

#[test]
fn test_help_lists_commands() {
    let dir = TempDir::new().unwrap();
    keycut(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("probe"))
        .stdout(predicate::str::contains("plan"))
        .stdout(predicate::str::contains("cut"));
}

#[test]
fn test_aligned_range_is_a_single_copy() {
    let dir = TempDir::new().unwrap();
    let json = plan_json(&dir, &["--codec", "h264", "-r", "2-4"]);

    let plan = &json["plan"];
    assert_eq!(plan["assembly"], "SingleOutput");
    assert_eq!(plan["save_mode"], "keep-selections");
    assert_eq!(plan["operations"][0]["mode"], "StreamCopy");

    let steps = json["invocations"]["steps"].as_array().unwrap();
    assert_eq!(steps.len(), 1);
    assert_eq!(steps[0]["is_lossless_hint"], true);
    let output = json["invocations"]["outputs"][0].as_str().unwrap();
    assert!(output.ends_with("clip_edited.mp4"), "{}", output);
}

#[test]
fn test_unaligned_range_reencodes_only_edges() {
    let dir = TempDir::new().unwrap();
    let json = plan_json(
        &dir,
        &[
            "--codec", "h264", "--pix-fmt", "yuv420p", "--profile", "High", "--frame-rate", "25",
            "-r", "1-5",
        ],
    );

    let op = &json["plan"]["operations"][0];
    assert_eq!(op["mode"], "ReEncode");
    assert_eq!(op["escalated"], false);
    let modes: Vec<&str> = op["segments"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["mode"].as_str().unwrap())
        .collect();
    assert_eq!(modes, vec!["ReEncode", "StreamCopy", "ReEncode"]);
}

#[test]
fn test_unknown_stream_parameters_escalate() {
    let dir = TempDir::new().unwrap();
    let json = plan_json(&dir, &["--codec", "h264", "-r", "1-5"]);

    let op = &json["plan"]["operations"][0];
    assert_eq!(op["escalated"], true);
    assert_eq!(op["segments"].as_array().unwrap().len(), 1);
}

#[test]
fn test_bad_frame_rate_is_rejected() {
    let dir = TempDir::new().unwrap();
    keycut(&dir)
        .args([
            "plan", "-i", "clip.mp4", "--duration", "10", "--frame-rate", "0/0", "-r", "0-5",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid --frame-rate"));
}

#[test]
fn test_unmatched_codec_escalates_to_full_reencode() {
    let dir = TempDir::new().unwrap();
    let json = plan_json(&dir, &["--codec", "prores", "--container", "mov", "-r", "1-5"]);

    let op = &json["plan"]["operations"][0];
    assert_eq!(op["escalated"], true);
    assert_eq!(op["segments"].as_array().unwrap().len(), 1);
}

#[test]
fn test_split_by_tags_numbers_parts() {
    let dir = TempDir::new().unwrap();
    let json = plan_json(&dir, &["-m", "split-tags", "-t", "4", "-t", "6"]);

    assert_eq!(json["plan"]["assembly"], "OneFilePerOperation");
    let outputs: Vec<&str> = json["invocations"]["outputs"]
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o.as_str().unwrap())
        .collect();
    assert_eq!(outputs.len(), 3);
    assert!(outputs[0].ends_with("clip_tag_split_1.mp4"));
    assert!(outputs[2].ends_with("clip_tag_split_3.mp4"));
}

#[test]
fn test_remove_joins_the_gaps() {
    let dir = TempDir::new().unwrap();
    let json = plan_json(&dir, &["-m", "remove", "-r", "2-4", "-r", "6-8"]);

    assert_eq!(json["plan"]["assembly"], "ConcatenateAll");
    assert_eq!(json["plan"]["operations"].as_array().unwrap().len(), 3);
    let output = json["invocations"]["outputs"][0].as_str().unwrap();
    assert!(output.ends_with("clip_cleaned.mp4"), "{}", output);
}

#[test]
fn test_yaml_output() {
    let dir = TempDir::new().unwrap();
    keycut(&dir)
        .args([
            "plan", "-i", "clip.mp4", "--duration", "10", "--keyframes", "0,5", "-r", "0-5",
            "--print", "yaml",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("save_mode: keep-selections"));
}

#[test]
fn test_text_output_describes_edges() {
    let dir = TempDir::new().unwrap();
    keycut(&dir)
        .args([
            "plan", "-i", "clip.mp4", "--duration", "10", "--keyframes", "0,2,4,6,8", "--codec",
            "h264", "--pix-fmt", "yuv420p", "--profile", "Main", "--frame-rate", "30000/1001",
            "-r", "1-5",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("copy + re-encoded edges"))
        .stdout(predicate::str::contains("Steps:"));
}

#[test]
fn test_removing_everything_is_rejected() {
    let dir = TempDir::new().unwrap();
    keycut(&dir)
        .args([
            "plan", "-i", "clip.mp4", "--duration", "10", "-m", "remove", "-r", "0-10",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Nothing to cut"));
}

#[test]
fn test_range_past_duration_is_rejected() {
    let dir = TempDir::new().unwrap();
    keycut(&dir)
        .args(["plan", "-i", "clip.mp4", "--duration", "10", "-r", "8-12"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid range"));
}

#[test]
fn test_split_tags_without_tags_is_rejected() {
    let dir = TempDir::new().unwrap();
    keycut(&dir)
        .args(["plan", "-i", "clip.mp4", "--duration", "10", "-m", "split-tags"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("at least one tag"));
}

#[test]
fn test_bad_time_is_rejected() {
    let dir = TempDir::new().unwrap();
    keycut(&dir)
        .args(["plan", "-i", "clip.mp4", "--duration", "10", "-r", "abc-4"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid --range"));
}

#[test]
fn test_unknown_format_is_rejected() {
    let dir = TempDir::new().unwrap();
    keycut(&dir)
        .args([
            "plan", "-i", "clip.mp4", "--duration", "10", "-r", "0-5", "-f", "webp",
        ])
        .assert()
        .failure();
}

#[test]
fn test_keyframes_require_duration() {
    let dir = TempDir::new().unwrap();
    keycut(&dir)
        .args(["plan", "-i", "clip.mp4", "--keyframes", "0,2", "-r", "0-2"])
        .assert()
        .failure();
}
