//! End-to-end tests of the `elbenwald` binary.
//!
//! Runs the built executable against a file-source config in a temp
//! directory and checks stdout, the error log and exit codes.

use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

const WEB_SNAPSHOT: &str = r#"{"InstanceStates": [
    {"InstanceId": "i-a1", "AvailabilityZone": "eu-west-1a", "State": "InService", "Description": "N/A"},
    {"InstanceId": "i-a2", "AvailabilityZone": "eu-west-1a", "State": "InService", "Description": "N/A"},
    {"InstanceId": "i-b1", "AvailabilityZone": "eu-west-1b", "State": "OutOfService",
     "Description": "A transient error occurred. Please try again later."},
    {"InstanceId": "i-c1", "AvailabilityZone": "eu-west-1c", "State": "OutOfService",
     "Description": "Instance has failed at least the UnhealthyThreshold number of health checks consecutively."}
]}"#;

/// Writes a snapshot dir and a config whose error log lives at `log_path`.
fn write_config(root: &Path, log_path: &Path) -> std::path::PathBuf {
    let snapshots = root.join("snapshots");
    std::fs::create_dir_all(&snapshots).expect("should create snapshot dir");
    std::fs::write(snapshots.join("web.json"), WEB_SNAPSHOT).expect("should write snapshot");

    let config_path = root.join("elbenwald.toml");
    let config = format!(
        r#"
[check]
load_balancers = ["web"]
log_path = "{log}"

[source]
kind = "file"
snapshot_dir = "{snapshots}"
"#,
        log = log_path.display(),
        snapshots = snapshots.display(),
    );
    std::fs::write(&config_path, config).expect("should write config");
    config_path
}

fn elbenwald(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_elbenwald"))
        .args(args)
        .env_remove("RUST_LOG")
        .env("NO_COLOR", "1")
        .output()
        .expect("should run elbenwald binary")
}

#[test]
fn test_check_prints_json_report_and_logs_failures() {
    // Given: A fleet with one healthy, one transient and one failed zone
    let temp_dir = TempDir::new().expect("should create temp dir");
    let log_path = temp_dir.path().join("log/elbenwald.log");
    let config = write_config(temp_dir.path(), &log_path);

    // When: Running a JSON check
    let output = elbenwald(&[
        "--config",
        config.to_str().expect("utf-8 path"),
        "--output",
        "json",
        "check",
    ]);

    // Then: Exit 0 with the report on stdout
    assert_eq!(output.status.code(), Some(0), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let report: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout should be one JSON document");
    assert_eq!(report["load_balancer"], "web");
    assert_eq!(report["report"]["total"], 3);
    assert_eq!(report["report"]["zone_stats"]["eu-west-1c"]["healthy_count"], 0);
    assert_eq!(report["report"]["unknown_zones"], 1);

    // Then: Both non-service instances appended to the error log
    let log = std::fs::read_to_string(&log_path).expect("should read error log");
    assert_eq!(log.lines().count(), 2);
    assert!(log.contains("] [web] [eu-west-1b] [i-b1] [A transient error occurred."));
}

#[test]
fn test_check_text_output() {
    // Given: A valid config
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config = write_config(temp_dir.path(), &temp_dir.path().join("elbenwald.log"));

    // When: Running a text check
    let output = elbenwald(&["--config", config.to_str().expect("utf-8 path"), "check"]);

    // Then: A zone table is printed
    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Load balancer: web"));
    assert!(stdout.contains("eu-west-1b"));
    assert!(stdout.contains("Minimum: 0"));
}

#[test]
fn test_check_unknown_load_balancer_exits_5() {
    // Given: A load balancer without snapshot
    let temp_dir = TempDir::new().expect("should create temp dir");
    let log_path = temp_dir.path().join("elbenwald.log");
    let config = write_config(temp_dir.path(), &log_path);

    // When: Checking it by name
    let output = elbenwald(&[
        "--config",
        config.to_str().expect("utf-8 path"),
        "check",
        "-b",
        "ghost",
    ]);

    // Then: Exit 5, nothing printed, nothing logged
    assert_eq!(output.status.code(), Some(5));
    assert!(output.stdout.is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).contains("ghost"));
    assert!(!log_path.exists());
}

#[test]
fn test_check_unwritable_log_exits_6_after_report() {
    // Given: An error log path below a regular file
    let temp_dir = TempDir::new().expect("should create temp dir");
    let blocker = temp_dir.path().join("not-a-dir");
    std::fs::write(&blocker, "").expect("should write blocker");
    let config = write_config(temp_dir.path(), &blocker.join("elbenwald.log"));

    // When: Running a JSON check
    let output = elbenwald(&[
        "--config",
        config.to_str().expect("utf-8 path"),
        "--output",
        "json",
        "check",
    ]);

    // Then: The report is still printed but the exit code flags delivery
    assert_eq!(output.status.code(), Some(6));
    let report: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("report should still be printed");
    assert_eq!(report["report"]["zones"], 3);
}

#[test]
fn test_config_validate_invalid_exits_2() {
    // Given: A config with an unknown source kind
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config_path = temp_dir.path().join("elbenwald.toml");
    std::fs::write(
        &config_path,
        "[check]\nload_balancers = [\"web\"]\n\n[source]\nkind = \"carrier-pigeon\"\n",
    )
    .expect("should write config");

    // When: Validating as JSON
    let output = elbenwald(&[
        "--config",
        config_path.to_str().expect("utf-8 path"),
        "config",
        "validate",
        "--output",
        "json",
    ]);

    // Then: Exit 2 with a validation report naming the field
    assert_eq!(output.status.code(), Some(2));
    let report: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("validation report should be JSON");
    assert_eq!(report["valid"], false);
    assert!(
        report["errors"][0]
            .as_str()
            .unwrap_or_default()
            .contains("source.kind")
    );
}

#[test]
fn test_config_validate_valid_exits_0() {
    // Given: A valid config
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config = write_config(temp_dir.path(), &temp_dir.path().join("elbenwald.log"));

    // When: Validating
    let output = elbenwald(&["--config", config.to_str().expect("utf-8 path"), "config", "validate"]);

    // Then: Exit 0
    assert_eq!(output.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&output.stdout).contains("VALID"));
}

#[test]
fn test_config_show_section_as_json() {
    // Given: A valid config
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config = write_config(temp_dir.path(), &temp_dir.path().join("elbenwald.log"));

    // When: Showing the source section
    let output = elbenwald(&[
        "--config",
        config.to_str().expect("utf-8 path"),
        "--output",
        "json",
        "config",
        "show",
        "--section",
        "source",
    ]);

    // Then: Only that section is rendered
    assert_eq!(output.status.code(), Some(0));
    let report: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("config report should be JSON");
    assert_eq!(report["section"], "source");
    assert_eq!(report["config"]["kind"], "file");
}

#[test]
fn test_config_show_unknown_section_exits_1() {
    // Given: A valid config
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config = write_config(temp_dir.path(), &temp_dir.path().join("elbenwald.log"));

    // When: Asking for a section that does not exist
    let output = elbenwald(&[
        "--config",
        config.to_str().expect("utf-8 path"),
        "config",
        "show",
        "--section",
        "ebpf",
    ]);

    // Then: Exit 1
    assert_eq!(output.status.code(), Some(1));
}
