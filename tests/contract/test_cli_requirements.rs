use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Contract tests for `occ requirements`

const MANIFEST: &str = "\
# The order of packages is significant.
PyYAML>=3.1.0 # MIT
appdirs>=1.3.0 # MIT License
keystoneauth1>=2.1.0 # Apache-2.0
requestsexceptions>=1.1.1 # Apache-2.0
";

fn occ(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("occ").unwrap();
    cmd.current_dir(dir).env_clear().env("HOME", dir.path());
    cmd
}

#[test]
fn test_requirements_lists_in_order() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("requirements.txt"), MANIFEST).unwrap();

    occ(&temp_dir)
        .arg("requirements")
        .assert()
        .success()
        .stdout(predicate::str::contains("4 requirements"))
        .stdout(predicate::str::contains("1. PyYAML >= 3.1.0  (MIT)"))
        .stdout(predicate::str::contains("4. requestsexceptions >= 1.1.1"));
}

#[test]
fn test_requirements_json() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("requirements.txt"), MANIFEST).unwrap();

    let output = occ(&temp_dir)
        .args(["requirements", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["status"], "ok");
    assert_eq!(json["count"], 4);
    assert_eq!(json["requirements"][2]["name"], "keystoneauth1");
    assert_eq!(json["requirements"][2]["comparator"], ">=");
    assert_eq!(json["requirements"][1]["annotation"], "MIT License");
}

#[test]
fn test_requirements_expect_order() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("requirements.txt"), MANIFEST).unwrap();

    occ(&temp_dir)
        .args([
            "requirements",
            "--expect-order",
            "PyYAML,appdirs,keystoneauth1,requestsexceptions",
        ])
        .assert()
        .success();

    occ(&temp_dir)
        .args([
            "requirements",
            "--expect-order",
            "appdirs,PyYAML,keystoneauth1,requestsexceptions",
        ])
        .assert()
        .failure()
        .code(65)
        .stderr(predicate::str::contains("Unexpected order"));
}

#[test]
fn test_requirements_duplicate_fails() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("dupes.txt");
    fs::write(&path, "PyYAML>=3.1.0\nappdirs>=1.3.0\nPyYAML>=3.1.0\n").unwrap();

    occ(&temp_dir)
        .args(["requirements", "--file", "dupes.txt"])
        .assert()
        .failure()
        .code(65)
        .stderr(predicate::str::contains("duplicates the requirement on line 1"));
}

#[test]
fn test_requirements_malformed_line_fails() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("requirements.txt"), "PyYAML\n").unwrap();

    occ(&temp_dir)
        .arg("requirements")
        .assert()
        .failure()
        .stderr(predicate::str::contains("line 1"));
}

#[test]
fn test_requirements_missing_file() {
    let temp_dir = TempDir::new().unwrap();

    occ(&temp_dir)
        .arg("requirements")
        .assert()
        .failure()
        .code(74);
}

#[test]
fn test_shipped_manifest_passes() {
    let temp_dir = TempDir::new().unwrap();
    let shipped = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("requirements.txt");

    occ(&temp_dir)
        .args(["requirements", "--file"])
        .arg(shipped)
        .args(["--expect-order", "PyYAML,appdirs,keystoneauth1,requestsexceptions"])
        .assert()
        .success()
        .stdout(predicate::str::contains("4 requirements"));
}
