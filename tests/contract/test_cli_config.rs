use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Contract tests for `occ clouds` and `occ show`

const CLOUDS: &str = r#"
clouds:
  devstack:
    auth:
      auth_url: http://127.0.0.1:5000
      username: demo
      password: supersecret
      project_name: demo
    region_name: RegionOne
    compute_api_version: "2.1"
  multi:
    auth:
      auth_url: http://127.0.0.1:5000
      token: abc
    auth_type: token
    regions:
      - east
      - west
"#;

fn occ(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("occ").unwrap();
    cmd.current_dir(dir).env_clear().env("HOME", dir.path());
    cmd
}

fn setup() -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("clouds.yaml"), CLOUDS).unwrap();
    temp_dir
}

#[test]
fn test_clouds_lists_regions() {
    let temp_dir = setup();

    occ(&temp_dir)
        .arg("clouds")
        .assert()
        .success()
        .stdout(predicate::str::contains("devstack: RegionOne"))
        .stdout(predicate::str::contains("multi: east, west"));
}

#[test]
fn test_clouds_json() {
    let temp_dir = setup();

    let output = occ(&temp_dir).args(["clouds", "--json"]).output().unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["clouds"][0]["name"], "devstack");
    assert_eq!(json["clouds"][1]["regions"], serde_json::json!(["east", "west"]));
    assert!(json["config_file"].as_str().unwrap().ends_with("clouds.yaml"));
}

#[test]
fn test_clouds_explicit_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("elsewhere.yaml");
    fs::write(&path, CLOUDS).unwrap();

    occ(&temp_dir)
        .env("OS_CLIENT_CONFIG_FILE", &path)
        .arg("clouds")
        .assert()
        .success()
        .stdout(predicate::str::contains("devstack"));
}

#[test]
fn test_clouds_empty() {
    let temp_dir = TempDir::new().unwrap();

    occ(&temp_dir)
        .arg("clouds")
        .assert()
        .success()
        .stdout(predicate::str::contains("No clouds configured."));
}

#[test]
fn test_show_masks_secrets() {
    let temp_dir = setup();

    occ(&temp_dir)
        .args(["show", "devstack"])
        .assert()
        .success()
        .stdout(predicate::str::contains("cloud: devstack"))
        .stdout(predicate::str::contains("region: RegionOne"))
        .stdout(predicate::str::contains("compute_api_version"))
        .stdout(predicate::str::contains("supersecret").not());
}

#[test]
fn test_show_json_with_region() {
    let temp_dir = setup();

    let output = occ(&temp_dir)
        .args(["show", "multi", "--region", "west", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["name"], "multi");
    assert_eq!(json["region"], "west");
    assert_eq!(json["config"]["auth"]["token"], "***");
    assert_eq!(json["config"]["region_name"], "west");
    assert_eq!(json["services"], serde_json::json!(["compute", "identity", "image", "network", "volume"]));
}

#[test]
fn test_show_masks_env_credentials() {
    let temp_dir = TempDir::new().unwrap();

    let output = occ(&temp_dir)
        .env("OS_AUTH_URL", "http://127.0.0.1:5000")
        .env("OS_AUTH_TYPE", "v3applicationcredential")
        .env("OS_APPLICATION_CREDENTIAL_ID", "ac-id")
        .env("OS_APPLICATION_CREDENTIAL_SECRET", "topsecret")
        .env("OS_AUTH_TOKEN", "tok123")
        .args(["show", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(!stdout.contains("topsecret"));
    assert!(!stdout.contains("tok123"));

    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(json["name"], "envvars");
    assert_eq!(json["config"]["auth"]["application_credential_secret"], "***");
    assert_eq!(json["config"]["auth"]["token"], "***");
    assert_eq!(json["config"]["auth"]["application_credential_id"], "ac-id");

    occ(&temp_dir)
        .env("OS_AUTH_URL", "http://127.0.0.1:5000")
        .env("OS_APPLICATION_CREDENTIAL_SECRET", "topsecret")
        .arg("show")
        .assert()
        .success()
        .stdout(predicate::str::contains("topsecret").not());
}

#[test]
fn test_show_uses_os_cloud() {
    let temp_dir = setup();

    occ(&temp_dir)
        .env("OS_CLOUD", "multi")
        .arg("show")
        .assert()
        .success()
        .stdout(predicate::str::contains("cloud: multi"))
        .stdout(predicate::str::contains("region: east"));
}

#[test]
fn test_show_unknown_cloud() {
    let temp_dir = setup();

    occ(&temp_dir)
        .args(["show", "nope"])
        .assert()
        .failure()
        .code(78)
        .stderr(predicate::str::contains("Cloud nope was not found."));
}

#[test]
fn test_show_invalid_region() {
    let temp_dir = setup();

    occ(&temp_dir)
        .args(["show", "multi", "--region", "north"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a valid region name"));
}
