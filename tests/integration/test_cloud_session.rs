use assert_cmd::Command;
use mockito::{Matcher, Server};
use predicates::prelude::*;
use serde_json::json;
use std::fs;
use tempfile::TempDir;

use occ::models::cloud_config::{ClientOptions, ConfigMap};
use occ::services::openstack_config::OpenStackConfig;
use occ::utils::config::{EnvVars, CONFIG_FILE_ENV};

/// End-to-end: clouds.yaml -> CloudConfig -> identity session -> endpoint

fn token_body() -> String {
    json!({
        "token": {
            "methods": ["password"],
            "expires_at": "2099-01-01T00:00:00.000000Z",
            "catalog": [
                {"type": "compute", "name": "nova", "endpoints": [
                    {"interface": "public", "region_id": "RegionOne", "url": "https://compute.r1/v2.1"},
                    {"interface": "public", "region_id": "RegionTwo", "url": "https://compute.r2/v2.1"},
                    {"interface": "admin", "region_id": "RegionOne", "url": "https://compute-admin.r1/v2.1"}
                ]},
                {"type": "volumev3", "name": "cinderv3", "endpoints": [
                    {"interface": "public", "region_id": "RegionOne", "url": "https://volume.r1/v3/p1"}
                ]}
            ]
        }
    })
    .to_string()
}

fn clouds_yaml(auth_url: &str) -> String {
    format!(
        r#"
cache:
  expiration_time: 120
  expiration:
    server: 10
clouds:
  devstack:
    auth:
      auth_url: {auth_url}
      username: demo
      password: secret
      project_name: demo
    regions:
      - RegionOne
      - RegionTwo
    volume_service_type: volumev3
    api_timeout: 20
  static:
    auth:
      auth_url: {auth_url}
      username: demo
      password: secret
    compute_endpoint: https://pinned.example.com/compute
"#
    )
}

fn write_config(dir: &TempDir, auth_url: &str) -> std::path::PathBuf {
    let path = dir.path().join("clouds.yaml");
    fs::write(&path, clouds_yaml(auth_url)).unwrap();
    path
}

#[tokio::test]
async fn test_load_and_resolve_endpoints() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/v3/auth/tokens")
        .match_body(Matcher::PartialJson(json!({
            "auth": {"scope": {"project": {"name": "demo"}}}
        })))
        .with_status(201)
        .with_header("X-Subject-Token", "tok-1")
        .with_body(token_body())
        .expect(1)
        .create_async()
        .await;

    let temp_dir = TempDir::new().unwrap();
    let path = write_config(&temp_dir, &server.url());
    let config = OpenStackConfig::load_with(Some(&path), &EnvVars::new()).unwrap();
    assert_eq!(config.config_file(), Some(path.as_path()));

    let cloud = config
        .get_one_cloud(Some("devstack"), Some("RegionTwo"), ConfigMap::new())
        .unwrap();
    assert_eq!(
        cloud.get_session_endpoint("compute").await.unwrap().as_deref(),
        Some("https://compute.r2/v2.1")
    );
    assert_eq!(cloud.get_cache_expiration_time(), Some(120));
    assert_eq!(cloud.get_cache_resource_expiration("server", None).unwrap(), Some(10.0));
    assert_eq!(
        cloud.get_session().unwrap().timeout(),
        Some(std::time::Duration::from_secs(20))
    );

    mock.assert_async().await;
}

#[tokio::test]
async fn test_service_type_override_and_legacy_options() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/v3/auth/tokens")
        .with_status(201)
        .with_header("X-Subject-Token", "tok-2")
        .with_body(token_body())
        .create_async()
        .await;

    let temp_dir = TempDir::new().unwrap();
    let path = write_config(&temp_dir, &server.url());
    let config = OpenStackConfig::load_with(Some(&path), &EnvVars::new()).unwrap();
    let cloud = config
        .get_one_cloud(Some("devstack"), Some("RegionOne"), ConfigMap::new())
        .unwrap();

    assert_eq!(cloud.get_service_type("volume"), "volumev3");
    assert_eq!(
        cloud.get_session_endpoint("volume").await.unwrap().as_deref(),
        Some("https://volume.r1/v3/p1")
    );

    let Some(ClientOptions::Service(options)) = cloud
        .get_legacy_client("volume", None, true, ConfigMap::new())
        .await
        .unwrap()
    else {
        panic!("expected service options");
    };
    assert_eq!(options.service_type, "volumev3");
    assert_eq!(options.version.as_deref(), Some("2"));
    assert_eq!(options.interface_key, "endpoint_type");
}

#[tokio::test]
async fn test_endpoint_override_skips_identity() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/v3/auth/tokens")
        .expect(0)
        .create_async()
        .await;

    let temp_dir = TempDir::new().unwrap();
    let path = write_config(&temp_dir, &server.url());
    let config = OpenStackConfig::load_with(Some(&path), &EnvVars::new()).unwrap();
    let cloud = config.get_one_cloud(Some("static"), None, ConfigMap::new()).unwrap();

    assert_eq!(
        cloud.get_session_endpoint("compute").await.unwrap().as_deref(),
        Some("https://pinned.example.com/compute")
    );
    mock.assert_async().await;
}

#[test]
fn test_cli_endpoint() {
    let mut server = Server::new();
    let _mock = server
        .mock("POST", "/v3/auth/tokens")
        .with_status(201)
        .with_header("X-Subject-Token", "tok-3")
        .with_body(token_body())
        .create();

    let temp_dir = TempDir::new().unwrap();
    let path = write_config(&temp_dir, &server.url());

    Command::cargo_bin("occ")
        .unwrap()
        .current_dir(&temp_dir)
        .env_clear()
        .env("HOME", temp_dir.path())
        .env(CONFIG_FILE_ENV, &path)
        .args(["endpoint", "compute", "--cloud", "devstack", "--interface", "admin"])
        .assert()
        .success()
        .stdout(predicate::str::diff("https://compute-admin.r1/v2.1\n"));
}

#[test]
fn test_cli_endpoint_unknown_service() {
    let mut server = Server::new();
    let _mock = server
        .mock("POST", "/v3/auth/tokens")
        .with_status(201)
        .with_header("X-Subject-Token", "tok-4")
        .with_body(token_body())
        .create();

    let temp_dir = TempDir::new().unwrap();
    let path = write_config(&temp_dir, &server.url());

    Command::cargo_bin("occ")
        .unwrap()
        .current_dir(&temp_dir)
        .env_clear()
        .env("HOME", temp_dir.path())
        .env(CONFIG_FILE_ENV, &path)
        .args(["endpoint", "dns", "--cloud", "devstack"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No endpoint found for service 'dns'"));
}

#[test]
fn test_cli_endpoint_rejected_credentials() {
    let mut server = Server::new();
    let _mock = server
        .mock("POST", "/v3/auth/tokens")
        .with_status(401)
        .create();

    let temp_dir = TempDir::new().unwrap();
    let path = write_config(&temp_dir, &server.url());

    Command::cargo_bin("occ")
        .unwrap()
        .current_dir(&temp_dir)
        .env_clear()
        .env("HOME", temp_dir.path())
        .env(CONFIG_FILE_ENV, &path)
        .args(["endpoint", "compute", "--cloud", "devstack"])
        .assert()
        .failure()
        .code(77)
        .stderr(predicate::str::contains("Authentication rejected"));
}
