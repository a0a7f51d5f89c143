use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::models::cloud_config::{value_to_string, CacheSettings, CloudConfig, ConfigMap};
use crate::services::auth::load_auth_plugin;
use crate::utils::config::{current_env, find_config_file, get_user_cache_dir, EnvVars};
use crate::utils::error::{OccError, Result};

/// Name of the cloud built from `OS_*` environment variables
pub const ENVVARS_CLOUD: &str = "envvars";

/// Default cache backend (caching disabled)
pub const DEFAULT_CACHE_CLASS: &str = "dogpile.cache.null";

/// Environment variables that select a cloud rather than describe one
const SELECTOR_VARS: &[&str] = &["OS_CLOUD", "OS_CLIENT_CONFIG_FILE"];

/// `OS_*` variables that belong in the `auth` section
const AUTH_KEYS: &[&str] = &[
    "auth_url",
    "username",
    "user_id",
    "password",
    "token",
    "project_id",
    "project_name",
    "tenant_id",
    "tenant_name",
    "user_domain_id",
    "user_domain_name",
    "project_domain_id",
    "project_domain_name",
    "domain_id",
    "domain_name",
    "application_credential_id",
    "application_credential_name",
    "application_credential_secret",
];

/// `OS_*` names that are spelled differently inside `auth`
const AUTH_ALIASES: &[(&str, &str)] = &[("auth_token", "token")];

#[derive(Debug, Default, Deserialize)]
struct CloudsFile {
    #[serde(default)]
    clouds: BTreeMap<String, Value>,
    #[serde(default)]
    client: ClientSection,
    #[serde(default)]
    cache: Option<CacheSection>,
}

#[derive(Debug, Default, Deserialize)]
struct ClientSection {
    #[serde(default)]
    force_ipv4: bool,
}

#[derive(Debug, Default, Deserialize)]
struct CacheSection {
    #[serde(default, alias = "max_age")]
    expiration_time: Option<i64>,
    #[serde(default)]
    path: Option<PathBuf>,
    #[serde(default)]
    class: Option<String>,
    #[serde(default)]
    arguments: Map<String, Value>,
    #[serde(default)]
    expiration: Map<String, Value>,
}

impl CacheSection {
    fn into_settings(self) -> CacheSettings {
        CacheSettings {
            expiration_time: self.expiration_time.unwrap_or(0),
            path: self.path.unwrap_or_else(get_user_cache_dir),
            class: self.class.unwrap_or_else(|| DEFAULT_CACHE_CLASS.to_string()),
            arguments: self.arguments,
            expiration: self.expiration,
        }
    }
}

/// Settings every cloud starts from before its own values are applied
pub fn default_config() -> ConfigMap {
    [
        ("auth_type", Value::from("password")),
        ("interface", Value::from("public")),
        ("verify", Value::Bool(true)),
        ("cacert", Value::Null),
        ("cert", Value::Null),
        ("key", Value::Null),
        ("api_timeout", Value::Null),
        ("identity_api_version", Value::from("3")),
        ("compute_api_version", Value::from("2")),
        ("image_api_version", Value::from("2")),
        ("network_api_version", Value::from("2")),
        ("volume_api_version", Value::from("2")),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

/// Loaded clouds.yaml plus environment, producing [`CloudConfig`] values
#[derive(Debug, Clone)]
pub struct OpenStackConfig {
    config_file: Option<PathBuf>,
    clouds: BTreeMap<String, ConfigMap>,
    force_ipv4: bool,
    cache: Arc<CacheSettings>,
    default_cloud: Option<String>,
}

impl OpenStackConfig {
    /// Load from the standard locations and the process environment
    pub fn load() -> Result<Self> {
        let env = current_env();
        let file = find_config_file(&env);
        Self::load_with(file.as_deref(), &env)
    }

    /// Load from an explicit file (if any) and an environment snapshot
    pub fn load_with(file: Option<&Path>, env: &EnvVars) -> Result<Self> {
        let content = match file {
            Some(path) => {
                tracing::debug!(path = %path.display(), "Loading cloud configuration");
                Some(fs::read_to_string(path).map_err(|e| {
                    OccError::ConfigError(format!("Failed to read {}: {}", path.display(), e))
                })?)
            }
            None => None,
        };

        let mut config = Self::from_yaml_str(content.as_deref().unwrap_or(""), env)?;
        config.config_file = file.map(Path::to_path_buf);
        Ok(config)
    }

    /// Build from clouds.yaml content and an environment snapshot
    pub fn from_yaml_str(content: &str, env: &EnvVars) -> Result<Self> {
        let parsed: CloudsFile = if content.trim().is_empty() {
            CloudsFile::default()
        } else {
            serde_yaml::from_str(content)?
        };

        let mut clouds = BTreeMap::new();
        for (name, value) in parsed.clouds {
            let Value::Object(map) = value else {
                return Err(OccError::ConfigError(format!(
                    "Cloud '{}' must be a mapping",
                    name
                )));
            };
            clouds.insert(name, normalize_keys(map.into_iter().collect()));
        }

        if let Some(env_cloud) = env_cloud(env) {
            clouds.insert(ENVVARS_CLOUD.to_string(), env_cloud);
        }

        let force_ipv4 = parsed.client.force_ipv4
            || env
                .get("OS_FORCE_IPV4")
                .is_some_and(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"));

        Ok(Self {
            config_file: None,
            clouds,
            force_ipv4,
            cache: Arc::new(parsed.cache.unwrap_or_default().into_settings()),
            default_cloud: env.get("OS_CLOUD").filter(|c| !c.is_empty()).cloned(),
        })
    }

    /// File the configuration was read from
    pub fn config_file(&self) -> Option<&Path> {
        self.config_file.as_deref()
    }

    pub fn get_cloud_names(&self) -> Vec<String> {
        self.clouds.keys().cloned().collect()
    }

    pub fn force_ipv4(&self) -> bool {
        self.force_ipv4
    }

    pub fn cache_settings(&self) -> &Arc<CacheSettings> {
        &self.cache
    }

    pub fn get_cache_expiration_time(&self) -> i64 {
        self.cache.expiration_time
    }

    pub fn get_cache_path(&self) -> &Path {
        &self.cache.path
    }

    pub fn get_cache_class(&self) -> &str {
        &self.cache.class
    }

    pub fn get_cache_arguments(&self) -> &Map<String, Value> {
        &self.cache.arguments
    }

    pub fn get_cache_expiration(&self) -> &Map<String, Value> {
        &self.cache.expiration
    }

    fn cloud(&self, name: &str) -> Result<&ConfigMap> {
        self.clouds
            .get(name)
            .ok_or_else(|| OccError::ConfigError(format!("Cloud {} was not found.", name)))
    }

    /// Region names configured for a cloud; a single empty name when none are
    pub fn get_regions(&self, cloud: &str) -> Result<Vec<String>> {
        let config = self.cloud(cloud)?;
        let regions = region_names(config);
        if !regions.is_empty() {
            return Ok(regions);
        }
        Ok(vec![config
            .get("region_name")
            .and_then(value_to_string)
            .unwrap_or_default()])
    }

    fn resolve_cloud_name(&self, cloud: Option<&str>) -> Result<String> {
        if let Some(name) = cloud.or(self.default_cloud.as_deref()) {
            return Ok(name.to_string());
        }
        if self.clouds.contains_key(ENVVARS_CLOUD) {
            return Ok(ENVVARS_CLOUD.to_string());
        }
        if self.clouds.len() == 1 {
            if let Some(name) = self.clouds.keys().next() {
                return Ok(name.clone());
            }
        }
        Err(OccError::ConfigError(
            "No cloud specified. Pass a cloud name or set OS_CLOUD.".to_string(),
        ))
    }

    /// Resolve one cloud in one region, applying `overrides` last
    ///
    /// Null override values are ignored, and an `auth` override is merged
    /// key by key into the cloud's auth section.
    pub fn get_one_cloud(
        &self,
        cloud: Option<&str>,
        region: Option<&str>,
        overrides: ConfigMap,
    ) -> Result<CloudConfig> {
        let name = self.resolve_cloud_name(cloud)?;
        let cloud_config = self.cloud(&name)?;

        let regions = region_names(cloud_config);
        let region = match region.filter(|r| !r.is_empty()) {
            Some(region) => region.to_string(),
            None => cloud_config
                .get("region_name")
                .and_then(value_to_string)
                .or_else(|| regions.first().cloned())
                .unwrap_or_default(),
        };
        if !regions.is_empty() && !region.is_empty() && !regions.contains(&region) {
            return Err(OccError::ConfigError(format!(
                "Region {} is not a valid region name for cloud {}. Valid choices are {}.",
                region,
                name,
                regions.join(", ")
            )));
        }

        let mut config = default_config();
        let mut own = cloud_config.clone();
        let region_values = region_values(&own, &region);
        own.remove("regions");
        merge_config(&mut config, own);
        merge_config(&mut config, region_values);
        merge_config(
            &mut config,
            normalize_keys(overrides.into_iter().filter(|(_, v)| !v.is_null()).collect()),
        );
        config.insert("region_name".to_string(), Value::String(region.clone()));

        let mut result = CloudConfig::new(&name, &region, config)
            .with_force_ipv4(self.force_ipv4)
            .with_cache_settings(Arc::clone(&self.cache));

        let auth_type = result
            .config
            .get("auth_type")
            .and_then(value_to_string)
            .unwrap_or_else(|| "password".to_string());
        let auth_args = result.get_auth_args().cloned().unwrap_or_default();
        match load_auth_plugin(&auth_type, &auth_args) {
            Ok(plugin) => result = result.with_auth_plugin(Arc::from(plugin)),
            Err(e) => tracing::debug!(cloud = %name, error = %e, "No usable auth plugin"),
        }

        Ok(result)
    }

    /// Every cloud in every configured region
    pub fn get_all_clouds(&self) -> Result<Vec<CloudConfig>> {
        let mut all = Vec::new();
        for name in self.clouds.keys() {
            for region in self.get_regions(name)? {
                all.push(self.get_one_cloud(Some(name), Some(&region), ConfigMap::new())?);
            }
        }
        Ok(all)
    }
}

/// Replace `-` with `_` in keys, including the nested `auth` section
fn normalize_keys(config: ConfigMap) -> ConfigMap {
    config
        .into_iter()
        .map(|(key, value)| {
            let key = key.replace('-', "_");
            let value = match value {
                Value::Object(map) if key == "auth" => Value::Object(
                    map.into_iter()
                        .map(|(k, v)| (k.replace('-', "_"), v))
                        .collect(),
                ),
                other => other,
            };
            (key, value)
        })
        .collect()
}

/// Apply `overlay` on top of `base`, merging `auth` maps key by key
fn merge_config(base: &mut ConfigMap, overlay: ConfigMap) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) if key == "auth" => {
                existing.extend(incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

/// Names from a `regions` list of strings or `{name, values}` mappings
fn region_names(config: &ConfigMap) -> Vec<String> {
    let Some(Value::Array(regions)) = config.get("regions") else {
        return Vec::new();
    };
    regions
        .iter()
        .filter_map(|region| match region {
            Value::String(name) => Some(name.clone()),
            Value::Object(map) => map.get("name").and_then(value_to_string),
            _ => None,
        })
        .collect()
}

/// Region-specific `values` for the selected region
fn region_values(config: &ConfigMap, region: &str) -> ConfigMap {
    let Some(Value::Array(regions)) = config.get("regions") else {
        return ConfigMap::new();
    };
    regions
        .iter()
        .filter_map(Value::as_object)
        .find(|map| map.get("name").and_then(Value::as_str) == Some(region))
        .and_then(|map| map.get("values"))
        .and_then(Value::as_object)
        .map(|values| normalize_keys(values.clone().into_iter().collect()))
        .unwrap_or_default()
}

/// Cloud described by `OS_*` variables, if any are set
fn env_cloud(env: &EnvVars) -> Option<ConfigMap> {
    let vars: Vec<(String, &String)> = env
        .iter()
        .filter(|(key, _)| key.starts_with("OS_") && !SELECTOR_VARS.contains(&key.as_str()))
        .map(|(key, value)| (key["OS_".len()..].to_ascii_lowercase(), value))
        .collect();

    let auth_key = |key: &str| -> Option<&'static str> {
        AUTH_ALIASES
            .iter()
            .find(|(alias, _)| *alias == key)
            .map(|(_, target)| *target)
            .or_else(|| AUTH_KEYS.iter().find(|k| **k == key).copied())
    };
    if !vars.iter().any(|(key, _)| auth_key(key).is_some()) {
        return None;
    }

    // vars are sorted, so OS_TOKEN wins over OS_AUTH_TOKEN
    let mut config = ConfigMap::new();
    let mut auth = Map::new();
    for (key, value) in vars {
        match auth_key(&key) {
            Some(name) => {
                auth.insert(name.to_string(), Value::String(value.clone()));
            }
            None => {
                config.insert(key, Value::String(value.clone()));
            }
        }
    }
    config.insert("auth".to_string(), Value::Object(auth));
    Some(config)
}
