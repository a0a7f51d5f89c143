use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{btree_map, BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::models::catalog::EndpointFilter;
use crate::services::auth::AuthPlugin;
use crate::services::session::Session;
use crate::utils::error::{OccError, Result};

/// Resolved key/value settings of one cloud
pub type ConfigMap = BTreeMap<String, Value>;

/// Setting names whose values are never printed
const SECRET_KEYS: &[&str] = &["password", "token", "secret", "auth_token"];

/// Suffixes that mark a setting as secret (`admin_password`, `application_credential_secret`)
const SECRET_SUFFIXES: &[&str] = &["_password", "_secret", "_token"];

/// Server certificate verification mode
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verify {
    /// Accept any server certificate
    Disabled,
    /// Verify against the system trust store
    System,
    /// Verify against the given CA bundle
    CaBundle(PathBuf),
}

impl Verify {
    pub fn is_enabled(&self) -> bool {
        !matches!(self, Verify::Disabled)
    }
}

/// TLS client certificate, with the key when it lives in a separate file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientCert {
    pub cert: PathBuf,
    pub key: Option<PathBuf>,
}

/// Cache settings shared by every cloud of a configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Default expiration time in seconds
    pub expiration_time: i64,
    pub path: PathBuf,
    pub class: String,
    pub arguments: Map<String, Value>,
    /// Per-resource expiration overrides
    pub expiration: Map<String, Value>,
}

/// Constructor options for a per-service API client
#[derive(Debug, Clone)]
pub enum ClientOptions {
    Service(ServiceClientOptions),
    ObjectStore(ObjectStoreOptions),
}

#[derive(Debug, Clone)]
pub struct ServiceClientOptions {
    pub session: Arc<Session>,
    /// Positional API version, present when the version argument is passed
    pub version: Option<String>,
    pub service_name: Option<String>,
    pub service_type: String,
    pub region_name: String,
    /// Option name the interface is passed under (`interface` or `endpoint_type`)
    pub interface_key: String,
    pub interface: Option<String>,
    pub endpoint: Option<String>,
    /// Caller supplied pass-through options
    pub extra: ConfigMap,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectStoreOptions {
    pub preauth_url: String,
    pub preauth_token: String,
    pub auth_version: Option<String>,
    pub region_name: String,
    pub timeout: Option<Duration>,
}

/// Configuration of one cloud in one region
#[derive(Debug)]
pub struct CloudConfig {
    pub name: String,
    pub region: String,
    pub config: ConfigMap,
    force_ipv4: bool,
    auth_plugin: Option<Arc<dyn AuthPlugin>>,
    cache: Option<Arc<CacheSettings>>,
    session: Mutex<Option<Arc<Session>>>,
}

impl PartialEq for CloudConfig {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.region == other.region && self.config == other.config
    }
}

impl<'a> IntoIterator for &'a CloudConfig {
    type Item = &'a String;
    type IntoIter = btree_map::Keys<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.config.keys()
    }
}

impl CloudConfig {
    pub fn new(name: &str, region: &str, config: ConfigMap) -> Self {
        Self {
            name: name.to_string(),
            region: region.to_string(),
            config,
            force_ipv4: false,
            auth_plugin: None,
            cache: None,
            session: Mutex::new(None),
        }
    }

    pub fn with_force_ipv4(mut self, force_ipv4: bool) -> Self {
        self.force_ipv4 = force_ipv4;
        self
    }

    pub fn with_auth_plugin(mut self, plugin: Arc<dyn AuthPlugin>) -> Self {
        self.auth_plugin = Some(plugin);
        self
    }

    pub fn with_cache_settings(mut self, cache: Arc<CacheSettings>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Arbitrary attribute lookup
    ///
    /// A leading `os_` is ignored and `-` in config keys matches `_`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        let key = key.strip_prefix("os_").unwrap_or(key);
        self.config
            .iter()
            .find(|(k, _)| k.replace('-', "_") == key)
            .map(|(_, v)| v)
    }

    /// Config keys in order
    pub fn keys(&self) -> btree_map::Keys<'_, String, Value> {
        self.config.keys()
    }

    fn string(&self, key: &str) -> Option<String> {
        self.config.get(key).and_then(value_to_string)
    }

    fn flag(&self, key: &str, default: bool) -> bool {
        match self.config.get(key) {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => match s.to_ascii_lowercase().as_str() {
                "true" | "yes" | "1" => true,
                "false" | "no" | "0" => false,
                _ => default,
            },
            Some(Value::Number(n)) => n.as_i64() != Some(0),
            _ => default,
        }
    }

    /// Verification mode and client certificate for HTTPS requests
    pub fn get_requests_verify_args(&self) -> (Verify, Option<ClientCert>) {
        let cacert = self.string("cacert");
        let verify = if self.flag("verify", true) {
            cacert.map_or(Verify::System, |ca| Verify::CaBundle(PathBuf::from(ca)))
        } else {
            if cacert.is_some() {
                tracing::warn!(
                    "You are specifying a cacert for the cloud {} but also to ignore the host \
                     verification. The host SSL cert will not be verified.",
                    self.name
                );
            }
            Verify::Disabled
        };

        let cert = self.string("cert").map(|cert| ClientCert {
            cert: PathBuf::from(cert),
            key: self.string("key").map(PathBuf::from),
        });

        (verify, cert)
    }

    /// Service keys this config carries per-service settings for
    pub fn get_services(&self) -> Vec<String> {
        let services: BTreeSet<String> = self
            .config
            .keys()
            .filter(|key| {
                key.ends_with("api_version")
                    || key.ends_with("service_type")
                    || key.ends_with("service_name")
            })
            .filter_map(|key| {
                let parts: Vec<&str> = key.split('_').collect();
                let service = parts[..parts.len().saturating_sub(2)].join("_");
                (!service.is_empty()).then_some(service)
            })
            .collect();
        services.into_iter().collect()
    }

    pub fn get_auth_args(&self) -> Option<&Map<String, Value>> {
        self.config.get("auth").and_then(Value::as_object)
    }

    pub fn get_interface(&self, service_type: Option<&str>) -> Option<String> {
        let interface = self.string("interface");
        match service_type {
            Some(service) => self.string(&format!("{service}_interface")).or(interface),
            None => interface,
        }
    }

    pub fn get_region_name(&self, service_type: Option<&str>) -> String {
        service_type
            .and_then(|service| self.string(&format!("{service}_region_name")))
            .unwrap_or_else(|| self.region.clone())
    }

    pub fn get_api_version(&self, service_type: &str) -> Option<String> {
        self.string(&format!("{service_type}_api_version"))
    }

    pub fn get_service_type(&self, service_type: &str) -> String {
        self.string(&format!("{service_type}_service_type"))
            .unwrap_or_else(|| service_type.to_string())
    }

    pub fn get_service_name(&self, service_type: &str) -> Option<String> {
        self.string(&format!("{service_type}_service_name"))
    }

    pub fn get_endpoint(&self, service_type: &str) -> Option<String> {
        self.string(&format!("{service_type}_endpoint"))
    }

    /// `api_timeout` in seconds, none when unset
    pub fn get_api_timeout(&self) -> Option<Duration> {
        let seconds = match self.config.get("api_timeout")? {
            Value::Number(n) => n.as_f64()?,
            Value::String(s) => s.trim().parse::<f64>().ok()?,
            _ => return None,
        };
        (seconds > 0.0).then(|| Duration::from_secs_f64(seconds))
    }

    pub fn prefer_ipv6(&self) -> bool {
        !self.force_ipv4
    }

    pub fn force_ipv4(&self) -> bool {
        self.force_ipv4
    }

    pub fn get_auth(&self) -> Option<&Arc<dyn AuthPlugin>> {
        self.auth_plugin.as_ref()
    }

    /// Identity session for this cloud, created on first call
    pub fn get_session(&self) -> Result<Arc<Session>> {
        let mut guard = self
            .session
            .lock()
            .map_err(|_| OccError::OpenStackConfigError("Session lock poisoned".to_string()))?;

        if let Some(session) = guard.as_ref() {
            return Ok(Arc::clone(session));
        }

        let auth = self.auth_plugin.clone().ok_or_else(|| {
            OccError::OpenStackConfigError("Problem with auth parameters".to_string())
        })?;

        let (verify, cert) = self.get_requests_verify_args();
        if !verify.is_enabled() {
            tracing::debug!(
                "Turning off SSL warnings for {}:{} since verify=False",
                self.name,
                self.region
            );
        }

        let session = Arc::new(Session::new(auth, verify, cert, self.get_api_timeout())?);
        *guard = Some(Arc::clone(&session));
        Ok(session)
    }

    /// Endpoint for a service: the configured override, else the catalog
    pub async fn get_session_endpoint(&self, service_key: &str) -> Result<Option<String>> {
        if let Some(endpoint) = self.get_endpoint(service_key) {
            return Ok(Some(endpoint));
        }

        let session = self.get_session()?;
        let filter = if service_key == "identity" {
            EndpointFilter::auth()
        } else {
            EndpointFilter {
                service_type: Some(self.get_service_type(service_key)),
                service_name: self.get_service_name(service_key),
                interface: self.get_interface(Some(service_key)),
                region_name: Some(self.region.clone()),
            }
        };
        session.get_endpoint(&filter).await
    }

    /// Constructor options for a per-service API client
    ///
    /// `object-store` yields [`ClientOptions::ObjectStore`], or none when the
    /// catalog has no object-store endpoint. `interface_key` defaults to
    /// `interface` for `image` and `endpoint_type` for everything else.
    pub async fn get_legacy_client(
        &self,
        service_key: &str,
        interface_key: Option<&str>,
        pass_version_arg: bool,
        mut extra: ConfigMap,
    ) -> Result<Option<ClientOptions>> {
        if service_key == "object-store" {
            return self.object_store_options().await;
        }

        let interface = self.get_interface(Some(service_key));
        // fails early when the service cannot be reached
        let mut endpoint = self.get_session_endpoint(service_key).await?;

        let interface_key = interface_key
            .map(str::to_string)
            .unwrap_or_else(|| {
                if service_key == "image" {
                    "interface".to_string()
                } else {
                    "endpoint_type".to_string()
                }
            });

        let mut options = ServiceClientOptions {
            session: self.get_session()?,
            version: None,
            service_name: self.get_service_name(service_key),
            service_type: self.get_service_type(service_key),
            region_name: self.region.clone(),
            interface_key,
            interface,
            endpoint: None,
            extra: ConfigMap::new(),
        };

        if service_key == "image" {
            if let Some(url) = endpoint.take() {
                let (stripped, _) = strip_version(&url);
                options.endpoint = Some(stripped);
            }
        }

        if let Some(url) = extra.remove("endpoint").as_ref().and_then(value_to_string) {
            options.endpoint = Some(url);
        }
        extra.remove(&options.interface_key);
        options.extra = extra;

        if pass_version_arg {
            let mut version = self.get_api_version(service_key);
            if service_key == "network" && version.as_deref() == Some("2") {
                version = Some("2.0".to_string());
            }
            if service_key == "identity" && options.endpoint.is_none() {
                options.endpoint = self.get_session_endpoint("identity").await?;
            }
            options.version = version;
        }

        Ok(Some(ClientOptions::Service(options)))
    }

    async fn object_store_options(&self) -> Result<Option<ClientOptions>> {
        let session = self.get_session()?;
        let token = session.get_token().await?;
        let Some(endpoint) = self.get_session_endpoint("object-store").await? else {
            return Ok(None);
        };

        Ok(Some(ClientOptions::ObjectStore(ObjectStoreOptions {
            preauth_url: endpoint,
            preauth_token: token,
            auth_version: self.get_api_version("identity"),
            region_name: self.get_region_name(None),
            timeout: self.get_api_timeout(),
        })))
    }

    pub fn get_cache_expiration_time(&self) -> Option<i64> {
        self.cache.as_ref().map(|c| c.expiration_time)
    }

    pub fn get_cache_path(&self) -> Option<PathBuf> {
        self.cache.as_ref().map(|c| c.path.clone())
    }

    pub fn get_cache_class(&self) -> Option<String> {
        self.cache.as_ref().map(|c| c.class.clone())
    }

    pub fn get_cache_arguments(&self) -> Option<Map<String, Value>> {
        self.cache.as_ref().map(|c| c.arguments.clone())
    }

    pub fn get_cache_expiration(&self) -> Option<Map<String, Value>> {
        self.cache.as_ref().map(|c| c.expiration.clone())
    }

    /// Expiration time for a resource type
    ///
    /// Returns none when no cache settings are attached, and `default` when
    /// the resource has no entry.
    pub fn get_cache_resource_expiration(
        &self,
        resource: &str,
        default: Option<f64>,
    ) -> Result<Option<f64>> {
        let Some(cache) = &self.cache else {
            return Ok(None);
        };
        let Some(value) = cache.expiration.get(resource) else {
            return Ok(default);
        };

        let seconds = match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        seconds.map(Some).ok_or_else(|| {
            OccError::ValidationError(format!(
                "Cache expiration for '{}' is not a number: {}",
                resource, value
            ))
        })
    }

    /// Config with secret values masked, for display
    ///
    /// Applies at every level, so secrets that arrive as top-level settings
    /// are masked as well as those under `auth`.
    pub fn redacted_config(&self) -> ConfigMap {
        let mut config = self.config.clone();
        for (key, value) in config.iter_mut() {
            redact(key, value);
        }
        config
    }
}

fn is_secret_key(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    SECRET_KEYS.contains(&key.as_str()) || SECRET_SUFFIXES.iter().any(|s| key.ends_with(s))
}

fn redact(key: &str, value: &mut Value) {
    match value {
        Value::Null => {}
        Value::Object(map) => {
            for (key, value) in map.iter_mut() {
                redact(key, value);
            }
        }
        _ if is_secret_key(key) => *value = Value::String("***".to_string()),
        _ => {}
    }
}

/// Render a scalar config value as a string; null and containers give none
pub fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Split a trailing `/vN[.N]` path off an endpoint URL
///
/// `https://image.example.com/v2` becomes `("https://image.example.com", Some("2"))`.
/// URLs whose path does not start with a version are returned unchanged.
pub fn strip_version(endpoint: &str) -> (String, Option<String>) {
    let endpoint = endpoint.trim_end_matches('/');
    let (scheme, rest) = match endpoint.split_once("://") {
        Some((scheme, rest)) => (Some(scheme), rest),
        None => (None, endpoint),
    };
    let (netloc, path) = rest.split_once('/').unwrap_or((rest, ""));
    let path = path.trim_start_matches('/');

    let version: String = path
        .strip_prefix('v')
        .map(|tail| {
            tail.chars()
                .take_while(|c| c.is_ascii_digit() || *c == '.')
                .collect()
        })
        .unwrap_or_default();

    if version.is_empty() || !version.starts_with(|c: char| c.is_ascii_digit()) {
        return (endpoint.to_string(), None);
    }

    let base = match scheme {
        Some(scheme) => format!("{scheme}://{netloc}"),
        None => netloc.to_string(),
    };
    (base, Some(version.trim_end_matches('.').to_string()))
}
