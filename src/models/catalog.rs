use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Interface name the identity service is reached through before a catalog exists
pub const AUTH_INTERFACE: &str = "auth";

/// One endpoint of a catalog entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEndpoint {
    pub interface: String,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub region_id: Option<String>,
    pub url: String,
}

impl CatalogEndpoint {
    fn region_matches(&self, region: &str) -> bool {
        self.region.as_deref() == Some(region) || self.region_id.as_deref() == Some(region)
    }
}

/// One service of the service catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    #[serde(rename = "type")]
    pub service_type: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub endpoints: Vec<CatalogEndpoint>,
}

/// Service catalog returned with an identity token
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceCatalog {
    pub entries: Vec<CatalogEntry>,
}

/// Criteria for picking an endpoint out of the catalog
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndpointFilter {
    pub service_type: Option<String>,
    pub service_name: Option<String>,
    pub interface: Option<String>,
    pub region_name: Option<String>,
}

impl EndpointFilter {
    /// Filter selecting the identity endpoint used for authentication
    pub fn auth() -> Self {
        Self {
            interface: Some(AUTH_INTERFACE.to_string()),
            ..Self::default()
        }
    }

    pub fn is_auth(&self) -> bool {
        self.interface.as_deref() == Some(AUTH_INTERFACE)
    }
}

/// Strip the legacy `URL` suffix (`publicURL` -> `public`)
pub fn normalize_interface(interface: &str) -> &str {
    interface.strip_suffix("URL").unwrap_or(interface)
}

impl ServiceCatalog {
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First endpoint URL matching the filter
    pub fn url_for(&self, filter: &EndpointFilter) -> Option<String> {
        let interface = normalize_interface(filter.interface.as_deref().unwrap_or("public"));

        self.entries
            .iter()
            .filter(|entry| {
                filter
                    .service_type
                    .as_deref()
                    .is_none_or(|t| entry.service_type == t)
            })
            .filter(|entry| {
                filter
                    .service_name
                    .as_deref()
                    .is_none_or(|n| entry.name.as_deref() == Some(n))
            })
            .flat_map(|entry| entry.endpoints.iter())
            .filter(|endpoint| normalize_interface(&endpoint.interface) == interface)
            .find(|endpoint| {
                filter
                    .region_name
                    .as_deref()
                    .filter(|r| !r.is_empty())
                    .is_none_or(|r| endpoint.region_matches(r))
            })
            .map(|endpoint| endpoint.url.clone())
    }
}

/// Result of a successful authentication
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessInfo {
    pub token: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub catalog: ServiceCatalog,
}

impl AccessInfo {
    /// Whether the token is expired (or expires within `leeway_secs`)
    pub fn will_expire_soon(&self, leeway_secs: i64) -> bool {
        self.expires_at
            .is_some_and(|at| at <= Utc::now() + chrono::Duration::seconds(leeway_secs))
    }
}
