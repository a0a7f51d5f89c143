use std::fs;
use std::sync::Arc;
use std::time::Duration;

use reqwest::{Certificate, Client, Identity};
use tokio::sync::Mutex;

use crate::models::catalog::{AccessInfo, EndpointFilter};
use crate::models::cloud_config::{ClientCert, Verify};
use crate::services::auth::AuthPlugin;
use crate::services::identity_client::IdentityClient;
use crate::utils::error::{OccError, Result};

/// Tokens this close to expiry are renewed before use
const EXPIRY_LEEWAY_SECS: i64 = 30;

/// An authenticated identity session
///
/// Authentication happens on first use. The token and service catalog are
/// cached and fetched again once the token is about to expire.
#[derive(Debug)]
pub struct Session {
    client: Client,
    identity: IdentityClient,
    auth: Arc<dyn AuthPlugin>,
    access: Mutex<Option<AccessInfo>>,
    verify: Verify,
    cert: Option<ClientCert>,
    timeout: Option<Duration>,
}

impl Session {
    /// Build a session with the given TLS settings and request timeout
    pub fn new(
        auth: Arc<dyn AuthPlugin>,
        verify: Verify,
        cert: Option<ClientCert>,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let mut builder = Client::builder().use_rustls_tls();

        match &verify {
            Verify::Disabled => {
                builder = builder.danger_accept_invalid_certs(true);
            }
            Verify::System => {}
            Verify::CaBundle(path) => {
                let pem = fs::read(path).map_err(|e| {
                    OccError::ConfigError(format!("Failed to read cacert {}: {}", path.display(), e))
                })?;
                let ca = Certificate::from_pem(&pem).map_err(|e| {
                    OccError::ConfigError(format!("Invalid cacert {}: {}", path.display(), e))
                })?;
                builder = builder.add_root_certificate(ca);
            }
        }

        if let Some(cert) = &cert {
            builder = builder.identity(load_identity(cert)?);
        }

        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        let client = builder.build()?;
        Ok(Self {
            identity: IdentityClient::with_client(client.clone()),
            client,
            auth,
            access: Mutex::new(None),
            verify,
            cert,
            timeout,
        })
    }

    /// HTTP client configured with this session's TLS settings
    pub fn http_client(&self) -> &Client {
        &self.client
    }

    pub fn auth(&self) -> &Arc<dyn AuthPlugin> {
        &self.auth
    }

    pub fn verify(&self) -> &Verify {
        &self.verify
    }

    pub fn cert(&self) -> Option<&ClientCert> {
        self.cert.as_ref()
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Current access info, authenticating when needed
    pub async fn get_access(&self) -> Result<AccessInfo> {
        let mut guard = self.access.lock().await;
        if let Some(access) = guard.as_ref() {
            if !access.will_expire_soon(EXPIRY_LEEWAY_SECS) {
                return Ok(access.clone());
            }
            tracing::debug!("Identity token expired, re-authenticating");
        }

        let access = self.identity.authenticate(self.auth.as_ref()).await?;
        *guard = Some(access.clone());
        Ok(access)
    }

    pub async fn get_token(&self) -> Result<String> {
        Ok(self.get_access().await?.token)
    }

    /// Drop the cached token so the next call authenticates again
    pub async fn invalidate(&self) {
        *self.access.lock().await = None;
    }

    /// Resolve an endpoint; the auth interface maps to the plugin's URL
    pub async fn get_endpoint(&self, filter: &EndpointFilter) -> Result<Option<String>> {
        if filter.is_auth() {
            return Ok(Some(self.auth.auth_url().to_string()));
        }

        let access = self.get_access().await?;
        let endpoint = access.catalog.url_for(filter);
        tracing::debug!(
            service_type = ?filter.service_type,
            region = ?filter.region_name,
            endpoint = ?endpoint,
            "Catalog lookup"
        );
        Ok(endpoint)
    }
}

fn load_identity(cert: &ClientCert) -> Result<Identity> {
    let read = |path: &std::path::Path| {
        fs::read(path).map_err(|e| {
            OccError::ConfigError(format!("Failed to read {}: {}", path.display(), e))
        })
    };

    let mut pem = read(&cert.cert)?;
    if let Some(key) = &cert.key {
        pem.push(b'\n');
        pem.extend(read(key)?);
    }

    Identity::from_pem(&pem).map_err(|e| {
        OccError::ConfigError(format!("Invalid client certificate {}: {}", cert.cert.display(), e))
    })
}
