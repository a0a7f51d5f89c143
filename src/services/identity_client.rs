use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::models::catalog::{AccessInfo, ServiceCatalog};
use crate::services::auth::AuthPlugin;

/// Header carrying the issued token
pub const SUBJECT_TOKEN_HEADER: &str = "X-Subject-Token";

/// Identity (Keystone v3) API client
#[derive(Debug, Clone)]
pub struct IdentityClient {
    /// HTTP client for identity requests
    client: Client,
    /// User agent string for requests
    user_agent: String,
}

/// Body of a token response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: TokenBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenBody {
    /// Expiry timestamp (ISO 8601)
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    /// Absent for unscoped tokens
    #[serde(default)]
    pub catalog: Option<ServiceCatalog>,
    #[serde(default)]
    pub methods: Vec<String>,
}

/// Identity client errors
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    /// HTTP request failed
    #[error("Identity request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// Credentials rejected
    #[error("Authentication rejected by {0}")]
    Unauthorized(String),

    /// Non-success status other than 401
    #[error("Identity service returned HTTP {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    /// Response body could not be decoded
    #[error("Failed to parse identity response: {0}")]
    ParseError(String),

    /// 2xx without the subject token header
    #[error("Identity response did not include an X-Subject-Token header")]
    MissingToken,
}

impl Default for IdentityClient {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityClient {
    /// Create a new identity client with a default HTTP client
    pub fn new() -> Self {
        Self::with_client(Client::new())
    }

    /// Create a new identity client with a preconfigured HTTP client
    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            user_agent: format!("occ/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// `<auth_url>/v3/auth/tokens`, adding `/v3` only when missing
    pub fn tokens_url(auth_url: &str) -> String {
        let base = auth_url.trim_end_matches('/');
        if base.ends_with("/v3") {
            format!("{}/auth/tokens", base)
        } else {
            format!("{}/v3/auth/tokens", base)
        }
    }

    /// Authenticate with the given plugin and return the token and catalog
    pub async fn authenticate(&self, plugin: &dyn AuthPlugin) -> Result<AccessInfo, IdentityError> {
        let url = Self::tokens_url(plugin.auth_url());
        tracing::debug!(url = %url, method = plugin.method(), "Requesting identity token");

        let response = self
            .client
            .post(&url)
            .header("User-Agent", &self.user_agent)
            .header("Accept", "application/json")
            .json(&plugin.auth_body())
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(IdentityError::Unauthorized(plugin.auth_url().to_string()));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(IdentityError::UnexpectedStatus {
                status: status.as_u16(),
                body,
            });
        }

        let token = response
            .headers()
            .get(SUBJECT_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or(IdentityError::MissingToken)?;

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| IdentityError::ParseError(e.to_string()))?;

        Ok(AccessInfo {
            token,
            expires_at: body.token.expires_at,
            catalog: body.token.catalog.unwrap_or_default(),
        })
    }
}
