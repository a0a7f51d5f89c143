use serde_json::{json, Map, Value};
use std::fmt;

/// An identity authentication method
///
/// Plugins only describe the request. The [`Session`](crate::services::session::Session)
/// performs it and caches the result.
pub trait AuthPlugin: fmt::Debug + Send + Sync {
    /// Identity endpoint the plugin authenticates against
    fn auth_url(&self) -> &str;

    /// Body of the `POST /v3/auth/tokens` request
    fn auth_body(&self) -> Value;

    /// Short method name, used in logs
    fn method(&self) -> &'static str;
}

/// Project or domain the token should be scoped to
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scope {
    pub project_id: Option<String>,
    pub project_name: Option<String>,
    pub project_domain_id: Option<String>,
    pub project_domain_name: Option<String>,
    pub domain_id: Option<String>,
    pub domain_name: Option<String>,
}

impl Scope {
    fn from_args(args: &Map<String, Value>) -> Self {
        Self {
            project_id: arg(args, "project_id").or_else(|| arg(args, "tenant_id")),
            project_name: arg(args, "project_name").or_else(|| arg(args, "tenant_name")),
            project_domain_id: arg(args, "project_domain_id"),
            project_domain_name: arg(args, "project_domain_name"),
            domain_id: arg(args, "domain_id"),
            domain_name: arg(args, "domain_name"),
        }
    }

    fn to_json(&self) -> Option<Value> {
        if let Some(id) = &self.project_id {
            return Some(json!({"project": {"id": id}}));
        }
        if let Some(name) = &self.project_name {
            let domain = domain_ref(
                self.project_domain_id.as_ref(),
                self.project_domain_name.as_ref(),
            )
            .unwrap_or_else(|| json!({"id": "default"}));
            return Some(json!({"project": {"name": name, "domain": domain}}));
        }
        domain_ref(self.domain_id.as_ref(), self.domain_name.as_ref())
            .map(|domain| json!({"domain": domain}))
    }
}

fn domain_ref(id: Option<&String>, name: Option<&String>) -> Option<Value> {
    match (id, name) {
        (Some(id), _) => Some(json!({"id": id})),
        (None, Some(name)) => Some(json!({"name": name})),
        (None, None) => None,
    }
}

fn arg(args: &Map<String, Value>, key: &str) -> Option<String> {
    match args.get(key) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

/// Username/password authentication
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordAuth {
    pub auth_url: String,
    pub username: Option<String>,
    pub user_id: Option<String>,
    pub password: String,
    pub user_domain_id: Option<String>,
    pub user_domain_name: Option<String>,
    pub scope: Scope,
}

impl fmt::Debug for PasswordAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordAuth")
            .field("auth_url", &self.auth_url)
            .field("username", &self.username)
            .field("user_id", &self.user_id)
            .field("password", &"***")
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

impl AuthPlugin for PasswordAuth {
    fn auth_url(&self) -> &str {
        &self.auth_url
    }

    fn auth_body(&self) -> Value {
        let mut user = Map::new();
        if let Some(id) = &self.user_id {
            user.insert("id".to_string(), json!(id));
        } else if let Some(name) = &self.username {
            user.insert("name".to_string(), json!(name));
            let domain = domain_ref(self.user_domain_id.as_ref(), self.user_domain_name.as_ref())
                .unwrap_or_else(|| json!({"id": "default"}));
            user.insert("domain".to_string(), domain);
        }
        user.insert("password".to_string(), json!(self.password));

        let mut auth = json!({
            "identity": {
                "methods": ["password"],
                "password": {"user": Value::Object(user)}
            }
        });
        if let Some(scope) = self.scope.to_json() {
            auth["scope"] = scope;
        }
        json!({ "auth": auth })
    }

    fn method(&self) -> &'static str {
        "password"
    }
}

/// Re-scoping an existing token
#[derive(Clone, PartialEq, Eq)]
pub struct TokenAuth {
    pub auth_url: String,
    pub token: String,
    pub scope: Scope,
}

impl fmt::Debug for TokenAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenAuth")
            .field("auth_url", &self.auth_url)
            .field("token", &"***")
            .field("scope", &self.scope)
            .finish()
    }
}

impl AuthPlugin for TokenAuth {
    fn auth_url(&self) -> &str {
        &self.auth_url
    }

    fn auth_body(&self) -> Value {
        let mut auth = json!({
            "identity": {
                "methods": ["token"],
                "token": {"id": self.token}
            }
        });
        if let Some(scope) = self.scope.to_json() {
            auth["scope"] = scope;
        }
        json!({ "auth": auth })
    }

    fn method(&self) -> &'static str {
        "token"
    }
}

/// Errors building an auth plugin from configuration
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthConfigError {
    #[error("Unsupported auth_type '{0}'")]
    UnsupportedType(String),

    #[error("Missing required auth parameter '{0}'")]
    MissingParameter(&'static str),
}

/// Build a plugin for `auth_type` from the cloud's `auth` arguments
pub fn load_auth_plugin(
    auth_type: &str,
    args: &Map<String, Value>,
) -> Result<Box<dyn AuthPlugin>, AuthConfigError> {
    let auth_url = arg(args, "auth_url").ok_or(AuthConfigError::MissingParameter("auth_url"))?;
    let scope = Scope::from_args(args);

    match auth_type {
        "password" | "v3password" => {
            let username = arg(args, "username");
            let user_id = arg(args, "user_id");
            if username.is_none() && user_id.is_none() {
                return Err(AuthConfigError::MissingParameter("username"));
            }
            let password =
                arg(args, "password").ok_or(AuthConfigError::MissingParameter("password"))?;
            Ok(Box::new(PasswordAuth {
                auth_url,
                username,
                user_id,
                password,
                user_domain_id: arg(args, "user_domain_id"),
                user_domain_name: arg(args, "user_domain_name"),
                scope,
            }))
        }
        "token" | "v3token" => {
            let token = arg(args, "token").ok_or(AuthConfigError::MissingParameter("token"))?;
            Ok(Box::new(TokenAuth {
                auth_url,
                token,
                scope,
            }))
        }
        other => Err(AuthConfigError::UnsupportedType(other.to_string())),
    }
}
