// Common error types for occ

use crate::models::manifest::ManifestError;
use crate::services::identity_client::IdentityError;

#[derive(Debug, thiserror::Error)]
pub enum OccError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    /// Raised when a session is requested for a cloud without usable credentials
    #[error("{0}")]
    OpenStackConfigError(String),

    #[error(transparent)]
    Identity(#[from] IdentityError),
}

impl From<serde_yaml::Error> for OccError {
    fn from(err: serde_yaml::Error) -> Self {
        OccError::ConfigError(format!("Invalid YAML: {}", err))
    }
}

impl From<ManifestError> for OccError {
    fn from(err: ManifestError) -> Self {
        match err {
            ManifestError::Read { source, .. } => OccError::IoError(source),
            other => OccError::ValidationError(other.to_string()),
        }
    }
}

impl From<reqwest::Error> for OccError {
    fn from(err: reqwest::Error) -> Self {
        OccError::NetworkError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, OccError>;

/// Error presented to a CLI user, with the process exit code to use
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserError {
    pub message: String,
    pub hint: Option<String>,
    pub exit_code: i32,
}

impl UserError {
    pub fn from_occ_error(err: &OccError) -> Self {
        match err {
            OccError::IoError(e) => Self {
                message: format!("I/O failure: {}", e),
                hint: None,
                exit_code: 74,
            },
            OccError::ConfigError(msg) => Self {
                message: msg.clone(),
                hint: Some(
                    "Check clouds.yaml or set OS_CLIENT_CONFIG_FILE to the file you want to use."
                        .to_string(),
                ),
                exit_code: 78,
            },
            OccError::ValidationError(msg) => Self {
                message: msg.clone(),
                hint: None,
                exit_code: 65,
            },
            OccError::NetworkError(msg) => Self {
                message: msg.clone(),
                hint: Some("Check that the identity endpoint is reachable.".to_string()),
                exit_code: 69,
            },
            OccError::OpenStackConfigError(msg) => Self {
                message: msg.clone(),
                hint: Some("Make sure the cloud has an 'auth' section with credentials.".to_string()),
                exit_code: 78,
            },
            OccError::Identity(e) => Self {
                message: e.to_string(),
                hint: None,
                exit_code: 77,
            },
        }
    }

    /// Build a user error from an arbitrary error chain
    pub fn from_anyhow(err: &anyhow::Error) -> Self {
        if let Some(occ) = err.downcast_ref::<OccError>() {
            let mut user = Self::from_occ_error(occ);
            if err.chain().count() > 1 {
                user.message = format!("{:#}", err);
            }
            return user;
        }
        Self {
            message: format!("{:#}", err),
            hint: None,
            exit_code: 1,
        }
    }

    /// Print the error to stderr
    pub fn print(&self) {
        eprintln!("error: {}", self.message);
        if let Some(hint) = &self.hint {
            eprintln!("\n{}", hint);
        }
    }
}
