use clap::Args;
use serde_json::Value;

use crate::models::cloud_config::ConfigMap;
use crate::services::openstack_config::OpenStackConfig;
use crate::utils::error::OccError;

/// Resolve the endpoint of a service
#[derive(Debug, Args)]
pub struct EndpointCommand {
    /// Service key, such as compute, network or identity
    pub service: String,

    /// Cloud name (default: OS_CLOUD, then the envvars cloud)
    #[arg(long)]
    pub cloud: Option<String>,

    /// Region to resolve
    #[arg(long)]
    pub region: Option<String>,

    /// Interface override (public, internal, admin)
    #[arg(long)]
    pub interface: Option<String>,
}

impl EndpointCommand {
    pub async fn execute(&self) -> anyhow::Result<()> {
        let config = OpenStackConfig::load()?;

        let mut overrides = ConfigMap::new();
        if let Some(interface) = &self.interface {
            overrides.insert("interface".to_string(), Value::String(interface.clone()));
        }

        let cloud = config.get_one_cloud(
            self.cloud.as_deref(),
            self.region.as_deref(),
            overrides,
        )?;

        match cloud.get_session_endpoint(&self.service).await? {
            Some(endpoint) => {
                println!("{}", endpoint);
                Ok(())
            }
            None => Err(OccError::ConfigError(format!(
                "No endpoint found for service '{}' in {}:{}",
                self.service, cloud.name, cloud.region
            ))
            .into()),
        }
    }
}
