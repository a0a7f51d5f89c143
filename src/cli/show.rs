use clap::Args;
use serde_json::json;

use crate::models::cloud_config::ConfigMap;
use crate::services::openstack_config::OpenStackConfig;

/// Show the resolved configuration of a cloud
#[derive(Debug, Args)]
pub struct ShowCommand {
    /// Cloud name (default: OS_CLOUD, then the envvars cloud)
    pub cloud: Option<String>,

    /// Region to resolve
    #[arg(long)]
    pub region: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl ShowCommand {
    pub fn execute(&self) -> anyhow::Result<()> {
        let config = OpenStackConfig::load()?;
        let cloud = config.get_one_cloud(
            self.cloud.as_deref(),
            self.region.as_deref(),
            ConfigMap::new(),
        )?;

        if self.json {
            let response = json!({
                "name": cloud.name,
                "region": cloud.region,
                "services": cloud.get_services(),
                "config": cloud.redacted_config(),
            });
            println!("{}", serde_json::to_string_pretty(&response)?);
            return Ok(());
        }

        println!("cloud: {}", cloud.name);
        println!("region: {}", cloud.region);
        println!("services: {}", cloud.get_services().join(", "));
        print!("{}", serde_yaml::to_string(&cloud.redacted_config())?);
        Ok(())
    }
}
