use clap::Args;
use serde::{Deserialize, Serialize};

use crate::services::openstack_config::OpenStackConfig;

/// List configured clouds and their regions
#[derive(Debug, Args)]
pub struct CloudsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CloudEntry {
    pub name: String,
    pub regions: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CloudsResponse {
    pub config_file: Option<String>,
    pub clouds: Vec<CloudEntry>,
}

impl CloudsCommand {
    pub fn execute(&self) -> anyhow::Result<()> {
        let config = OpenStackConfig::load()?;

        let mut clouds = Vec::new();
        for name in config.get_cloud_names() {
            let regions = config
                .get_regions(&name)?
                .into_iter()
                .filter(|r| !r.is_empty())
                .collect();
            clouds.push(CloudEntry { name, regions });
        }

        if self.json {
            let response = CloudsResponse {
                config_file: config.config_file().map(|p| p.display().to_string()),
                clouds,
            };
            println!("{}", serde_json::to_string_pretty(&response)?);
            return Ok(());
        }

        if clouds.is_empty() {
            println!("No clouds configured.");
            println!("\nCreate a clouds.yaml in the current directory or in ~/.config/openstack/,");
            println!("or export OS_AUTH_URL and friends.");
            return Ok(());
        }

        for cloud in clouds {
            if cloud.regions.is_empty() {
                println!("{}", cloud.name);
            } else {
                println!("{}: {}", cloud.name, cloud.regions.join(", "));
            }
        }
        Ok(())
    }
}
