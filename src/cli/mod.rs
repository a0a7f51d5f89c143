// CLI module for command-line interface

pub mod clouds;
pub mod endpoint;
pub mod requirements;
pub mod show;

use clap::{Parser, Subcommand};

use self::clouds::CloudsCommand;
use self::endpoint::EndpointCommand;
use self::requirements::RequirementsCommand;
use self::show::ShowCommand;

/// Main CLI structure
#[derive(Debug, Parser)]
#[command(name = "occ")]
#[command(about = "Inspect OpenStack client configuration")]
#[command(long_about = r#"occ reads clouds.yaml and OS_* environment variables the same way
OpenStack client tools do, and shows what a client would end up using.

Configuration is searched in this order:
  • $OS_CLIENT_CONFIG_FILE
  • ./clouds.yaml
  • ~/.config/openstack/clouds.yaml
  • /etc/openstack/clouds.yaml

Examples:
  occ clouds                          List clouds and regions
  occ show devstack --region RegionOne  Show the resolved settings of a cloud
  occ endpoint compute --cloud devstack Resolve the compute endpoint
  occ requirements                    Check requirements.txt"#)]
#[command(version)]
pub struct Cli {
    /// Show debug output (overridden by RUST_LOG / OCC_LOGLEVEL)
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// All available CLI commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Validate a requirements manifest and print its specifiers in order
    #[command(long_about = r#"Parse and validate a pip-style requirements manifest.

Every non-comment line must be '<name><comparator><version>' with an optional
'# annotation'. Duplicate packages are rejected. Order is significant, so
--expect-order can pin the exact sequence.

Examples:
  occ requirements
  occ requirements --file other.txt --json
  occ requirements --expect-order PyYAML,appdirs,keystoneauth1,requestsexceptions"#)]
    Requirements(RequirementsCommand),

    /// List configured clouds and their regions
    Clouds(CloudsCommand),

    /// Show the resolved configuration of a cloud (secrets masked)
    Show(ShowCommand),

    /// Resolve a service endpoint from configuration or the service catalog
    Endpoint(EndpointCommand),
}

/// CLI command dispatcher
pub struct CliDispatcher;

impl CliDispatcher {
    /// Execute a CLI command
    pub async fn execute(command: Commands) -> anyhow::Result<()> {
        match command {
            Commands::Requirements(cmd) => cmd.execute(),
            Commands::Clouds(cmd) => cmd.execute(),
            Commands::Show(cmd) => cmd.execute(),
            Commands::Endpoint(cmd) => cmd.execute().await,
        }
    }
}
