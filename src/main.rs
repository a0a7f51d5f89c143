// occ - OpenStack client configuration
// Main CLI entry point

use clap::Parser;
use occ::cli::{Cli, CliDispatcher};
use occ::utils::error::UserError;
use occ::utils::logging;
use std::process;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(err) = logging::init(cli.verbose) {
        eprintln!("warning: failed to initialise logging: {err}");
    }

    let result = CliDispatcher::execute(cli.command).await;

    if let Err(err) = result {
        let user_error = UserError::from_anyhow(&err);
        user_error.print();
        process::exit(user_error.exit_code);
    }
}
