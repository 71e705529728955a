//! abm-verify - OAuth2 client-assertion probe
//!
#![doc = "abm-verify - OAuth2 client-assertion probe"]
#![doc = "Main entry point for the abm-verify binary."]

use anyhow::{bail, Context, Result};

use abm_verify::cli::{Cli, Commands};
use abm_verify::commands;
use abm_verify::config::{self, Config, Flow};
use abm_verify::logging;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    logging::init_logging(config::log_json_from_env())?;

    // Parse command line arguments
    let cli = Cli::parse_args();

    match cli.command {
        Commands::Assertion => {
            let config = Config::load(Flow::Assertion).context("invalid configuration")?;
            tracing::debug!(?config, "Loaded configuration");

            let jwt = commands::assertion::run(&config).context("failed to build assertion")?;
            println!("{}", jwt);
            Ok(())
        }
        Commands::Verify => {
            let config = Config::load(Flow::Verify).context("invalid configuration")?;
            tracing::debug!(?config, "Loaded configuration");

            let report = commands::verify::run(&config)
                .await
                .context("verification failed")?;

            println!("Devices status: {}", report.devices.status);
            println!("{}", report.devices.body);

            if !report.devices.is_success() {
                bail!(
                    "device listing returned HTTP {}",
                    report.devices.status
                );
            }
            Ok(())
        }
    }
}
