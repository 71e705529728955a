//! Command-line interface definition for abm-verify
//!
//! All settings come from `ABM_*` environment variables; the command line
//! only selects which flow to run.

use clap::{Parser, Subcommand};

/// abm-verify - OAuth2 client-assertion probe for device-management APIs
///
/// Reads ABM_CLIENT_ID, ABM_KEY_ID and ABM_KEY_PATH from the environment.
#[derive(Parser, Debug, Clone)]
#[command(name = "abm-verify")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Print a freshly signed client assertion (JWT) to stdout
    Assertion,

    /// Exchange an assertion for an access token and list organization devices
    Verify,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
