//! abm-verify - OAuth2 client-assertion probe library
//!
//! This library implements the OAuth2 client-credentials grant with JWT
//! client assertions (RFC 7523) against a device-management API, followed by
//! one authenticated read call.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `assertion`: ES256 client assertion construction and the `Signer` seam
//! - `token`: Token exchange and the redacting `AccessToken`
//! - `api`: Bearer-authenticated GET against the device API
//! - `config`: Environment-sourced configuration and validation
//! - `commands`: The `assertion` and `verify` flows used by the binary
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//! - `http`: Shared HTTP client construction with timeout and user agent
//! - `logging`: Tracing subscriber setup (text or JSON, stderr)
//! - `redact`: Token redaction for log output
//!
//! # Example
//!
//! ```no_run
//! use abm_verify::config::{Config, Flow};
//! use abm_verify::commands;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load(Flow::Verify)?;
//!     let report = commands::verify::run(&config).await?;
//!     println!("{} {}", report.devices.status, report.devices.body);
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod assertion;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod http;
pub mod logging;
pub mod redact;
pub mod token;

// Re-export commonly used types
pub use assertion::{AssertionBuilder, AssertionClaims, Es256Signer, JwtHeader, Signer};
pub use config::{Config, Flow};
pub use error::{AbmError, Result};
pub use token::{AccessToken, TokenExchanger};

#[cfg(test)]
pub mod test_utils;
