//! Structured logging setup
//!
//! Logs always go to stderr so stdout carries only command output (a signed
//! assertion, or the device listing). The filter comes from `RUST_LOG`,
//! falling back to `abm_verify=info`.

use anyhow::Result;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter directive when `RUST_LOG` is unset or invalid
pub const DEFAULT_DIRECTIVE: &str = "abm_verify=info";

/// Initialize the global tracing subscriber.
///
/// # Arguments
///
/// * `json` - Emit JSON lines instead of human-readable output
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_logging(json: bool) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));

    let registry = tracing_subscriber::registry().with(env_filter);

    if json {
        let layer = fmt::layer()
            .json()
            .with_current_span(true)
            .with_writer(std::io::stderr);
        registry.with(layer).try_init()?;
    } else {
        let layer = fmt::layer()
            .with_target(true)
            .with_level(true)
            .with_writer(std::io::stderr);
        registry.with(layer).try_init()?;
    }

    Ok(())
}
