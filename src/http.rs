//! Shared HTTP client construction

use std::time::Duration;

use reqwest::Client;

use crate::error::Result;

/// `User-Agent` sent with every request
pub const USER_AGENT: &str = concat!("abm-verify/", env!("CARGO_PKG_VERSION"));

/// Build an HTTP client whose requests are bounded by `timeout`
///
/// The timeout covers connecting, sending and reading the full response.
///
/// # Errors
///
/// Returns [`AbmError::Http`](crate::AbmError::Http) if the TLS backend
/// cannot be initialized.
pub fn build_client(timeout: Duration) -> Result<Client> {
    let client = Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()?;
    Ok(client)
}
