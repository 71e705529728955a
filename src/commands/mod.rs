/*!
Command handlers for the CLI

This module provides the two flows invoked by the CLI entrypoint:

- `assertion`: Build and print a signed client assertion
- `verify`: Assertion, token exchange, then one authenticated API call

Both take an already validated [`Config`]; configuration errors therefore
surface before any key is read or any request is sent.
*/

use crate::api::{ApiClient, ApiResponse};
use crate::assertion::{verify_assertion, AssertionBuilder, Es256Signer};
use crate::config::Config;
use crate::error::Result;
use crate::http::build_client;
use crate::token::TokenExchanger;

/// Load the configured private key and log its thumbprint
fn load_signer(config: &Config) -> Result<Es256Signer> {
    let signer = Es256Signer::from_key_file(&config.key_path)?;
    tracing::info!(
        key_path = %config.key_path.display(),
        kid = %config.key_id,
        thumbprint = %signer.public_key_thumbprint(),
        "Loaded ES256 private key"
    );
    Ok(signer)
}

/// Assertion command
///
/// Mirrors a standalone "make an assertion" script: the JWT is the output.
pub mod assertion {
    use super::*;

    /// Build a client assertion and check it against the local public key
    ///
    /// # Arguments
    ///
    /// * `config` - Validated configuration for [`Flow::Assertion`](crate::config::Flow::Assertion)
    ///
    /// # Returns
    ///
    /// The compact signed JWT.
    ///
    /// # Errors
    ///
    /// Returns `KeyLoad` or `Signing` errors from key loading and signing.
    pub fn run(config: &Config) -> Result<String> {
        let signer = load_signer(config)?;
        let jwt = AssertionBuilder::from_config(config).build(&signer)?;

        let (_, claims) = verify_assertion(&jwt, signer.verifying_key())?;
        tracing::info!(
            aud = %claims.aud,
            exp = claims.exp,
            jti = %claims.jti,
            "Client assertion signed and verified locally"
        );

        Ok(jwt)
    }

}

/// Verify command
///
/// Runs the full sequence and reports the device listing response.
pub mod verify {
    use super::*;
    use chrono::{DateTime, Utc};

    /// Outcome of a successful token exchange and API call
    #[derive(Debug, Clone)]
    pub struct VerifyReport {
        /// `token_type` reported by the token endpoint
        pub token_type: Option<String>,
        /// Access token expiry, when the server reported one
        pub expires_at: Option<DateTime<Utc>>,
        /// Raw device listing response
        pub devices: ApiResponse,
    }

    /// Build an assertion, exchange it for a token, and list devices
    ///
    /// # Arguments
    ///
    /// * `config` - Validated configuration for [`Flow::Verify`](crate::config::Flow::Verify)
    ///
    /// # Errors
    ///
    /// Any error from key loading, signing, the token exchange, or the API
    /// transport. A non-2xx device response is not an error; it is returned
    /// in the report.
    pub async fn run(config: &Config) -> Result<VerifyReport> {
        let signer = load_signer(config)?;
        let assertion = AssertionBuilder::from_config(config).build(&signer)?;

        let http = build_client(config.http_timeout())?;

        let exchanger = TokenExchanger::new(http.clone(), config.token_url.clone());
        let token = exchanger
            .exchange(&config.client_id, &assertion, config.scope.as_deref())
            .await?;

        let api = ApiClient::new(http, config.api_base.clone());
        let devices = api.org_devices(&token).await?;

        Ok(VerifyReport {
            token_type: token.token_type.clone(),
            expires_at: token.expires_at,
            devices,
        })
    }
}
