//! Client assertion construction (RFC 7523)
//!
//! A client assertion is a short-lived ES256 JWT that stands in for a client
//! secret in the OAuth2 client-credentials grant. Its header names the
//! registered key (`kid`); its payload identifies the client as both issuer
//! and subject, targets the token endpoint as audience, and carries a fresh
//! `jti` so each assertion is single-use.
//!
//! # Module Layout
//!
//! - [`signer`] -- the [`Signer`] capability and the P-256 [`Es256Signer`]

pub mod signer;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use p256::ecdsa::signature::Verifier;
use p256::ecdsa::{Signature, VerifyingKey};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::Config;
use crate::error::{AbmError, Result};

pub use signer::{Es256Signer, Signer};

/// JOSE algorithm used for every assertion
pub const ALGORITHM: &str = "ES256";

/// `typ` header value
pub const JWT_TYPE: &str = "JWT";

/// JWT header of a client assertion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtHeader {
    /// Signing algorithm
    pub alg: String,
    /// Token type
    pub typ: String,
    /// Identifier of the registered public key
    pub kid: String,
}

/// Client assertion claims
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertionClaims {
    /// Issuer (the client identifier)
    pub iss: String,
    /// Subject (equal to the issuer for this flow)
    pub sub: String,
    /// Audience (the exact value the authorization server validates)
    pub aud: String,
    /// Issued at, seconds since Unix epoch
    pub iat: i64,
    /// Expiration, seconds since Unix epoch
    pub exp: i64,
    /// Unique identifier for replay prevention
    pub jti: String,
}

/// Builds signed client assertions for one client and key
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use abm_verify::assertion::{AssertionBuilder, Es256Signer};
///
/// let signer = Es256Signer::from_key_file(Path::new("key.pem"))?;
/// let builder = AssertionBuilder::new(
///     "BUSINESSAPI.example",
///     "key-id",
///     "https://account.apple.com/auth/oauth2/token",
///     300,
/// );
/// let jwt = builder.build(&signer)?;
/// assert_eq!(jwt.split('.').count(), 3);
/// # Ok::<(), abm_verify::AbmError>(())
/// ```
#[derive(Debug, Clone)]
pub struct AssertionBuilder {
    client_id: String,
    key_id: String,
    audience: String,
    lifetime_secs: u64,
}

impl AssertionBuilder {
    /// Create a builder
    ///
    /// # Arguments
    ///
    /// * `client_id` - Used as `iss` and `sub`
    /// * `key_id` - Written to the `kid` header
    /// * `audience` - Written to `aud`
    /// * `lifetime_secs` - Distance between `iat` and `exp`
    pub fn new(
        client_id: impl Into<String>,
        key_id: impl Into<String>,
        audience: impl Into<String>,
        lifetime_secs: u64,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            key_id: key_id.into(),
            audience: audience.into(),
            lifetime_secs,
        }
    }

    /// Create a builder from validated configuration
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.client_id.clone(),
            config.key_id.clone(),
            config.token_audience.clone(),
            config.assertion_lifetime_secs,
        )
    }

    /// Build and sign an assertion issued now
    ///
    /// # Errors
    ///
    /// Returns [`AbmError::Signing`] if the claims cannot be encoded or the
    /// signer fails.
    pub fn build(&self, signer: &dyn Signer) -> Result<String> {
        self.build_at(signer, chrono::Utc::now().timestamp())
    }

    /// Build and sign an assertion with an explicit `iat`
    pub fn build_at(&self, signer: &dyn Signer, issued_at: i64) -> Result<String> {
        let header = JwtHeader {
            alg: signer.algorithm().to_string(),
            typ: JWT_TYPE.to_string(),
            kid: self.key_id.clone(),
        };
        let claims = self.claims_at(issued_at)?;

        tracing::debug!(
            kid = %header.kid,
            aud = %claims.aud,
            iat = claims.iat,
            exp = claims.exp,
            jti = %claims.jti,
            "Signing client assertion"
        );

        signer.sign(&header, &claims)
    }

    /// Assemble the claim set for an assertion issued at `issued_at`
    ///
    /// Every call yields a new `jti`.
    pub fn claims_at(&self, issued_at: i64) -> Result<AssertionClaims> {
        let expires_at = i64::try_from(self.lifetime_secs)
            .ok()
            .and_then(|lifetime| issued_at.checked_add(lifetime))
            .ok_or_else(|| {
                AbmError::Signing(format!(
                    "assertion lifetime of {}s overflows the expiry timestamp",
                    self.lifetime_secs
                ))
            })?;

        Ok(AssertionClaims {
            iss: self.client_id.clone(),
            sub: self.client_id.clone(),
            aud: self.audience.clone(),
            iat: issued_at,
            exp: expires_at,
            jti: Uuid::new_v4().to_string(),
        })
    }
}

/// Decode a compact ES256 JWT and verify its signature
///
/// Claims such as `exp` or `aud` are not judged here; the caller gets them
/// back and decides.
///
/// # Errors
///
/// Returns [`AbmError::InvalidAssertion`] if the token is malformed, uses
/// another algorithm, or the signature does not verify under
/// `verifying_key`.
pub fn verify_assertion(
    token: &str,
    verifying_key: &VerifyingKey,
) -> Result<(JwtHeader, AssertionClaims)> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err(AbmError::InvalidAssertion(format!(
            "expected 3 segments, found {}",
            parts.len()
        )));
    }

    let header: JwtHeader = decode_segment(parts[0], "header")?;
    if header.alg != ALGORITHM {
        return Err(AbmError::InvalidAssertion(format!(
            "unsupported algorithm: {}",
            header.alg
        )));
    }

    let signature_bytes = URL_SAFE_NO_PAD
        .decode(parts[2])
        .map_err(|_| AbmError::InvalidAssertion("signature is not base64url".to_string()))?;
    let signature = Signature::from_slice(&signature_bytes)
        .map_err(|_| AbmError::InvalidAssertion("malformed ES256 signature".to_string()))?;

    let message = format!("{}.{}", parts[0], parts[1]);
    verifying_key
        .verify(message.as_bytes(), &signature)
        .map_err(|_| AbmError::InvalidAssertion("signature verification failed".to_string()))?;

    let claims: AssertionClaims = decode_segment(parts[1], "payload")?;
    Ok((header, claims))
}

fn decode_segment<T: for<'de> Deserialize<'de>>(segment: &str, name: &str) -> Result<T> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| AbmError::InvalidAssertion(format!("{name} is not base64url")))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| AbmError::InvalidAssertion(format!("{name} is not valid JSON: {e}")))
}
