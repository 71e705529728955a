//! OAuth2 client-credentials token exchange with a JWT client assertion
//!
//! The exchanger POSTs a form-encoded request to the token endpoint:
//!
//! ```text
//! grant_type=client_credentials
//! client_id=<client id>
//! client_assertion_type=urn:ietf:params:oauth:client-assertion-type:jwt-bearer
//! client_assertion=<signed JWT>
//! scope=<scope>              (only when configured)
//! ```
//!
//! A 2xx response must carry a JSON `access_token`. Any other status is
//! reported with its status and raw body, which are also logged before the
//! error is returned.
//!
//! # References
//!
//! - RFC 6749 section 4.4 <https://www.rfc-editor.org/rfc/rfc6749#section-4.4>
//! - RFC 7523 section 2.2 <https://www.rfc-editor.org/rfc/rfc7523#section-2.2>

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AbmError, Result};
use crate::redact::{redact_json_body, redact_token};

/// `grant_type` for the client-credentials grant
pub const GRANT_TYPE: &str = "client_credentials";

/// `client_assertion_type` for JWT bearer client authentication
pub const CLIENT_ASSERTION_TYPE: &str = "urn:ietf:params:oauth:client-assertion-type:jwt-bearer";

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// Form body of the token request
#[derive(Debug, Serialize)]
struct TokenRequest<'a> {
    grant_type: &'a str,
    client_id: &'a str,
    client_assertion_type: &'a str,
    client_assertion: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    scope: Option<&'a str>,
}

/// Raw JSON response from the token endpoint
///
/// Only `access_token` is required. The metadata fields are kept as loose
/// JSON values so a server that reports them with an unexpected type still
/// yields a usable token; such values are ignored.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<Value>,
    #[serde(default)]
    token_type: Option<Value>,
    #[serde(default)]
    expires_in: Option<Value>,
    #[serde(default)]
    scope: Option<Value>,
}

impl TokenResponse {
    /// Decode a 2xx response body
    fn from_body(body: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(body).map_err(|e| {
            AbmError::TokenResponse(format!("token response is not valid JSON: {e}"))
        })?;
        if !value.is_object() {
            return Err(AbmError::TokenResponse(
                "token response is not a JSON object".to_string(),
            ));
        }
        serde_json::from_value(value).map_err(|e| {
            AbmError::TokenResponse(format!("token response could not be decoded: {e}"))
        })
    }

    fn into_access_token(self) -> Result<AccessToken> {
        let secret = match self.access_token {
            Some(Value::String(token)) if !token.is_empty() => token,
            Some(Value::String(_)) | None | Some(Value::Null) => {
                return Err(AbmError::TokenResponse(
                    "response does not contain access_token".to_string(),
                ))
            }
            Some(_) => {
                return Err(AbmError::TokenResponse(
                    "access_token is not a string".to_string(),
                ))
            }
        };

        let expires_at = self
            .expires_in
            .as_ref()
            .and_then(expires_in_secs)
            .and_then(chrono::Duration::try_seconds)
            .and_then(|lifetime| Utc::now().checked_add_signed(lifetime));

        Ok(AccessToken {
            secret,
            token_type: self.token_type.and_then(string_value),
            expires_at,
            scope: self.scope.and_then(scope_value),
        })
    }
}

/// `expires_in` as whole seconds, from a number or a numeric string
fn expires_in_secs(value: &Value) -> Option<i64> {
    let secs = match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().and_then(float_secs)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(float_secs))
        }
        _ => None,
    }?;
    (secs >= 0).then_some(secs)
}

fn float_secs(secs: f64) -> Option<i64> {
    (secs.is_finite() && secs >= 0.0 && secs <= i64::MAX as f64).then(|| secs.trunc() as i64)
}

fn string_value(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        _ => None,
    }
}

/// `scope` as a space-delimited string; a list of strings is joined
fn scope_value(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Array(items) => {
            let scopes: Vec<&str> = items.iter().filter_map(Value::as_str).collect();
            (!scopes.is_empty()).then(|| scopes.join(" "))
        }
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// AccessToken
// ---------------------------------------------------------------------------

/// Bearer access token held in memory for the duration of one API call
///
/// `Debug` and `Display` never reveal the token; use [`AccessToken::secret`]
/// where the raw value is genuinely needed.
#[derive(Clone)]
pub struct AccessToken {
    secret: String,
    /// `token_type` as reported by the server
    pub token_type: Option<String>,
    /// Expiry derived from `expires_in`
    pub expires_at: Option<DateTime<Utc>>,
    /// Granted scope as reported by the server
    pub scope: Option<String>,
}

impl AccessToken {
    /// Wrap a raw token with no server metadata
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            token_type: None,
            expires_at: None,
            scope: None,
        }
    }

    /// The raw bearer credential
    pub fn secret(&self) -> &str {
        &self.secret
    }

    /// Value for the `Authorization` header
    pub fn authorization_header(&self) -> String {
        format!("Bearer {}", self.secret)
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("secret", &redact_token(&self.secret))
            .field("token_type", &self.token_type)
            .field("expires_at", &self.expires_at)
            .field("scope", &self.scope)
            .finish()
    }
}

impl std::fmt::Display for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&redact_token(&self.secret))
    }
}

// ---------------------------------------------------------------------------
// TokenExchanger
// ---------------------------------------------------------------------------

/// Exchanges client assertions for access tokens at one token endpoint
///
/// # Examples
///
/// ```no_run
/// use std::time::Duration;
/// use abm_verify::http::build_client;
/// use abm_verify::token::TokenExchanger;
///
/// # async fn example(assertion: &str) -> abm_verify::Result<()> {
/// let http = build_client(Duration::from_secs(30))?;
/// let exchanger = TokenExchanger::new(http, "https://account.apple.com/auth/oauth2/token");
/// let token = exchanger
///     .exchange("BUSINESSAPI.example", assertion, Some("business.api"))
///     .await?;
/// println!("got token {}", token);
/// # Ok(())
/// # }
/// ```
pub struct TokenExchanger {
    http: Client,
    token_url: String,
}

impl TokenExchanger {
    /// Create an exchanger using a prepared HTTP client
    pub fn new(http: Client, token_url: impl Into<String>) -> Self {
        Self {
            http,
            token_url: token_url.into(),
        }
    }

    /// Token endpoint this exchanger posts to
    pub fn token_url(&self) -> &str {
        &self.token_url
    }

    /// Exchange a client assertion for an access token
    ///
    /// # Arguments
    ///
    /// * `client_id` - Client identifier, matching the assertion's `iss`
    /// * `assertion` - Compact signed JWT
    /// * `scope` - Optional scope to request
    ///
    /// # Errors
    ///
    /// - [`AbmError::TokenExchange`] on a non-2xx status, with status and body
    /// - [`AbmError::TokenResponse`] if a 2xx body lacks `access_token` or is
    ///   not JSON
    /// - [`AbmError::Timeout`] if the request exceeds the client timeout
    /// - [`AbmError::Http`] on other transport failures
    pub async fn exchange(
        &self,
        client_id: &str,
        assertion: &str,
        scope: Option<&str>,
    ) -> Result<AccessToken> {
        let form = TokenRequest {
            grant_type: GRANT_TYPE,
            client_id,
            client_assertion_type: CLIENT_ASSERTION_TYPE,
            client_assertion: assertion,
            scope,
        };

        tracing::info!(
            token_url = %self.token_url,
            client_id = %client_id,
            scope = scope.unwrap_or("-"),
            "Requesting access token"
        );

        let response = self
            .http
            .post(&self.token_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| AbmError::from_transport(e, "token request"))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AbmError::from_transport(e, "reading token response"))?;

        if !status.is_success() {
            tracing::warn!(
                status = status.as_u16(),
                body = %body,
                "Token endpoint rejected the client assertion"
            );
            return Err(AbmError::TokenExchange {
                status: status.as_u16(),
                body,
            });
        }

        tracing::info!(status = status.as_u16(), "Token endpoint responded");
        tracing::debug!(body = %redact_json_body(&body), "Token response body");

        let token = TokenResponse::from_body(&body)?.into_access_token()?;

        tracing::info!(
            token = %token,
            token_type = token.token_type.as_deref().unwrap_or("-"),
            expires_at = ?token.expires_at,
            "Obtained access token"
        );

        Ok(token)
    }
}
