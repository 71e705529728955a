//! Configuration management for abm-verify
//!
//! All settings come from environment variables. They are read once at
//! startup into an explicit [`Config`], validated, and then passed by
//! reference to the components that need them. The lookup itself is
//! injectable so callers and tests never have to mutate the process
//! environment.

use crate::error::{AbmError, Result};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Token endpoint used for the client-credentials exchange
pub const DEFAULT_TOKEN_URL: &str = "https://account.apple.com/auth/oauth2/token";

/// Audience the authorization server validates for exchanged assertions
pub const DEFAULT_TOKEN_AUDIENCE: &str = "https://account.apple.com/auth/oauth2/v2/token";

/// Base URL of the device-management API
pub const DEFAULT_API_BASE: &str = "https://api-business.apple.com/v1";

/// Scope requested by the verification flow
pub const DEFAULT_SCOPE: &str = "business.api";

/// Longest assertion lifetime the authorization server accepts (15 minutes)
pub const MAX_ASSERTION_LIFETIME_SECS: u64 = 900;

const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Environment variable names
pub mod env {
    pub const CLIENT_ID: &str = "ABM_CLIENT_ID";
    pub const KEY_ID: &str = "ABM_KEY_ID";
    pub const KEY_PATH: &str = "ABM_KEY_PATH";
    pub const TOKEN_URL: &str = "ABM_TOKEN_URL";
    pub const TOKEN_AUDIENCE: &str = "ABM_TOKEN_AUDIENCE";
    pub const API_BASE: &str = "ABM_API_BASE";
    pub const SCOPE: &str = "ABM_SCOPE";
    pub const ASSERTION_LIFETIME_SECS: &str = "ABM_ASSERTION_LIFETIME_SECS";
    pub const HTTP_TIMEOUT_SECS: &str = "ABM_HTTP_TIMEOUT_SECS";
    pub const LOG_JSON: &str = "ABM_LOG_JSON";
}

/// Which flow the configuration is built for
///
/// The standalone assertion flow and the full verification flow use
/// different defaults for lifetime, audience and scope. Neither set is
/// authoritative for the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Build and print a client assertion only
    Assertion,
    /// Build an assertion, exchange it, and call the device API
    Verify,
}

impl Flow {
    fn default_lifetime_secs(self) -> u64 {
        match self {
            Flow::Assertion => 300,
            Flow::Verify => 900,
        }
    }

    fn default_scope(self) -> Option<String> {
        match self {
            Flow::Assertion => None,
            Flow::Verify => Some(DEFAULT_SCOPE.to_string()),
        }
    }

    fn default_audience(self, token_url: &str) -> String {
        match self {
            Flow::Assertion => token_url.to_string(),
            Flow::Verify => DEFAULT_TOKEN_AUDIENCE.to_string(),
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone)]
pub struct Config {
    /// API client identifier, used as `iss`, `sub` and `client_id`
    pub client_id: String,
    /// Identifier of the registered public key, sent as `kid`
    pub key_id: String,
    /// Path to the unencrypted PKCS#8 EC P-256 private key
    pub key_path: PathBuf,
    /// OAuth2 token endpoint
    pub token_url: String,
    /// Exact `aud` value expected by the authorization server
    pub token_audience: String,
    /// Base URL of the device-management API
    pub api_base: String,
    /// Optional scope for the token request
    pub scope: Option<String>,
    /// Assertion validity window in seconds
    pub assertion_lifetime_secs: u64,
    /// Per-request HTTP timeout in seconds
    pub http_timeout_secs: u64,
}

impl Config {
    /// Load and validate configuration from the process environment
    ///
    /// # Errors
    ///
    /// Returns [`AbmError::Config`] if a required variable is missing or any
    /// value fails validation.
    pub fn load(flow: Flow) -> Result<Self> {
        Self::load_with(flow, |name| std::env::var(name).ok())
    }

    /// Load and validate configuration from an arbitrary variable lookup
    pub fn load_with<F>(flow: Flow, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = Self::from_lookup(flow, lookup)?;
        config.validate()?;
        Ok(config)
    }

    /// Build configuration from the process environment without validating
    pub fn from_env(flow: Flow) -> Result<Self> {
        Self::from_lookup(flow, |name| std::env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable lookup
    ///
    /// # Arguments
    ///
    /// * `flow` - Selects the flow-specific defaults
    /// * `lookup` - Returns the value of a variable, or `None` when unset
    ///
    /// # Errors
    ///
    /// Returns [`AbmError::Config`] if `ABM_CLIENT_ID`, `ABM_KEY_ID` or
    /// `ABM_KEY_PATH` is missing, or a numeric value does not parse.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::collections::HashMap;
    /// use abm_verify::config::{Config, Flow};
    ///
    /// let vars: HashMap<&str, &str> = [
    ///     ("ABM_CLIENT_ID", "BUSINESSAPI.example"),
    ///     ("ABM_KEY_ID", "key-1"),
    ///     ("ABM_KEY_PATH", "/tmp/key.pem"),
    /// ]
    /// .into_iter()
    /// .collect();
    ///
    /// let config = Config::from_lookup(Flow::Assertion, |name| {
    ///     vars.get(name).map(|v| v.to_string())
    /// })
    /// .unwrap();
    /// assert_eq!(config.assertion_lifetime_secs, 300);
    /// ```
    pub fn from_lookup<F>(flow: Flow, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let client_id = required(&lookup, env::CLIENT_ID)?;
        let key_id = required(&lookup, env::KEY_ID)?;
        let key_path = PathBuf::from(required(&lookup, env::KEY_PATH)?);

        let token_url = optional(&lookup, env::TOKEN_URL)
            .unwrap_or_else(|| DEFAULT_TOKEN_URL.to_string());
        let token_audience = optional(&lookup, env::TOKEN_AUDIENCE)
            .unwrap_or_else(|| flow.default_audience(&token_url));
        let api_base =
            optional(&lookup, env::API_BASE).unwrap_or_else(|| DEFAULT_API_BASE.to_string());

        // An explicitly empty scope disables it even where the flow has a default.
        let scope = match lookup(env::SCOPE) {
            Some(value) if value.trim().is_empty() => None,
            Some(value) => Some(value.trim().to_string()),
            None => flow.default_scope(),
        };

        let assertion_lifetime_secs = parse_secs(&lookup, env::ASSERTION_LIFETIME_SECS)?
            .unwrap_or_else(|| flow.default_lifetime_secs());
        let http_timeout_secs =
            parse_secs(&lookup, env::HTTP_TIMEOUT_SECS)?.unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS);

        Ok(Self {
            client_id,
            key_id,
            key_path,
            token_url,
            token_audience,
            api_base,
            scope,
            assertion_lifetime_secs,
            http_timeout_secs,
        })
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns [`AbmError::Config`] if any check fails.
    pub fn validate(&self) -> Result<()> {
        if self.client_id.trim().is_empty() {
            return Err(AbmError::Config("client_id cannot be empty".to_string()));
        }

        if self.key_id.trim().is_empty() {
            return Err(AbmError::Config("key_id cannot be empty".to_string()));
        }

        if !self.key_path.is_file() {
            return Err(AbmError::Config(format!(
                "key file not found: {}",
                self.key_path.display()
            )));
        }

        validate_http_url("token_url", &self.token_url)?;
        validate_http_url("api_base", &self.api_base)?;

        if self.token_audience.trim().is_empty() {
            return Err(AbmError::Config("token_audience cannot be empty".to_string()));
        }

        if self.assertion_lifetime_secs == 0 {
            return Err(AbmError::Config(
                "assertion lifetime must be greater than 0".to_string(),
            ));
        }

        if self.assertion_lifetime_secs > MAX_ASSERTION_LIFETIME_SECS {
            return Err(AbmError::Config(format!(
                "assertion lifetime must be at most {} seconds, got {}",
                MAX_ASSERTION_LIFETIME_SECS, self.assertion_lifetime_secs
            )));
        }

        if self.http_timeout_secs == 0 {
            return Err(AbmError::Config(
                "http timeout must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Per-request timeout for both network calls
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

/// Whether JSON log output was requested through `ABM_LOG_JSON`
///
/// The log format is read ahead of [`Config`] so that configuration errors
/// are reported through the subscriber it selects. It is not part of
/// [`Config`] and never fails.
pub fn log_json_from_env() -> bool {
    log_json_with(|name| std::env::var(name).ok())
}

/// Same as [`log_json_from_env`], reading through an arbitrary lookup
pub fn log_json_with<F>(lookup: F) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    optional(&lookup, env::LOG_JSON).is_some_and(|v| parse_bool(&v))
}

fn required<F>(lookup: &F, name: &str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    optional(lookup, name).ok_or_else(|| AbmError::Config(format!("{name} is not set")))
}

fn optional<F>(lookup: &F, name: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_secs<F>(lookup: &F, name: &str) -> Result<Option<u64>>
where
    F: Fn(&str) -> Option<String>,
{
    match optional(lookup, name) {
        Some(raw) => raw
            .parse::<u64>()
            .map(Some)
            .map_err(|_| AbmError::Config(format!("{name} must be a whole number, got {raw:?}"))),
        None => Ok(None),
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn validate_http_url(field: &str, value: &str) -> Result<()> {
    let url = Url::parse(value)
        .map_err(|e| AbmError::Config(format!("{field} is not a valid URL ({value}): {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(AbmError::Config(format!(
            "{field} must use http or https, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::collections::HashMap;
    use tempfile::NamedTempFile;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    fn base_vars(key_path: &str) -> Vec<(&'static str, String)> {
        vec![
            (env::CLIENT_ID, "BUSINESSAPI.test-client".to_string()),
            (env::KEY_ID, "test-key-id".to_string()),
            (env::KEY_PATH, key_path.to_string()),
        ]
    }

    fn config_for(flow: Flow, extra: &[(&str, &str)]) -> Result<Config> {
        let mut vars: Vec<(&str, &str)> = vec![
            (env::CLIENT_ID, "BUSINESSAPI.test-client"),
            (env::KEY_ID, "test-key-id"),
            (env::KEY_PATH, "/nonexistent/key.pem"),
        ];
        vars.extend_from_slice(extra);
        Config::from_lookup(flow, lookup_from(&vars))
    }

    #[test]
    fn test_verify_flow_defaults() {
        let config = config_for(Flow::Verify, &[]).unwrap();
        assert_eq!(config.token_url, DEFAULT_TOKEN_URL);
        assert_eq!(config.token_audience, DEFAULT_TOKEN_AUDIENCE);
        assert_eq!(config.api_base, DEFAULT_API_BASE);
        assert_eq!(config.scope.as_deref(), Some("business.api"));
        assert_eq!(config.assertion_lifetime_secs, 900);
        assert_eq!(config.http_timeout_secs, 30);
    }

    #[test]
    fn test_assertion_flow_defaults() {
        let config = config_for(Flow::Assertion, &[]).unwrap();
        assert_eq!(config.token_audience, DEFAULT_TOKEN_URL);
        assert_eq!(config.scope, None);
        assert_eq!(config.assertion_lifetime_secs, 300);
    }

    #[test]
    fn test_assertion_audience_follows_token_url_override() {
        let config = config_for(
            Flow::Assertion,
            &[(env::TOKEN_URL, "http://127.0.0.1:9999/token")],
        )
        .unwrap();
        assert_eq!(config.token_audience, "http://127.0.0.1:9999/token");
    }

    #[test]
    fn test_missing_key_path_is_config_error() {
        let lookup = lookup_from(&[
            (env::CLIENT_ID, "BUSINESSAPI.test-client"),
            (env::KEY_ID, "test-key-id"),
        ]);
        let err = Config::from_lookup(Flow::Verify, lookup).unwrap_err();
        assert!(matches!(err, AbmError::Config(ref msg) if msg.contains("ABM_KEY_PATH")));
    }

    #[test]
    fn test_blank_client_id_is_treated_as_missing() {
        let lookup = lookup_from(&[
            (env::CLIENT_ID, "   "),
            (env::KEY_ID, "test-key-id"),
            (env::KEY_PATH, "/tmp/key.pem"),
        ]);
        let err = Config::from_lookup(Flow::Verify, lookup).unwrap_err();
        assert!(matches!(err, AbmError::Config(ref msg) if msg.contains("ABM_CLIENT_ID")));
    }

    #[test]
    fn test_empty_scope_disables_default() {
        let config = config_for(Flow::Verify, &[(env::SCOPE, "")]).unwrap();
        assert_eq!(config.scope, None);
    }

    #[test]
    fn test_scope_override() {
        let config = config_for(Flow::Assertion, &[(env::SCOPE, "business.api")]).unwrap();
        assert_eq!(config.scope.as_deref(), Some("business.api"));
    }

    #[test]
    fn test_invalid_lifetime_number() {
        let err = config_for(Flow::Verify, &[(env::ASSERTION_LIFETIME_SECS, "15m")]).unwrap_err();
        assert!(matches!(err, AbmError::Config(_)));
    }

    #[test]
    fn test_validation_success() {
        let key = NamedTempFile::new().unwrap();
        let vars = base_vars(key.path().to_str().unwrap());
        let vars: Vec<(&str, &str)> = vars.iter().map(|(k, v)| (*k, v.as_str())).collect();
        let config = Config::from_lookup(Flow::Verify, lookup_from(&vars)).unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_missing_key_file() {
        let config = config_for(Flow::Verify, &[]).unwrap();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, AbmError::Config(ref msg) if msg.contains("key file not found")));
    }

    #[test]
    fn test_validation_rejects_lifetime_above_maximum() {
        let key = NamedTempFile::new().unwrap();
        let mut config = config_for(Flow::Verify, &[]).unwrap();
        config.key_path = key.path().to_path_buf();
        config.assertion_lifetime_secs = MAX_ASSERTION_LIFETIME_SECS + 1;
        assert!(config.validate().is_err());

        config.assertion_lifetime_secs = MAX_ASSERTION_LIFETIME_SECS;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_zero_lifetime_and_timeout() {
        let key = NamedTempFile::new().unwrap();
        let mut config = config_for(Flow::Verify, &[]).unwrap();
        config.key_path = key.path().to_path_buf();

        config.assertion_lifetime_secs = 0;
        assert!(config.validate().is_err());

        config.assertion_lifetime_secs = 300;
        config.http_timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_non_http_urls() {
        let key = NamedTempFile::new().unwrap();
        let mut config = config_for(Flow::Verify, &[]).unwrap();
        config.key_path = key.path().to_path_buf();
        config.token_url = "ftp://example.com/token".to_string();
        assert!(config.validate().is_err());

        config.token_url = DEFAULT_TOKEN_URL.to_string();
        config.api_base = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_log_json_uses_lookup() {
        let vars = vec![(env::LOG_JSON, "true")];
        assert!(log_json_with(lookup_from(&vars)));

        let vars = vec![(env::LOG_JSON, "no")];
        assert!(!log_json_with(lookup_from(&vars)));

        let vars: Vec<(&str, &str)> = Vec::new();
        assert!(!log_json_with(lookup_from(&vars)));
    }

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("true"));
        assert!(parse_bool("1"));
        assert!(parse_bool(" YES "));
        assert!(!parse_bool("false"));
        assert!(!parse_bool(""));
    }

    #[test]
    #[serial]
    fn test_from_env_reads_process_environment() {
        std::env::set_var(env::CLIENT_ID, "BUSINESSAPI.from-env");
        std::env::set_var(env::KEY_ID, "env-key-id");
        std::env::set_var(env::KEY_PATH, "/tmp/env-key.pem");
        std::env::set_var(env::HTTP_TIMEOUT_SECS, "5");

        let config = Config::from_env(Flow::Verify).unwrap();

        std::env::remove_var(env::CLIENT_ID);
        std::env::remove_var(env::KEY_ID);
        std::env::remove_var(env::KEY_PATH);
        std::env::remove_var(env::HTTP_TIMEOUT_SECS);

        assert_eq!(config.client_id, "BUSINESSAPI.from-env");
        assert_eq!(config.key_id, "env-key-id");
        assert_eq!(config.http_timeout(), Duration::from_secs(5));
    }
}
