//! Authenticated calls to the device-management API
//!
//! This is a thin verification probe: the response status and body are
//! returned untouched, and a non-2xx status is data, not an error.

use reqwest::Client;

use crate::error::{AbmError, Result};
use crate::token::AccessToken;

/// Resource listing the organization's devices
pub const ORG_DEVICES_PATH: &str = "/orgDevices";

/// Raw response from the API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body, unmodified
    pub body: String,
}

impl ApiResponse {
    /// Whether the status is in the 2xx range
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Client for the device-management API
pub struct ApiClient {
    http: Client,
    base_url: String,
}

impl ApiClient {
    /// Create a client using a prepared HTTP client
    pub fn new(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// GET `path` below the base URL with the bearer token
    ///
    /// # Errors
    ///
    /// Returns [`AbmError::Timeout`] if the request exceeds the client
    /// timeout, or [`AbmError::Http`] on other transport failures.
    pub async fn get(&self, path: &str, token: &AccessToken) -> Result<ApiResponse> {
        let url = self.url(path);
        tracing::info!(url = %url, token = %token, "Calling API");

        let response = self
            .http
            .get(&url)
            .header(reqwest::header::AUTHORIZATION, token.authorization_header())
            .send()
            .await
            .map_err(|e| AbmError::from_transport(e, "API request"))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| AbmError::from_transport(e, "reading API response"))?;

        if (200..300).contains(&status) {
            tracing::info!(status, bytes = body.len(), "API responded");
        } else {
            tracing::warn!(status, body = %body, "API returned an error status");
        }

        Ok(ApiResponse { status, body })
    }

    /// GET the organization's device list
    pub async fn org_devices(&self, token: &AccessToken) -> Result<ApiResponse> {
        self.get(ORG_DEVICES_PATH, token).await
    }
}
