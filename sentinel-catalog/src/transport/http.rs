//! Blocking HTTP access used by the OData transport.

use crate::config::{CatalogConfig, Credentials};

use super::error::TransportError;

/// A blocking GET returning the response body.
///
/// Implementations report non-success statuses as
/// [`TransportError::Status`] so callers can tell a missing resource from a
/// network failure. Tests substitute canned clients here.
pub trait HttpClient: Send + Sync {
    fn get(&self, url: &str) -> Result<Vec<u8>, TransportError>;
}

/// Real HTTP client implementation using reqwest.
///
/// Every request carries the configured basic-auth credentials and user
/// agent, and is bounded by the configured timeout.
pub struct ReqwestClient {
    client: reqwest::blocking::Client,
    credentials: Option<Credentials>,
}

impl ReqwestClient {
    /// Creates a client from the catalog configuration.
    pub fn new(config: &CatalogConfig) -> Result<Self, TransportError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| TransportError::Http(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            credentials: config.credentials.clone(),
        })
    }
}

impl HttpClient for ReqwestClient {
    fn get(&self, url: &str) -> Result<Vec<u8>, TransportError> {
        let mut request = self.client.get(url);
        if let Some(creds) = &self.credentials {
            request = request.basic_auth(&creds.username, Some(&creds.password));
        }

        let response = request
            .send()
            .map_err(|e| TransportError::Http(format!("Request to {} failed: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(TransportError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        response
            .bytes()
            .map(|b| b.to_vec())
            .map_err(|e| TransportError::Http(format!("Failed to read response: {}", e)))
    }
}
