//! Startup configuration.

use std::time::Duration;

use crate::client::DRIVE_API_BASE;
use crate::error::{DriveError, Result};
use crate::identity::IDENTITY_DISCOVERY_URL;
use crate::picker::DRIVE_DISCOVERY_URL;

/// How long callers wait for the libraries before reporting "not ready".
pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(10);

/// Remote endpoints. Defaults point at the vendor's public services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub identity_discovery: String,
    pub drive_discovery: String,
    pub drive_api: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            identity_discovery: IDENTITY_DISCOVERY_URL.to_string(),
            drive_discovery: DRIVE_DISCOVERY_URL.to_string(),
            drive_api: DRIVE_API_BASE.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub client_id: String,
    pub developer_key: String,
    pub client_secret: Option<String>,
    pub endpoints: Endpoints,
    pub ready_timeout: Duration,
}

impl Config {
    /// Validate the two required identifiers. Blank values are rejected here
    /// so a misconfigured deployment fails before anything is loaded.
    pub fn new(client_id: impl Into<String>, developer_key: impl Into<String>) -> Result<Self> {
        let client_id = client_id.into().trim().to_string();
        let developer_key = developer_key.into().trim().to_string();

        if client_id.is_empty() {
            return Err(DriveError::MissingConfig("GOOGLE_CLIENT_ID"));
        }
        if developer_key.is_empty() {
            return Err(DriveError::MissingConfig("GOOGLE_DEVELOPER_KEY"));
        }

        Ok(Self {
            client_id,
            developer_key,
            client_secret: None,
            endpoints: Endpoints::default(),
            ready_timeout: DEFAULT_READY_TIMEOUT,
        })
    }

    pub fn with_client_secret(mut self, secret: Option<String>) -> Self {
        self.client_secret = secret.filter(|s| !s.trim().is_empty());
        self
    }

    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn with_ready_timeout(mut self, timeout: Duration) -> Self {
        self.ready_timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_client_id() {
        let err = Config::new("  ", "key").unwrap_err();
        assert!(matches!(err, DriveError::MissingConfig("GOOGLE_CLIENT_ID")));
    }

    #[test]
    fn test_requires_developer_key() {
        let err = Config::new("client", "").unwrap_err();
        assert!(err.to_string().contains("GOOGLE_DEVELOPER_KEY"));
    }

    #[test]
    fn test_defaults() {
        let config = Config::new(" client ", "key")
            .unwrap()
            .with_client_secret(Some(String::new()));
        assert_eq!(config.client_id, "client");
        assert_eq!(config.client_secret, None);
        assert_eq!(config.endpoints, Endpoints::default());
        assert_eq!(config.ready_timeout, DEFAULT_READY_TIMEOUT);
    }
}
