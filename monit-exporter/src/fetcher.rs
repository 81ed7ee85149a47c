//! Fetcher for the monit status document.

use std::time::Duration;

use bytes::Bytes;
use thiserror::Error;
use tracing::debug;

use crate::config::MonitConfig;

/// Fetch errors.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Failed to build http client: {0}")]
    Client(reqwest::Error),
    #[error("Failed to fetch monit status: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Monit status request returned {status}")]
    Status { status: reqwest::StatusCode },
}

/// HTTP(S) client for one monit daemon.
///
/// The client is built once at startup; certificate verification is
/// disabled iff `ignore_ssl` was set, an explicit insecure opt-in.
pub struct StatusFetcher {
    config: MonitConfig,
    client: reqwest::Client,
}

impl StatusFetcher {
    /// Create a fetcher for the configured monit daemon.
    pub fn new(config: MonitConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(config.ignore_ssl)
            .timeout(Duration::from_secs(config.fetch_timeout_secs))
            .build()
            .map_err(FetchError::Client)?;

        Ok(Self { config, client })
    }

    /// Fetch the raw status document with a single GET, fully buffered.
    ///
    /// Basic auth is attached only when credentials are configured, so
    /// an unauthenticated monit never sees a spurious auth header.
    pub async fn fetch(&self) -> Result<Bytes, FetchError> {
        let mut request = self.client.get(&self.config.scrape_uri);

        if self.has_credentials() {
            request = request.basic_auth(&self.config.user, Some(&self.config.password));
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status { status });
        }

        let body = response.bytes().await?;
        debug!(uri = %self.config.scrape_uri, bytes = body.len(), "Fetched monit status");
        Ok(body)
    }

    fn has_credentials(&self) -> bool {
        !self.config.user.is_empty() || !self.config.password.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_fetcher(user: &str, password: &str) -> StatusFetcher {
        let config = MonitConfig {
            user: user.to_string(),
            password: password.to_string(),
            ..Default::default()
        };
        StatusFetcher::new(config).unwrap()
    }

    #[test]
    fn test_no_credentials_no_auth() {
        assert!(!make_fetcher("", "").has_credentials());
    }

    #[test]
    fn test_credentials_enable_auth() {
        assert!(make_fetcher("admin", "monit").has_credentials());
        // A lone user or password is still sent; trust the config.
        assert!(make_fetcher("admin", "").has_credentials());
        assert!(make_fetcher("", "secret").has_credentials());
    }

    #[test]
    fn test_insecure_client_builds() {
        let config = MonitConfig {
            ignore_ssl: true,
            ..Default::default()
        };
        assert!(StatusFetcher::new(config).is_ok());
    }

    #[tokio::test]
    async fn test_fetch_unreachable_daemon() {
        let config = MonitConfig {
            scrape_uri: "http://127.0.0.1:1/_status?format=xml".to_string(),
            fetch_timeout_secs: 1,
            ..Default::default()
        };
        let fetcher = StatusFetcher::new(config).unwrap();

        assert!(fetcher.fetch().await.is_err());
    }
}
