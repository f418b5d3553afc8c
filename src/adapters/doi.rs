//! DOI resolution over HTTP.
//!
//! A DOI "resolves" when `GET {base_url}{doi}` ends (after redirects) in a
//! 2xx response. Transport failures and timeouts are reported as errors,
//! never as a non-resolving DOI.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::USER_AGENT;
use tracing::debug;

use super::{DoiResolver, ResolveError};

pub const DEFAULT_DOI_BASE_URL: &str = "https://doi.org/";

/// Some publisher landing pages refuse requests without a browser agent
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0";

/// Resolver backed by an HTTP DOI proxy
pub struct HttpDoiResolver {
    client: reqwest::Client,
    base_url: String,
    user_agent: String,
    timeout: Duration,
}

impl HttpDoiResolver {
    pub fn new(base_url: impl Into<String>, user_agent: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            user_agent: user_agent.into(),
            timeout,
        }
    }

    pub fn with_defaults(timeout: Duration) -> Self {
        Self::new(DEFAULT_DOI_BASE_URL, DEFAULT_USER_AGENT, timeout)
    }

    pub fn url_for(&self, doi: &str) -> String {
        format!("{}{}", self.base_url, doi.trim())
    }
}

#[async_trait]
impl DoiResolver for HttpDoiResolver {
    fn name(&self) -> &str {
        "http"
    }

    async fn resolves(&self, doi: &str) -> Result<bool, ResolveError> {
        let url = self.url_for(doi);

        let response = self
            .client
            .get(&url)
            .header(USER_AGENT, &self.user_agent)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ResolveError::Timeout {
                        doi: doi.to_string(),
                        seconds: self.timeout.as_secs(),
                    }
                } else {
                    ResolveError::Network {
                        doi: doi.to_string(),
                        message: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        debug!(%url, %status, "DOI resolver responded");
        Ok(status.is_success())
    }
}

/// Resolver for runs without network access; every lookup is indeterminate
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineResolver;

#[async_trait]
impl DoiResolver for OfflineResolver {
    fn name(&self) -> &str {
        "offline"
    }

    async fn resolves(&self, doi: &str) -> Result<bool, ResolveError> {
        Err(ResolveError::Network {
            doi: doi.to_string(),
            message: "network access disabled".to_string(),
        })
    }
}
