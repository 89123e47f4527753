//! Page fetching
//!
//! The sweep only needs two capabilities from the outside world: get the
//! markup of a source page, and pull article cards out of it. [`Fetcher`]
//! bundles both; [`HttpFetcher`] is the reqwest-backed implementation.

use crate::config::{FetcherConfig, SelectorConfig};
use crate::crawler::parser::{extract_articles, ExtractError, ExtractedArticle};
use async_trait::async_trait;
use reqwest::{redirect::Policy, Client};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while fetching a source page
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("Request timeout for {url}")]
    Timeout { url: String },
}

/// Fetch+Extract capability used by the sweep
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Returns the markup of `url`, giving up after `timeout`
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<String, FetchError>;

    /// Extracts article cards from markup fetched from `source_url`
    fn extract(
        &self,
        html: &str,
        source_url: &str,
        selectors: &SelectorConfig,
    ) -> Result<Vec<ExtractedArticle>, ExtractError> {
        extract_articles(html, source_url, selectors)
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The fetcher configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(config: &FetcherConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.as_str())
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches source pages with a plain HTTP GET
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &FetcherConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(config)?,
        })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<String, FetchError> {
        let classify = |e: reqwest::Error| {
            if e.is_timeout() {
                FetchError::Timeout {
                    url: url.to_string(),
                }
            } else {
                FetchError::Http {
                    url: url.to_string(),
                    source: e,
                }
            }
        };

        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(&classify)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(&classify)
    }
}
