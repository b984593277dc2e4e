//! Page fetching over HTTP
//!
//! [`PageFetcher`] is the capability the pipeline needs from the transport:
//! fetch one page's bytes, retrying transient failures internally, and fail
//! with a [`FetchError`] once retries are exhausted or a permanent failure
//! occurs. [`HttpFetcher`] is the reqwest-backed production implementation;
//! tests substitute their own.

use crate::config::{Config, RetryConfig};
use crate::error::{Error, FetchError, Result};
use crate::retry::fetch_with_retry;
use crate::types::PageRef;
use async_trait::async_trait;
use url::Url;

/// Capability to retrieve one page's raw bytes.
///
/// Implementations apply their own retry policy; a returned error means the
/// page is permanently unavailable and the job must fail.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch the payload for `page`, retrying transient failures internally.
    async fn fetch(&self, page: &PageRef) -> std::result::Result<Vec<u8>, FetchError>;
}

/// HTTP page fetcher with an explicitly owned connection pool.
///
/// The pool is constructed once, sized to at least twice the worker-count
/// upper bound so concurrent workers never starve each other of connections,
/// and released when the fetcher is dropped on any exit path.
pub struct HttpFetcher {
    client: reqwest::Client,
    retry: RetryConfig,
}

impl HttpFetcher {
    /// Build a fetcher from config.
    ///
    /// Fails with [`Error::Client`] if the underlying TLS/connection setup
    /// cannot be initialized.
    pub fn new(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.fetch.request_timeout)
            .user_agent(config.fetch.user_agent.clone())
            .pool_max_idle_per_host(config.fetch.max_workers.saturating_mul(2))
            .build()
            .map_err(Error::Client)?;

        Ok(Self {
            client,
            retry: config.retry.clone(),
        })
    }

    /// One GET attempt, no retries.
    async fn fetch_once(&self, url: &Url) -> std::result::Result<Vec<u8>, FetchError> {
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status().as_u16();
        if !response.status().is_success() {
            return Err(FetchError::Status {
                status,
                retryable: self.retry.is_retryable_status(status),
            });
        }
        let body = response.bytes().await?;
        Ok(body.to_vec())
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, page: &PageRef) -> std::result::Result<Vec<u8>, FetchError> {
        tracing::debug!(page = page.number, url = %page.url, "fetching page");
        let payload = fetch_with_retry(&self.retry, || self.fetch_once(&page.url)).await?;
        tracing::debug!(page = page.number, bytes = payload.len(), "page fetched");
        Ok(payload)
    }
}
