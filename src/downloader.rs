//! Job orchestration
//!
//! [`BookDownloader`] owns the configuration and the HTTP connection pool and
//! drives one descriptor from parse to finished PDF: resolve, optionally
//! probe page 1 to size the worker pool, run the concurrent pipeline over the
//! remaining pages, finalize. On any fatal error no artifact is produced and
//! the document is never finalized.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::fetch::{HttpFetcher, PageFetcher};
use crate::governor::WorkerPlan;
use crate::pipeline;
use crate::resolver::BookDescriptor;
use crate::sink::{PageSink, PdfSink};
use crate::types::AssembledBook;
use std::sync::Arc;

/// Downloads one book per call. Cheap to clone; clones share the connection
/// pool.
#[derive(Clone)]
pub struct BookDownloader {
    config: Config,
    fetcher: Arc<HttpFetcher>,
}

impl BookDownloader {
    /// Build a downloader, constructing the shared HTTP client.
    pub fn new(config: Config) -> Result<Self> {
        let fetcher = Arc::new(HttpFetcher::new(&config)?);
        Ok(Self { config, fetcher })
    }

    /// Fetch every page of `descriptor` and assemble them into a PDF.
    ///
    /// Pages are fetched concurrently but committed to the document in strict
    /// ascending order. Returns the complete artifact or the first fatal
    /// error; there is no partial output.
    pub async fn download(&self, descriptor: &str) -> Result<AssembledBook> {
        let book = BookDescriptor::parse(descriptor)?;
        tracing::info!(
            total_pages = book.total_pages,
            base_url = %book.base_url,
            "starting book download"
        );

        // Reject impossible static limits before touching the network
        WorkerPlan::compute(&self.config, None)?;

        let mut pages = book.pages();
        let mut sink = PdfSink::new();
        sink.begin()?;

        // With a memory budget, page 1 doubles as the probe: its measured
        // size feeds the governor and its payload is committed directly, so
        // no page is ever fetched twice.
        let plan = if self.config.memory.budget_bytes.is_some() {
            let first = pages.remove(0);
            let payload = self
                .fetcher
                .fetch(&first)
                .await
                .map_err(|cause| Error::FetchFailed {
                    page: first.number,
                    cause,
                })?;
            tracing::debug!(bytes = payload.len(), "probe page fetched");
            let plan = WorkerPlan::compute(&self.config, Some(payload.len() as u64))?;
            sink.add_page(first.number, &payload)?;
            plan
        } else {
            WorkerPlan::compute(&self.config, None)?
        };

        let fetcher: Arc<dyn PageFetcher> = self.fetcher.clone();
        pipeline::assemble(fetcher, pages, plan, &mut sink).await?;

        let bytes = sink.finalize()?;
        tracing::info!(
            total_pages = book.total_pages,
            artifact_bytes = bytes.len(),
            "book assembled"
        );
        Ok(AssembledBook {
            bytes,
            page_count: book.total_pages,
        })
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn malformed_descriptor_fails_before_any_fetch() {
        let downloader = BookDownloader::new(Config::default()).unwrap();
        let err = downloader.download("not a url at all").await.unwrap_err();
        assert!(matches!(err, Error::MalformedDescriptor(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn impossible_limits_fail_before_any_fetch() {
        let mut config = Config::default();
        config.memory.lookahead = 0;
        let downloader = BookDownloader::new(config).unwrap();
        // Host is unroutable; reaching the network would hang, not error fast
        let err = downloader
            .download("http://192.0.2.1/r?Url=%2Fb&TotalPage=3")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ResourceExhaustion { .. }), "got {err:?}");
    }

    #[test]
    fn downloader_clones_share_the_pool() {
        let downloader = BookDownloader::new(Config::default()).unwrap();
        let clone = downloader.clone();
        assert!(Arc::ptr_eq(&downloader.fetcher, &clone.fetcher));
    }
}
