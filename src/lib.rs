//! # book-dl
//!
//! Concurrent book-reader page downloader. Given the URL of an online book
//! viewer, `book-dl` fetches every page image in parallel and assembles them
//! into a single PDF, in strict page order, with memory bounded by an
//! explicit lookahead window.
//!
//! ## Quick start
//!
//! ```no_run
//! use book_dl::{BookDownloader, Config};
//!
//! # async fn run() -> book_dl::Result<()> {
//! let downloader = BookDownloader::new(Config::default())?;
//! let book = downloader
//!     .download("https://library.example.edu/reader?Url=%2Fbooks%2Fabc&TotalPage=162&ext=jpg")
//!     .await?;
//! std::fs::write("book.pdf", &book.bytes)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## How it works
//!
//! - The **resolver** turns the viewer URL into an ordered list of page
//!   image URLs (pure, no I/O).
//! - The **governor** sizes the worker pool: with a memory budget configured,
//!   page 1 is probe-fetched first and its payload size decides how many
//!   concurrent fetches fit the budget.
//! - The **pipeline** fetches pages concurrently, buffers out-of-order
//!   completions, and commits them to the sink in ascending order. A
//!   semaphore holds completed-but-unwritten pages below the configured
//!   lookahead, so memory stays flat regardless of page count.
//! - The **sink** appends each image to an incrementally written PDF. JPEG
//!   pages are embedded byte-for-byte; other formats are re-encoded to
//!   flate-compressed RGB.
//!
//! Any permanent page failure aborts the whole job; the result is either a
//! complete document or an error, never a partial one.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

pub mod config;
pub mod downloader;
pub mod error;
pub mod fetch;
pub mod governor;
mod pdf;
pub mod pipeline;
pub mod resolver;
pub mod retry;
pub mod sink;
pub mod types;

pub use config::{Config, FetchConfig, MemoryConfig, RetryConfig};
pub use downloader::BookDownloader;
pub use error::{Error, FetchError, Result};
pub use fetch::{HttpFetcher, PageFetcher};
pub use governor::WorkerPlan;
pub use resolver::BookDescriptor;
pub use sink::{PageSink, PdfSink};
pub use types::{AssembledBook, PageRef};
