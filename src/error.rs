//! Error types for book-dl
//!
//! Two layers of errors exist:
//! - [`FetchError`] lives at the HTTP transport boundary. Transient cases
//!   (rate limiting, 5xx statuses, connection timeouts) are retried inside the
//!   fetch worker and never escape it unless retries are exhausted.
//! - [`Error`] is the job-level taxonomy. Every variant other than `Io` is
//!   fatal to the whole job: no partial document is ever finalized.

use thiserror::Error;

/// Result type alias for book-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for book-dl
///
/// Any of these aborts the entire job. The caller gets either a complete
/// document or one of these; there is no partial output.
#[derive(Debug, Error)]
pub enum Error {
    /// The input descriptor lacks required fields or has a non-positive page count
    #[error("malformed descriptor: {0}")]
    MalformedDescriptor(String),

    /// A page could not be retrieved after retries, or returned a permanent
    /// non-success status
    #[error("failed to fetch page {page}: {cause}")]
    FetchFailed {
        /// 1-based page number that failed
        page: u32,
        /// The underlying transport failure
        cause: FetchError,
    },

    /// Retrieved bytes could not be interpreted as an image
    #[error("page {page} is not a decodable image: {reason}")]
    Decode {
        /// 1-based page number whose payload failed to decode
        page: u32,
        /// Decoder diagnostic
        reason: String,
    },

    /// The memory budget cannot accommodate even the minimum pipeline,
    /// or the lookahead bound is zero. Surfaced before any main-wave fetch.
    #[error("resource limits too tight: {reason}")]
    ResourceExhaustion {
        /// What the configuration cannot accommodate
        reason: String,
    },

    /// HTTP client construction failed
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// Fetch workers stopped before every page was delivered
    ///
    /// Only reachable if a worker task panics; fetch failures surface as
    /// [`Error::FetchFailed`] instead.
    #[error("fetch workers stopped before page {page} was delivered")]
    Stalled {
        /// The next page the assembler was waiting for
        page: u32,
    },

    /// I/O error while writing the output artifact
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Transport-level fetch failure for a single attempt
///
/// Classified as retryable or permanent at construction time, against the
/// configured retryable status set, so the retry loop stays policy-agnostic.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Server answered with a non-success HTTP status
    #[error("HTTP status {status}")]
    Status {
        /// The HTTP status code returned by the server
        status: u16,
        /// Whether the status is in the configured retryable set
        retryable: bool,
    },

    /// Request-level failure (connect, timeout, body read)
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl Error {
    /// Page number this error concerns, if it is tied to a single page.
    pub fn page(&self) -> Option<u32> {
        match self {
            Error::FetchFailed { page, .. } | Error::Decode { page, .. } => Some(*page),
            _ => None,
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_failed_display_includes_page_and_cause() {
        let err = Error::FetchFailed {
            page: 7,
            cause: FetchError::Status {
                status: 404,
                retryable: false,
            },
        };
        let msg = err.to_string();
        assert!(msg.contains("page 7"), "message was: {msg}");
        assert!(msg.contains("404"), "message was: {msg}");
    }

    #[test]
    fn decode_display_includes_page() {
        let err = Error::Decode {
            page: 3,
            reason: "unsupported format".into(),
        };
        assert!(err.to_string().contains("page 3"));
    }

    #[test]
    fn resource_exhaustion_display_includes_reason() {
        let err = Error::ResourceExhaustion {
            reason: "budget of 1000 bytes holds zero workers".into(),
        };
        assert!(err.to_string().contains("1000 bytes"));
    }

    #[test]
    fn page_accessor_reports_page_bound_variants_only() {
        let fetch = Error::FetchFailed {
            page: 2,
            cause: FetchError::Status {
                status: 500,
                retryable: true,
            },
        };
        assert_eq!(fetch.page(), Some(2));

        let decode = Error::Decode {
            page: 9,
            reason: "truncated".into(),
        };
        assert_eq!(decode.page(), Some(9));

        let malformed = Error::MalformedDescriptor("missing TotalPage".into());
        assert_eq!(malformed.page(), None);
    }
}
