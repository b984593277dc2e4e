//! Core shared types

use url::Url;

/// One fetchable page image, identified by its 1-based sequence number.
///
/// The number is the page's final position in the output document. Produced
/// once by the resolver and immutable thereafter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRef {
    /// 1-based page number
    pub number: u32,
    /// Fully resolved fetch location for this page
    pub url: Url,
}

/// The assembled output document.
#[derive(Debug, Clone)]
pub struct AssembledBook {
    /// Complete PDF bytes
    pub bytes: Vec<u8>,
    /// Number of pages in the document, equal to the descriptor's total
    pub page_count: u32,
}
