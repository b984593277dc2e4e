//! Reader-descriptor parsing
//!
//! A descriptor is the URL of an online book viewer whose query string names
//! the total page count (`TotalPage`), the page image extension (`ext`) and
//! the percent-encoded directory that hosts the page images (`Url`). Parsing
//! is a pure function of the input string: no I/O, no side effects.

use crate::error::{Error, Result};
use crate::types::PageRef;
use url::Url;

/// Default page image extension when the descriptor omits `ext`
const DEFAULT_EXT: &str = "jpg";

/// Width of the zero-padded page number in image filenames (000001.jpg, ...)
const PAGE_NUMBER_WIDTH: usize = 6;

/// Parsed descriptor: the total page count plus the base location every
/// per-page URL is resolved against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookDescriptor {
    /// Total number of pages (always >= 1)
    pub total_pages: u32,
    /// Lowercased page image extension without the leading dot
    pub ext: String,
    /// Image directory resolved against the viewer's origin, trailing slash kept
    pub base_url: Url,
}

impl BookDescriptor {
    /// Parse a viewer URL into a descriptor.
    ///
    /// Fails with [`Error::MalformedDescriptor`] when the input is not an
    /// absolute URL, `TotalPage` is missing/non-numeric/non-positive, or
    /// `Url` is missing or empty.
    pub fn parse(descriptor: &str) -> Result<Self> {
        let reader_url = Url::parse(descriptor)
            .map_err(|e| Error::MalformedDescriptor(format!("not a valid URL: {e}")))?;

        let mut total_pages: Option<i64> = None;
        let mut ext = DEFAULT_EXT.to_string();
        let mut rel_path: Option<String> = None;

        for (key, value) in reader_url.query_pairs() {
            match key.as_ref() {
                "TotalPage" => {
                    let n = value.parse::<i64>().map_err(|_| {
                        Error::MalformedDescriptor(format!("TotalPage is not a number: {value:?}"))
                    })?;
                    total_pages = Some(n);
                }
                "ext" => ext = value.to_lowercase(),
                "Url" => rel_path = Some(value.into_owned()),
                _ => {}
            }
        }

        let total_pages = match total_pages {
            Some(n) if n > 0 => u32::try_from(n)
                .map_err(|_| Error::MalformedDescriptor(format!("TotalPage out of range: {n}")))?,
            Some(n) => {
                return Err(Error::MalformedDescriptor(format!(
                    "TotalPage must be positive, got {n}"
                )));
            }
            None => {
                return Err(Error::MalformedDescriptor(
                    "missing 'TotalPage' parameter".into(),
                ));
            }
        };

        let rel_path = rel_path
            .filter(|p| !p.is_empty())
            .ok_or_else(|| Error::MalformedDescriptor("missing 'Url' parameter".into()))?;

        let base_url = make_base_url(&reader_url, &rel_path)?;

        Ok(Self {
            total_pages,
            ext,
            base_url,
        })
    }

    /// Fetch location for one page: the base joined with the zero-padded
    /// sequence number and extension.
    #[must_use]
    pub fn page_url(&self, page: u32) -> Url {
        let mut url = self.base_url.clone();
        // http(s) URLs always have mutable path segments
        if let Ok(mut segments) = url.path_segments_mut() {
            let name = format!("{page:0width$}.{ext}", width = PAGE_NUMBER_WIDTH, ext = self.ext);
            segments.pop_if_empty().push(&name);
        }
        url
    }

    /// The ordered sequence of fetchable pages, `1..=total_pages`, no gaps.
    #[must_use]
    pub fn pages(&self) -> Vec<PageRef> {
        (1..=self.total_pages)
            .map(|number| PageRef {
                number,
                url: self.page_url(number),
            })
            .collect()
    }
}

/// Resolve the decoded image directory path against the viewer's origin.
///
/// Tolerates a path that already starts with `/` and inner double slashes
/// (some viewers emit `//FullPreview`); always yields a trailing slash so
/// page filenames join underneath it.
fn make_base_url(reader_url: &Url, rel_path: &str) -> Result<Url> {
    let mut path = rel_path.trim_start_matches('/').to_string();
    if !path.ends_with('/') {
        path.push('/');
    }

    let mut base = reader_url.clone();
    base.set_query(None);
    base.set_fragment(None);
    base.set_path(&format!("/{path}"));
    Ok(base)
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    const READER_URL: &str = "https://library.example.edu/pages/cms/FullBookReader.aspx?\
        Url=%2Fpages%2Fcms%2FTempDir%2Fbooks%2F202006-bc77%2F%2FFullPreview&TotalPage=162&ext=jpg";

    #[test]
    fn parses_real_world_descriptor() {
        let desc = BookDescriptor::parse(READER_URL).unwrap();
        assert_eq!(desc.total_pages, 162);
        assert_eq!(desc.ext, "jpg");
        assert_eq!(
            desc.base_url.as_str(),
            "https://library.example.edu/pages/cms/TempDir/books/202006-bc77//FullPreview/"
        );
    }

    #[test]
    fn page_urls_are_zero_padded_and_ordered() {
        let desc = BookDescriptor::parse(READER_URL).unwrap();
        assert!(desc.page_url(1).as_str().ends_with("/000001.jpg"));
        assert!(desc.page_url(42).as_str().ends_with("/000042.jpg"));
        assert!(desc.page_url(123_456).as_str().ends_with("/123456.jpg"));
    }

    #[test]
    fn pages_covers_one_through_n_without_gaps() {
        let desc = BookDescriptor::parse(
            "https://host.example/reader?Url=%2Fbooks%2Fabc&TotalPage=5&ext=png",
        )
        .unwrap();
        let pages = desc.pages();
        assert_eq!(pages.len(), 5);
        for (i, page) in pages.iter().enumerate() {
            assert_eq!(page.number as usize, i + 1);
            assert!(
                page.url
                    .as_str()
                    .ends_with(&format!("{:06}.png", i + 1))
            );
        }
    }

    #[test]
    fn ext_defaults_to_jpg_and_is_lowercased() {
        let desc = BookDescriptor::parse("https://host.example/r?Url=%2Fb&TotalPage=3").unwrap();
        assert_eq!(desc.ext, "jpg");

        let desc =
            BookDescriptor::parse("https://host.example/r?Url=%2Fb&TotalPage=3&ext=PNG").unwrap();
        assert_eq!(desc.ext, "png");
    }

    #[test]
    fn missing_total_page_is_malformed() {
        let err = BookDescriptor::parse("https://host.example/r?Url=%2Fbooks").unwrap_err();
        assert!(matches!(err, Error::MalformedDescriptor(_)), "got {err:?}");
        assert!(err.to_string().contains("TotalPage"));
    }

    #[test]
    fn zero_or_negative_total_page_is_malformed() {
        for total in ["0", "-3"] {
            let url = format!("https://host.example/r?Url=%2Fb&TotalPage={total}");
            let err = BookDescriptor::parse(&url).unwrap_err();
            assert!(matches!(err, Error::MalformedDescriptor(_)), "got {err:?}");
        }
    }

    #[test]
    fn non_numeric_total_page_is_malformed() {
        let err =
            BookDescriptor::parse("https://host.example/r?Url=%2Fb&TotalPage=many").unwrap_err();
        assert!(matches!(err, Error::MalformedDescriptor(_)));
    }

    #[test]
    fn missing_or_empty_url_param_is_malformed() {
        for q in ["TotalPage=10", "TotalPage=10&Url="] {
            let url = format!("https://host.example/r?{q}");
            let err = BookDescriptor::parse(&url).unwrap_err();
            assert!(matches!(err, Error::MalformedDescriptor(_)), "query {q:?}");
            assert!(err.to_string().contains("Url"), "query {q:?}");
        }
    }

    #[test]
    fn not_a_url_is_malformed() {
        let err = BookDescriptor::parse("definitely not a url").unwrap_err();
        assert!(matches!(err, Error::MalformedDescriptor(_)));
    }

    #[test]
    fn relative_path_without_leading_slash_is_absolutized() {
        let desc =
            BookDescriptor::parse("https://host.example/r?Url=books%2Fx&TotalPage=1").unwrap();
        assert_eq!(desc.base_url.as_str(), "https://host.example/books/x/");
    }

    #[test]
    fn parsing_is_deterministic() {
        let a = BookDescriptor::parse(READER_URL).unwrap();
        let b = BookDescriptor::parse(READER_URL).unwrap();
        assert_eq!(a, b);
    }
}
