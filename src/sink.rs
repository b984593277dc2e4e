//! Streaming document sink
//!
//! [`PageSink`] is the capability the pipeline needs from the encoder:
//! consume pages strictly in order, append each to a growing artifact, and
//! hand back the finished bytes exactly once. [`PdfSink`] is the production
//! implementation; tests substitute recording sinks.

use crate::error::{Error, Result};
use crate::pdf::{ColorSpace, ImageEncoding, PageImage, PdfWriter};
use flate2::Compression;
use flate2::write::ZlibEncoder;
use image::GenericImageView;
use std::io::Write;

/// Ordered consumer of page payloads.
///
/// Callers must deliver pages in ascending page-number order; the sink never
/// reorders. `finalize` must only be called after every page has been added.
pub trait PageSink {
    /// Open the document. Idempotent.
    fn begin(&mut self) -> Result<()>;

    /// Append one page. The payload is released once this returns.
    fn add_page(&mut self, page: u32, payload: &[u8]) -> Result<()>;

    /// Close the document and return the artifact bytes.
    fn finalize(self) -> Result<Vec<u8>>
    where
        Self: Sized;
}

/// PDF sink: each payload becomes one page sized exactly to the image's
/// pixel dimensions, drawn at full extent.
///
/// Decodes only enough of each payload to obtain dimensions and color
/// information; at most one decoded image is alive at a time. JPEG payloads
/// are embedded byte-for-byte, other decodable formats are re-encoded to
/// flate-compressed RGB.
pub struct PdfSink {
    writer: PdfWriter,
}

impl PdfSink {
    /// Create an empty document.
    #[must_use]
    pub fn new() -> Self {
        Self {
            writer: PdfWriter::new(),
        }
    }

    /// Number of pages committed so far.
    #[must_use]
    pub fn page_count(&self) -> usize {
        self.writer.page_count()
    }
}

impl Default for PdfSink {
    fn default() -> Self {
        Self::new()
    }
}

impl PageSink for PdfSink {
    fn begin(&mut self) -> Result<()> {
        // Header bytes are emitted at construction; nothing to reopen
        Ok(())
    }

    fn add_page(&mut self, page: u32, payload: &[u8]) -> Result<()> {
        let format = image::guess_format(payload).map_err(|e| Error::Decode {
            page,
            reason: e.to_string(),
        })?;
        let decoded = image::load_from_memory(payload).map_err(|e| Error::Decode {
            page,
            reason: e.to_string(),
        })?;
        let (width, height) = decoded.dimensions();
        if width == 0 || height == 0 {
            return Err(Error::Decode {
                page,
                reason: format!("degenerate dimensions {width}x{height}"),
            });
        }

        match format {
            image::ImageFormat::Jpeg => {
                let color = match decoded.color() {
                    image::ColorType::L8 | image::ColorType::L16 => ColorSpace::DeviceGray,
                    _ => ColorSpace::DeviceRgb,
                };
                self.writer.add_page(&PageImage {
                    width,
                    height,
                    color,
                    encoding: ImageEncoding::Dct,
                    data: payload,
                });
            }
            _ => {
                let raw = decoded.into_rgb8().into_raw();
                let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
                encoder.write_all(&raw)?;
                let compressed = encoder.finish()?;
                self.writer.add_page(&PageImage {
                    width,
                    height,
                    color: ColorSpace::DeviceRgb,
                    encoding: ImageEncoding::Flate,
                    data: &compressed,
                });
            }
        }

        tracing::trace!(page, width, height, "page committed to document");
        Ok(())
    }

    fn finalize(self) -> Result<Vec<u8>> {
        Ok(self.writer.finish())
    }
}
