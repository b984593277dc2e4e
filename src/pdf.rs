//! Incremental PDF writer for image-per-page documents
//!
//! Emits page triplets (image XObject, content stream, page object) as they
//! arrive, so the in-memory state at any moment is the bytes already written
//! plus bookkeeping offsets; no page is revisited. The page tree, catalog,
//! cross-reference table and trailer are emitted once at [`PdfWriter::finish`].
//!
//! JPEG payloads are embedded byte-for-byte as `DCTDecode` streams. Anything
//! else arrives pre-deflated from the sink as raw RGB with `FlateDecode`.

/// Object id of the document catalog (written at finish)
const CATALOG_ID: u32 = 1;
/// Object id of the page tree root (written at finish)
const PAGES_ID: u32 = 2;

/// How the image data in a [`PageImage`] is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ImageEncoding {
    /// JPEG bytes embedded as-is
    Dct,
    /// zlib-deflated raw samples
    Flate,
}

/// Color space the image samples are in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ColorSpace {
    /// 8-bit RGB triplets
    DeviceRgb,
    /// 8-bit grayscale
    DeviceGray,
}

/// One page's image, ready to embed.
pub(crate) struct PageImage<'a> {
    /// Pixel width; also the page width in points (px == pt at 72 dpi)
    pub width: u32,
    /// Pixel height; also the page height in points
    pub height: u32,
    /// Sample color space
    pub color: ColorSpace,
    /// Stream encoding
    pub encoding: ImageEncoding,
    /// Encoded image bytes
    pub data: &'a [u8],
}

/// Streaming writer: pages in, complete PDF out.
pub(crate) struct PdfWriter {
    buf: Vec<u8>,
    /// Byte offset of each object, indexed by `id - 1`. Slots for the
    /// catalog and page tree stay zero until finish.
    offsets: Vec<u64>,
    page_ids: Vec<u32>,
}

impl PdfWriter {
    /// Start a document: header and binary marker only.
    pub(crate) fn new() -> Self {
        let mut buf = Vec::with_capacity(4096);
        buf.extend_from_slice(b"%PDF-1.4\n");
        // Binary marker comment so transports treat the file as binary
        buf.extend_from_slice(b"%\xE2\xE3\xCF\xD3\n");
        Self {
            buf,
            offsets: vec![0; 2],
            page_ids: Vec::new(),
        }
    }

    /// Number of pages appended so far.
    pub(crate) fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    /// Append one page sized exactly to the image, image drawn at full
    /// extent: no rescaling, no cropping.
    pub(crate) fn add_page(&mut self, image: &PageImage<'_>) {
        let image_id = self.alloc();
        let content_id = self.alloc();
        let page_id = self.alloc();

        let colorspace = match image.color {
            ColorSpace::DeviceRgb => "/DeviceRGB",
            ColorSpace::DeviceGray => "/DeviceGray",
        };
        let filter = match image.encoding {
            ImageEncoding::Dct => "/DCTDecode",
            ImageEncoding::Flate => "/FlateDecode",
        };

        self.begin_object(image_id);
        self.push(&format!(
            "<< /Type /XObject /Subtype /Image /Width {} /Height {} \
             /ColorSpace {} /BitsPerComponent 8 /Filter {} /Length {} >>\nstream\n",
            image.width,
            image.height,
            colorspace,
            filter,
            image.data.len(),
        ));
        self.buf.extend_from_slice(image.data);
        self.push("\nendstream\nendobj\n");

        // Scale the unit image square up to the page and draw it
        let content = format!(
            "q\n{w} 0 0 {h} 0 0 cm\n/Im0 Do\nQ\n",
            w = image.width,
            h = image.height,
        );
        self.begin_object(content_id);
        self.push(&format!(
            "<< /Length {} >>\nstream\n{}endstream\nendobj\n",
            content.len(),
            content,
        ));

        self.begin_object(page_id);
        self.push(&format!(
            "<< /Type /Page /Parent {PAGES_ID} 0 R /MediaBox [0 0 {w} {h}] \
             /Resources << /XObject << /Im0 {image_id} 0 R >> >> \
             /Contents {content_id} 0 R >>\nendobj\n",
            w = image.width,
            h = image.height,
        ));

        self.page_ids.push(page_id);
    }

    /// Emit the page tree, catalog, cross-reference table and trailer;
    /// return the complete document.
    pub(crate) fn finish(mut self) -> Vec<u8> {
        self.begin_object(PAGES_ID);
        let kids = self
            .page_ids
            .iter()
            .map(|id| format!("{id} 0 R"))
            .collect::<Vec<_>>()
            .join(" ");
        self.push(&format!(
            "<< /Type /Pages /Kids [{kids}] /Count {} >>\nendobj\n",
            self.page_ids.len(),
        ));

        self.begin_object(CATALOG_ID);
        self.push(&format!(
            "<< /Type /Catalog /Pages {PAGES_ID} 0 R >>\nendobj\n"
        ));

        let xref_offset = self.buf.len();
        let size = self.offsets.len() + 1;
        self.push(&format!("xref\n0 {size}\n"));
        // Entry lines are exactly 20 bytes each, free entry first
        self.push("0000000000 65535 f \n");
        for offset in &self.offsets {
            self.buf
                .extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes());
        }
        self.push(&format!(
            "trailer\n<< /Size {size} /Root {CATALOG_ID} 0 R >>\nstartxref\n{xref_offset}\n%%EOF\n"
        ));

        self.buf
    }

    /// Reserve the next object id.
    fn alloc(&mut self) -> u32 {
        self.offsets.push(0);
        self.offsets.len() as u32
    }

    /// Record the offset of `id` and write its object header.
    fn begin_object(&mut self, id: u32) {
        self.offsets[(id - 1) as usize] = self.buf.len() as u64;
        self.push(&format!("{id} 0 obj\n"));
    }

    fn push(&mut self, s: &str) {
        self.buf.extend_from_slice(s.as_bytes());
    }
}
