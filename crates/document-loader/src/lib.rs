//! Document loading for contract analysis
//!
//! Turns an uploaded file into a [`Document`] holding normalized plain text.
//! Supported inputs are PDF, DOCX and plain text; the format comes from the
//! caller's declaration (explicit or via filename extension) and must agree
//! with the content's byte signature.
//!
//! Loading is all-or-nothing: either the full normalized text is returned or
//! a [`LoaderError`], never a truncated result.

pub mod error;
pub mod legal;
pub mod normalize;
pub mod sniff;

mod docx;
mod pdf;
mod text;

use shared_types::{Document, DocumentFormat};
use tracing::{debug, info};

pub use error::LoaderError;
pub use legal::looks_like_legal_document;
pub use normalize::{normalize_pages, normalize_text, PAGE_BREAK, PAGE_SEPARATOR};
pub use sniff::sniff_format;

/// Default upload ceiling: 25 MiB
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// An uploaded file awaiting extraction
#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: Option<String>,
    /// Explicit format declaration; takes precedence over the extension
    pub format: Option<DocumentFormat>,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: Some(filename.into()),
            format: None,
            bytes,
        }
    }

    /// Upload with no name; the format is sniffed from content
    pub fn anonymous(bytes: Vec<u8>) -> Self {
        Self {
            filename: None,
            format: None,
            bytes,
        }
    }

    pub fn with_format(mut self, format: DocumentFormat) -> Self {
        self.format = Some(format);
        self
    }

    /// The declared format, if any.
    ///
    /// `Ok(None)` means nothing was declared (no explicit format and no
    /// extension). An extension outside the supported set is an error.
    pub fn declared_format(&self) -> Result<Option<DocumentFormat>, LoaderError> {
        if let Some(format) = self.format {
            return Ok(Some(format));
        }

        let extension = self
            .filename
            .as_deref()
            .and_then(|name| name.rsplit_once('.'))
            .map(|(_, ext)| ext)
            .filter(|ext| !ext.is_empty());

        match extension {
            Some(ext) => DocumentFormat::from_extension(ext)
                .map(Some)
                .ok_or_else(|| LoaderError::UnsupportedFormat(format!(".{}", ext))),
            None => Ok(None),
        }
    }
}

/// Converts uploads into normalized [`Document`]s
#[derive(Debug, Clone)]
pub struct DocumentLoader {
    max_upload_bytes: usize,
}

impl DocumentLoader {
    pub fn new(max_upload_bytes: usize) -> Self {
        Self { max_upload_bytes }
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_bytes
    }

    /// Validate, detect and extract an upload.
    ///
    /// # Errors
    /// - `TooLarge` when the upload exceeds the configured ceiling
    /// - `UnsupportedFormat` for unknown extensions or unrecognizable content
    /// - `CorruptDocument` for empty uploads, content that does not match the
    ///   declared format, and documents with no extractable text
    pub fn load(&self, upload: Upload) -> Result<Document, LoaderError> {
        let size = upload.bytes.len();
        if size > self.max_upload_bytes {
            return Err(LoaderError::TooLarge {
                size,
                limit: self.max_upload_bytes,
            });
        }

        let declared = upload.declared_format()?;
        if size == 0 {
            return Err(LoaderError::corrupt(declared, "upload is empty"));
        }

        let format = resolve_format(declared, &upload.bytes)?;
        debug!(%format, size, filename = ?upload.filename, "Resolved upload format");

        let (text, pages) = match format {
            DocumentFormat::Pdf => {
                let extracted = pdf::extract_pdf(&upload.bytes)?;
                (normalize_pages(&extracted.pages), extracted.page_count)
            }
            DocumentFormat::Docx => (normalize_text(&docx::extract_docx(&upload.bytes)?), 1),
            DocumentFormat::PlainText => plain_text(&text::decode_text(&upload.bytes)),
        };

        finish(upload.bytes, format, text, pages)
    }

    /// Load text the caller already has as a string, such as pasted contract
    /// text. Size and emptiness are checked as for uploads; there is no
    /// signature check because the content is text by construction.
    pub fn load_text(&self, raw: &str) -> Result<Document, LoaderError> {
        let size = raw.len();
        if size > self.max_upload_bytes {
            return Err(LoaderError::TooLarge {
                size,
                limit: self.max_upload_bytes,
            });
        }
        if size == 0 {
            return Err(LoaderError::corrupt(
                Some(DocumentFormat::PlainText),
                "upload is empty",
            ));
        }

        let (text, pages) = plain_text(raw);
        finish(raw.as_bytes().to_vec(), DocumentFormat::PlainText, text, pages)
    }
}

fn plain_text(raw: &str) -> (String, u32) {
    let text = normalize_text(raw);
    let pages = text.matches(PAGE_BREAK).count() as u32 + 1;
    (text, pages)
}

fn finish(
    bytes: Vec<u8>,
    format: DocumentFormat,
    text: String,
    pages: u32,
) -> Result<Document, LoaderError> {
    if text.is_empty() {
        return Err(LoaderError::corrupt(
            Some(format),
            "no text could be extracted",
        ));
    }

    info!(%format, pages, chars = text.len(), "Loaded document");

    Ok(Document::new(bytes, format, text, pages))
}

impl Default for DocumentLoader {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_UPLOAD_BYTES)
    }
}

/// Reconcile the declared format with the byte signature.
fn resolve_format(
    declared: Option<DocumentFormat>,
    data: &[u8],
) -> Result<DocumentFormat, LoaderError> {
    let sniffed = sniff_format(data);

    match (declared, sniffed) {
        (Some(declared), Some(sniffed)) if declared == sniffed => Ok(declared),
        (Some(declared), _) => Err(LoaderError::corrupt(
            Some(declared),
            format!("content does not match the declared {} format", declared),
        )),
        (None, Some(sniffed)) => Ok(sniffed),
        (None, None) => Err(LoaderError::UnsupportedFormat(
            "unrecognized file content".to_string(),
        )),
    }
}
