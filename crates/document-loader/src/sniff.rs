//! Byte-signature format detection

use std::io::Cursor;

use shared_types::DocumentFormat;

const PDF_MAGIC: &[u8] = b"%PDF-";
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
pub(crate) const DOCX_MAIN_PART: &str = "word/document.xml";

/// PDF readers accept the header anywhere in the first kilobyte
const PDF_HEADER_WINDOW: usize = 1024;
const TEXT_SAMPLE_LEN: usize = 8 * 1024;

/// Detect the format of `data` from its content alone.
///
/// Returns `None` for empty input and for content that is neither a PDF, a
/// DOCX package, nor plausible text.
pub fn sniff_format(data: &[u8]) -> Option<DocumentFormat> {
    if data.is_empty() {
        return None;
    }

    if is_pdf(data) {
        return Some(DocumentFormat::Pdf);
    }

    if data.starts_with(ZIP_MAGIC) {
        return is_docx_package(data).then_some(DocumentFormat::Docx);
    }

    looks_like_text(data).then_some(DocumentFormat::PlainText)
}

pub(crate) fn is_pdf(data: &[u8]) -> bool {
    let window = &data[..data.len().min(PDF_HEADER_WINDOW)];
    window
        .windows(PDF_MAGIC.len())
        .any(|candidate| candidate == PDF_MAGIC)
}

fn is_docx_package(data: &[u8]) -> bool {
    match zip::ZipArchive::new(Cursor::new(data)) {
        Ok(archive) => archive.file_names().any(|name| name == DOCX_MAIN_PART),
        Err(_) => false,
    }
}

/// Text heuristic: no NUL bytes and almost no non-whitespace control bytes
/// in the leading sample. Latin-1 text passes, binary formats do not.
pub(crate) fn looks_like_text(data: &[u8]) -> bool {
    let sample = &data[..data.len().min(TEXT_SAMPLE_LEN)];
    if sample.contains(&0) {
        return false;
    }

    let suspicious = sample
        .iter()
        .filter(|&&b| b < 0x20 && !matches!(b, b'\t' | b'\n' | b'\r' | 0x0C))
        .count();

    suspicious * 100 <= sample.len()
}
