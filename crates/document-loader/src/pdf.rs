//! PDF text extraction via pdf-extract

use std::panic::{catch_unwind, AssertUnwindSafe};

use shared_types::DocumentFormat;
use tracing::debug;

use crate::error::LoaderError;

/// Raw per-page text of a PDF
pub(crate) struct ExtractedPdf {
    pub pages: Vec<String>,
    pub page_count: u32,
}

pub(crate) fn extract_pdf(data: &[u8]) -> Result<ExtractedPdf, LoaderError> {
    // pdf-extract panics on some malformed inputs; a panic here means the
    // document cannot be read, not that the service is broken.
    let extracted = catch_unwind(AssertUnwindSafe(|| {
        pdf_extract::extract_text_from_mem_by_pages(data)
    }))
    .map_err(|_| LoaderError::corrupt(Some(DocumentFormat::Pdf), "PDF parser aborted"))?;

    let pages = extracted.map_err(|e| {
        let message = e.to_string();
        let lowered = message.to_lowercase();
        if lowered.contains("encrypted") || lowered.contains("password") {
            LoaderError::corrupt(Some(DocumentFormat::Pdf), "PDF is password protected")
        } else {
            LoaderError::corrupt(Some(DocumentFormat::Pdf), message)
        }
    })?;

    let page_count = pages.len().max(1) as u32;

    debug!(
        page_count,
        chars = pages.iter().map(String::len).sum::<usize>(),
        "Extracted PDF text"
    );

    Ok(ExtractedPdf { pages, page_count })
}
