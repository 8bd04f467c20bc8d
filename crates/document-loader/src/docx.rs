//! DOCX text extraction
//!
//! Reads `word/document.xml` out of the package and walks the WordprocessingML
//! body. Body paragraphs become lines in document order; table content is
//! appended after the body, one line per table row with cell texts joined by
//! a single space.

use std::io::{Cursor, Read};

use quick_xml::events::Event;
use quick_xml::Reader;
use shared_types::DocumentFormat;

use crate::error::LoaderError;
use crate::sniff::DOCX_MAIN_PART;

/// Hard cap on the decompressed main part, guarding against zip bombs
const MAX_DOCUMENT_XML_BYTES: u64 = 64 * 1024 * 1024;

pub(crate) fn extract_docx(data: &[u8]) -> Result<String, LoaderError> {
    let xml = read_main_part(data, MAX_DOCUMENT_XML_BYTES)?;
    parse_document_xml(&xml)
}

/// Read the main part in full. A part larger than `limit` is rejected rather
/// than cut short.
fn read_main_part(data: &[u8], limit: u64) -> Result<String, LoaderError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(data))
        .map_err(|e| corrupt(format!("not a valid DOCX package: {}", e)))?;

    let part = archive
        .by_name(DOCX_MAIN_PART)
        .map_err(|_| corrupt(format!("package has no {}", DOCX_MAIN_PART)))?;

    let mut xml = String::new();
    let read = part
        .take(limit.saturating_add(1))
        .read_to_string(&mut xml)
        .map_err(|e| corrupt(format!("unreadable {}: {}", DOCX_MAIN_PART, e)))?;

    if read as u64 > limit {
        return Err(corrupt(format!(
            "{} exceeds {} bytes",
            DOCX_MAIN_PART, limit
        )));
    }

    Ok(xml)
}

#[derive(Default)]
struct BodyWalker {
    body_lines: Vec<String>,
    table_lines: Vec<String>,
    paragraph: String,
    cell: String,
    row_cells: Vec<String>,
    table_depth: usize,
    in_text_run: bool,
}

impl BodyWalker {
    fn end_paragraph(&mut self) {
        let paragraph = std::mem::take(&mut self.paragraph);
        if self.table_depth > 0 {
            if !self.cell.is_empty() && !paragraph.trim().is_empty() {
                self.cell.push(' ');
            }
            self.cell.push_str(paragraph.trim());
        } else if !paragraph.trim().is_empty() {
            self.body_lines.push(paragraph);
        }
    }

    fn end_cell(&mut self) {
        let cell = std::mem::take(&mut self.cell);
        if !cell.trim().is_empty() {
            self.row_cells.push(cell);
        }
    }

    fn end_row(&mut self) {
        let cells = std::mem::take(&mut self.row_cells);
        if !cells.is_empty() {
            self.table_lines.push(cells.join(" "));
        }
    }

    fn finish(mut self) -> String {
        self.end_paragraph();
        self.body_lines.append(&mut self.table_lines);
        self.body_lines.join("\n")
    }
}

pub(crate) fn parse_document_xml(xml: &str) -> Result<String, LoaderError> {
    let mut reader = Reader::from_str(xml);
    let mut walker = BodyWalker::default();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"t" => walker.in_text_run = true,
                b"tbl" => walker.table_depth += 1,
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"tab" => walker.paragraph.push(' '),
                b"br" | b"cr" => walker.paragraph.push('\n'),
                _ => {}
            },
            Ok(Event::Text(t)) if walker.in_text_run => {
                let text = t
                    .unescape()
                    .map_err(|e| corrupt(format!("malformed text run: {}", e)))?;
                walker.paragraph.push_str(&text);
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => walker.in_text_run = false,
                b"p" => walker.end_paragraph(),
                b"tc" if walker.table_depth > 0 => walker.end_cell(),
                b"tr" if walker.table_depth > 0 => walker.end_row(),
                b"tbl" => walker.table_depth = walker.table_depth.saturating_sub(1),
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(corrupt(format!(
                    "malformed {} at byte {}: {}",
                    DOCX_MAIN_PART,
                    reader.buffer_position(),
                    e
                )))
            }
            _ => {}
        }
    }

    Ok(walker.finish())
}

fn corrupt(reason: String) -> LoaderError {
    LoaderError::corrupt(Some(DocumentFormat::Docx), reason)
}
