//! Text normalization shared by every extractor
//!
//! Normalized text is a sequence of non-empty lines joined by `\n`. Each line
//! is trimmed and has internal whitespace collapsed to single spaces. Page
//! and section breaks are a line holding only [`PAGE_BREAK`]; there is never
//! a break at the start or end of the text and never two in a row.

pub use shared_types::PAGE_BREAK;

/// Separator string as it appears between two pages
pub const PAGE_SEPARATOR: &str = "\n\u{000C}\n";

/// Normalize a single block of raw text.
///
/// Form feeds already present in the input are treated as page breaks.
pub fn normalize_text(raw: &str) -> String {
    normalize_pages(raw.split(PAGE_BREAK))
}

/// Normalize a sequence of raw pages and join them with [`PAGE_SEPARATOR`].
/// Pages that normalize to nothing are dropped.
pub fn normalize_pages<I, S>(pages: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    pages
        .into_iter()
        .map(|page| normalize_page(page.as_ref()))
        .filter(|page| !page.is_empty())
        .collect::<Vec<_>>()
        .join(PAGE_SEPARATOR)
}

fn normalize_page(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());

    for line in raw.lines() {
        let start = out.len();
        if start > 0 {
            out.push('\n');
        }
        let content_start = out.len();
        collapse_whitespace(line, &mut out);
        if out.len() == content_start {
            // Blank line: drop the newline we just pushed
            out.truncate(start);
        }
    }

    out
}

/// Append `line` to `out` trimmed, with whitespace runs collapsed and
/// control characters dropped.
fn collapse_whitespace(line: &str, out: &mut String) {
    let mut pending_space = false;
    let mut wrote_any = false;

    for ch in line.chars() {
        if ch.is_whitespace() {
            pending_space = wrote_any;
        } else if ch.is_control() || ch == '\u{FEFF}' {
            continue;
        } else {
            if pending_space {
                out.push(' ');
                pending_space = false;
            }
            out.push(ch);
            wrote_any = true;
        }
    }
}
