//! Clause segmentation
//!
//! Splits normalized document text into an ordered, lazily produced sequence
//! of [`Clause`]s. Two policies exist:
//!
//! - **Structural**: used when the text carries at least
//!   `min_structural_markers` marker lines (numbered sections, `Section 4`,
//!   `Article IV`, ALL-CAPS headings or lead-ins, recitals). Each clause runs
//!   from one marker line to the line before the next one. Sentence ends
//!   inside a section never split it.
//! - **Sentence**: otherwise. Clauses are sentences, with common legal
//!   abbreviations and list enumerators protected from splitting.
//!
//! Clause text is the span's content with page-break lines removed. Spans are
//! byte offsets into the input and never overlap; the text between two spans
//! is only whitespace and page breaks.

use std::iter::FusedIterator;

use lazy_static::lazy_static;
use regex::Regex;
use shared_types::{Clause, TextSpan};

/// Marker lines needed before structural splitting is trusted
pub const DEFAULT_MIN_STRUCTURAL_MARKERS: usize = 2;

const MAX_HEADING_CHARS: usize = 80;
const MAX_HEADING_WORDS: usize = 10;
const MAX_TITLE_CHARS: usize = 60;
const MAX_TITLE_WORDS: usize = 6;

const TITLE_CONNECTORS: &[&str] = &["of", "and", "or", "the", "to", "in", "for", "on", "by", "&"];

/// Tokens that end in a period without ending a sentence (compared lowercase,
/// without the final period)
const ABBREVIATIONS: &[&str] = &[
    "inc", "ltd", "co", "corp", "no", "nos", "sec", "secs", "art", "para", "paras", "cl", "mr",
    "mrs", "ms", "dr", "st", "jr", "sr", "vs", "etc", "approx", "dept", "est", "fig", "pp", "cf",
    "seq", "al", "viz",
];

lazy_static! {
    /// `1.`, `2)`, `1.1`, `4.2.1.` at the start of a line
    static ref NUMBERED: Regex =
        Regex::new(r"^(?:\d{1,3}(?:\.\d{1,3})+\.?|\d{1,3}[.)])(?:\s|$)").unwrap();
    /// `Section 4`, `ARTICLE IV.`, `Section 2.1:`
    static ref SECTION: Regex = Regex::new(
        r"^(?i:section|article)\s+(?:\d{1,3}(?:\.\d{1,3})*|[IVXLC]{1,6}|[ivxlc]{1,6})\b[.:)]?"
    )
    .unwrap();
    static ref RECITAL: Regex =
        Regex::new(r"^(?:WHEREAS|NOW,?\s+THEREFORE|IN\s+WITNESS\s+WHEREOF)\b").unwrap();
    /// `CONFIDENTIALITY: ...`, `GOVERNING LAW. ...`
    static ref CAPS_LEAD_IN: Regex =
        Regex::new(r"^([A-Z][A-Z&,'/\- ]*[A-Z])[:.](?:\s|$)").unwrap();
    /// Whole sentence-so-far is a list enumerator: `1`, `(2)`, `1.3`, `IV`, `(iv)`
    static ref ENUMERATOR: Regex =
        Regex::new(r"^(?:\(?\d{1,3}(?:\.\d{1,3})*\)?|[IVXLC]{1,5}|\([ivxlc]{1,5}\)|\([a-z]\))$")
            .unwrap();
    /// Sentence-so-far is a section label: `Section 5`, `Art. 3`
    static ref SECTION_LABEL: Regex =
        Regex::new(r"^(?i:section|article|sec|art)\.?\s+\S+$").unwrap();
}

/// Which splitting policy produced a clause sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentationMode {
    Structural,
    Sentence,
}

impl SegmentationMode {
    /// Separator that rejoins clause texts in this mode
    pub fn separator(&self) -> &'static str {
        match self {
            SegmentationMode::Structural => "\n",
            SegmentationMode::Sentence => " ",
        }
    }
}

/// Splits normalized text into clauses
#[derive(Debug, Clone)]
pub struct Segmenter {
    min_structural_markers: usize,
}

impl Segmenter {
    pub fn new() -> Self {
        Self {
            min_structural_markers: DEFAULT_MIN_STRUCTURAL_MARKERS,
        }
    }

    pub fn with_min_structural_markers(mut self, markers: usize) -> Self {
        self.min_structural_markers = markers.max(1);
        self
    }

    /// Pick the splitting policy for `text`
    pub fn detect_mode(&self, text: &str) -> SegmentationMode {
        let markers = text
            .lines()
            .filter(|line| is_marker_line(line.trim()))
            .take(self.min_structural_markers)
            .count();

        if markers >= self.min_structural_markers {
            SegmentationMode::Structural
        } else {
            SegmentationMode::Sentence
        }
    }

    /// Lazily segment `text`. The returned iterator can be cloned to restart
    /// from its current position; calling `segment` again starts over.
    pub fn segment<'a>(&self, text: &'a str) -> Segments<'a> {
        Segments {
            text,
            mode: self.detect_mode(text),
            cursor: 0,
            next_index: 0,
        }
    }
}

impl Default for Segmenter {
    fn default() -> Self {
        Self::new()
    }
}

/// Lazy clause iterator over one document's text
#[derive(Debug, Clone)]
pub struct Segments<'a> {
    text: &'a str,
    mode: SegmentationMode,
    cursor: usize,
    next_index: usize,
}

impl<'a> Segments<'a> {
    pub fn mode(&self) -> SegmentationMode {
        self.mode
    }

    fn next_span(&mut self) -> Option<TextSpan> {
        match self.mode {
            SegmentationMode::Structural => self.next_section(),
            SegmentationMode::Sentence => self.next_sentence(),
        }
    }

    fn next_section(&mut self) -> Option<TextSpan> {
        let text = self.text;
        let mut pos = self.cursor;

        // Skip page-break and blank lines between sections
        loop {
            if pos >= text.len() {
                self.cursor = text.len();
                return None;
            }
            let end = line_end(text, pos);
            if !is_gap_line(&text[pos..end]) {
                break;
            }
            pos = end + 1;
        }

        let first_end = line_end(text, pos);
        let start = pos + (text[pos..first_end].len() - text[pos..first_end].trim_start().len());
        let mut content_end = first_end;
        let mut next = first_end + 1;

        while next < text.len() {
            let end = line_end(text, next);
            let line = &text[next..end];
            if is_marker_line(line.trim()) {
                break;
            }
            if !is_gap_line(line) {
                content_end = end;
            }
            next = end + 1;
        }

        self.cursor = next.min(text.len());
        let end = start + text[start..content_end].trim_end().len();
        Some(TextSpan { start, end })
    }

    fn next_sentence(&mut self) -> Option<TextSpan> {
        let text = self.text;
        let rest = &text[self.cursor..];
        let start = self.cursor + (rest.len() - rest.trim_start().len());
        if start >= text.len() {
            self.cursor = text.len();
            return None;
        }

        let (end, resume) = find_sentence_end(text, start);
        self.cursor = resume;
        Some(TextSpan { start, end })
    }
}

impl<'a> Iterator for Segments<'a> {
    type Item = Clause;

    fn next(&mut self) -> Option<Clause> {
        loop {
            let span = self.next_span()?;
            let body = strip_page_breaks(&self.text[span.start..span.end]);
            if body.trim().is_empty() {
                continue;
            }

            let heading = body.lines().next().and_then(heading_of);
            let clause = Clause::new(self.next_index, body, span).with_heading(heading);
            self.next_index += 1;
            return Some(clause);
        }
    }
}

impl<'a> FusedIterator for Segments<'a> {}

/// Rejoin clause texts with the mode's separator.
///
/// Re-segmenting the result yields the same clause texts; it differs from
/// the original normalized text only in separator whitespace and dropped
/// page-break lines.
pub fn reassemble(clauses: &[Clause], mode: SegmentationMode) -> String {
    clauses
        .iter()
        .map(|c| c.text.as_str())
        .collect::<Vec<_>>()
        .join(mode.separator())
}

/// Heading a clause starts with: a structural marker (with its title when
/// one follows), or a short `Label:` lead-in.
pub fn heading_of(first_line: &str) -> Option<String> {
    let line = first_line.trim();
    structural_heading(line).or_else(|| lead_in_heading(line).map(str::to_string))
}

pub fn is_marker_line(line: &str) -> bool {
    structural_heading(line).is_some()
}

fn structural_heading(line: &str) -> Option<String> {
    if let Some(m) = NUMBERED.find(line).or_else(|| SECTION.find(line)) {
        let label = m.as_str().trim();
        let rest = line[m.end()..].trim_start();
        return Some(match numbered_title(rest) {
            Some(title) => format!("{} {}", label, title),
            None => label.to_string(),
        });
    }

    if let Some(m) = RECITAL.find(line) {
        return Some(m.as_str().to_string());
    }

    if is_caps_heading(line) {
        return Some(line.trim_end_matches([':', '.']).to_string());
    }

    CAPS_LEAD_IN
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .filter(|label| letter_count(label) >= 3)
        .map(str::to_string)
}

/// A whole line in capitals, short enough to be a heading. Figures such as
/// `USD 500` or `NET 30 DAYS` are table content, not headings; numbered
/// headings are matched earlier by `NUMBERED` and `SECTION`.
fn is_caps_heading(line: &str) -> bool {
    let letters = letter_count(line);
    let visible = line.chars().filter(|c| !c.is_whitespace()).count();

    letters >= 3
        && letters * 2 >= visible
        && line.chars().count() <= MAX_HEADING_CHARS
        && line.split_whitespace().count() <= MAX_HEADING_WORDS
        && !line.chars().any(|c| c.is_lowercase() || c.is_ascii_digit())
}

/// Title after an enumerator: `Confidentiality.` or `Payment terms:`
fn numbered_title(rest: &str) -> Option<&str> {
    let (pos, terminator) = rest.char_indices().find(|(_, c)| matches!(c, '.' | ':'))?;
    let title = rest[..pos].trim();
    let after = &rest[pos + 1..];
    if title.is_empty() || !(after.is_empty() || after.starts_with(char::is_whitespace)) {
        return None;
    }
    if !fits_title(title) {
        return None;
    }

    (terminator == ':' || is_title_case(title)).then_some(title)
}

/// `Governing law: ...` style label
fn lead_in_heading(line: &str) -> Option<&str> {
    let (label, after) = line.split_once(':')?;
    let label = label.trim();
    if !(after.is_empty() || after.starts_with(char::is_whitespace)) || !fits_title(label) {
        return None;
    }

    label
        .chars()
        .next()
        .filter(|c| c.is_uppercase())
        .map(|_| label)
}

fn fits_title(title: &str) -> bool {
    let words = title.split_whitespace().count();
    (1..=MAX_TITLE_WORDS).contains(&words) && title.chars().count() <= MAX_TITLE_CHARS
}

fn is_title_case(title: &str) -> bool {
    title.split_whitespace().all(|word| {
        TITLE_CONNECTORS.contains(&word)
            || word
                .chars()
                .next()
                .map_or(false, |c| c.is_uppercase() || !c.is_alphabetic())
    })
}

fn letter_count(s: &str) -> usize {
    s.chars().filter(|c| c.is_alphabetic()).count()
}

/// Find where the sentence starting at `start` ends.
///
/// Returns the end offset (just past the terminator) and the offset the next
/// sentence starts at.
fn find_sentence_end(text: &str, start: usize) -> (usize, usize) {
    let slice = &text[start..];
    let mut chars = slice.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if !matches!(c, '.' | '!' | '?') {
            continue;
        }

        let mut term_end = start + i + c.len_utf8();
        while let Some(&(j, d)) = chars.peek() {
            if matches!(d, '.' | '!' | '?' | '"' | '\'' | ')' | ']' | '\u{201D}' | '\u{2019}') {
                term_end = start + j + d.len_utf8();
                chars.next();
            } else {
                break;
            }
        }

        let after = &text[term_end..];
        let next = after.trim_start();
        if next.is_empty() {
            return (term_end, text.len());
        }
        if next.len() == after.len() {
            // No whitespace after the terminator: "1.5", "U.S."
            continue;
        }
        if !next.chars().next().map_or(false, starts_sentence) {
            continue;
        }
        if c == '.' && is_protected(&text[start..start + i]) {
            continue;
        }

        return (term_end, text.len() - next.len());
    }

    (start + slice.trim_end().len(), text.len())
}

fn starts_sentence(c: char) -> bool {
    c.is_uppercase()
        || c.is_ascii_digit()
        || matches!(c, '"' | '\'' | '(' | '[' | '\u{201C}' | '\u{2018}' | '\u{00A7}')
}

/// Whether a period after `before` belongs to an abbreviation, an initial
/// or a leading list enumerator rather than ending the sentence.
fn is_protected(before: &str) -> bool {
    let so_far = before.trim();
    if ENUMERATOR.is_match(so_far) || SECTION_LABEL.is_match(so_far) {
        return true;
    }

    let token = so_far
        .rsplit(char::is_whitespace)
        .next()
        .unwrap_or_default()
        .trim_start_matches(['(', '[', '"', '\'', '\u{201C}', '\u{2018}']);
    if token.is_empty() {
        return false;
    }

    // Initials and dotted abbreviations: "J.", "v.", "U.S.", "e.g."
    if token.chars().count() == 1 && token.chars().all(char::is_alphabetic) {
        return true;
    }
    if token.contains('.') && token.chars().all(|c| c.is_alphabetic() || c == '.') {
        return true;
    }

    ABBREVIATIONS.contains(&token.to_lowercase().as_str())
}

fn line_end(text: &str, start: usize) -> usize {
    text[start..].find('\n').map_or(text.len(), |i| start + i)
}

/// Blank or page-break-only line
fn is_gap_line(line: &str) -> bool {
    line.chars().all(char::is_whitespace)
}

fn strip_page_breaks(span: &str) -> String {
    span.lines()
        .filter(|line| !is_gap_line(line))
        .collect::<Vec<_>>()
        .join("\n")
}
