//! Plain text decoding

/// Decode text as UTF-8, falling back to Latin-1 (which accepts any byte
/// sequence). A UTF-8 byte order mark is stripped.
pub(crate) fn decode_text(data: &[u8]) -> String {
    let data = data.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(data);
    match std::str::from_utf8(data) {
        Ok(text) => text.to_string(),
        Err(_) => data.iter().map(|&b| b as char).collect(),
    }
}
