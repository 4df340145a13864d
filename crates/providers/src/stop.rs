//! Stop-sequence matching for incremental decoding.

/// Byte offset of the earliest stop sequence in `text`, if any.
///
/// Empty stop sequences are ignored.
pub fn find_stop(text: &str, stops: &[String]) -> Option<usize> {
    stops
        .iter()
        .filter(|s| !s.is_empty())
        .filter_map(|s| text.find(s.as_str()))
        .min()
}

/// `text` cut before its earliest stop sequence.
pub fn truncate_at_stop<'a>(text: &'a str, stops: &[String]) -> &'a str {
    match find_stop(text, stops) {
        Some(idx) => &text[..idx],
        None => text,
    }
}
