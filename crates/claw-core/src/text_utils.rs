/// Cuts `text` at `max_chars` characters and appends `...` when longer.
///
/// Every truncation in the pipeline goes through this helper so rendered
/// output stays byte-for-byte stable across event types.
pub fn truncate_with_ellipsis(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_offset, _)) => format!("{}...", &text[..byte_offset]),
        None => text.to_string(),
    }
}
