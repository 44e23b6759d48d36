//! Shared UTF-8-safe truncation helpers.
//!
//! Command output, file reads, and history turns are all capped before they
//! reach the model or the surface. Byte slicing directly can panic when the
//! cut falls inside a multi-byte character, so every cap goes through here.

/// Return a UTF-8-safe prefix whose byte length is at most `max_bytes`.
pub fn safe_prefix_by_bytes(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }

    let mut end = max_bytes;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// Return the prefix holding at most `max_chars` characters.
pub fn prefix_by_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

/// Truncate by characters and append `suffix` when truncation occurs.
pub fn truncate_with_suffix_by_chars(text: &str, max_chars: usize, suffix: &str) -> String {
    let prefix = prefix_by_chars(text, max_chars);
    if prefix.len() == text.len() {
        return text.to_string();
    }
    format!("{prefix}{suffix}")
}
