//! Shared text helpers.

/// One-line preview of a turn's content for logs and listings.
///
/// Whitespace runs (including newlines) collapse to a single space. Content
/// longer than `max_chars` characters is cut on a character boundary and
/// suffixed with `...`.
pub fn preview(content: &str, max_chars: usize) -> String {
    let flat = content.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max_chars {
        return flat;
    }
    let cut: String = flat.chars().take(max_chars).collect();
    format!("{}...", cut.trim_end())
}
