//! Length-bounded text splitter feeding the ingestion pipeline.

/// Splits `text` into an ordered sequence of chunks of at most
/// `max_chars` characters each, with no cross-chunk overlap.
///
/// The input is trimmed once; empty or whitespace-only text yields no
/// chunks. Splitting is character-based, never byte-based, so multibyte
/// input cannot be cut mid-codepoint. A `max_chars` of zero is treated
/// as one.
#[must_use]
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    let max_chars = max_chars.max(1);
    let chars: Vec<char> = trimmed.chars().collect();
    chars
        .chunks(max_chars)
        .map(|piece| piece.iter().collect())
        .collect()
}
