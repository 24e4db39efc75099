//! Splitting long text for Telegram's 4096-character message limit.

/// Telegram maximum message length.
pub const TELEGRAM_MSG_LIMIT: usize = 4096;

/// Split `text` into pieces of at most `limit` bytes.
///
/// Splitting priority:
/// 1. Paragraph boundaries (`\n\n`)
/// 2. Newline boundaries (`\n`)
/// 3. Space boundaries
/// 4. Hard split at the limit (last resort, on a char boundary)
pub fn chunk_text(text: &str, limit: usize) -> Vec<&str> {
    if text.len() <= limit {
        return vec![text];
    }

    let mut chunks = Vec::new();
    let mut remaining = text;

    while remaining.len() > limit {
        let hard = floor_char_boundary(remaining, limit);
        // A single char wider than the limit still has to go somewhere.
        let hard = if hard == 0 {
            remaining.chars().next().map(char::len_utf8).unwrap_or(1)
        } else {
            hard
        };
        let slice = &remaining[..hard];

        let split_at = slice
            .rfind("\n\n")
            .map(|pos| pos + 2)
            .or_else(|| slice.rfind('\n').map(|pos| pos + 1))
            .or_else(|| slice.rfind(' ').map(|pos| pos + 1))
            .filter(|&pos| pos > 0)
            .unwrap_or(hard);

        let (chunk, rest) = remaining.split_at(split_at);
        let chunk = chunk.trim_end();
        if !chunk.is_empty() {
            chunks.push(chunk);
        }
        remaining = rest.trim_start_matches('\n');
    }

    if !remaining.trim().is_empty() {
        chunks.push(remaining);
    }

    chunks
}

/// Round `idx` down to the nearest valid UTF-8 character boundary in `s`.
pub(crate) fn floor_char_boundary(s: &str, idx: usize) -> usize {
    if idx >= s.len() {
        return s.len();
    }
    let mut i = idx;
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}
