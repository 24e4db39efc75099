//! Text utility functions for the Gemibot core library.

/// Truncate a string to a maximum number of Unicode characters.
///
/// If the string exceeds `max_chars`, the result is the first `max_chars - 3`
/// characters followed by `...`. If `max_chars <= 3`, returns `"."` repeated
/// `max_chars` times. Strings at or below the limit are returned unchanged.
pub fn truncate(s: &str, max_chars: usize) -> String {
    let char_count = s.chars().count();
    if char_count <= max_chars {
        s.to_string()
    } else if max_chars <= 3 {
        ".".repeat(max_chars)
    } else {
        let truncated: String = s.chars().take(max_chars - 3).collect();
        format!("{}...", truncated)
    }
}

/// Mask a secret for display, keeping the first and last four characters.
///
/// Secrets of eight characters or fewer are masked entirely.
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}{}{}", head, "*".repeat(chars.len() - 8), tail)
}
