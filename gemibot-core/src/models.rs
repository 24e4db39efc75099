//! Static catalog of Gemini-family models shown by `/models`.

/// Model name and a one-line description.
pub const MODEL_CATALOG: &[(&str, &str)] = &[
    ("gemini-pro", "General-purpose, highly capable LLM."),
    ("gemini-pro-vision", "Pro with image understanding."),
    ("gemini-ultra", "Most powerful, for complex tasks."),
    ("gemini-ultra-vision", "Ultra with image capabilities."),
    ("gemini-1.0-pro", "Earlier versions."),
    ("gemini-1.0-pro-vision", "Earlier versions with vision."),
    ("gemini-1.0-ultra", "Earlier versions."),
    ("gemini-1.0-ultra-vision", "Earlier versions with vision."),
    ("gemini-1.5-pro", "Intermediate versions."),
    ("gemini-1.5-pro-vision", "Intermediate versions with vision."),
    ("gemini-1.5-ultra", "Intermediate versions."),
    ("gemini-1.5-ultra-vision", "Intermediate versions with vision."),
    ("gemini-nano", "Efficient for on-device use."),
    ("gemini-nano-vision", "Nano with visual input."),
    ("gemini-flash", "Optimized for speed."),
    ("gemini-2.0-flash", "Improved speed and performance."),
    ("gemini-experimental", "Developing features."),
    ("gemini-experimental-vision", "Developing features with vision."),
    ("Gemma 3 27B", "Gemma 3 27B model."),
    ("Gemma 2 2B", "Gemma 2 2B model."),
    ("Gemma 2 9B", "Gemma 2 9B model."),
    ("Gemma 2 27B", "Gemma 2 27B model."),
];

/// Render the catalog as a plain-text list.
pub fn format_catalog() -> String {
    let mut out = String::from("Available models:\n\n");
    for (name, description) in MODEL_CATALOG {
        out.push_str(&format!("{}: {}\n", name, description));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_catalog_header_and_lines() {
        let text = format_catalog();
        assert!(text.starts_with("Available models:\n\n"));
        assert_eq!(text.lines().count(), MODEL_CATALOG.len() + 2);
        assert!(text.contains("gemini-2.0-flash: Improved speed and performance.\n"));
    }

    #[test]
    fn test_catalog_names_unique() {
        let mut names: Vec<&str> = MODEL_CATALOG.iter().map(|(n, _)| *n).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), MODEL_CATALOG.len());
    }
}
