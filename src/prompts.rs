//! The fixed instruction sent with every page image.
//!
//! Callers can override it via [`crate::config::ExtractionConfig::instruction`];
//! the constant here is used only when no override is provided.

/// Default instruction for transcribing a page image.
pub const DEFAULT_INSTRUCTION: &str = r#"Extract and rewrite all of the content in this page image in English.

Rules:
- Transcribe verbatim. Do NOT summarise, shorten, or omit anything.
- Translate any non-English text into English; keep names, numbers, dates and units exactly as written.
- Keep the structure of the page: headings, lists, key/value fields and tables (use pipe tables for tables).
- Preserve reading order as a human would read the page.
- Output ONLY the transcribed content, with no commentary and no code fences."#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instruction_forbids_summaries() {
        assert!(DEFAULT_INSTRUCTION.contains("English"));
        assert!(DEFAULT_INSTRUCTION.contains("verbatim"));
        assert!(DEFAULT_INSTRUCTION.contains("Do NOT summarise"));
    }
}
