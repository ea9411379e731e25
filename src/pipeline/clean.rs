//! Page text normalisation before concatenation.
//!
//! Native PDF text and tesseract output both carry artefacts that waste
//! prompt budget without adding content: CRLF line endings, form feeds
//! between pages, zero-width characters, trailing spaces and long runs of
//! blank lines. Each rule is a pure `&str → String` pass; they run in the
//! order listed in [`clean_page_text`].
//!
//! The recognition decision is made on the raw native text, not on the
//! output of this module.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all normalisation rules to one page of text.
///
/// 1. Normalise line endings (CRLF / CR → LF)
/// 2. Drop form feeds and invisible Unicode (ZWSP, BOM, soft hyphen, …)
/// 3. Trim trailing whitespace per line
/// 4. Collapse runs of blank lines down to one
/// 5. Trim leading/trailing blank lines
pub fn clean_page_text(input: &str) -> String {
    let s = normalise_line_endings(input);
    let s = remove_invisible_chars(&s);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    s.trim_matches('\n').to_string()
}

/// Number of characters left once every whitespace character is removed.
pub fn non_whitespace_len(text: &str) -> usize {
    text.chars().filter(|c| !c.is_whitespace()).count()
}

// ── Rule 1: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 2: Strip invisible characters ───────────────────────────────────────

/// Characters that render as nothing but still count against the prompt budget.
const INVISIBLE: &[char] = &[
    '\u{000C}', // form feed (tesseract page separator)
    '\u{200B}', // zero-width space
    '\u{2060}', // word joiner
    '\u{FEFF}', // BOM
    '\u{00AD}', // soft hyphen
];

fn remove_invisible_chars(input: &str) -> String {
    input.chars().filter(|c| !INVISIBLE.contains(c)).collect()
}

// ── Rule 3: Trim trailing whitespace per line ────────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Rule 4: Collapse excessive blank lines ───────────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalise_line_endings() {
        assert_eq!(normalise_line_endings("a\r\nb\rc"), "a\nb\nc");
    }

    #[test]
    fn test_trim_trailing_whitespace() {
        assert_eq!(
            trim_trailing_whitespace("  hello   \nworld  "),
            "  hello\nworld"
        );
    }

    #[test]
    fn test_collapse_blank_lines() {
        assert_eq!(collapse_blank_lines("a\n\n\n\n\nb"), "a\n\nb");
        assert_eq!(collapse_blank_lines("a\n\nb"), "a\n\nb");
    }

    #[test]
    fn test_remove_invisible() {
        let input = "hello\u{200B}world\u{FEFF}foo\u{00AD}bar\u{000C}";
        assert_eq!(remove_invisible_chars(input), "helloworldfoobar");
    }

    #[test]
    fn devanagari_joiner_is_kept() {
        // ZWJ/ZWNJ shape conjuncts in Devanagari.
        let input = "क्\u{200D}ष क्\u{200C}ष";
        assert_eq!(remove_invisible_chars(input), input);
    }

    #[test]
    fn test_clean_page_text_full_pipeline() {
        let input = "\r\n\r\nPhotosynthesis   \r\n\r\n\r\n\r\nLight reactions\u{000C}\n\n";
        assert_eq!(clean_page_text(input), "Photosynthesis\n\nLight reactions");
    }

    #[test]
    fn non_whitespace_len_ignores_all_whitespace() {
        assert_eq!(non_whitespace_len(" a\tb\nc \u{00A0}"), 3);
        assert_eq!(non_whitespace_len(""), 0);
        assert_eq!(non_whitespace_len("नमस्ते"), 6);
    }
}
