//! Output types: extracted text, question records, and run statistics.

use crate::config::PageRange;
use crate::error::PageError;
use serde::{Deserialize, Serialize};
use std::fmt;

// ── Text acquisition ─────────────────────────────────────────────────────

/// Where a page's text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextSource {
    /// Text glyphs already encoded in the PDF.
    Native,
    /// Text recognized optically from a rendered page image.
    Recognized,
}

/// Text of one page, produced by the acquisition pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedPage {
    /// 1-indexed page number.
    pub page_num: usize,
    pub text: String,
    pub source: TextSource,
}

/// The page-boundary marker placed before each page in the combined text.
pub fn page_marker(page_num: usize) -> String {
    format!("--- Page {page_num} ---")
}

/// What happened during acquisition, page by page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionReport {
    /// Pages processed, in ascending order.
    pub pages: usize,
    /// Pages whose text came from optical recognition.
    pub recognized_pages: Vec<usize>,
    /// Absorbed per-page failures.
    pub page_errors: Vec<PageError>,
    /// Wall-clock duration of the acquisition stage.
    pub duration_ms: u64,
}

/// Concatenated text of a page range.
///
/// Never truncated here: the character budget is applied only when the
/// text is embedded in a prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombinedText {
    /// The range that was actually extracted (after clamping).
    pub range: PageRange,
    pub text: String,
    pub report: ExtractionReport,
}

impl CombinedText {
    /// Number of characters (not bytes) in the combined text.
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}

// ── Question records ─────────────────────────────────────────────────────

/// Language tag of a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    English,
    Hindi,
    Other,
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Language::English => "English",
            Language::Hindi => "Hindi",
            Language::Other => "Other",
        })
    }
}

/// The shape of a question; each variant carries only its valid fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuestionKind {
    /// `answer` is always one of `options`.
    MultipleChoice { options: Vec<String> },
    ShortAnswer,
}

impl QuestionKind {
    pub fn label(&self) -> &'static str {
        match self {
            QuestionKind::MultipleChoice { .. } => "Multiple Choice",
            QuestionKind::ShortAnswer => "Short Answer",
        }
    }

    pub fn options(&self) -> &[String] {
        match self {
            QuestionKind::MultipleChoice { options } => options,
            QuestionKind::ShortAnswer => &[],
        }
    }
}

/// A validated study question. Only the response parser creates these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub question: String,
    pub question_translation: Option<String>,
    pub translation_language: Option<Language>,
    #[serde(flatten)]
    pub kind: QuestionKind,
    pub answer: String,
    pub context: String,
    pub language: Language,
}

/// A record the model returned that failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedRecord {
    /// 0-based position in the model's array.
    pub index: usize,
    pub reason: String,
}

/// Questions produced by a single parse, with the records that were dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedQuiz {
    pub questions: Vec<Question>,
    pub skipped: Vec<SkippedRecord>,
}

/// Outcome of the synthesis stage on its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Synthesis {
    pub questions: Vec<Question>,
    pub skipped: Vec<SkippedRecord>,
    pub model: String,
    /// Characters of page text embedded in the prompt.
    pub prompt_text_chars: usize,
    pub truncated: bool,
    pub duration_ms: u64,
}

// ── End-to-end output ────────────────────────────────────────────────────

/// Statistics for one generation request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuizStats {
    pub total_pages: usize,
    pub extraction: ExtractionReport,
    /// Characters of page text embedded in the prompt.
    pub prompt_text_chars: usize,
    /// Whether the page text exceeded the prompt budget and was cut.
    pub truncated: bool,
    pub model: String,
    pub generation_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// Result of a successful generation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizOutput {
    pub range: PageRange,
    pub questions: Vec<Question>,
    pub skipped: Vec<SkippedRecord>,
    pub stats: QuizStats,
}

/// Document-level metadata, available without an API key.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub page_count: usize,
    pub pdf_version: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_serialises_with_flat_type_tag() {
        let q = Question {
            question: "What is 2 + 2?".into(),
            question_translation: None,
            translation_language: None,
            kind: QuestionKind::MultipleChoice {
                options: vec!["3".into(), "4".into()],
            },
            answer: "4".into(),
            context: "Arithmetic".into(),
            language: Language::English,
        };
        let v = serde_json::to_value(&q).unwrap();
        assert_eq!(v["type"], "multiple_choice");
        assert_eq!(v["options"][1], "4");
        assert_eq!(v["language"], "english");
        assert!(v["questionTranslation"].is_null());

        let back: Question = serde_json::from_value(v).unwrap();
        assert_eq!(back, q);
    }

    #[test]
    fn short_answer_has_no_options() {
        let kind = QuestionKind::ShortAnswer;
        assert!(kind.options().is_empty());
        assert_eq!(kind.label(), "Short Answer");
    }

    #[test]
    fn marker_format() {
        assert_eq!(page_marker(12), "--- Page 12 ---");
    }
}
