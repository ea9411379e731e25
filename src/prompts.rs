//! Prompt construction for question synthesis.
//!
//! Every fragment the model sees lives in this module. [`build_prompt`] is a pure function of the page text and the quiz
//! parameters. The page text is cut to the character budget here and only
//! here; the acquisition pipeline never truncates.

use crate::config::{Difficulty, LanguageMode, PageRange, QuestionType, QuizConfig};

/// Default character budget for page text embedded in a prompt.
pub const DEFAULT_MAX_PROMPT_CHARS: usize = 30_000;

/// Output schema the model must follow, one object per question.
pub const OUTPUT_SCHEMA: &str = r#"[
  {
    "question": "string",
    "questionTranslation": "string or null",
    "translationLanguage": "english" | "hindi" | null,
    "options": ["string", "..."],
    "answer": "string",
    "context": "string",
    "type": "multiple_choice" | "short_answer",
    "language": "english" | "hindi" | "other"
  }
]"#;

/// Instructions for English-only quizzes.
pub const ENGLISH_INSTRUCTIONS: &str = r#"LANGUAGE RULES (English only)
   - Write "question", "options", "answer" and "context" in English
   - If the source text is in another language, translate the content into English
   - Names and terms with no English equivalent are transliterated into Latin script
   - Set "questionTranslation" to null and "translationLanguage" to null
   - Set "language" to "english""#;

/// Instructions for Hindi-only quizzes.
pub const HINDI_INSTRUCTIONS: &str = r#"LANGUAGE RULES (Hindi only)
   - Write "question", "options", "answer" and "context" in Hindi, using Devanagari script
   - If the source text is in English, translate the content into Hindi
   - Technical terms with no common Hindi equivalent are transliterated into Devanagari,
     followed by the English term in parentheses the first time they appear
   - Numbers, chemical formulas and units stay as written in the source
   - Set "questionTranslation" to null and "translationLanguage" to null
   - Set "language" to "hindi""#;

/// Instructions for bilingual (English + Hindi) quizzes.
pub const BILINGUAL_INSTRUCTIONS: &str = r#"LANGUAGE RULES (Bilingual: English + Hindi)
   - Write "question" in the main language of the source text (English or Hindi)
   - Write "questionTranslation" as a faithful translation of the question into the other language
   - Set "translationLanguage" to the language of "questionTranslation" ("english" or "hindi")
   - "questionTranslation" and "translationLanguage" must NEVER be null
   - Write "options", "answer" and "context" in the same language as "question"
   - Terms with no equivalent in the other language are transliterated into its script,
     keeping the original term in parentheses
   - Set "language" to the language of "question""#;

/// A prompt ready to send, with what was embedded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizPrompt {
    pub text: String,
    /// Characters of page text embedded after truncation.
    pub embedded_chars: usize,
    /// Whether the page text was cut to fit the budget.
    pub truncated: bool,
}

/// Cut `text` to its first `max_chars` characters (not bytes).
///
/// Returns the prefix and whether anything was removed.
pub fn truncate_chars(text: &str, max_chars: usize) -> (&str, bool) {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => (&text[..byte_idx], true),
        None => (text, false),
    }
}

/// Build the generation prompt for `text` extracted from `range`.
pub fn build_prompt(text: &str, quiz: &QuizConfig, range: PageRange, max_chars: usize) -> QuizPrompt {
    let (embedded, truncated) = truncate_chars(text, max_chars);
    let count = quiz.question_count();

    let prompt = format!(
        r#"You are an experienced teacher writing a study quiz from a textbook excerpt.

SOURCE
   - The text below was extracted from {range} of a PDF textbook
   - Page boundaries are marked with lines like "--- Page N ---"
   - Some pages were recognized optically and may contain recognition errors
   - Quiz language mode: {mode}

TASK
   - Write exactly {count} questions of {difficulty} difficulty
   - {difficulty_rule}
   - {type_rule}
   - Base every question strictly on the source text; do not use outside knowledge
   - "context" briefly quotes or summarises the passage that supports the answer

{language_rules}

OUTPUT FORMAT
   - Respond with a JSON array only, no prose and no code fences
   - Every element must follow this schema exactly:

{schema}

   - For "short_answer" questions, "options" is an empty array
   - For "multiple_choice" questions, "answer" must be copied exactly from one of the "options"
   - If the source text is empty, unreadable or not educational content, respond with []
   - Do not return fewer than {count} questions unless the text genuinely cannot support them;
     in that case return as many as you can and explain the shortfall in the "context" of the last question

SOURCE TEXT
"""
{embedded}
""""#,
        range = range,
        mode = quiz.language_mode().as_str(),
        count = count,
        difficulty = quiz.difficulty().as_str(),
        difficulty_rule = difficulty_rule(quiz.difficulty()),
        type_rule = type_rule(quiz.question_type()),
        language_rules = language_instructions(quiz.language_mode()),
        schema = OUTPUT_SCHEMA,
        embedded = embedded,
    );

    QuizPrompt {
        text: prompt,
        embedded_chars: embedded.chars().count(),
        truncated,
    }
}

/// The instruction block for `mode`.
pub fn language_instructions(mode: LanguageMode) -> &'static str {
    match mode {
        LanguageMode::English => ENGLISH_INSTRUCTIONS,
        LanguageMode::Hindi => HINDI_INSTRUCTIONS,
        LanguageMode::Bilingual => BILINGUAL_INSTRUCTIONS,
    }
}

fn difficulty_rule(difficulty: Difficulty) -> &'static str {
    match difficulty {
        Difficulty::Easy => "Easy questions test recall of facts and definitions stated directly in the text",
        Difficulty::Medium => "Medium questions test understanding: explain, compare or apply what the text states",
        Difficulty::Hard => "Hard questions require reasoning across several statements or applying concepts to new cases",
    }
}

fn type_rule(question_type: QuestionType) -> &'static str {
    match question_type {
        QuestionType::Mixed => {
            "Mix both types: roughly half \"multiple_choice\" (4 options each) and half \"short_answer\""
        }
        QuestionType::MultipleChoice => {
            "Every question is \"multiple_choice\" with exactly 4 distinct options"
        }
        QuestionType::ShortAnswer => {
            "Every question is \"short_answer\" with a one- or two-sentence answer"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiz(mode: LanguageMode) -> QuizConfig {
        QuizConfig::new(Difficulty::Hard, 7, QuestionType::MultipleChoice, mode).unwrap()
    }

    #[test]
    fn prompt_embeds_parameters() {
        let p = build_prompt(
            "--- Page 3 ---\nMitochondria make ATP.\n",
            &quiz(LanguageMode::English),
            PageRange::new(3, 5),
            DEFAULT_MAX_PROMPT_CHARS,
        );
        assert!(p.text.contains("pages 3-5"));
        assert!(p.text.contains("exactly 7 questions of hard difficulty"));
        assert!(p.text.contains("exactly 4 distinct options"));
        assert!(p.text.contains("Mitochondria make ATP."));
        assert!(p.text.contains(OUTPUT_SCHEMA));
        assert!(p.text.contains("respond with []"));
        assert!(!p.truncated);
    }

    #[test]
    fn language_block_is_selected_by_mode() {
        let range = PageRange::single(1);
        let en = build_prompt("x", &quiz(LanguageMode::English), range, 1000).text;
        let hi = build_prompt("x", &quiz(LanguageMode::Hindi), range, 1000).text;
        let bi = build_prompt("x", &quiz(LanguageMode::Bilingual), range, 1000).text;

        assert!(en.contains(ENGLISH_INSTRUCTIONS) && !en.contains(BILINGUAL_INSTRUCTIONS));
        assert!(hi.contains(HINDI_INSTRUCTIONS) && !hi.contains(ENGLISH_INSTRUCTIONS));
        assert!(bi.contains(BILINGUAL_INSTRUCTIONS) && !bi.contains(HINDI_INSTRUCTIONS));
        assert!(bi.contains("must NEVER be null"));
    }

    #[test]
    fn truncation_counts_characters() {
        let text = "अआइ".repeat(10);
        let (cut, truncated) = truncate_chars(&text, 4);
        assert_eq!(cut, "अआइअ");
        assert!(truncated);

        let (whole, truncated) = truncate_chars("short", 10);
        assert_eq!(whole, "short");
        assert!(!truncated);

        let (exact, truncated) = truncate_chars("abcd", 4);
        assert_eq!(exact, "abcd");
        assert!(!truncated);
    }

    #[test]
    fn long_text_is_cut_to_budget() {
        let text = "a".repeat(DEFAULT_MAX_PROMPT_CHARS + 500);
        let p = build_prompt(&text, &quiz(LanguageMode::English), PageRange::single(1), DEFAULT_MAX_PROMPT_CHARS);
        assert!(p.truncated);
        assert_eq!(p.embedded_chars, DEFAULT_MAX_PROMPT_CHARS);
        assert!(!p.text.contains(&"a".repeat(DEFAULT_MAX_PROMPT_CHARS + 1)));
    }
}
