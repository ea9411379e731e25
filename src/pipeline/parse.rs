//! Response interpretation: raw model text → validated [`Question`]s.
//!
//! ## Stages
//!
//! 1. strip code-fence markers (```` ```json ```` and friends)
//! 2. take the first bracketed `[...]` span, so prose around the array is
//!    ignored; an array that never closes runs to the end of the text
//! 3. strict `serde_json` parse; on failure, [`repair_json`] and parse again
//! 4. the value must be an array with at least the requested number of
//!    elements
//! 5. every element is validated into a [`Question`]; malformed records are
//!    dropped with a warning and reported as [`SkippedRecord`]s
//!
//! ## Why strict on count?
//!
//! An under-filled quiz is reported as an error naming both numbers instead
//! of being returned short. The caller can retry with a smaller count or a
//! larger page range; a silently short quiz looks like a bug.
//!
//! Validation rules per record:
//!
//! * `question` and `answer` must be non-empty
//! * a missing `type` is inferred: options present → multiple choice
//! * multiple choice needs options, and `answer` must be one of them (an
//!   answer equal to an option after trimming and case folding is replaced
//!   by the option text)
//! * in bilingual mode `questionTranslation` is required; in single-language
//!   modes a translation is stripped

use crate::config::LanguageMode;
use crate::error::Pdf2QuizError;
use crate::output::{Language, ParsedQuiz, Question, QuestionKind, SkippedRecord};
use crate::pipeline::repair::repair_json;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

// ── Text-level extraction ────────────────────────────────────────────────

static RE_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"```[A-Za-z0-9_-]*").unwrap());

/// Remove every code-fence marker, keeping the fenced content.
pub fn strip_code_fences(raw: &str) -> String {
    RE_FENCE.replace_all(raw, "").trim().to_string()
}

/// The first `[...]` span of `text`, matched with string awareness.
///
/// If the opening bracket is never closed the span runs to the end of the
/// text, leaving the closing to [`repair_json`]. `None` when `text` contains
/// no `[` at all.
pub fn extract_array_span(text: &str) -> Option<&str> {
    let start = text.find('[')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, ch) in text[start..].char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }
        match ch {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '[' if !in_string => depth += 1,
            ']' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=start + i]);
                }
            }
            _ => {}
        }
    }

    Some(text[start..].trim_end())
}

// ── Parse + validate ─────────────────────────────────────────────────────

/// Parse the model's raw text into at least `expected` valid questions.
///
/// # Errors
/// * [`Pdf2QuizError::UnrecoverableJson`]: neither strict nor repaired parse worked
/// * [`Pdf2QuizError::NotAnArray`]: the JSON value is not an array
/// * [`Pdf2QuizError::TooFewQuestions`]: fewer than `expected` records
/// * [`Pdf2QuizError::TooFewValidQuestions`]: enough records, too many malformed
pub fn parse_response(
    raw: &str,
    expected: usize,
    mode: LanguageMode,
) -> Result<ParsedQuiz, Pdf2QuizError> {
    let records = parse_array(raw)?;
    if records.len() < expected {
        return Err(Pdf2QuizError::TooFewQuestions {
            actual: records.len(),
            expected,
        });
    }

    let mut parsed = ParsedQuiz::default();
    for (index, record) in records.into_iter().enumerate() {
        match validate_record(record, mode) {
            Ok(question) => parsed.questions.push(question),
            Err(reason) => {
                warn!("Dropping question {}: {}", index + 1, reason);
                parsed.skipped.push(SkippedRecord { index, reason });
            }
        }
    }

    if parsed.questions.len() < expected {
        return Err(Pdf2QuizError::TooFewValidQuestions {
            valid: parsed.questions.len(),
            expected,
            skipped: parsed.skipped.len(),
        });
    }

    debug!(
        "Parsed {} questions ({} skipped)",
        parsed.questions.len(),
        parsed.skipped.len()
    );
    Ok(parsed)
}

/// Steps 1–3 plus the array check: raw text → array elements.
pub fn parse_array(raw: &str) -> Result<Vec<Value>, Pdf2QuizError> {
    let stripped = strip_code_fences(raw);
    let candidate = extract_array_span(&stripped).unwrap_or(&stripped);

    let value = match serde_json::from_str::<Value>(candidate) {
        Ok(v) => v,
        Err(strict_err) => {
            debug!("Strict parse failed ({}), attempting repair", strict_err);
            let repaired = repair_json(candidate);
            let v = parse_leading_value(&repaired).map_err(|e| {
                Pdf2QuizError::UnrecoverableJson {
                    detail: format!("{strict_err}; after repair: {e}"),
                }
            })?;
            warn!("Model response was not valid JSON; repaired it");
            v
        }
    };

    match value {
        Value::Array(items) => Ok(items),
        other => Err(Pdf2QuizError::NotAnArray {
            found: json_kind(&other),
        }),
    }
}

/// The first JSON value in `text`. Anything after it (usually prose the
/// model appended) is ignored.
fn parse_leading_value(text: &str) -> Result<Value, serde_json::Error> {
    match serde_json::Deserializer::from_str(text).into_iter::<Value>().next() {
        Some(value) => value,
        None => serde_json::from_str(text),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// A record exactly as the model wrote it; every field optional.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawQuestion {
    question: Option<String>,
    question_translation: Option<String>,
    translation_language: Option<String>,
    options: Option<Vec<Value>>,
    answer: Option<Value>,
    context: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    language: Option<String>,
}

fn validate_record(record: Value, mode: LanguageMode) -> Result<Question, String> {
    if !record.is_object() {
        return Err(format!("expected an object, got {}", json_kind(&record)));
    }
    let raw: RawQuestion =
        serde_json::from_value(record).map_err(|e| format!("unexpected field type: {e}"))?;

    let question = non_empty(raw.question).ok_or("missing question text")?;
    let mut answer = raw
        .answer
        .as_ref()
        .and_then(scalar_text)
        .ok_or("missing answer")?;
    let options: Vec<String> = raw
        .options
        .unwrap_or_default()
        .iter()
        .filter_map(scalar_text)
        .collect();

    let multiple_choice = match raw.kind.as_deref().map(normalise_tag) {
        Some(t) if matches!(t.as_str(), "multiple_choice" | "multiplechoice" | "mcq") => true,
        Some(t) if matches!(t.as_str(), "short_answer" | "shortanswer" | "short") => false,
        Some(t) if !t.is_empty() => return Err(format!("unknown question type '{t}'")),
        _ => !options.is_empty(),
    };

    let kind = if multiple_choice {
        if options.is_empty() {
            return Err("multiple-choice question without options".into());
        }
        if !options.contains(&answer) {
            let folded = answer.to_lowercase();
            answer = options
                .iter()
                .find(|o| o.to_lowercase() == folded)
                .cloned()
                .ok_or_else(|| format!("answer '{answer}' is not one of the options"))?;
        }
        QuestionKind::MultipleChoice { options }
    } else {
        QuestionKind::ShortAnswer
    };

    let language = raw
        .language
        .as_deref()
        .map(parse_language)
        .unwrap_or_else(|| detect_language(&question));

    let mut translation = non_empty(raw.question_translation);
    let mut translation_language = raw.translation_language.as_deref().map(parse_language);

    match mode {
        LanguageMode::Bilingual => {
            let text = translation
                .as_deref()
                .ok_or("bilingual question without questionTranslation")?;
            if !matches!(translation_language, Some(Language::English | Language::Hindi)) {
                translation_language = Some(detect_language(text));
            }
        }
        LanguageMode::English | LanguageMode::Hindi => {
            if translation.is_some() {
                warn!(
                    "Stripping questionTranslation from a {} quiz question",
                    mode.as_str()
                );
                translation = None;
            }
            translation_language = None;
        }
    }

    Ok(Question {
        question,
        question_translation: translation,
        translation_language,
        kind,
        answer,
        context: raw.context.map(|c| c.trim().to_string()).unwrap_or_default(),
        language,
    })
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Strings, numbers and booleans as trimmed text; anything else is `None`.
fn scalar_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

fn normalise_tag(tag: &str) -> String {
    tag.trim().to_lowercase().replace([' ', '-'], "_")
}

fn parse_language(tag: &str) -> Language {
    match normalise_tag(tag).as_str() {
        "english" | "en" | "eng" => Language::English,
        "hindi" | "hi" | "hin" => Language::Hindi,
        _ => Language::Other,
    }
}

/// Hindi when the text contains Devanagari, English otherwise.
fn detect_language(text: &str) -> Language {
    if text.chars().any(|c| ('\u{0900}'..='\u{097F}').contains(&c)) {
        Language::Hindi
    } else {
        Language::English
    }
}
