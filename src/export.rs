//! Plain-text export of a generated quiz.
//!
//! One section per question, sections separated by a line of dashes:
//!
//! ```text
//! Question 1: What do mitochondria produce?
//! Type: Multiple Choice
//! Options:
//!   A. ATP
//!   B. DNA
//! Answer: ATP
//! Language: English
//! Context: Mitochondria are the site of cellular respiration.
//! -------------------
//! Question 2: ...
//! ```

use crate::error::Pdf2QuizError;
use crate::output::Question;
use std::fmt::Write as _;
use std::path::Path;

/// The literal line placed between two questions.
pub const SECTION_SEPARATOR: &str = "-------------------";

/// Render `questions` in the export format.
pub fn render_export(questions: &[Question]) -> String {
    questions
        .iter()
        .enumerate()
        .map(|(i, q)| render_question(i + 1, q))
        .collect::<Vec<_>>()
        .join(&format!("{SECTION_SEPARATOR}\n"))
}

fn render_question(number: usize, q: &Question) -> String {
    let mut s = String::new();
    let _ = writeln!(s, "Question {}: {}", number, q.question);
    let _ = writeln!(s, "Type: {}", q.kind.label());

    let options = q.kind.options();
    if !options.is_empty() {
        s.push_str("Options:\n");
        for (i, option) in options.iter().enumerate() {
            let _ = writeln!(s, "  {}. {}", option_letter(i), option);
        }
    }

    if let Some(ref translation) = q.question_translation {
        match q.translation_language {
            Some(lang) => {
                let _ = writeln!(s, "Translation ({}): {}", lang, translation);
            }
            None => {
                let _ = writeln!(s, "Translation: {}", translation);
            }
        }
    }

    let _ = writeln!(s, "Answer: {}", q.answer);
    let _ = writeln!(s, "Language: {}", q.language);
    let _ = writeln!(s, "Context: {}", q.context);
    s
}

fn option_letter(index: usize) -> String {
    if index < 26 {
        char::from(b'A' + index as u8).to_string()
    } else {
        (index + 1).to_string()
    }
}

/// Write the export to `path`.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn write_export(path: impl AsRef<Path>, questions: &[Question]) -> Result<(), Pdf2QuizError> {
    let path = path.as_ref();
    let write_err = |source| Pdf2QuizError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let mut tmp_name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "quiz".into());
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    tokio::fs::write(&tmp_path, render_export(questions))
        .await
        .map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::{Language, QuestionKind};

    fn mcq() -> Question {
        Question {
            question: "What do mitochondria produce?".into(),
            question_translation: Some("माइटोकॉन्ड्रिया क्या बनाते हैं?".into()),
            translation_language: Some(Language::Hindi),
            kind: QuestionKind::MultipleChoice {
                options: vec!["ATP".into(), "DNA".into()],
            },
            answer: "ATP".into(),
            context: "Cellular respiration".into(),
            language: Language::English,
        }
    }

    fn short() -> Question {
        Question {
            question: "Define osmosis.".into(),
            question_translation: None,
            translation_language: None,
            kind: QuestionKind::ShortAnswer,
            answer: "Movement of water across a membrane.".into(),
            context: String::new(),
            language: Language::English,
        }
    }

    #[test]
    fn sections_are_separated() {
        let text = render_export(&[mcq(), short()]);
        let sections: Vec<&str> = text.split("-------------------\n").collect();
        assert_eq!(sections.len(), 2);
        assert!(sections[0].starts_with("Question 1: What do mitochondria produce?\n"));
        assert!(sections[0].contains("Type: Multiple Choice\n"));
        assert!(sections[0].contains("  A. ATP\n  B. DNA\n"));
        assert!(sections[0].contains("Translation (Hindi): माइटोकॉन्ड्रिया"));
        assert!(sections[1].starts_with("Question 2: Define osmosis.\n"));
        assert!(!sections[1].contains("Options:"));
        assert!(!sections[1].contains("Translation"));
        assert!(sections[1].ends_with("Context: \n"));
    }

    #[test]
    fn empty_quiz_renders_nothing() {
        assert_eq!(render_export(&[]), "");
    }

    #[tokio::test]
    async fn write_export_is_atomic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("quiz.txt");
        write_export(&path, &[short()]).await.unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("Answer: Movement of water"));
        assert!(!dir.path().join("nested").join("quiz.txt.tmp").exists());
    }
}
