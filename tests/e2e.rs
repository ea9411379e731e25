//! End-to-end integration tests for edgequake-pdf2quiz.
//!
//! These tests use real PDF files in `./test_cases/`, a real pdfium library,
//! the `tesseract` binary and live Gemini API calls. They are gated behind
//! the `E2E_ENABLED` environment variable so they do not run in CI unless
//! explicitly requested.
//!
//! Run with:
//!   E2E_ENABLED=1 DYLD_LIBRARY_PATH=. cargo test --test e2e -- --nocapture
//!
//! To restrict to a specific test:
//!   E2E_ENABLED=1 DYLD_LIBRARY_PATH=. cargo test --test e2e test_inspect -- --nocapture

use edgequake_pdf2quiz::{
    extract_text, generate_quiz, generate_quiz_from_bytes, inspect, write_export, Difficulty,
    GenerationConfig, Language, LanguageMode, PageRange, Pdf2QuizError, QuestionKind,
    QuestionType, QuizConfig, TesseractRecognizer,
};
use std::path::PathBuf;

// ── Test helpers ─────────────────────────────────────────────────────────────

fn test_cases_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_cases")
}

fn output_dir() -> PathBuf {
    let d = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_cases/output");
    std::fs::create_dir_all(&d).ok();
    d
}

/// Skip this test if E2E_ENABLED is not set *or* no PDF file at `path`.
macro_rules! e2e_skip_unless_ready {
    ($path:expr) => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP: set E2E_ENABLED=1 to run e2e tests");
            return;
        }
        init_tracing();
        let p: PathBuf = $path;
        if !p.exists() {
            println!("SKIP: test file not found: {}", p.display());
            return;
        }
        p
    }};
}

/// Skip unless a Gemini key is present in the environment.
macro_rules! skip_without_api_key {
    () => {
        if std::env::var("GEMINI_API_KEY").is_err() && std::env::var("GOOGLE_API_KEY").is_err() {
            println!("SKIP: GEMINI_API_KEY not set");
            return;
        }
    };
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn attention_paper() -> PathBuf {
    test_cases_dir().join("attention_is_all_you_need.pdf")
}

fn page_markers(text: &str) -> Vec<usize> {
    text.lines()
        .filter_map(|l| l.strip_prefix("--- Page ")?.strip_suffix(" ---")?.parse().ok())
        .collect()
}

// ── Inspect tests (no LLM, instant) ──────────────────────────────────────────

#[tokio::test]
async fn test_inspect_arxiv_paper() {
    let path = e2e_skip_unless_ready!(attention_paper());

    let meta = inspect(path.to_str().unwrap(), &GenerationConfig::default())
        .await
        .expect("inspect() should succeed");

    assert_eq!(meta.page_count, 15, "Attention paper should have 15 pages");
    assert!(!meta.pdf_version.is_empty());
    println!("Metadata: {:?}", meta);
}

#[tokio::test]
async fn test_inspect_nonexistent() {
    if std::env::var("E2E_ENABLED").is_err() {
        println!("SKIP");
        return;
    }

    let result = inspect("/definitely/not/a/real/file.pdf", &GenerationConfig::default()).await;
    assert!(
        matches!(result, Err(Pdf2QuizError::FileNotFound { .. })),
        "inspect() should fail with FileNotFound, got {result:?}"
    );
}

// ── Text acquisition (pdfium, optionally tesseract) ──────────────────────────

#[tokio::test]
async fn test_extract_native_text() {
    let path = e2e_skip_unless_ready!(attention_paper());

    let combined = extract_text(
        path.to_str().unwrap(),
        PageRange::new(1, 3),
        LanguageMode::English,
        &GenerationConfig::default(),
    )
    .await
    .expect("extraction should succeed");

    assert_eq!(page_markers(&combined.text), vec![1, 2, 3]);
    assert!(combined.report.recognized_pages.is_empty(), "born-digital pages need no OCR");
    assert!(combined.text.to_lowercase().contains("attention"));
    println!("[extract] {} chars", combined.char_count());
}

#[tokio::test]
async fn test_extract_range_is_clamped() {
    let path = e2e_skip_unless_ready!(attention_paper());

    let combined = extract_text(
        path.to_str().unwrap(),
        PageRange::new(14, 40),
        LanguageMode::English,
        &GenerationConfig::builder().ocr_enabled(false).build().unwrap(),
    )
    .await
    .expect("extraction should succeed");

    assert_eq!(combined.range, PageRange::new(14, 15));
    assert_eq!(page_markers(&combined.text), vec![14, 15]);
}

#[tokio::test]
async fn test_extract_forced_recognition() {
    let path = e2e_skip_unless_ready!(attention_paper());
    if !TesseractRecognizer::default().is_available().await {
        println!("SKIP: tesseract not installed");
        return;
    }

    // Every page looks sparse, so every page goes through tesseract.
    let config = GenerationConfig::builder()
        .min_native_chars(usize::MAX)
        .build()
        .unwrap();

    let combined = extract_text(
        path.to_str().unwrap(),
        PageRange::single(1),
        LanguageMode::English,
        &config,
    )
    .await
    .expect("extraction should succeed");

    assert_eq!(combined.report.recognized_pages, vec![1]);
    assert!(combined.text.to_lowercase().contains("attention"));
}

// ── Quiz generation (needs Gemini API) ───────────────────────────────────────

#[tokio::test]
async fn test_generate_multiple_choice_english() {
    let path = e2e_skip_unless_ready!(attention_paper());
    skip_without_api_key!();

    let quiz = QuizConfig::new(
        Difficulty::Medium,
        5,
        QuestionType::MultipleChoice,
        LanguageMode::English,
    )
    .unwrap();

    let output = generate_quiz(
        path.to_str().unwrap(),
        PageRange::new(1, 3),
        &quiz,
        &GenerationConfig::default(),
    )
    .await
    .expect("generation should succeed");

    assert!(output.questions.len() >= 5);
    for q in &output.questions {
        match &q.kind {
            QuestionKind::MultipleChoice { options } => {
                assert!(options.contains(&q.answer), "answer must be an option: {q:?}");
            }
            QuestionKind::ShortAnswer => panic!("expected multiple choice only: {q:?}"),
        }
        assert!(q.question_translation.is_none());
    }

    let out_path = output_dir().join("arxiv_quiz.txt");
    write_export(&out_path, &output.questions).await.expect("export");
    println!("[mcq] Saved to {}", out_path.display());
    println!("[mcq] Stats: {:?}", output.stats);
}

#[tokio::test]
async fn test_generate_bilingual_has_translations() {
    let path = e2e_skip_unless_ready!(attention_paper());
    skip_without_api_key!();

    let quiz = QuizConfig::new(
        Difficulty::Easy,
        3,
        QuestionType::ShortAnswer,
        LanguageMode::Bilingual,
    )
    .unwrap();

    let output = generate_quiz(
        path.to_str().unwrap(),
        PageRange::single(1),
        &quiz,
        &GenerationConfig::default(),
    )
    .await
    .expect("generation should succeed");

    for q in &output.questions {
        assert!(q.question_translation.is_some(), "missing translation: {q:?}");
        let target = q.translation_language.expect("translation language");
        assert_ne!(target, q.language);
        assert!(matches!(target, Language::English | Language::Hindi));
    }
}

#[tokio::test]
async fn test_generate_from_bytes() {
    let path = e2e_skip_unless_ready!(attention_paper());
    skip_without_api_key!();

    let bytes = std::fs::read(&path).expect("read pdf");
    let quiz = QuizConfig::new(Difficulty::Hard, 2, QuestionType::Mixed, LanguageMode::English)
        .unwrap();

    let output = generate_quiz_from_bytes(
        bytes,
        PageRange::single(2),
        &quiz,
        &GenerationConfig::default(),
    )
    .await
    .expect("generation should succeed");

    assert!(output.questions.len() >= 2);
    assert_eq!(output.range, PageRange::single(2));
}

#[tokio::test]
async fn test_unknown_model_is_reported() {
    let path = e2e_skip_unless_ready!(attention_paper());
    skip_without_api_key!();

    let config = GenerationConfig::builder()
        .model("gemini-does-not-exist")
        .build()
        .unwrap();

    let err = generate_quiz(
        path.to_str().unwrap(),
        PageRange::single(1),
        &QuizConfig::default(),
        &config,
    )
    .await
    .unwrap_err();

    assert!(matches!(err, Pdf2QuizError::ModelNotFound { .. }), "{err}");
}
