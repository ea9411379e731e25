//! # edgequake-pdf2quiz
//!
//! Generate study questions from the pages of a PDF textbook.
//!
//! ## Why this crate?
//!
//! Textbook PDFs mix born-digital pages with scanned ones, and many Indian
//! textbooks are in Hindi or carry both English and Hindi. This crate reads
//! the native text of each page, falls back to tesseract for pages that have
//! none, and asks a language model for a quiz in a strict JSON shape. The
//! model's answer is repaired if needed and validated record by record, so
//! callers only ever see well-formed questions or a typed error.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input    resolve local file or download from URL
//!  ├─ 2. Extract  native text per page; sparse pages rendered and OCR'd
//!  ├─ 3. Prompt   language rules + JSON schema + page text (≤ 30 000 chars)
//!  ├─ 4. Generate one Gemini generateContent call (or an edgequake-llm provider)
//!  └─ 5. Parse    fences → [ … ] span → strict parse → repair → validate
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_pdf2quiz::{
//!     generate_quiz, Difficulty, GenerationConfig, LanguageMode, PageRange, QuestionType,
//!     QuizConfig,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // API key read from GEMINI_API_KEY
//!     let quiz = QuizConfig::new(Difficulty::Medium, 10, QuestionType::Mixed, LanguageMode::Bilingual)?;
//!     let config = GenerationConfig::default();
//!     let output = generate_quiz("biology.pdf", PageRange::new(12, 18), &quiz, &config).await?;
//!     for q in &output.questions {
//!         println!("{} → {}", q.question, q.answer);
//!     }
//!     eprintln!("{} pages recognized optically", output.stats.extraction.recognized_pages.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2quiz` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-pdf2quiz = { version = "0.1", default-features = false }
//! ```
//!
//! ## Runtime requirements
//!
//! * a pdfium shared library (see [`pipeline::pdfium`])
//! * the `tesseract` binary with the `eng` and `hin` language data, for
//!   scanned pages only
//! * `GEMINI_API_KEY`, unless another provider is configured

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod export;
pub mod generate;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    Difficulty, GenerationConfig, GenerationConfigBuilder, LanguageMode, PageRange, QuestionType,
    QuizConfig,
};
pub use error::{OcrError, PageError, Pdf2QuizError};
pub use export::{render_export, write_export};
pub use generate::{
    extract_text, generate_quiz, generate_quiz_from_bytes, generate_quiz_sync, inspect,
    run_pipeline, synthesize_questions,
};
pub use output::{
    CombinedText, DocumentMetadata, ExtractionReport, Language, Question, QuestionKind,
    QuizOutput, QuizStats, SkippedRecord, Synthesis, TextSource,
};
pub use pipeline::document::DocumentAccessor;
pub use pipeline::llm::{GeminiClient, GenerationClient, ProviderClient};
pub use pipeline::ocr::{OpticalRecognizer, TesseractRecognizer};
pub use progress::{NoopProgressCallback, ProgressCallback, QuizProgressCallback};
pub use tokio_util::sync::CancellationToken;
