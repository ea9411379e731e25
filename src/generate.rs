//! Quiz generation entry points.
//!
//! ## Layers
//!
//! * [`generate_quiz`] / [`generate_quiz_from_bytes`] / [`generate_quiz_sync`]
//!  : the full request: resolve input, open the PDF, acquire text, generate
//!   and validate questions.
//! * [`extract_text`] and [`inspect`]: acquisition or metadata only; no API
//!   key needed.
//! * [`run_pipeline`] and [`synthesize_questions`]: the two pipelines over
//!   injected collaborators ([`DocumentAccessor`], [`OpticalRecognizer`],
//!   [`GenerationClient`]). The public entry points are thin wrappers around
//!   these, and tests drive them with in-memory fakes.
//!
//! Every error is terminal for the request. Nothing partial is returned
//! alongside an error, and nothing is retried.

use crate::config::{GenerationConfig, LanguageMode, PageRange, QuizConfig};
use crate::error::Pdf2QuizError;
use crate::output::{CombinedText, DocumentMetadata, QuizOutput, QuizStats, Synthesis};
use crate::pipeline::cancellable;
use crate::pipeline::document::{DocumentAccessor, PdfiumDocument};
use crate::pipeline::extract::extract;
use crate::pipeline::input::{self, ResolvedInput};
use crate::pipeline::llm::{resolve_client, GenerationClient};
use crate::pipeline::ocr::{OpticalRecognizer, TesseractRecognizer};
use crate::pipeline::parse::parse_response;
use crate::prompts::build_prompt;
use std::time::Instant;
use tracing::{debug, info};

/// Generate a quiz from a PDF file or URL.
///
/// This is the primary entry point for the library.
///
/// # Arguments
/// * `input`: local file path or HTTP/HTTPS URL to a PDF
/// * `range`: 1-indexed inclusive page range; clamped to the document
/// * `quiz` : difficulty, count, question type and language mode
/// * `config`: pipeline configuration
///
/// # Errors
/// The generation backend is resolved first, so a missing API key fails
/// before the input is read. See [`Pdf2QuizError`] for the other cases.
pub async fn generate_quiz(
    input: impl AsRef<str>,
    range: PageRange,
    quiz: &QuizConfig,
    config: &GenerationConfig,
) -> Result<QuizOutput, Pdf2QuizError> {
    let input = input.as_ref();
    info!("Starting quiz generation: {} ({})", input, range);

    let client = resolve_client(config)?;
    let token = config.cancellation_token();
    let resolved = cancellable(
        &token,
        input::resolve_input(input, config.download_timeout_secs),
    )
    .await?;

    generate_from_resolved(resolved, range, quiz, config, client.as_ref()).await
}

/// Generate a quiz from PDF bytes already in memory.
///
/// # Example
/// ```rust,no_run
/// use edgequake_pdf2quiz::{generate_quiz_from_bytes, GenerationConfig, PageRange, QuizConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let bytes = std::fs::read("biology.pdf")?;
/// let output = generate_quiz_from_bytes(
///     bytes,
///     PageRange::new(3, 7),
///     &QuizConfig::default(),
///     &GenerationConfig::default(),
/// )
/// .await?;
/// for q in &output.questions {
///     println!("{}", q.question);
/// }
/// # Ok(())
/// # }
/// ```
pub async fn generate_quiz_from_bytes(
    bytes: Vec<u8>,
    range: PageRange,
    quiz: &QuizConfig,
    config: &GenerationConfig,
) -> Result<QuizOutput, Pdf2QuizError> {
    let client = resolve_client(config)?;
    input::ensure_pdf("<memory>", &bytes)?;
    let resolved = ResolvedInput {
        name: "<memory>".to_string(),
        bytes,
    };
    generate_from_resolved(resolved, range, quiz, config, client.as_ref()).await
}

/// Synchronous wrapper around [`generate_quiz`].
///
/// Creates a temporary tokio runtime internally.
pub fn generate_quiz_sync(
    input: impl AsRef<str>,
    range: PageRange,
    quiz: &QuizConfig,
    config: &GenerationConfig,
) -> Result<QuizOutput, Pdf2QuizError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Pdf2QuizError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(generate_quiz(input, range, quiz, config))
}

/// Run only the acquisition pipeline and return the untruncated text.
///
/// Does not require an API key.
pub async fn extract_text(
    input: impl AsRef<str>,
    range: PageRange,
    language: LanguageMode,
    config: &GenerationConfig,
) -> Result<CombinedText, Pdf2QuizError> {
    let token = config.cancellation_token();
    let resolved = cancellable(
        &token,
        input::resolve_input(input.as_ref(), config.download_timeout_secs),
    )
    .await?;
    let doc = open_document(resolved, config).await?;
    let recognizer = TesseractRecognizer::new(&config.tesseract_path);
    extract(&doc, Some(&recognizer), range, language, config).await
}

/// Read PDF metadata without extracting text.
///
/// Does not require an API key. Uses the config's password and download
/// timeout.
pub async fn inspect(
    input: impl AsRef<str>,
    config: &GenerationConfig,
) -> Result<DocumentMetadata, Pdf2QuizError> {
    let resolved = input::resolve_input(input.as_ref(), config.download_timeout_secs).await?;
    let doc = open_document(resolved, config).await?;
    doc.metadata().await
}

/// Both pipelines over injected collaborators.
///
/// `doc` is read-only and not retained after the text is acquired.
pub async fn run_pipeline(
    doc: &dyn DocumentAccessor,
    recognizer: Option<&dyn OpticalRecognizer>,
    client: &dyn GenerationClient,
    range: PageRange,
    quiz: &QuizConfig,
    config: &GenerationConfig,
) -> Result<QuizOutput, Pdf2QuizError> {
    let total_start = Instant::now();

    let combined = extract(doc, recognizer, range, quiz.language_mode(), config).await?;
    let synthesis = synthesize_questions(&combined.text, combined.range, quiz, client, config).await?;

    let stats = QuizStats {
        total_pages: doc.page_count(),
        extraction: combined.report,
        prompt_text_chars: synthesis.prompt_text_chars,
        truncated: synthesis.truncated,
        model: synthesis.model,
        generation_duration_ms: synthesis.duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    info!(
        "Quiz complete: {} questions from {}, {}ms total",
        synthesis.questions.len(),
        combined.range,
        stats.total_duration_ms
    );

    Ok(QuizOutput {
        range: combined.range,
        questions: synthesis.questions,
        skipped: synthesis.skipped,
        stats,
    })
}

/// Build the prompt, call the model once, and parse and validate the answer.
pub async fn synthesize_questions(
    text: &str,
    range: PageRange,
    quiz: &QuizConfig,
    client: &dyn GenerationClient,
    config: &GenerationConfig,
) -> Result<Synthesis, Pdf2QuizError> {
    let start = Instant::now();
    let token = config.cancellation_token();
    if token.is_cancelled() {
        return Err(Pdf2QuizError::Cancelled);
    }

    let prompt = build_prompt(text, quiz, range, config.max_prompt_chars);
    if prompt.truncated {
        info!(
            "Page text cut to {} of {} chars for the prompt",
            prompt.embedded_chars,
            text.chars().count()
        );
    }
    debug!("Prompt is {} chars", prompt.text.chars().count());

    if let Some(ref cb) = config.progress_callback {
        cb.on_generation_start(client.model(), prompt.text.chars().count());
    }

    let raw = cancellable(&token, client.generate(&prompt.text)).await?;
    let parsed = parse_response(&raw, quiz.question_count(), quiz.language_mode())?;

    if let Some(ref cb) = config.progress_callback {
        cb.on_generation_complete(parsed.questions.len(), parsed.skipped.len());
    }

    Ok(Synthesis {
        questions: parsed.questions,
        skipped: parsed.skipped,
        model: client.model().to_string(),
        prompt_text_chars: prompt.embedded_chars,
        truncated: prompt.truncated,
        duration_ms: start.elapsed().as_millis() as u64,
    })
}

// ── Internal helpers ─────────────────────────────────────────────────────

async fn generate_from_resolved(
    resolved: ResolvedInput,
    range: PageRange,
    quiz: &QuizConfig,
    config: &GenerationConfig,
    client: &dyn GenerationClient,
) -> Result<QuizOutput, Pdf2QuizError> {
    let doc = open_document(resolved, config).await?;
    let recognizer = TesseractRecognizer::new(&config.tesseract_path);
    run_pipeline(&doc, Some(&recognizer), client, range, quiz, config).await
}

async fn open_document(
    resolved: ResolvedInput,
    config: &GenerationConfig,
) -> Result<PdfiumDocument, Pdf2QuizError> {
    let token = config.cancellation_token();
    let doc = cancellable(
        &token,
        PdfiumDocument::open(resolved.name, resolved.bytes, config.password.clone()),
    )
    .await?;
    if doc.page_count() == 0 {
        return Err(Pdf2QuizError::EmptyDocument {
            source_name: doc.name().to_string(),
        });
    }
    Ok(doc)
}
