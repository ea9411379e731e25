//! Error types for the edgequake-pdf2quiz library.
//!
//! Three error types mirror three failure scopes:
//!
//! * [`Pdf2QuizError`] (**fatal**): the request cannot produce a quiz at all
//!   (bad input file, wrong password, missing API key, provider failure,
//!   unusable model output). Returned as `Err(Pdf2QuizError)` from every
//!   top-level entry point. Nothing partial is ever returned alongside it.
//!
//! * [`PageError`] (**non-fatal**): text retrieval, rendering or recognition
//!   failed for one page. The page degrades to whatever native text exists
//!   and the failure is recorded in [`crate::output::ExtractionReport`].
//!
//! * [`OcrError`]: raised by an [`crate::pipeline::ocr::OpticalRecognizer`];
//!   the acquisition pipeline folds it into a [`PageError`].

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-pdf2quiz library.
#[derive(Debug, Error)]
pub enum Pdf2QuizError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The bytes were read, but they are not a PDF.
    #[error("'{source_name}' is not a PDF file (first bytes: {magic:?})\nUpload a .pdf textbook.")]
    NotAPdf { source_name: String, magic: Vec<u8> },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{source_name}' is corrupt or unreadable: {detail}")]
    CorruptPdf { source_name: String, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{source_name}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { source_name: String },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{source_name}'")]
    WrongPassword { source_name: String },

    /// The document opened but contains no pages.
    #[error("PDF '{source_name}' has no pages")]
    EmptyDocument { source_name: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Install libpdfium for your platform and either:\n\
  • place it next to the pdf2quiz binary, or\n\
  • install it system-wide, or\n\
  • set PDFIUM_LIB_PATH=/path/to/libpdfium.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Configuration errors ──────────────────────────────────────────────
    /// No API key was configured for the generation service.
    #[error("No API key configured for the generation service.\nSet {env_var} (or pass --api-key) and try again.")]
    MissingApiKey { env_var: &'static str },

    /// The configured edgequake-llm provider could not be created.
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// Builder or quiz validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Remote-service errors ─────────────────────────────────────────────
    /// The provider answered with a non-success status.
    #[error("Generation service returned HTTP {status}: {message}")]
    ApiError { status: u16, message: String },

    /// The provider reports that the configured model does not exist.
    #[error(
        "Generation service returned HTTP {status}: {message}\n\
Model '{model}' is not available to this API key.\n\
Set GEMINI_MODEL (or --model) to a supported model, e.g. gemini-2.0-flash."
    )]
    ModelNotFound {
        status: u16,
        model: String,
        message: String,
    },

    /// The request succeeded but no text was generated.
    #[error("Generation service returned no text{}", reason.as_deref().map(|r| format!(" ({r})")).unwrap_or_default())]
    EmptyGeneration { reason: Option<String> },

    /// The network request failed before a response arrived.
    #[error("Request to the generation service failed: {0}")]
    Transport(String),

    /// The generation call timed out.
    #[error("Generation call timed out after {secs}s\nTry a smaller page range or increase --api-timeout.")]
    ApiTimeout { secs: u64 },

    // ── Parse / validation errors ─────────────────────────────────────────
    /// Neither the raw response nor its repaired form parsed as JSON.
    #[error(
        "The model response was not recoverable JSON: {detail}\n\
Try again, or choose a smaller page range."
    )]
    UnrecoverableJson { detail: String },

    /// The response parsed, but the top-level value is not an array.
    #[error("The model response was JSON but not a list of questions (got {found})\nTry again.")]
    NotAnArray { found: &'static str },

    /// The model produced fewer records than requested.
    #[error(
        "The model returned {actual} questions but {expected} were requested.\n\
Try a smaller question count or a larger page range."
    )]
    TooFewQuestions { actual: usize, expected: usize },

    /// Enough records were produced but too many failed validation.
    #[error(
        "Only {valid} of the {expected} requested questions were well-formed ({skipped} malformed records dropped).\n\
Try again, or request fewer questions."
    )]
    TooFewValidQuestions {
        valid: usize,
        expected: usize,
        skipped: usize,
    },

    // ── Flow control ──────────────────────────────────────────────────────
    /// The request was cancelled by the caller.
    #[error("Request cancelled")]
    Cancelled,

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the export file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single page.
///
/// The page keeps whatever native text it had; the error is recorded in
/// [`crate::output::ExtractionReport::page_errors`].
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum PageError {
    /// Native text retrieval failed; the page is treated as empty.
    #[error("Page {page}: text extraction failed: {detail}")]
    TextFailed { page: usize, detail: String },

    /// Rasterising the page for recognition failed.
    #[error("Page {page}: rendering failed: {detail}")]
    RenderFailed { page: usize, detail: String },

    /// The optical recognizer failed on this page.
    #[error("Page {page}: recognition failed: {detail}")]
    RecognitionFailed { page: usize, detail: String },
}

impl PageError {
    /// 1-indexed page number the error belongs to.
    pub fn page(&self) -> usize {
        match self {
            PageError::TextFailed { page, .. }
            | PageError::RenderFailed { page, .. }
            | PageError::RecognitionFailed { page, .. } => *page,
        }
    }
}

/// Errors raised by an optical recognizer.
#[derive(Debug, Error)]
pub enum OcrError {
    /// The recognizer binary could not be started.
    #[error("failed to run '{binary}' (is it installed?): {source}")]
    Launch {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    /// The recognizer ran and exited unsuccessfully.
    #[error("exited with code {code}: {stderr}")]
    Failed { code: i32, stderr: String },

    /// Preparing the page image for the recognizer failed.
    #[error("could not prepare page image: {0}")]
    Image(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn too_few_questions_names_both_counts() {
        let e = Pdf2QuizError::TooFewQuestions {
            actual: 3,
            expected: 10,
        };
        let msg = e.to_string();
        assert!(msg.contains("returned 3"), "got: {msg}");
        assert!(msg.contains("10 were requested"), "got: {msg}");
    }

    #[test]
    fn model_not_found_carries_provider_text_and_guidance() {
        let e = Pdf2QuizError::ModelNotFound {
            status: 404,
            model: "gemini-9".into(),
            message: "models/gemini-9 is not found".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("models/gemini-9 is not found"));
        assert!(msg.contains("GEMINI_MODEL"));
    }

    #[test]
    fn empty_generation_display() {
        assert_eq!(
            Pdf2QuizError::EmptyGeneration { reason: None }.to_string(),
            "Generation service returned no text"
        );
        let e = Pdf2QuizError::EmptyGeneration {
            reason: Some("SAFETY".into()),
        };
        assert!(e.to_string().ends_with("(SAFETY)"));
    }

    #[test]
    fn missing_api_key_names_env_var() {
        let e = Pdf2QuizError::MissingApiKey {
            env_var: "GEMINI_API_KEY",
        };
        assert!(e.to_string().contains("GEMINI_API_KEY"));
    }

    #[test]
    fn page_error_reports_page() {
        let e = PageError::RecognitionFailed {
            page: 7,
            detail: "boom".into(),
        };
        assert_eq!(e.page(), 7);
        assert!(e.to_string().starts_with("Page 7"));
    }
}
