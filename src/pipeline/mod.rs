//! Pipeline stages for PDF-to-quiz generation.
//!
//! Each submodule implements exactly one step. The external collaborators
//! (PDF library, OCR engine, generation service) sit behind traits so the
//! stages can be driven by in-memory fakes in tests.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ document ──▶ extract ──▶ prompt ──▶ llm ──▶ parse
//! (URL/path) (pdfium)   (text/OCR)  (builder)  (Gemini) (repair + validate)
//! ```
//!
//! 1. [`input`]   : load the user-supplied path or URL into memory
//! 2. [`document`]: page count, native text and rendering; pdfium calls run
//!    in `spawn_blocking` because pdfium is not async-safe
//! 3. [`extract`] : per-page acquisition with [`ocr`] fallback, cleaned by
//!    [`clean`] and joined with page markers
//! 4. [`llm`]     : the only stage with network I/O after input
//! 5. [`parse`]   : fence stripping, array extraction, strict parse with a
//!    [`repair`] retry, and record validation

pub mod clean;
pub mod document;
pub mod extract;
pub mod input;
pub mod llm;
pub mod ocr;
pub mod parse;
pub mod pdfium;
pub mod repair;

use crate::error::Pdf2QuizError;
use std::future::Future;
use tokio_util::sync::CancellationToken;

/// Run `fut` unless `token` fires first; the future is dropped on cancellation.
pub(crate) async fn cancellable<T, F>(token: &CancellationToken, fut: F) -> Result<T, Pdf2QuizError>
where
    F: Future<Output = Result<T, Pdf2QuizError>>,
{
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(Pdf2QuizError::Cancelled),
        result = fut => result,
    }
}
