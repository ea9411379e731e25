//! Text acquisition: native text with optical-recognition fallback.
//!
//! For every page of the (clamped) range, in ascending order:
//!
//! 1. ask the [`DocumentAccessor`] for native text
//! 2. if fewer than `min_native_chars` non-whitespace characters came back,
//!    render the page at `render_scale` and run the [`OpticalRecognizer`]
//!    with the language hint of the quiz
//! 3. clean the text and append `--- Page N ---` plus the text to the blob
//!
//! Recognition failures are absorbed: the page keeps its (possibly empty)
//! native text and the failure is recorded in the [`ExtractionReport`].
//! Only the document itself failing is fatal.
//!
//! ## Why `buffered` and not `buffer_unordered`?
//!
//! Pages may be acquired concurrently (`ocr_concurrency > 1`), but the blob
//! must list them in page order. `buffered` yields results in input order
//! whatever order they finish in. With the default concurrency of 1 the loop
//! is strictly sequential: page *n + 1* starts only after page *n* is done,
//! so at most one rendered image exists at a time.

use crate::config::{GenerationConfig, LanguageMode, PageRange};
use crate::error::{PageError, Pdf2QuizError};
use crate::output::{page_marker, CombinedText, ExtractedPage, ExtractionReport, TextSource};
use crate::pipeline::cancellable;
use crate::pipeline::clean::{clean_page_text, non_whitespace_len};
use crate::pipeline::document::DocumentAccessor;
use crate::pipeline::ocr::OpticalRecognizer;
use crate::progress::ProgressCallback;
use futures::stream::{self, StreamExt};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Whether a page's native text is too sparse to be trusted.
///
/// True when `native_text` has fewer than `min_chars` characters once all
/// whitespace is removed.
pub fn needs_recognition(native_text: &str, min_chars: usize) -> bool {
    non_whitespace_len(native_text) < min_chars
}

/// Join pages into one blob, each preceded by its page marker.
pub fn assemble_pages(pages: &[ExtractedPage]) -> String {
    pages
        .iter()
        .map(|p| format!("{}\n{}\n", page_marker(p.page_num), p.text))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Acquire the text of `range` from `doc`.
///
/// `recognizer` may be `None` (or OCR disabled in `config`), in which case
/// sparse pages simply keep their native text. The returned blob is never
/// truncated.
///
/// # Errors
/// * [`Pdf2QuizError::EmptyDocument`] if the document has no pages
/// * [`Pdf2QuizError::Cancelled`] if the config's token fires
pub async fn extract(
    doc: &dyn DocumentAccessor,
    recognizer: Option<&dyn OpticalRecognizer>,
    range: PageRange,
    language: LanguageMode,
    config: &GenerationConfig,
) -> Result<CombinedText, Pdf2QuizError> {
    let start = Instant::now();
    let token = config.cancellation_token();
    if token.is_cancelled() {
        return Err(Pdf2QuizError::Cancelled);
    }

    let range = range
        .clamp(doc.page_count())
        .ok_or_else(|| Pdf2QuizError::EmptyDocument {
            source_name: doc.name().to_string(),
        })?;
    let total = range.len();
    let hint = language.ocr_hint();
    let recognizer = recognizer.filter(|_| config.ocr_enabled);
    let cb = config.progress_callback.as_ref();

    info!("Extracting {} of '{}' (OCR hint: {})", range, doc.name(), hint);
    if let Some(cb) = cb {
        cb.on_extraction_start(total);
    }

    let mut outcomes = stream::iter(range.pages())
        .map(|page_num| acquire_page(doc, recognizer, page_num, total, hint, config, cb))
        .buffered(config.ocr_concurrency.max(1));

    let mut pages = Vec::with_capacity(total);
    let mut report = ExtractionReport::default();

    // Dropping `outcomes` on cancellation drops every in-flight page future.
    while let Some(outcome) = cancellable(&token, async { Ok(outcomes.next().await) }).await? {
        if outcome.page.source == TextSource::Recognized {
            report.recognized_pages.push(outcome.page.page_num);
        }
        report.page_errors.extend(outcome.errors);
        pages.push(outcome.page);
    }

    report.pages = pages.len();
    report.duration_ms = start.elapsed().as_millis() as u64;

    if let Some(cb) = cb {
        cb.on_extraction_complete(total, report.recognized_pages.len());
    }
    info!(
        "Extraction complete: {} pages ({} recognized, {} page errors) in {}ms",
        report.pages,
        report.recognized_pages.len(),
        report.page_errors.len(),
        report.duration_ms
    );

    Ok(CombinedText {
        range,
        text: assemble_pages(&pages),
        report,
    })
}

struct PageOutcome {
    page: ExtractedPage,
    errors: Vec<PageError>,
}

async fn acquire_page(
    doc: &dyn DocumentAccessor,
    recognizer: Option<&dyn OpticalRecognizer>,
    page_num: usize,
    total: usize,
    hint: &str,
    config: &GenerationConfig,
    cb: Option<&ProgressCallback>,
) -> PageOutcome {
    if let Some(cb) = cb {
        cb.on_page_start(page_num, total);
    }
    let mut errors = Vec::new();

    let native = match doc.page_text(page_num).await {
        Ok(text) => text,
        Err(e) => {
            warn!("{}; treating the page as empty", e);
            errors.push(e);
            String::new()
        }
    };

    let (raw, source) = match recognizer {
        Some(ocr) if needs_recognition(&native, config.min_native_chars) => {
            debug!(
                "Page {}: {} native chars, running recognition",
                page_num,
                non_whitespace_len(&native)
            );
            match recognize_page(doc, ocr, page_num, hint, config.render_scale).await {
                Ok(text) => (text, TextSource::Recognized),
                Err(e) => {
                    warn!("{}; keeping native text", e);
                    if let Some(cb) = cb {
                        cb.on_page_degraded(page_num, total, &e.to_string());
                    }
                    errors.push(e);
                    (native, TextSource::Native)
                }
            }
        }
        _ => (native, TextSource::Native),
    };

    let text = clean_page_text(&raw);
    if let Some(cb) = cb {
        cb.on_page_complete(page_num, total, source, text.chars().count());
    }

    PageOutcome {
        page: ExtractedPage {
            page_num,
            text,
            source,
        },
        errors,
    }
}

/// Render one page and recognize it. The image is dropped before returning.
async fn recognize_page(
    doc: &dyn DocumentAccessor,
    ocr: &dyn OpticalRecognizer,
    page_num: usize,
    hint: &str,
    scale: f32,
) -> Result<String, PageError> {
    let image = doc.render_page(page_num, scale).await?;
    ocr.recognize(&image, hint)
        .await
        .map_err(|e| PageError::RecognitionFailed {
            page: page_num,
            detail: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognition_threshold_boundary() {
        let short = "a".repeat(29);
        let enough = "a".repeat(30);
        assert!(needs_recognition(&short, 30));
        assert!(!needs_recognition(&enough, 30));
    }

    #[test]
    fn recognition_ignores_whitespace() {
        let spaced = "a b c d e f g h i j k l m n o p q r s t u v w x y z 1 2 3";
        assert_eq!(non_whitespace_len(spaced), 29);
        assert!(needs_recognition(spaced, 30));
        assert!(needs_recognition("   \n\t  ", 30));
    }

    #[test]
    fn assemble_orders_markers() {
        let pages = vec![
            ExtractedPage {
                page_num: 3,
                text: "Three".into(),
                source: TextSource::Native,
            },
            ExtractedPage {
                page_num: 4,
                text: String::new(),
                source: TextSource::Native,
            },
        ];
        assert_eq!(
            assemble_pages(&pages),
            "--- Page 3 ---\nThree\n\n--- Page 4 ---\n\n"
        );
    }
}
