//! Progress-callback trait for acquisition and synthesis events.
//!
//! Inject an [`Arc<dyn QuizProgressCallback>`] via
//! [`crate::config::GenerationConfigBuilder::progress_callback`] to receive
//! events as pages are read and the quiz is generated. The CLI uses it to
//! drive its progress bar; a service could forward events to a WebSocket.
//!
//! # Example
//!
//! ```rust
//! use edgequake_pdf2quiz::{GenerationConfig, QuizProgressCallback, TextSource};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     recognized: AtomicUsize,
//! }
//!
//! impl QuizProgressCallback for CountingCallback {
//!     fn on_page_complete(&self, _page: usize, _total: usize, source: TextSource, _chars: usize) {
//!         if source == TextSource::Recognized {
//!             self.recognized.fetch_add(1, Ordering::SeqCst);
//!         }
//!     }
//! }
//!
//! let cb = Arc::new(CountingCallback { recognized: AtomicUsize::new(0) });
//! let config = GenerationConfig::builder()
//!     .progress_callback(cb as Arc<dyn QuizProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::output::TextSource;
use std::sync::Arc;

/// Called by the pipelines as a request progresses.
///
/// All methods have no-op defaults. With `ocr_concurrency > 1` the page
/// events may arrive from several pages at once, so implementations must be
/// `Send + Sync`.
pub trait QuizProgressCallback: Send + Sync {
    /// Called once before the first page is read.
    ///
    /// * `total_pages`: number of pages in the selected range
    fn on_extraction_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called before a page's native text is requested.
    fn on_page_start(&self, page_num: usize, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// Called when a page's text is final.
    ///
    /// * `source`: whether optical recognition produced the text
    /// * `chars` : character count of the page text
    fn on_page_complete(&self, page_num: usize, total_pages: usize, source: TextSource, chars: usize) {
        let _ = (page_num, total_pages, source, chars);
    }

    /// Called when recognition failed and the page fell back to native text.
    fn on_page_degraded(&self, page_num: usize, total_pages: usize, error: &str) {
        let _ = (page_num, total_pages, error);
    }

    /// Called once after every page of the range has been read.
    ///
    /// * `recognized`: number of pages that went through recognition
    fn on_extraction_complete(&self, total_pages: usize, recognized: usize) {
        let _ = (total_pages, recognized);
    }

    /// Called just before the prompt is sent to the model.
    fn on_generation_start(&self, model: &str, prompt_chars: usize) {
        let _ = (model, prompt_chars);
    }

    /// Called after the response has been parsed and validated.
    fn on_generation_complete(&self, questions: usize, skipped: usize) {
        let _ = (questions, skipped);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl QuizProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::GenerationConfig`].
pub type ProgressCallback = Arc<dyn QuizProgressCallback>;
