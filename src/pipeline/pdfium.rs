//! Binding to the pdfium shared library.
//!
//! Resolution order (first match wins):
//!
//! 1. `PDFIUM_LIB_PATH`: explicit path to `libpdfium.so` / `.dylib` / `pdfium.dll`,
//!    or to the directory containing it
//! 2. the platform library name in the current working directory
//! 3. the system library search path

use crate::error::Pdf2QuizError;
use pdfium_render::prelude::*;
use std::path::PathBuf;
use tracing::debug;

/// Environment variable pointing at an existing pdfium library.
pub const PDFIUM_LIB_ENV: &str = "PDFIUM_LIB_PATH";

/// Bind to pdfium. Call from blocking contexts only.
pub fn bind_pdfium() -> Result<Pdfium, Pdf2QuizError> {
    if let Some(path) = env_library_path() {
        debug!("Binding pdfium from {}", path.display());
        return Pdfium::bind_to_library(&path)
            .map(Pdfium::new)
            .map_err(|e| {
                Pdf2QuizError::PdfiumBindingFailed(format!("{}: {}", path.display(), e))
            });
    }

    Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
        .or_else(|_| Pdfium::bind_to_system_library())
        .map(Pdfium::new)
        .map_err(|e| Pdf2QuizError::PdfiumBindingFailed(e.to_string()))
}

fn env_library_path() -> Option<PathBuf> {
    let raw = std::env::var(PDFIUM_LIB_ENV).ok()?;
    if raw.trim().is_empty() {
        return None;
    }
    let path = PathBuf::from(raw);
    if path.is_dir() {
        Some(Pdfium::pdfium_platform_library_name_at_path(&path))
    } else {
        Some(path)
    }
}
