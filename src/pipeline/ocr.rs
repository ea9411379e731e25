//! Optical recognition of rendered pages.
//!
//! [`OpticalRecognizer`] is the seam; [`TesseractRecognizer`] implements it
//! by running the `tesseract` CLI on a temporary PNG:
//!
//! ```text
//! tesseract /tmp/pdf2quiz-ocr-XXXX.png stdout -l eng+hin
//! ```
//!
//! The child process is spawned with `kill_on_drop`, so dropping the future
//! (cancellation, timeout) also stops the recognizer.

use crate::error::OcrError;
use async_trait::async_trait;
use image::DynamicImage;
use std::process::Stdio;
use tracing::debug;

/// Converts a rendered page image into text.
#[async_trait]
pub trait OpticalRecognizer: Send + Sync {
    /// Recognize the text on `image`.
    ///
    /// `language` is a tesseract-style hint: `"eng"`, `"hin"` or `"eng+hin"`.
    async fn recognize(&self, image: &DynamicImage, language: &str) -> Result<String, OcrError>;
}

/// Recognizer backed by the `tesseract` command-line tool.
#[derive(Debug, Clone)]
pub struct TesseractRecognizer {
    binary: String,
}

impl TesseractRecognizer {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    /// Whether the configured binary can be executed.
    pub async fn is_available(&self) -> bool {
        tokio::process::Command::new(&self.binary)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|s| s.success())
            .unwrap_or(false)
    }
}

impl Default for TesseractRecognizer {
    fn default() -> Self {
        Self::new("tesseract")
    }
}

#[async_trait]
impl OpticalRecognizer for TesseractRecognizer {
    async fn recognize(&self, image: &DynamicImage, language: &str) -> Result<String, OcrError> {
        let image = image.clone();
        let png = tokio::task::spawn_blocking(move || write_temp_png(&image))
            .await
            .map_err(|e| OcrError::Image(format!("encode task panicked: {e}")))??;

        let output = tokio::process::Command::new(&self.binary)
            .arg(png.path())
            .arg("stdout")
            .arg("-l")
            .arg(language)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| OcrError::Launch {
                binary: self.binary.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(OcrError::Failed {
                code: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let text = String::from_utf8_lossy(&output.stdout).replace('\x0c', "");
        debug!("tesseract ({}) recognized {} chars", language, text.chars().count());
        Ok(text)
    }
}

/// Encode the page as PNG into a temporary file that is deleted on drop.
fn write_temp_png(image: &DynamicImage) -> Result<tempfile::NamedTempFile, OcrError> {
    let file = tempfile::Builder::new()
        .prefix("pdf2quiz-ocr-")
        .suffix(".png")
        .tempfile()
        .map_err(|e| OcrError::Image(format!("temp file: {e}")))?;
    image
        .save_with_format(file.path(), image::ImageFormat::Png)
        .map_err(|e| OcrError::Image(e.to_string()))?;
    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn blank_page() -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(16, 16, Rgba([255, 255, 255, 255])))
    }

    #[test]
    fn temp_png_is_written() {
        let file = write_temp_png(&blank_page()).expect("png should encode");
        let bytes = std::fs::read(file.path()).unwrap();
        assert!(bytes.starts_with(b"\x89PNG"));
        assert!(file.path().to_string_lossy().ends_with(".png"));
    }

    #[tokio::test]
    async fn missing_binary_is_a_launch_error() {
        let ocr = TesseractRecognizer::new("/nonexistent/tesseract");
        assert!(!ocr.is_available().await);
        let err = ocr.recognize(&blank_page(), "eng").await.unwrap_err();
        assert!(matches!(err, OcrError::Launch { .. }), "got: {err:?}");
    }
}
