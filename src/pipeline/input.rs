//! Input resolution: load a user-supplied path or URL into memory.
//!
//! pdfium opens documents straight from a byte slice, so both local files
//! and downloads end up as an in-memory buffer. The PDF magic bytes (`%PDF`)
//! are checked here so a wrong file type is reported as an input error
//! before any decoding is attempted.

use crate::error::Pdf2QuizError;
use std::path::PathBuf;
use tracing::{debug, info};

/// A PDF loaded into memory, with a display name for error messages.
#[derive(Debug, Clone)]
pub struct ResolvedInput {
    /// File path or URL the bytes came from.
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve the input string to PDF bytes.
///
/// URLs are downloaded with the given timeout; anything else is treated as
/// a local path.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<ResolvedInput, Pdf2QuizError> {
    if input.trim().is_empty() {
        return Err(Pdf2QuizError::InvalidInput {
            input: input.to_string(),
        });
    }
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        read_local(input).await
    }
}

/// Reject buffers that do not start with the PDF magic bytes.
pub fn ensure_pdf(name: &str, bytes: &[u8]) -> Result<(), Pdf2QuizError> {
    if bytes.len() < 4 || &bytes[..4] != b"%PDF" {
        return Err(Pdf2QuizError::NotAPdf {
            source_name: name.to_string(),
            magic: bytes.iter().take(4).copied().collect(),
        });
    }
    Ok(())
}

async fn read_local(path_str: &str) -> Result<ResolvedInput, Pdf2QuizError> {
    let path = PathBuf::from(path_str);

    let bytes = match tokio::fs::read(&path).await {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(Pdf2QuizError::FileNotFound { path });
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(Pdf2QuizError::PermissionDenied { path });
        }
        Err(e) => {
            return Err(Pdf2QuizError::Internal(format!(
                "Failed to read '{}': {}",
                path.display(),
                e
            )));
        }
    };

    ensure_pdf(path_str, &bytes)?;
    debug!("Loaded local PDF: {} ({} bytes)", path.display(), bytes.len());

    Ok(ResolvedInput {
        name: path_str.to_string(),
        bytes,
    })
}

async fn download_url(url: &str, timeout_secs: u64) -> Result<ResolvedInput, Pdf2QuizError> {
    info!("Downloading PDF from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| Pdf2QuizError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            Pdf2QuizError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            Pdf2QuizError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(Pdf2QuizError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| Pdf2QuizError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?
        .to_vec();

    ensure_pdf(url, &bytes)?;
    info!("Downloaded {} bytes", bytes.len());

    Ok(ResolvedInput {
        name: url.to_string(),
        bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/doc.pdf"));
        assert!(is_url("http://example.com/doc.pdf"));
        assert!(!is_url("/tmp/doc.pdf"));
        assert!(!is_url("doc.pdf"));
        assert!(!is_url(""));
    }

    #[test]
    fn ensure_pdf_accepts_magic() {
        assert!(ensure_pdf("a.pdf", b"%PDF-1.7\n...").is_ok());
    }

    #[test]
    fn ensure_pdf_rejects_other_types() {
        let err = ensure_pdf("notes.docx", b"PK\x03\x04rest").unwrap_err();
        match err {
            Pdf2QuizError::NotAPdf { source_name, magic } => {
                assert_eq!(source_name, "notes.docx");
                assert_eq!(magic, b"PK\x03\x04".to_vec());
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(ensure_pdf("tiny", b"%P").is_err());
    }

    #[tokio::test]
    async fn missing_file_is_reported() {
        let err = resolve_input("/definitely/not/here.pdf", 5).await.unwrap_err();
        assert!(matches!(err, Pdf2QuizError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn local_non_pdf_is_rejected() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"hello world").unwrap();
        let err = resolve_input(tmp.path().to_str().unwrap(), 5)
            .await
            .unwrap_err();
        assert!(matches!(err, Pdf2QuizError::NotAPdf { .. }));
    }

    #[tokio::test]
    async fn local_pdf_is_loaded() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"%PDF-1.4\n%fake").unwrap();
        let resolved = resolve_input(tmp.path().to_str().unwrap(), 5)
            .await
            .unwrap();
        assert!(resolved.bytes.starts_with(b"%PDF"));
    }
}
