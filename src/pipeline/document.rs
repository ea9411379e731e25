//! Document access: page count, native page text, and page rendering.
//!
//! [`DocumentAccessor`] is the seam between the acquisition pipeline and the
//! PDF library. [`PdfiumDocument`] implements it over `pdfium-render`.
//!
//! ## Why reopen per call?
//!
//! `PdfDocument` borrows its `Pdfium` binding and cannot cross an `.await`,
//! and pdfium itself must run on a blocking thread. Each operation therefore
//! runs inside `tokio::task::spawn_blocking`, opens the shared in-memory
//! buffer, does one thing, and drops everything. Nothing mutable is shared
//! between calls, and the rendered bitmap never outlives its page.

use crate::error::{PageError, Pdf2QuizError};
use crate::output::DocumentMetadata;
use crate::pipeline::pdfium::bind_pdfium;
use async_trait::async_trait;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::sync::Arc;
use tracing::{debug, info};

/// A read-only, paged document.
///
/// Page numbers are 1-indexed throughout.
#[async_trait]
pub trait DocumentAccessor: Send + Sync {
    /// Display name used in error messages.
    fn name(&self) -> &str {
        "document"
    }

    /// Total number of pages in the document.
    fn page_count(&self) -> usize;

    /// Native (already encoded) text of a page.
    async fn page_text(&self, page_num: usize) -> Result<String, PageError>;

    /// Rasterise a page at `scale` × its natural size.
    async fn render_page(&self, page_num: usize, scale: f32) -> Result<DynamicImage, PageError>;
}

/// A PDF held in memory and accessed through pdfium.
#[derive(Clone)]
pub struct PdfiumDocument {
    name: String,
    bytes: Arc<Vec<u8>>,
    password: Option<String>,
    page_count: usize,
}

impl std::fmt::Debug for PdfiumDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfiumDocument")
            .field("name", &self.name)
            .field("bytes", &self.bytes.len())
            .field("page_count", &self.page_count)
            .finish()
    }
}

impl PdfiumDocument {
    /// Decode `bytes` and read the page count.
    ///
    /// Corrupt or encrypted documents fail here, before any page is touched.
    pub async fn open(
        name: impl Into<String>,
        bytes: Vec<u8>,
        password: Option<String>,
    ) -> Result<Self, Pdf2QuizError> {
        let name = name.into();
        let bytes = Arc::new(bytes);

        let page_count = {
            let name = name.clone();
            let bytes = Arc::clone(&bytes);
            let password = password.clone();
            tokio::task::spawn_blocking(move || {
                let pdfium = bind_pdfium()?;
                let document = load(&pdfium, &name, &bytes, password.as_deref())?;
                Ok::<_, Pdf2QuizError>(document.pages().len() as usize)
            })
            .await
            .map_err(|e| Pdf2QuizError::Internal(format!("Open task panicked: {}", e)))??
        };

        info!("PDF loaded: {} ({} pages)", name, page_count);

        Ok(Self {
            name,
            bytes,
            password,
            page_count,
        })
    }

    /// Document-level metadata (title, author, …).
    pub async fn metadata(&self) -> Result<DocumentMetadata, Pdf2QuizError> {
        let name = self.name.clone();
        let bytes = Arc::clone(&self.bytes);
        let password = self.password.clone();

        tokio::task::spawn_blocking(move || {
            let pdfium = bind_pdfium()?;
            let document = load(&pdfium, &name, &bytes, password.as_deref())?;
            Ok(read_metadata(&document))
        })
        .await
        .map_err(|e| Pdf2QuizError::Internal(format!("Metadata task panicked: {}", e)))?
    }

    /// Run `op` against page `page_num` on a blocking thread.
    async fn with_page<T, F>(&self, page_num: usize, op: F) -> Result<T, String>
    where
        T: Send + 'static,
        F: FnOnce(&PdfPage<'_>) -> Result<T, String> + Send + 'static,
    {
        if page_num == 0 || page_num > self.page_count {
            return Err(format!(
                "page {} is out of range (document has {} pages)",
                page_num, self.page_count
            ));
        }

        let name = self.name.clone();
        let bytes = Arc::clone(&self.bytes);
        let password = self.password.clone();

        tokio::task::spawn_blocking(move || {
            let pdfium = bind_pdfium().map_err(|e| e.to_string())?;
            let document =
                load(&pdfium, &name, &bytes, password.as_deref()).map_err(|e| e.to_string())?;
            let page = document
                .pages()
                .get((page_num - 1) as u16)
                .map_err(|e| format!("{:?}", e))?;
            op(&page)
        })
        .await
        .map_err(|e| format!("page task panicked: {}", e))?
    }
}

#[async_trait]
impl DocumentAccessor for PdfiumDocument {
    fn name(&self) -> &str {
        &self.name
    }

    fn page_count(&self) -> usize {
        self.page_count
    }

    async fn page_text(&self, page_num: usize) -> Result<String, PageError> {
        self.with_page(page_num, |page| {
            page.text()
                .map(|t| t.all())
                .map_err(|e| format!("{:?}", e))
        })
        .await
        .map_err(|detail| PageError::TextFailed {
            page: page_num,
            detail,
        })
    }

    async fn render_page(&self, page_num: usize, scale: f32) -> Result<DynamicImage, PageError> {
        let image = self
            .with_page(page_num, move |page| {
                let render_config = PdfRenderConfig::new().scale_page_by_factor(scale);
                page.render_with_config(&render_config)
                    .map(|bitmap| bitmap.as_image())
                    .map_err(|e| format!("{:?}", e))
            })
            .await
            .map_err(|detail| PageError::RenderFailed {
                page: page_num,
                detail,
            })?;

        debug!(
            "Rendered page {} → {}x{} px",
            page_num,
            image.width(),
            image.height()
        );
        Ok(image)
    }
}

/// Open the buffer, classifying password failures separately from corruption.
fn load<'a>(
    pdfium: &'a Pdfium,
    name: &str,
    bytes: &'a [u8],
    password: Option<&str>,
) -> Result<PdfDocument<'a>, Pdf2QuizError> {
    pdfium.load_pdf_from_byte_slice(bytes, password).map_err(|e| {
        let err_str = format!("{:?}", e);
        if err_str.contains("Password") || err_str.contains("password") {
            if password.is_some() {
                Pdf2QuizError::WrongPassword {
                    source_name: name.to_string(),
                }
            } else {
                Pdf2QuizError::PasswordRequired {
                    source_name: name.to_string(),
                }
            }
        } else {
            Pdf2QuizError::CorruptPdf {
                source_name: name.to_string(),
                detail: err_str,
            }
        }
    })
}

fn read_metadata(document: &PdfDocument) -> DocumentMetadata {
    let metadata = document.metadata();

    let get_meta = |tag: PdfDocumentMetadataTagType| -> Option<String> {
        metadata.get(tag).and_then(|t| {
            let v = t.value().trim().to_string();
            if v.is_empty() {
                None
            } else {
                Some(v)
            }
        })
    };

    DocumentMetadata {
        title: get_meta(PdfDocumentMetadataTagType::Title),
        author: get_meta(PdfDocumentMetadataTagType::Author),
        subject: get_meta(PdfDocumentMetadataTagType::Subject),
        creator: get_meta(PdfDocumentMetadataTagType::Creator),
        producer: get_meta(PdfDocumentMetadataTagType::Producer),
        page_count: document.pages().len() as usize,
        pdf_version: format!("{:?}", document.version()),
    }
}
