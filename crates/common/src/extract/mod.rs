//! Text extraction for uploaded documents
//!
//! Routes a file to the right extractor by type: PDFs go through the lopdf
//! content-stream parser, images go through the OCR inference backend.
//! URL ingestion (download + content sniffing) lives in [`url`].

mod pdf;
pub mod url;

pub use pdf::extract_text_from_pdf;

use crate::inference::OcrBackend;
use thiserror::Error;

/// Extraction failure modes
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Unsupported file type: '{extension}'. Supported: .pdf, .png, .jpg, .jpeg")]
    UnsupportedFileType { extension: String },

    #[error("PDF parse error: {message}")]
    PdfParse { message: String },

    #[error("OCR failed: {message}")]
    Ocr { message: String },

    #[error("Download failed for {url}: {message}")]
    Download { url: String, message: String },

    #[error("File too large: {size} bytes exceeds limit of {limit} bytes")]
    TooLarge { size: usize, limit: usize },

    #[error("Invalid URL scheme: '{scheme}'. Use http or https.")]
    InvalidScheme { scheme: String },

    #[error("Unsupported content from {url}. URL or Content-Type must indicate PDF or image, got: {content_type}")]
    UnsupportedContent { url: String, content_type: String },
}

/// Supported document kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Pdf,
    Image,
}

impl FileKind {
    /// Resolve a kind from a lowercase file extension (with or without dot)
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.trim_start_matches('.').to_lowercase().as_str() {
            "pdf" => Some(FileKind::Pdf),
            "png" | "jpg" | "jpeg" => Some(FileKind::Image),
            _ => None,
        }
    }

    /// Resolve a kind from a file name
    pub fn from_filename(filename: &str) -> Option<Self> {
        let extension = filename.rsplit_once('.').map(|(_, ext)| ext)?;
        Self::from_extension(extension)
    }
}

/// Extract text from a document of the given kind.
///
/// PDF extraction is local; images are sent to the OCR backend.
pub async fn extract_text(
    kind: FileKind,
    bytes: &[u8],
    ocr: &dyn OcrBackend,
) -> Result<String, ExtractError> {
    match kind {
        FileKind::Pdf => extract_text_from_pdf(bytes),
        FileKind::Image => ocr
            .image_to_text(bytes)
            .await
            .map_err(|e| ExtractError::Ocr {
                message: e.to_string(),
            }),
    }
}
