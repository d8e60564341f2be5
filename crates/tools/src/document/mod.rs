//! Text extraction from uploaded documents (PDF, DOCX, plain text).

mod docx;
mod pdf;
mod txt;

use std::path::Path;

use thiserror::Error;

use crate::tool::ToolError;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Unsupported file type: '{0}' (expected pdf, docx or txt)")]
    UnsupportedType(String),
    #[error("PDF extraction failed: {0}")]
    PdfError(String),
    #[error("DOCX extraction failed: {0}")]
    DocxError(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ExtractionError> for ToolError {
    fn from(e: ExtractionError) -> Self {
        ToolError::ResourceAccess(e.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct PageContent {
    /// 1-based. DOCX and plain text always yield a single page.
    pub page_number: usize,
    pub text: String,
}

/// Text pulled out of one contract or regulation file.
#[derive(Debug, Clone)]
pub struct ExtractedDocument {
    pub filename: String,
    /// Lowercased extension: `pdf`, `docx`, `txt` or `text`.
    pub file_type: String,
    pub pages: Vec<PageContent>,
}

impl ExtractedDocument {
    /// Non-empty pages joined with newlines.
    pub fn full_text(&self) -> String {
        self.pages
            .iter()
            .map(|p| p.text.as_str())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// True when no page produced any non-whitespace text.
    pub fn is_blank(&self) -> bool {
        self.pages.iter().all(|p| p.text.trim().is_empty())
    }
}

/// Lowercased extension of `filename`, or an empty string.
pub fn file_extension(filename: &str) -> String {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

/// Whether `filename` has an extension this module can extract.
pub fn is_supported(filename: &str) -> bool {
    matches!(file_extension(filename).as_str(), "pdf" | "docx" | "txt" | "text")
}

/// Dispatch on the extension of `filename`.
pub fn extract_text(bytes: &[u8], filename: &str) -> Result<ExtractedDocument, ExtractionError> {
    let file_type = file_extension(filename);

    let pages = match file_type.as_str() {
        "pdf" => pdf::extract_pdf(bytes)?,
        "docx" => docx::extract_docx(bytes)?,
        "txt" | "text" => txt::extract_txt(bytes),
        other => return Err(ExtractionError::UnsupportedType(other.to_string())),
    };

    Ok(ExtractedDocument {
        filename: filename.to_string(),
        file_type,
        pages,
    })
}

/// Read a file from disk and extract its text.
///
/// The extension is checked before touching the filesystem so an unsupported
/// file is reported as such even when it does not exist.
pub async fn read_document(path: &Path) -> Result<ExtractedDocument, ExtractionError> {
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string();
    if !is_supported(&filename) {
        return Err(ExtractionError::UnsupportedType(file_extension(&filename)));
    }
    let bytes = tokio::fs::read(path).await?;
    extract_text(&bytes, &filename)
}
