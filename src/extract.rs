//! Best-effort metadata extraction from uploaded practice documents.
//!
//! Only the page count is read from the file. The descriptive fields are
//! placeholders until a content extractor exists.

use std::fmt;
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::models::DescriptiveFields;

pub const PENDING_PLACEHOLDER: &str = "To be extracted by LLM";
pub const PENDING_SUMMARY_PLACEHOLDER: &str = "To be generated by LLM";
pub const FAILED_PLACEHOLDER: &str = "Automatic extraction failed";

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionResult {
    pub num_pages: i64,
    pub fields: DescriptiveFields,
}

impl ExtractionResult {
    pub fn pending(num_pages: i64) -> Self {
        let mut fields = DescriptiveFields::uniform(PENDING_PLACEHOLDER);
        fields.summary = PENDING_SUMMARY_PLACEHOLDER.to_string();
        Self { num_pages, fields }
    }

    /// What a submission records when extraction did not succeed.
    pub fn failed() -> Self {
        Self {
            num_pages: 0,
            fields: DescriptiveFields::uniform(FAILED_PLACEHOLDER),
        }
    }
}

#[derive(Debug)]
pub enum ExtractionError {
    Unreadable(String),
    UnsupportedFormat(String),
    Malformed(String),
}

impl fmt::Display for ExtractionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractionError::Unreadable(msg) => write!(f, "unreadable document: {}", msg),
            ExtractionError::UnsupportedFormat(msg) => write!(f, "unsupported format: {}", msg),
            ExtractionError::Malformed(msg) => write!(f, "malformed document: {}", msg),
        }
    }
}

impl std::error::Error for ExtractionError {}

pub trait DocumentExtractor {
    fn extract(&self, path: &Path) -> Result<ExtractionResult, ExtractionError>;
}

/// Reads the page count of PDF documents with `lopdf`.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfExtractor;

impl DocumentExtractor for PdfExtractor {
    fn extract(&self, path: &Path) -> Result<ExtractionResult, ExtractionError> {
        let bytes = fs::read(path).map_err(|e| {
            ExtractionError::Unreadable(format!("{}: {}", path.to_string_lossy(), e))
        })?;
        if !is_pdf(&bytes) {
            return Err(ExtractionError::UnsupportedFormat(
                path.to_string_lossy().to_string(),
            ));
        }

        let doc = lopdf::Document::load_mem(&bytes)
            .map_err(|e| ExtractionError::Malformed(e.to_string()))?;
        let num_pages = doc.get_pages().len() as i64;
        debug!("{:?} has {} pages", path, num_pages);
        Ok(ExtractionResult::pending(num_pages))
    }
}

fn is_pdf(bytes: &[u8]) -> bool {
    bytes.starts_with(b"%PDF-")
}
