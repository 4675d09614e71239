// PDF text capability - F29 compacto exports sometimes arrive only as PDF
//
// Extraction is injected so callers without PDF support (or tests) can swap
// in `NoPdfText`.

use anyhow::{anyhow, Context};
use std::path::Path;
use tracing::info;

use crate::error::Result;

/// Extract the plain text of a PDF document
pub trait PdfTextExtractor {
    fn extract_text(&self, path: &Path) -> Result<String>;
}

/// Extraction backed by the `pdf-extract` crate
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfExtractText;

impl PdfTextExtractor for PdfExtractText {
    fn extract_text(&self, path: &Path) -> Result<String> {
        info!("Extracting PDF text: {:?}", path);
        pdf_extract::extract_text(path).context("Failed to extract text from PDF")
    }
}

/// Extraction that is never available
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPdfText;

impl PdfTextExtractor for NoPdfText {
    fn extract_text(&self, path: &Path) -> Result<String> {
        Err(anyhow!("PDF text extraction unavailable for {:?}", path))
    }
}
