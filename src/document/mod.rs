// Document loading
// Turns uploaded PDF bytes into page-level text units


use std::path::Path;

use lopdf::Document;
use tracing::{debug, info, warn};

use crate::{AppError, Result};

/// Text of a single PDF page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// Zero-based page index within the document
    pub index: usize,
    pub text: String,
}

/// Load a PDF from disk and extract the text of every page
#[inline]
pub fn load_pdf(path: &Path) -> Result<Vec<Page>> {
    debug!("Loading PDF from {}", path.display());

    let bytes = std::fs::read(path)?;
    load_pdf_bytes(&bytes)
}

/// Parse PDF bytes in memory, producing one `Page` per PDF page in page order
#[inline]
pub fn load_pdf_bytes(bytes: &[u8]) -> Result<Vec<Page>> {
    let document = Document::load_mem(bytes)
        .map_err(|e| AppError::Document(format!("Failed to parse PDF: {}", e)))?;

    let page_numbers: Vec<u32> = document.get_pages().keys().copied().collect();
    let mut pages = Vec::with_capacity(page_numbers.len());

    for (index, page_number) in page_numbers.iter().enumerate() {
        let text = match document.extract_text(&[*page_number]) {
            Ok(text) => text,
            Err(e) => {
                warn!("Could not extract text from page {}: {}", page_number, e);
                String::new()
            }
        };
        pages.push(Page { index, text });
    }

    info!(
        "Loaded PDF with {} pages ({} characters of text)",
        pages.len(),
        pages.iter().map(|p| p.text.chars().count()).sum::<usize>()
    );

    Ok(pages)
}

/// Whether a file name looks like a PDF. Used only for upload filtering.
#[inline]
pub fn is_pdf_file_name(file_name: &str) -> bool {
    Path::new(file_name)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}
