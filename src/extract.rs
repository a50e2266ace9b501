//! Text extraction from uploaded files.

use anyhow::Result;
use tracing::{debug, error};

/// Largest slice of document text sent to the model.
pub const MAX_CONTEXT_BYTES: usize = 150_000;

/// Extract text from an upload. PDFs go through `lopdf`; anything else is read as UTF-8.
///
/// An unreadable PDF yields an empty string, which callers report per file.
pub fn extract_text(filename: &str, data: &[u8]) -> String {
    if filename.to_lowercase().ends_with(".pdf") {
        extract_pdf_text(data).unwrap_or_else(|e| {
            error!("PDF extraction failed for {}: {}", filename, e);
            String::new()
        })
    } else {
        String::from_utf8_lossy(data).to_string()
    }
}

/// Extract text from a PDF file using lopdf.
fn extract_pdf_text(data: &[u8]) -> Result<String> {
    use lopdf::Document;
    use std::io::Cursor;

    let doc = Document::load_from(Cursor::new(data))
        .map_err(|e| anyhow::anyhow!("Failed to load PDF: {}", e))?;

    let mut text = String::new();
    let pages = doc.get_pages();
    debug!("PDF has {} pages", pages.len());

    for (page_num, _) in pages {
        if let Ok(content) = doc.extract_text(&[page_num]) {
            text.push_str(&content);
            text.push('\n');
        }
    }

    Ok(text)
}

/// Cut `text` to at most `max_bytes`, backing off to a char boundary.
pub fn truncate_for_context(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        text
    } else {
        let mut end = max_bytes;
        while !text.is_char_boundary(end) && end > 0 {
            end -= 1;
        }
        &text[..end]
    }
}
