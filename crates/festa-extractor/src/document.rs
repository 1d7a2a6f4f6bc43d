//! Document text extraction

use crate::ExtractionError;

/// Reads the text layer of a document
pub trait DocumentReader: Send + Sync {
    /// Extract all text from the document bytes
    fn read_text(&self, bytes: &[u8]) -> Result<String, ExtractionError>;
}

/// PDF reader backed by `lopdf`
#[derive(Debug, Default, Clone, Copy)]
pub struct LopdfReader;

impl DocumentReader for LopdfReader {
    fn read_text(&self, bytes: &[u8]) -> Result<String, ExtractionError> {
        let doc = lopdf::Document::load_mem(bytes)
            .map_err(|e| ExtractionError::Document(format!("Failed to load PDF: {}", e)))?;

        let mut text = String::new();
        for (page_num, _) in doc.get_pages() {
            match doc.extract_text(&[page_num]) {
                Ok(page_text) => {
                    text.push_str(&page_text);
                    text.push_str("\n\n");
                }
                Err(e) => tracing::debug!("No text on page {}: {}", page_num, e),
            }
        }
        Ok(text.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_garbage_is_document_error() {
        let result = LopdfReader.read_text(b"definitely not a pdf");
        assert!(matches!(result, Err(ExtractionError::Document(_))));
    }
}
