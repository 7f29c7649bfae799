//! PDF text extraction.
//!
//! Connector-agnostic: callers supply bytes, this module returns plain
//! UTF-8 text or a typed error. Extraction never panics on malformed input.

use crate::error::DocError;

/// Leading bytes every PDF starts with.
const PDF_MAGIC: &[u8] = b"%PDF";

/// Returns true if the bytes look like a PDF document.
pub fn is_pdf(bytes: &[u8]) -> bool {
    bytes.starts_with(PDF_MAGIC)
}

/// Extract plain text from an in-memory PDF.
pub fn extract_pdf_text(bytes: &[u8]) -> Result<String, DocError> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| DocError::Extraction(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_pdf_magic() {
        assert!(is_pdf(b"%PDF-1.7 rest of file"));
        assert!(!is_pdf(b"PK\x03\x04 zip header"));
        assert!(!is_pdf(b""));
        assert!(!is_pdf(b"%PD"));
    }

    #[test]
    fn test_extract_rejects_garbage() {
        let result = extract_pdf_text(b"definitely not a pdf");
        assert!(matches!(result, Err(DocError::Extraction(_))));
    }
}
