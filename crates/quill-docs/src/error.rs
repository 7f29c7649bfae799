//! Error types for the document store.

use uuid::Uuid;

use quill_core::error::QuillError;

/// Errors from document storage, extraction, and lookup.
#[derive(Debug, thiserror::Error)]
pub enum DocError {
    #[error("document not found: {0}")]
    NotFound(Uuid),
    #[error("document not parsed yet: {0}")]
    NotParsed(Uuid),
    #[error("invalid document: {0}")]
    Invalid(String),
    #[error("document too large: {size} bytes exceeds {limit} bytes")]
    TooLarge { size: usize, limit: usize },
    #[error("text extraction failed: {0}")]
    Extraction(String),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<QuillError> for DocError {
    fn from(err: QuillError) -> Self {
        DocError::Storage(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_doc_error_display() {
        let id = Uuid::nil();
        assert_eq!(
            DocError::NotFound(id).to_string(),
            "document not found: 00000000-0000-0000-0000-000000000000"
        );
        assert_eq!(
            DocError::NotParsed(id).to_string(),
            "document not parsed yet: 00000000-0000-0000-0000-000000000000"
        );
        assert_eq!(
            DocError::TooLarge { size: 11, limit: 10 }.to_string(),
            "document too large: 11 bytes exceeds 10 bytes"
        );
    }

    #[test]
    fn test_doc_error_from_quill_error() {
        let err: DocError = QuillError::Storage("disk full".to_string()).into();
        assert!(matches!(err, DocError::Storage(_)));
        assert!(err.to_string().contains("disk full"));
    }
}
