//! Error types for the conversational core.

use uuid::Uuid;

use quill_core::error::QuillError;
use quill_docs::DocError;

/// Errors from the chat engine.
///
/// Precondition failures (`NoDocumentSelected`, `NotParsed`, message
/// validation) are client errors and never mutate state; `Generation`
/// covers any provider failure and is never retried here.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("no document selected")]
    NoDocumentSelected,
    #[error("document not found: {0}")]
    DocumentNotFound(Uuid),
    #[error("document not parsed yet: {0}")]
    NotParsed(Uuid),
    #[error("message cannot be empty")]
    EmptyMessage,
    #[error("message exceeds maximum length of {0} characters")]
    MessageTooLong(usize),
    #[error("invalid chunking configuration: chunk_size={chunk_size}, overlap={overlap}")]
    InvalidChunking { chunk_size: usize, overlap: usize },
    #[error("generation failed: {0}")]
    Generation(String),
    #[error("storage error: {0}")]
    Storage(String),
}

impl From<QuillError> for ChatError {
    fn from(err: QuillError) -> Self {
        ChatError::Storage(err.to_string())
    }
}

impl From<DocError> for ChatError {
    fn from(err: DocError) -> Self {
        match err {
            DocError::NotFound(id) => ChatError::DocumentNotFound(id),
            DocError::NotParsed(id) => ChatError::NotParsed(id),
            other => ChatError::Storage(other.to_string()),
        }
    }
}
