use thiserror::Error;

/// Top-level error type for the Quill system.
///
/// Each variant wraps a subsystem-specific error. Subsystem crates define
/// their own error types and implement `From` conversions so that the `?`
/// operator works seamlessly across crate boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuillError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Document error: {0}")]
    Document(String),

    #[error("Auth error: {0}")]
    Auth(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for QuillError {
    fn from(err: toml::de::Error) -> Self {
        QuillError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for QuillError {
    fn from(err: toml::ser::Error) -> Self {
        QuillError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for QuillError {
    fn from(err: serde_json::Error) -> Self {
        QuillError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Quill operations.
pub type Result<T> = std::result::Result<T, QuillError>;
