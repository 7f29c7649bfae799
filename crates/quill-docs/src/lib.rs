//! Quill document store - PDF blobs, metadata, and extracted text.
//!
//! The chat core consumes two operations (`verify_ownership`,
//! `parsed_text`); upload, listing, and parsing are driven by the API
//! layer. Blobs live on disk under the data directory; metadata and
//! extracted text live in SQLite.

pub mod error;
pub mod extract;
pub mod store;

pub use error::DocError;
pub use store::DocumentStore;
