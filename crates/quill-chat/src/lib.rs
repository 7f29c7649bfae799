//! Conversational core for Quill.
//!
//! Binds a user's selected document to a conversation bucket, prepares
//! bounded context windows from the extracted text, invokes the generation
//! provider, and persists both sides of each exchange in order.

pub mod binder;
pub mod chunker;
pub mod error;
pub mod orchestrator;
pub mod provider;

pub use binder::SessionBinder;
pub use chunker::chunk_text;
pub use error::ChatError;
pub use orchestrator::{ChatHistory, ChatOrchestrator};
pub use provider::{GeminiConfig, GeminiProvider, GenerationProvider, MockProvider};
