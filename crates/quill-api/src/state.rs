//! Application state shared across all route handlers.
//!
//! AppState holds references to all services and shared resources.
//! It is passed to handlers via axum's State extractor.

use std::sync::Arc;
use std::time::Instant;

use quill_chat::ChatOrchestrator;
use quill_core::config::QuillConfig;
use quill_docs::DocumentStore;
use quill_storage::Database;

/// Shared application state.
///
/// All fields use `Arc` for cheap cloning across handler tasks.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<QuillConfig>,
    /// SQLite database for persistent storage.
    pub database: Arc<Database>,
    /// Document store (blobs, metadata, extracted text).
    pub documents: Arc<DocumentStore>,
    /// Conversation orchestrator.
    pub orchestrator: Arc<ChatOrchestrator>,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    /// Create a new AppState with the given components.
    pub fn new(
        config: QuillConfig,
        database: Arc<Database>,
        documents: Arc<DocumentStore>,
        orchestrator: Arc<ChatOrchestrator>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            database,
            documents,
            orchestrator,
            start_time: Instant::now(),
        }
    }
}
