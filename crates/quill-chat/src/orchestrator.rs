//! Conversation orchestrator: the core of the document-chat flow.
//!
//! Ties together the selected document, its extracted text, the context
//! chunker, and the generation provider, then commits both sides of the
//! exchange in order.

use std::sync::Arc;

use tracing::debug;

use quill_core::config::ChatSettings;
use quill_core::types::{ChatMessage, User};
use quill_docs::DocumentStore;
use quill_storage::{Database, MessageRepository};

use crate::binder::SessionBinder;
use crate::chunker;
use crate::error::ChatError;
use crate::provider::GenerationProvider;

/// A user's full chat history across all buckets, in bucket-creation then
/// message-creation order.
#[derive(Debug, Clone)]
pub struct ChatHistory {
    pub messages: Vec<ChatMessage>,
    pub total: usize,
}

/// Central coordinator for chat turns and history reads.
pub struct ChatOrchestrator {
    binder: SessionBinder,
    messages: MessageRepository,
    docs: Arc<DocumentStore>,
    provider: Arc<dyn GenerationProvider>,
    settings: ChatSettings,
}

impl ChatOrchestrator {
    pub fn new(
        db: Arc<Database>,
        docs: Arc<DocumentStore>,
        provider: Arc<dyn GenerationProvider>,
        settings: ChatSettings,
    ) -> Self {
        Self {
            binder: SessionBinder::new(Arc::clone(&db)),
            messages: MessageRepository::new(db),
            docs,
            provider,
            settings,
        }
    }

    /// Run one chat turn for the user's selected document.
    ///
    /// Preconditions are checked in order, each with its own failure:
    /// a document must be selected and parsed, and the message must be
    /// non-empty and within bounds. The generation call is the only remote
    /// step; nothing is persisted unless it succeeds, and then the
    /// user/assistant pair is committed in a single transaction.
    pub async fn chat(&self, user: &User, message: &str) -> Result<ChatMessage, ChatError> {
        let document_id = user
            .selected_document_id
            .ok_or(ChatError::NoDocumentSelected)?;

        if message.is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        if message.chars().count() > self.settings.max_message_chars {
            return Err(ChatError::MessageTooLong(self.settings.max_message_chars));
        }

        let session = self.binder.resolve_or_create(user.id, Some(document_id))?;
        let text = self.docs.parsed_text(document_id, user.id)?;
        let chunks = chunker::chunk_text(&text, self.settings.chunk_size, self.settings.overlap)?;

        debug!(
            session_id = %session.id,
            document_id = %document_id,
            chunks = chunks.len(),
            "Dispatching generation request"
        );

        let answer = self.provider.generate(&chunks, message).await?;

        let (_user_msg, assistant_msg) =
            self.messages
                .append_exchange(session.id, user.id, message, &answer)?;

        Ok(assistant_msg)
    }

    /// All of the user's messages across every bucket, oldest bucket first,
    /// oldest message first within each, with the total count.
    pub fn history(&self, user: &User) -> Result<ChatHistory, ChatError> {
        let messages = self.messages.history_for_user(user.id)?;
        let total = messages.len();
        Ok(ChatHistory { messages, total })
    }
}
