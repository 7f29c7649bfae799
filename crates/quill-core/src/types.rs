use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// Enums
// =============================================================================

/// Who produced a chat message. Both roles are attributed to the owning
/// user; the role records which side of the exchange spoke.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Storage representation, matching the `role` CHECK constraint.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Entities
// =============================================================================

/// A registered account.
///
/// `selected_document_id` points at the document currently active for chat;
/// it is a reference into the document store, not an owned child. `None`
/// means chat is disallowed until a document is selected.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub selected_document_id: Option<Uuid>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// One conversation thread between a user and a specific document.
///
/// For a given (user, document) pair the most recently created session is
/// the single active bucket; the storage layer enforces uniqueness of the
/// pair so at most one exists.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: Uuid,
    pub user_id: Uuid,
    pub document_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// One utterance in a session. Immutable once written.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub session_id: Uuid,
    pub user_id: Uuid,
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Metadata for a stored document. The binary blob lives on disk under the
/// data directory; extracted text is cached separately once parsed.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub id: Uuid,
    pub user_id: Uuid,
    pub filename: String,
    pub size_bytes: u64,
    pub is_parsed: bool,
    pub created_at: DateTime<Utc>,
}
