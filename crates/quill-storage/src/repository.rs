//! Repository implementations for SQLite-backed persistence.
//!
//! Provides UserRepository, SessionRepository, and MessageRepository
//! that operate on the Database struct using raw SQL.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use rusqlite::OptionalExtension;
use uuid::Uuid;

use quill_core::error::QuillError;
use quill_core::types::{ChatMessage, ChatSession, Role, User};

use crate::db::Database;

/// Repository for user accounts.
pub struct UserRepository {
    db: Arc<Database>,
}

impl UserRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Create a new user with the given email and password hash.
    pub fn create(&self, email: &str, password_hash: &str) -> Result<User, QuillError> {
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            selected_document_id: None,
            is_active: true,
            created_at: epoch_to_datetime(Utc::now().timestamp()),
        };

        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, email, password_hash, is_active, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![
                    user.id.to_string(),
                    user.email,
                    user.password_hash,
                    user.is_active as i32,
                    user.created_at.timestamp(),
                ],
            )
            .map_err(|e| QuillError::Storage(format!("Failed to create user: {}", e)))?;
            Ok(())
        })?;

        Ok(user)
    }

    /// Find a user by email address.
    pub fn find_by_email(&self, email: &str) -> Result<Option<User>, QuillError> {
        self.db.with_conn(|conn| {
            let result = conn
                .query_row(
                    "SELECT id, email, password_hash, selected_document_id, is_active, created_at
                     FROM users WHERE email = ?1",
                    rusqlite::params![email],
                    |row| Ok(row_to_user(row)),
                )
                .optional()
                .map_err(|e| QuillError::Storage(e.to_string()))?;

            match result {
                Some(user) => Ok(Some(user?)),
                None => Ok(None),
            }
        })
    }

    /// Find a user by ID.
    pub fn find_by_id(&self, id: Uuid) -> Result<Option<User>, QuillError> {
        self.db.with_conn(|conn| {
            let result = conn
                .query_row(
                    "SELECT id, email, password_hash, selected_document_id, is_active, created_at
                     FROM users WHERE id = ?1",
                    rusqlite::params![id.to_string()],
                    |row| Ok(row_to_user(row)),
                )
                .optional()
                .map_err(|e| QuillError::Storage(e.to_string()))?;

            match result {
                Some(user) => Ok(Some(user?)),
                None => Ok(None),
            }
        })
    }

    /// Point the user's active chat context at a document (or clear it).
    pub fn set_selected_document(
        &self,
        user_id: Uuid,
        document_id: Option<Uuid>,
    ) -> Result<(), QuillError> {
        self.db.with_conn(|conn| {
            let changed = conn
                .execute(
                    "UPDATE users SET selected_document_id = ?1 WHERE id = ?2",
                    rusqlite::params![
                        document_id.map(|d| d.to_string()),
                        user_id.to_string()
                    ],
                )
                .map_err(|e| QuillError::Storage(e.to_string()))?;
            if changed == 0 {
                return Err(QuillError::Storage(format!("No such user: {}", user_id)));
            }
            Ok(())
        })
    }

    /// Delete a user. Sessions, messages, documents, and cached texts are
    /// removed by cascade.
    pub fn delete(&self, user_id: Uuid) -> Result<(), QuillError> {
        self.db.with_conn(|conn| {
            conn.execute(
                "DELETE FROM users WHERE id = ?1",
                rusqlite::params![user_id.to_string()],
            )
            .map_err(|e| QuillError::Storage(format!("Failed to delete user: {}", e)))?;
            Ok(())
        })
    }
}

/// Repository for conversation buckets.
pub struct SessionRepository {
    db: Arc<Database>,
}

impl SessionRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Most recent session for the exact (user, document) pair, if any.
    pub fn latest_for(
        &self,
        user_id: Uuid,
        document_id: Option<Uuid>,
    ) -> Result<Option<ChatSession>, QuillError> {
        self.db.with_conn(|conn| {
            let result = conn
                .query_row(
                    "SELECT id, user_id, document_id, created_at
                     FROM chat_sessions
                     WHERE user_id = ?1 AND document_id IS ?2
                     ORDER BY created_at DESC, rowid DESC
                     LIMIT 1",
                    rusqlite::params![
                        user_id.to_string(),
                        document_id.map(|d| d.to_string())
                    ],
                    |row| Ok(row_to_session(row)),
                )
                .optional()
                .map_err(|e| QuillError::Storage(e.to_string()))?;

            match result {
                Some(session) => Ok(Some(session?)),
                None => Ok(None),
            }
        })
    }

    /// Return the active session for the pair, creating one if none exists.
    ///
    /// The insert uses OR IGNORE against the unique (user_id, document_id)
    /// index, then re-selects, so concurrent first messages converge on a
    /// single bucket instead of racing into duplicates.
    pub fn find_or_create(
        &self,
        user_id: Uuid,
        document_id: Option<Uuid>,
    ) -> Result<ChatSession, QuillError> {
        if let Some(session) = self.latest_for(user_id, document_id)? {
            return Ok(session);
        }

        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO chat_sessions (id, user_id, document_id, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![
                    Uuid::new_v4().to_string(),
                    user_id.to_string(),
                    document_id.map(|d| d.to_string()),
                    Utc::now().timestamp(),
                ],
            )
            .map_err(|e| QuillError::Storage(format!("Failed to create session: {}", e)))?;
            Ok(())
        })?;

        self.latest_for(user_id, document_id)?.ok_or_else(|| {
            QuillError::Storage(format!(
                "Session vanished after insert for user {}",
                user_id
            ))
        })
    }

    /// All sessions for a user, oldest first.
    pub fn list_for_user(&self, user_id: Uuid) -> Result<Vec<ChatSession>, QuillError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, user_id, document_id, created_at
                     FROM chat_sessions
                     WHERE user_id = ?1
                     ORDER BY created_at ASC, rowid ASC",
                )
                .map_err(|e| QuillError::Storage(e.to_string()))?;

            let rows = stmt
                .query_map(rusqlite::params![user_id.to_string()], |row| {
                    Ok(row_to_session(row))
                })
                .map_err(|e| QuillError::Storage(e.to_string()))?;

            let mut sessions = Vec::new();
            for row in rows {
                let session = row.map_err(|e| QuillError::Storage(e.to_string()))??;
                sessions.push(session);
            }
            Ok(sessions)
        })
    }
}

/// Repository for chat messages.
pub struct MessageRepository {
    db: Arc<Database>,
}

impl MessageRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Persist one complete chat turn: the user message followed by the
    /// assistant message, in a single transaction.
    ///
    /// Either both rows land or neither does; a half-written turn is never
    /// visible to readers.
    pub fn append_exchange(
        &self,
        session_id: Uuid,
        user_id: Uuid,
        user_text: &str,
        assistant_text: &str,
    ) -> Result<(ChatMessage, ChatMessage), QuillError> {
        let now = epoch_to_datetime(Utc::now().timestamp());
        let user_msg = ChatMessage {
            id: Uuid::new_v4(),
            session_id,
            user_id,
            role: Role::User,
            content: user_text.to_string(),
            created_at: now,
        };
        let assistant_msg = ChatMessage {
            id: Uuid::new_v4(),
            session_id,
            user_id,
            role: Role::Assistant,
            content: assistant_text.to_string(),
            created_at: now,
        };

        self.db.with_tx(|tx| {
            for msg in [&user_msg, &assistant_msg] {
                tx.execute(
                    "INSERT INTO chat_messages (id, session_id, user_id, role, content, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    rusqlite::params![
                        msg.id.to_string(),
                        msg.session_id.to_string(),
                        msg.user_id.to_string(),
                        msg.role.as_str(),
                        msg.content,
                        msg.created_at.timestamp(),
                    ],
                )
                .map_err(|e| QuillError::Storage(format!("Failed to append message: {}", e)))?;
            }
            Ok(())
        })?;

        Ok((user_msg, assistant_msg))
    }

    /// Messages within one session, oldest first.
    pub fn list_for_session(&self, session_id: Uuid) -> Result<Vec<ChatMessage>, QuillError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, session_id, user_id, role, content, created_at
                     FROM chat_messages
                     WHERE session_id = ?1
                     ORDER BY created_at ASC, rowid ASC",
                )
                .map_err(|e| QuillError::Storage(e.to_string()))?;

            let rows = stmt
                .query_map(rusqlite::params![session_id.to_string()], |row| {
                    Ok(row_to_message(row))
                })
                .map_err(|e| QuillError::Storage(e.to_string()))?;

            let mut messages = Vec::new();
            for row in rows {
                let message = row.map_err(|e| QuillError::Storage(e.to_string()))??;
                messages.push(message);
            }
            Ok(messages)
        })
    }

    /// Full history for a user across all sessions: buckets ordered by
    /// creation time ascending, messages within each bucket ascending.
    pub fn history_for_user(&self, user_id: Uuid) -> Result<Vec<ChatMessage>, QuillError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT m.id, m.session_id, m.user_id, m.role, m.content, m.created_at
                     FROM chat_messages m
                     JOIN chat_sessions s ON s.id = m.session_id
                     WHERE s.user_id = ?1
                     ORDER BY s.created_at ASC, s.rowid ASC, m.created_at ASC, m.rowid ASC",
                )
                .map_err(|e| QuillError::Storage(e.to_string()))?;

            let rows = stmt
                .query_map(rusqlite::params![user_id.to_string()], |row| {
                    Ok(row_to_message(row))
                })
                .map_err(|e| QuillError::Storage(e.to_string()))?;

            let mut messages = Vec::new();
            for row in rows {
                let message = row.map_err(|e| QuillError::Storage(e.to_string()))??;
                messages.push(message);
            }
            Ok(messages)
        })
    }
}

// ============================================================================
// Helper functions for row-to-entity conversion.
// ============================================================================

fn epoch_to_datetime(epoch: i64) -> chrono::DateTime<Utc> {
    Utc.timestamp_opt(epoch, 0).single().unwrap_or_default()
}

fn parse_uuid(s: &str) -> Result<Uuid, QuillError> {
    Uuid::parse_str(s).map_err(|e| QuillError::Storage(format!("Invalid UUID: {}", e)))
}

fn row_to_user(row: &rusqlite::Row<'_>) -> Result<User, QuillError> {
    let id: String = row.get(0).map_err(|e| QuillError::Storage(e.to_string()))?;
    let email: String = row.get(1).map_err(|e| QuillError::Storage(e.to_string()))?;
    let password_hash: String = row.get(2).map_err(|e| QuillError::Storage(e.to_string()))?;
    let selected: Option<String> = row.get(3).map_err(|e| QuillError::Storage(e.to_string()))?;
    let is_active: i32 = row.get(4).map_err(|e| QuillError::Storage(e.to_string()))?;
    let created_at: i64 = row.get(5).map_err(|e| QuillError::Storage(e.to_string()))?;

    Ok(User {
        id: parse_uuid(&id)?,
        email,
        password_hash,
        selected_document_id: match selected {
            Some(s) => Some(parse_uuid(&s)?),
            None => None,
        },
        is_active: is_active != 0,
        created_at: epoch_to_datetime(created_at),
    })
}

fn row_to_session(row: &rusqlite::Row<'_>) -> Result<ChatSession, QuillError> {
    let id: String = row.get(0).map_err(|e| QuillError::Storage(e.to_string()))?;
    let user_id: String = row.get(1).map_err(|e| QuillError::Storage(e.to_string()))?;
    let document_id: Option<String> =
        row.get(2).map_err(|e| QuillError::Storage(e.to_string()))?;
    let created_at: i64 = row.get(3).map_err(|e| QuillError::Storage(e.to_string()))?;

    Ok(ChatSession {
        id: parse_uuid(&id)?,
        user_id: parse_uuid(&user_id)?,
        document_id: match document_id {
            Some(s) => Some(parse_uuid(&s)?),
            None => None,
        },
        created_at: epoch_to_datetime(created_at),
    })
}

fn row_to_message(row: &rusqlite::Row<'_>) -> Result<ChatMessage, QuillError> {
    let id: String = row.get(0).map_err(|e| QuillError::Storage(e.to_string()))?;
    let session_id: String = row.get(1).map_err(|e| QuillError::Storage(e.to_string()))?;
    let user_id: String = row.get(2).map_err(|e| QuillError::Storage(e.to_string()))?;
    let role: String = row.get(3).map_err(|e| QuillError::Storage(e.to_string()))?;
    let content: String = row.get(4).map_err(|e| QuillError::Storage(e.to_string()))?;
    let created_at: i64 = row.get(5).map_err(|e| QuillError::Storage(e.to_string()))?;

    Ok(ChatMessage {
        id: parse_uuid(&id)?,
        session_id: parse_uuid(&session_id)?,
        user_id: parse_uuid(&user_id)?,
        role: role
            .parse()
            .map_err(|e: String| QuillError::Storage(e))?,
        content,
        created_at: epoch_to_datetime(created_at),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_db() -> Arc<Database> {
        Arc::new(Database::in_memory().unwrap())
    }

    fn make_user(db: &Arc<Database>) -> User {
        UserRepository::new(Arc::clone(db))
            .create("test@example.com", "hashed")
            .unwrap()
    }

    // ========================================================================
    // UserRepository tests
    // ========================================================================

    #[test]
    fn test_user_create_and_find() {
        let db = make_db();
        let repo = UserRepository::new(Arc::clone(&db));

        let user = repo.create("a@example.com", "hash1").unwrap();

        let by_id = repo.find_by_id(user.id).unwrap().unwrap();
        assert_eq!(by_id.email, "a@example.com");
        assert_eq!(by_id.password_hash, "hash1");
        assert!(by_id.is_active);
        assert!(by_id.selected_document_id.is_none());

        let by_email = repo.find_by_email("a@example.com").unwrap().unwrap();
        assert_eq!(by_email.id, user.id);
    }

    #[test]
    fn test_user_find_nonexistent() {
        let db = make_db();
        let repo = UserRepository::new(db);
        assert!(repo.find_by_id(Uuid::new_v4()).unwrap().is_none());
        assert!(repo.find_by_email("nobody@example.com").unwrap().is_none());
    }

    #[test]
    fn test_user_duplicate_email_rejected() {
        let db = make_db();
        let repo = UserRepository::new(db);
        repo.create("a@example.com", "h").unwrap();
        assert!(repo.create("a@example.com", "h").is_err());
    }

    #[test]
    fn test_set_selected_document() {
        let db = make_db();
        let repo = UserRepository::new(Arc::clone(&db));
        let user = make_user(&db);

        let doc_id = Uuid::new_v4();
        repo.set_selected_document(user.id, Some(doc_id)).unwrap();
        let reloaded = repo.find_by_id(user.id).unwrap().unwrap();
        assert_eq!(reloaded.selected_document_id, Some(doc_id));

        repo.set_selected_document(user.id, None).unwrap();
        let cleared = repo.find_by_id(user.id).unwrap().unwrap();
        assert!(cleared.selected_document_id.is_none());
    }

    #[test]
    fn test_set_selected_document_missing_user() {
        let db = make_db();
        let repo = UserRepository::new(db);
        assert!(repo
            .set_selected_document(Uuid::new_v4(), Some(Uuid::new_v4()))
            .is_err());
    }

    // ========================================================================
    // SessionRepository tests
    // ========================================================================

    #[test]
    fn test_find_or_create_creates_once() {
        let db = make_db();
        let user = make_user(&db);
        let repo = SessionRepository::new(Arc::clone(&db));

        let doc_id = Some(Uuid::new_v4());
        let first = repo.find_or_create(user.id, doc_id).unwrap();
        let second = repo.find_or_create(user.id, doc_id).unwrap();
        assert_eq!(first.id, second.id);

        let sessions = repo.list_for_user(user.id).unwrap();
        assert_eq!(sessions.len(), 1);
    }

    #[test]
    fn test_find_or_create_distinct_documents() {
        let db = make_db();
        let user = make_user(&db);
        let repo = SessionRepository::new(Arc::clone(&db));

        let a = repo.find_or_create(user.id, Some(Uuid::new_v4())).unwrap();
        let b = repo.find_or_create(user.id, Some(Uuid::new_v4())).unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(repo.list_for_user(user.id).unwrap().len(), 2);
    }

    #[test]
    fn test_latest_for_none_when_empty() {
        let db = make_db();
        let user = make_user(&db);
        let repo = SessionRepository::new(db);
        assert!(repo
            .latest_for(user.id, Some(Uuid::new_v4()))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_session_null_document() {
        let db = make_db();
        let user = make_user(&db);
        let repo = SessionRepository::new(Arc::clone(&db));

        let session = repo.find_or_create(user.id, None).unwrap();
        assert!(session.document_id.is_none());

        let found = repo.latest_for(user.id, None).unwrap().unwrap();
        assert_eq!(found.id, session.id);
    }

    #[test]
    fn test_list_for_user_ordered() {
        let db = make_db();
        let user = make_user(&db);
        let repo = SessionRepository::new(Arc::clone(&db));

        let a = repo.find_or_create(user.id, Some(Uuid::new_v4())).unwrap();
        let b = repo.find_or_create(user.id, Some(Uuid::new_v4())).unwrap();

        let sessions = repo.list_for_user(user.id).unwrap();
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].id, a.id);
        assert_eq!(sessions[1].id, b.id);
    }

    // ========================================================================
    // MessageRepository tests
    // ========================================================================

    #[test]
    fn test_append_exchange_persists_pair() {
        let db = make_db();
        let user = make_user(&db);
        let session = SessionRepository::new(Arc::clone(&db))
            .find_or_create(user.id, Some(Uuid::new_v4()))
            .unwrap();
        let repo = MessageRepository::new(Arc::clone(&db));

        let (user_msg, assistant_msg) = repo
            .append_exchange(session.id, user.id, "What is this?", "A greeting.")
            .unwrap();
        assert_eq!(user_msg.role, Role::User);
        assert_eq!(assistant_msg.role, Role::Assistant);
        assert_eq!(user_msg.session_id, session.id);
        assert_eq!(assistant_msg.session_id, session.id);

        let messages = repo.list_for_session(session.id).unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[0].content, "What is this?");
        assert_eq!(messages[1].role, Role::Assistant);
        assert_eq!(messages[1].content, "A greeting.");
    }

    #[test]
    fn test_append_exchange_missing_session_writes_nothing() {
        let db = make_db();
        let user = make_user(&db);
        let repo = MessageRepository::new(Arc::clone(&db));

        // Foreign key violation on the first insert rolls the turn back.
        let result = repo.append_exchange(Uuid::new_v4(), user.id, "hi", "hello");
        assert!(result.is_err());

        assert!(repo.history_for_user(user.id).unwrap().is_empty());
    }

    #[test]
    fn test_history_spans_sessions_in_order() {
        let db = make_db();
        let user = make_user(&db);
        let sessions = SessionRepository::new(Arc::clone(&db));
        let repo = MessageRepository::new(Arc::clone(&db));

        let first = sessions.find_or_create(user.id, Some(Uuid::new_v4())).unwrap();
        let second = sessions.find_or_create(user.id, Some(Uuid::new_v4())).unwrap();

        repo.append_exchange(first.id, user.id, "q1", "a1").unwrap();
        repo.append_exchange(second.id, user.id, "q2", "a2").unwrap();
        repo.append_exchange(first.id, user.id, "q3", "a3").unwrap();

        let history = repo.history_for_user(user.id).unwrap();
        assert_eq!(history.len(), 6);
        // All of the first bucket's messages precede the second bucket's.
        assert_eq!(history[0].content, "q1");
        assert_eq!(history[1].content, "a1");
        assert_eq!(history[2].content, "q3");
        assert_eq!(history[3].content, "a3");
        assert_eq!(history[4].content, "q2");
        assert_eq!(history[5].content, "a2");
    }

    #[test]
    fn test_history_empty_user() {
        let db = make_db();
        let user = make_user(&db);
        let repo = MessageRepository::new(db);
        assert!(repo.history_for_user(user.id).unwrap().is_empty());
    }

    #[test]
    fn test_user_delete_removes_history() {
        let db = make_db();
        let user = make_user(&db);
        let users = UserRepository::new(Arc::clone(&db));
        let session = SessionRepository::new(Arc::clone(&db))
            .find_or_create(user.id, Some(Uuid::new_v4()))
            .unwrap();
        let repo = MessageRepository::new(Arc::clone(&db));
        repo.append_exchange(session.id, user.id, "q", "a").unwrap();

        users.delete(user.id).unwrap();

        db.with_conn(|conn| {
            let count: i64 = conn
                .query_row("SELECT COUNT(*) FROM chat_messages", [], |row| row.get(0))
                .map_err(|e| QuillError::Storage(e.to_string()))?;
            assert_eq!(count, 0);
            Ok(())
        })
        .unwrap();
    }
}
