//! Session binder: resolves the active conversation bucket for a
//! (user, selected document) pair.

use std::sync::Arc;

use uuid::Uuid;

use quill_core::types::ChatSession;
use quill_storage::{Database, SessionRepository};

use crate::error::ChatError;

/// Resolves or lazily creates the conversation bucket for a pair.
///
/// The most recently created bucket for the exact pair is the active one;
/// a bucket is only ever created when none exists yet. The storage layer's
/// unique (user_id, document_id) index makes concurrent first messages
/// converge on a single bucket.
pub struct SessionBinder {
    sessions: SessionRepository,
}

impl SessionBinder {
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            sessions: SessionRepository::new(db),
        }
    }

    /// Return the active bucket for the pair, creating one on first contact.
    ///
    /// Callers are responsible for ensuring a document is actually
    /// selected; the binder binds whatever pair it is handed.
    pub fn resolve_or_create(
        &self,
        user_id: Uuid,
        document_id: Option<Uuid>,
    ) -> Result<ChatSession, ChatError> {
        let session = self.sessions.find_or_create(user_id, document_id)?;
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_storage::UserRepository;

    fn make_db_with_user() -> (Arc<Database>, Uuid) {
        let db = Arc::new(Database::in_memory().unwrap());
        let user = UserRepository::new(Arc::clone(&db))
            .create("binder@example.com", "hash")
            .unwrap();
        (db, user.id)
    }

    #[test]
    fn test_first_contact_creates_bucket() {
        let (db, user_id) = make_db_with_user();
        let binder = SessionBinder::new(db);

        let doc = Some(Uuid::new_v4());
        let session = binder.resolve_or_create(user_id, doc).unwrap();
        assert_eq!(session.user_id, user_id);
        assert_eq!(session.document_id, doc);
    }

    #[test]
    fn test_repeat_contact_reuses_bucket() {
        let (db, user_id) = make_db_with_user();
        let binder = SessionBinder::new(db);

        let doc = Some(Uuid::new_v4());
        let first = binder.resolve_or_create(user_id, doc).unwrap();
        let second = binder.resolve_or_create(user_id, doc).unwrap();
        let third = binder.resolve_or_create(user_id, doc).unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.id, third.id);
    }

    #[test]
    fn test_new_document_gets_new_bucket() {
        let (db, user_id) = make_db_with_user();
        let binder = SessionBinder::new(db);

        let a = binder.resolve_or_create(user_id, Some(Uuid::new_v4())).unwrap();
        let b = binder.resolve_or_create(user_id, Some(Uuid::new_v4())).unwrap();
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_users_do_not_share_buckets() {
        let (db, user_a) = make_db_with_user();
        let user_b = UserRepository::new(Arc::clone(&db))
            .create("other@example.com", "hash")
            .unwrap()
            .id;
        let binder = SessionBinder::new(db);

        let doc = Some(Uuid::new_v4());
        let a = binder.resolve_or_create(user_a, doc).unwrap();
        let b = binder.resolve_or_create(user_b, doc).unwrap();
        assert_ne!(a.id, b.id);
    }
}
