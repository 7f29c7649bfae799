//! Database schema migrations.
//!
//! Applies the initial schema: users, documents, document_texts,
//! chat_sessions, chat_messages, and the schema_migrations tracking table.

use rusqlite::Connection;
use tracing::info;

use quill_core::error::QuillError;

/// Run all pending database migrations.
///
/// Currently implements the initial schema (version 1). Future migrations
/// can be added by checking the current version and applying incremental changes.
pub fn run_migrations(conn: &Connection) -> Result<(), QuillError> {
    // Create the migrations tracking table first.
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version     INTEGER PRIMARY KEY NOT NULL,
            name        TEXT NOT NULL,
            applied_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );",
    )
    .map_err(|e| QuillError::Storage(format!("Failed to create migrations table: {}", e)))?;

    let current_version: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .map_err(|e| QuillError::Storage(format!("Failed to query migration version: {}", e)))?;

    if current_version < 1 {
        apply_v1(conn)?;
        info!("Applied migration v1: initial_schema");
    }

    Ok(())
}

/// Version 1: Initial schema.
fn apply_v1(conn: &Connection) -> Result<(), QuillError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id                   TEXT PRIMARY KEY NOT NULL,
            email                TEXT NOT NULL UNIQUE,
            password_hash        TEXT NOT NULL,
            selected_document_id TEXT,
            is_active            INTEGER NOT NULL DEFAULT 1,
            created_at           INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );

        CREATE INDEX IF NOT EXISTS idx_users_email
            ON users (email);

        -- Document metadata. The binary blob lives on disk, keyed by id.
        CREATE TABLE IF NOT EXISTS documents (
            id          TEXT PRIMARY KEY NOT NULL,
            user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            filename    TEXT NOT NULL DEFAULT '',
            size_bytes  INTEGER NOT NULL DEFAULT 0,
            is_parsed   INTEGER NOT NULL DEFAULT 0,
            created_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );

        CREATE INDEX IF NOT EXISTS idx_documents_user
            ON documents (user_id, created_at DESC);

        -- Extracted text cache, one row per parsed document.
        CREATE TABLE IF NOT EXISTS document_texts (
            document_id TEXT PRIMARY KEY NOT NULL REFERENCES documents(id) ON DELETE CASCADE,
            user_id     TEXT NOT NULL,
            text        TEXT NOT NULL DEFAULT '',
            parsed_at   INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );

        -- Conversation buckets. At most one per (user, document) pair;
        -- NULL document_ids are distinct, so unselected-context sessions
        -- are not constrained.
        CREATE TABLE IF NOT EXISTS chat_sessions (
            id          TEXT PRIMARY KEY NOT NULL,
            user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            document_id TEXT,
            created_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );

        CREATE UNIQUE INDEX IF NOT EXISTS idx_sessions_user_document
            ON chat_sessions (user_id, document_id);

        CREATE INDEX IF NOT EXISTS idx_sessions_user_created
            ON chat_sessions (user_id, created_at ASC);

        CREATE TABLE IF NOT EXISTS chat_messages (
            id          TEXT PRIMARY KEY NOT NULL,
            session_id  TEXT NOT NULL REFERENCES chat_sessions(id) ON DELETE CASCADE,
            user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            role        TEXT NOT NULL
                        CHECK (role IN ('user', 'assistant')),
            content     TEXT NOT NULL,
            created_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );

        CREATE INDEX IF NOT EXISTS idx_messages_session_created
            ON chat_messages (session_id, created_at ASC);

        CREATE INDEX IF NOT EXISTS idx_messages_user
            ON chat_messages (user_id, created_at ASC);

        -- Record migration.
        INSERT OR IGNORE INTO schema_migrations (version, name) VALUES (1, 'initial_schema');
        ",
    )
    .map_err(|e| QuillError::Storage(format!("Failed to apply migration v1: {}", e)))?;

    Ok(())
}
