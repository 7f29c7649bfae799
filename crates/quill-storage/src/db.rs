//! Database connection management.
//!
//! Wraps a single rusqlite Connection in a Mutex for thread-safe access.
//! Configures WAL mode and recommended PRAGMAs on initialization.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::Connection;
use tracing::info;

use quill_core::error::QuillError;

use crate::migrations;

/// Thread-safe SQLite database wrapper.
///
/// Uses WAL mode for concurrent read/write safety. The connection is
/// wrapped in a Mutex since rusqlite Connection is not Sync.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) a database at the given path.
    ///
    /// Configures WAL mode, synchronous=NORMAL, foreign keys, and runs
    /// all pending migrations.
    pub fn new(path: &Path) -> Result<Self, QuillError> {
        // Ensure parent directory exists.
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)
            .map_err(|e| QuillError::Storage(format!("Failed to open database: {}", e)))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys = ON;",
        )
        .map_err(|e| QuillError::Storage(format!("Failed to set pragmas: {}", e)))?;

        info!("Database opened at {}", path.display());

        let db = Self {
            conn: Mutex::new(conn),
        };

        db.with_conn(migrations::run_migrations)?;

        Ok(db)
    }

    /// Open an in-memory database (for testing).
    pub fn in_memory() -> Result<Self, QuillError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| QuillError::Storage(format!("Failed to open in-memory db: {}", e)))?;

        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(|e| QuillError::Storage(format!("Failed to set pragmas: {}", e)))?;

        let db = Self {
            conn: Mutex::new(conn),
        };

        db.with_conn(migrations::run_migrations)?;

        Ok(db)
    }

    /// Execute a closure with a reference to the underlying connection.
    ///
    /// This is the primary way to read from the database. The mutex is
    /// held for the duration of the closure.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, QuillError>
    where
        F: FnOnce(&Connection) -> Result<T, QuillError>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| QuillError::Storage(format!("Database lock poisoned: {}", e)))?;
        f(&conn)
    }

    /// Execute a closure inside a transaction.
    ///
    /// The transaction commits if the closure returns `Ok` and rolls back
    /// on `Err` (or if commit itself fails), so multi-statement writes are
    /// all-or-nothing.
    pub fn with_tx<F, T>(&self, f: F) -> Result<T, QuillError>
    where
        F: FnOnce(&rusqlite::Transaction<'_>) -> Result<T, QuillError>,
    {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| QuillError::Storage(format!("Database lock poisoned: {}", e)))?;
        let tx = conn
            .transaction()
            .map_err(|e| QuillError::Storage(format!("Failed to begin transaction: {}", e)))?;
        let value = f(&tx)?;
        tx.commit()
            .map_err(|e| QuillError::Storage(format!("Failed to commit transaction: {}", e)))?;
        Ok(value)
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_database() {
        let db = Database::in_memory().unwrap();
        db.with_conn(|conn| {
            let count: i64 = conn
                .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
                .map_err(|e| QuillError::Storage(e.to_string()))?;
            assert_eq!(count, 0);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.db");
        let db = Database::new(&path).unwrap();

        db.with_conn(|conn| {
            let count: i64 = conn
                .query_row("SELECT COUNT(*) FROM chat_messages", [], |row| row.get(0))
                .map_err(|e| QuillError::Storage(e.to_string()))?;
            assert_eq!(count, 0);
            Ok(())
        })
        .unwrap();

        assert!(path.exists());
    }

    #[test]
    fn test_tx_commits_on_ok() {
        let db = Database::in_memory().unwrap();
        db.with_tx(|tx| {
            tx.execute(
                "INSERT INTO users (id, email, password_hash) VALUES ('u1', 'a@b.c', 'h')",
                [],
            )
            .map_err(|e| QuillError::Storage(e.to_string()))?;
            Ok(())
        })
        .unwrap();

        db.with_conn(|conn| {
            let count: i64 = conn
                .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
                .map_err(|e| QuillError::Storage(e.to_string()))?;
            assert_eq!(count, 1);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_tx_rolls_back_on_err() {
        let db = Database::in_memory().unwrap();
        let result: Result<(), QuillError> = db.with_tx(|tx| {
            tx.execute(
                "INSERT INTO users (id, email, password_hash) VALUES ('u1', 'a@b.c', 'h')",
                [],
            )
            .map_err(|e| QuillError::Storage(e.to_string()))?;
            Err(QuillError::Storage("forced failure".to_string()))
        });
        assert!(result.is_err());

        db.with_conn(|conn| {
            let count: i64 = conn
                .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
                .map_err(|e| QuillError::Storage(e.to_string()))?;
            assert_eq!(count, 0);
            Ok(())
        })
        .unwrap();
    }
}
