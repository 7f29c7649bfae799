//! Document store: blob files on disk, metadata and extracted text in SQLite.
//!
//! Owns the `documents` and `document_texts` tables plus the blob
//! directory. The chat core only ever calls `verify_ownership` and
//! `parsed_text`; upload and parse are driven by the HTTP layer.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use rusqlite::OptionalExtension;
use tracing::info;
use uuid::Uuid;

use quill_core::error::QuillError;
use quill_core::types::DocumentMetadata;
use quill_storage::Database;

use crate::error::DocError;
use crate::extract;

/// Filesystem + SQLite backed document store, scoped per owning user.
pub struct DocumentStore {
    db: Arc<Database>,
    blob_dir: PathBuf,
    max_file_size: usize,
}

impl DocumentStore {
    /// Create a store rooted at `blob_dir`, creating the directory if needed.
    pub fn new(
        db: Arc<Database>,
        blob_dir: PathBuf,
        max_file_size: usize,
    ) -> Result<Self, DocError> {
        std::fs::create_dir_all(&blob_dir)?;
        Ok(Self {
            db,
            blob_dir,
            max_file_size,
        })
    }

    /// Store an uploaded PDF for a user and record its metadata.
    ///
    /// Rejects non-PDF content and oversized uploads before anything is
    /// written. The blob is removed again if the metadata insert fails.
    pub fn save(
        &self,
        user_id: Uuid,
        filename: &str,
        bytes: &[u8],
    ) -> Result<DocumentMetadata, DocError> {
        if !extract::is_pdf(bytes) {
            return Err(DocError::Invalid("Only PDF files are allowed".to_string()));
        }
        if bytes.len() > self.max_file_size {
            return Err(DocError::TooLarge {
                size: bytes.len(),
                limit: self.max_file_size,
            });
        }

        let metadata = DocumentMetadata {
            id: Uuid::new_v4(),
            user_id,
            filename: filename.to_string(),
            size_bytes: bytes.len() as u64,
            is_parsed: false,
            created_at: epoch_to_datetime(Utc::now().timestamp()),
        };

        let path = self.blob_path(metadata.id);
        std::fs::write(&path, bytes)?;

        let inserted = self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO documents (id, user_id, filename, size_bytes, is_parsed, created_at)
                 VALUES (?1, ?2, ?3, ?4, 0, ?5)",
                rusqlite::params![
                    metadata.id.to_string(),
                    metadata.user_id.to_string(),
                    metadata.filename,
                    metadata.size_bytes as i64,
                    metadata.created_at.timestamp(),
                ],
            )
            .map_err(|e| QuillError::Storage(format!("Failed to record document: {}", e)))?;
            Ok(())
        });

        if let Err(e) = inserted {
            let _ = std::fs::remove_file(&path);
            return Err(e.into());
        }

        info!(document_id = %metadata.id, size = bytes.len(), "Document stored");
        Ok(metadata)
    }

    /// All documents owned by a user, newest first.
    pub fn list(&self, user_id: Uuid) -> Result<Vec<DocumentMetadata>, DocError> {
        let rows = self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, user_id, filename, size_bytes, is_parsed, created_at
                     FROM documents
                     WHERE user_id = ?1
                     ORDER BY created_at DESC, rowid DESC",
                )
                .map_err(|e| QuillError::Storage(e.to_string()))?;

            let rows = stmt
                .query_map(rusqlite::params![user_id.to_string()], |row| {
                    Ok(row_to_metadata(row))
                })
                .map_err(|e| QuillError::Storage(e.to_string()))?;

            let mut docs = Vec::new();
            for row in rows {
                let doc = row.map_err(|e| QuillError::Storage(e.to_string()))??;
                docs.push(doc);
            }
            Ok(docs)
        })?;
        Ok(rows)
    }

    /// Metadata for a document owned by the given user.
    ///
    /// Fails with `NotFound` when no such document exists for that user —
    /// another user's document id is indistinguishable from a missing one.
    pub fn verify_ownership(
        &self,
        document_id: Uuid,
        user_id: Uuid,
    ) -> Result<DocumentMetadata, DocError> {
        let result = self.db.with_conn(|conn| {
            let result = conn
                .query_row(
                    "SELECT id, user_id, filename, size_bytes, is_parsed, created_at
                     FROM documents
                     WHERE id = ?1 AND user_id = ?2",
                    rusqlite::params![document_id.to_string(), user_id.to_string()],
                    |row| Ok(row_to_metadata(row)),
                )
                .optional()
                .map_err(|e| QuillError::Storage(e.to_string()))?;

            match result {
                Some(doc) => Ok(Some(doc?)),
                None => Ok(None),
            }
        })?;

        result.ok_or(DocError::NotFound(document_id))
    }

    /// Run text extraction for a document and cache the result.
    ///
    /// Loads the blob from disk, extracts text, upserts the text row and
    /// flips `is_parsed` in one transaction. Returns the extracted text.
    pub fn parse(&self, document_id: Uuid, user_id: Uuid) -> Result<String, DocError> {
        let metadata = self.verify_ownership(document_id, user_id)?;

        let bytes = std::fs::read(self.blob_path(metadata.id))?;
        let text = extract::extract_pdf_text(&bytes)?;

        self.db.with_tx(|tx| {
            tx.execute(
                "INSERT INTO document_texts (document_id, user_id, text, parsed_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(document_id) DO UPDATE SET text = ?3, parsed_at = ?4",
                rusqlite::params![
                    document_id.to_string(),
                    user_id.to_string(),
                    text,
                    Utc::now().timestamp(),
                ],
            )
            .map_err(|e| QuillError::Storage(format!("Failed to cache text: {}", e)))?;
            tx.execute(
                "UPDATE documents SET is_parsed = 1 WHERE id = ?1",
                rusqlite::params![document_id.to_string()],
            )
            .map_err(|e| QuillError::Storage(e.to_string()))?;
            Ok(())
        })?;

        info!(document_id = %document_id, text_len = text.len(), "Document parsed");
        Ok(text)
    }

    /// Cached extracted text for a document owned by the given user.
    ///
    /// Fails with `NotFound` if the document does not exist for the user
    /// and `NotParsed` if extraction has not run yet.
    pub fn parsed_text(&self, document_id: Uuid, user_id: Uuid) -> Result<String, DocError> {
        self.verify_ownership(document_id, user_id)?;

        let text = self.db.with_conn(|conn| {
            conn.query_row(
                "SELECT text FROM document_texts WHERE document_id = ?1 AND user_id = ?2",
                rusqlite::params![document_id.to_string(), user_id.to_string()],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .map_err(|e| QuillError::Storage(e.to_string()))
        })?;

        text.ok_or(DocError::NotParsed(document_id))
    }

    fn blob_path(&self, document_id: Uuid) -> PathBuf {
        self.blob_dir.join(format!("{}.pdf", document_id))
    }
}

fn epoch_to_datetime(epoch: i64) -> chrono::DateTime<Utc> {
    Utc.timestamp_opt(epoch, 0).single().unwrap_or_default()
}

fn row_to_metadata(row: &rusqlite::Row<'_>) -> Result<DocumentMetadata, QuillError> {
    let id: String = row.get(0).map_err(|e| QuillError::Storage(e.to_string()))?;
    let user_id: String = row.get(1).map_err(|e| QuillError::Storage(e.to_string()))?;
    let filename: String = row.get(2).map_err(|e| QuillError::Storage(e.to_string()))?;
    let size_bytes: i64 = row.get(3).map_err(|e| QuillError::Storage(e.to_string()))?;
    let is_parsed: i32 = row.get(4).map_err(|e| QuillError::Storage(e.to_string()))?;
    let created_at: i64 = row.get(5).map_err(|e| QuillError::Storage(e.to_string()))?;

    Ok(DocumentMetadata {
        id: Uuid::parse_str(&id)
            .map_err(|e| QuillError::Storage(format!("Invalid UUID: {}", e)))?,
        user_id: Uuid::parse_str(&user_id)
            .map_err(|e| QuillError::Storage(format!("Invalid UUID: {}", e)))?,
        filename,
        size_bytes: size_bytes as u64,
        is_parsed: is_parsed != 0,
        created_at: epoch_to_datetime(created_at),
    })
}
