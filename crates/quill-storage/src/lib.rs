//! Quill storage crate - SQLite persistence for users, sessions, and messages.
//!
//! Provides a WAL-mode SQLite database with migrations and repository
//! implementations for users, conversation buckets, and chat messages.
//! Writes that must be atomic (the paired user/assistant message insert)
//! go through `Database::with_tx`.

pub mod db;
pub mod migrations;
pub mod repository;

pub use db::Database;
pub use repository::{MessageRepository, SessionRepository, UserRepository};
