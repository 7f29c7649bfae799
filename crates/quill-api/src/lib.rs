//! Quill API crate - axum HTTP server and route handlers.
//!
//! Provides the REST API for the Quill application: registration and
//! login, document upload/select/parse, document-scoped chat, and chat
//! history, plus a health check.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::{create_router, start_server};
pub use state::AppState;
