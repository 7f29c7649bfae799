//! API error types and JSON error response formatting.
//!
//! ApiError provides a consistent JSON error response format across all
//! endpoints, mapping internal errors to appropriate HTTP status codes.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use quill_chat::ChatError;
use quill_core::error::QuillError;
use quill_docs::DocError;

/// JSON error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error code (e.g., "bad_request", "not_found").
    pub error: String,
    /// Human-readable error message.
    pub message: String,
}

/// API error type that maps to HTTP status codes and JSON responses.
#[derive(Debug)]
pub enum ApiError {
    /// 400 Bad Request - missing or invalid parameters or preconditions.
    BadRequest(String),
    /// 401 Unauthorized - missing or invalid credentials.
    Unauthorized(String),
    /// 404 Not Found - resource does not exist for this user.
    NotFound(String),
    /// 422 Unprocessable Entity - valid syntax but semantic failure.
    UnprocessableEntity(String),
    /// 500 Internal Server Error - unexpected server error.
    Internal(String),
    /// 502 Bad Gateway - the upstream generation call failed.
    BadGateway(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            ApiError::UnprocessableEntity(msg) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "unprocessable_entity", msg)
            }
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg),
            ApiError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, "bad_gateway", msg),
        };

        let body = ErrorBody {
            error: error_code.to_string(),
            message,
        };

        (status, Json(body)).into_response()
    }
}

impl From<QuillError> for ApiError {
    fn from(err: QuillError) -> Self {
        match &err {
            QuillError::Config(msg) => ApiError::BadRequest(msg.clone()),
            QuillError::Auth(msg) => ApiError::Unauthorized(msg.clone()),
            _ => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<ChatError> for ApiError {
    fn from(err: ChatError) -> Self {
        match &err {
            ChatError::NoDocumentSelected
            | ChatError::NotParsed(_)
            | ChatError::EmptyMessage
            | ChatError::MessageTooLong(_)
            | ChatError::InvalidChunking { .. } => ApiError::BadRequest(err.to_string()),
            ChatError::DocumentNotFound(_) => ApiError::NotFound(err.to_string()),
            ChatError::Generation(_) => ApiError::BadGateway(err.to_string()),
            ChatError::Storage(_) => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<DocError> for ApiError {
    fn from(err: DocError) -> Self {
        match &err {
            DocError::NotFound(_) => ApiError::NotFound(err.to_string()),
            DocError::NotParsed(_) | DocError::Invalid(_) | DocError::TooLarge { .. } => {
                ApiError::BadRequest(err.to_string())
            }
            DocError::Extraction(_) => ApiError::UnprocessableEntity(err.to_string()),
            DocError::Storage(_) | DocError::Io(_) => ApiError::Internal(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_chat_error_status_mapping() {
        assert!(matches!(
            ApiError::from(ChatError::NoDocumentSelected),
            ApiError::BadRequest(_)
        ));
        assert!(matches!(
            ApiError::from(ChatError::NotParsed(Uuid::new_v4())),
            ApiError::BadRequest(_)
        ));
        assert!(matches!(
            ApiError::from(ChatError::DocumentNotFound(Uuid::new_v4())),
            ApiError::NotFound(_)
        ));
        assert!(matches!(
            ApiError::from(ChatError::Generation("boom".to_string())),
            ApiError::BadGateway(_)
        ));
        assert!(matches!(
            ApiError::from(ChatError::Storage("boom".to_string())),
            ApiError::Internal(_)
        ));
    }

    #[test]
    fn test_doc_error_status_mapping() {
        assert!(matches!(
            ApiError::from(DocError::NotFound(Uuid::new_v4())),
            ApiError::NotFound(_)
        ));
        assert!(matches!(
            ApiError::from(DocError::Invalid("not a pdf".to_string())),
            ApiError::BadRequest(_)
        ));
        assert!(matches!(
            ApiError::from(DocError::TooLarge { size: 2, limit: 1 }),
            ApiError::BadRequest(_)
        ));
        assert!(matches!(
            ApiError::from(DocError::Extraction("bad xref".to_string())),
            ApiError::UnprocessableEntity(_)
        ));
    }
}
