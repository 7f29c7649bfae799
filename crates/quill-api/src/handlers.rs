//! Route handler functions for all API endpoints.
//!
//! Each handler extracts parameters via axum extractors, interacts with
//! AppState services, and returns JSON responses.

use std::sync::Arc;

use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use quill_core::types::{ChatMessage, DocumentMetadata, User};
use quill_storage::UserRepository;

use crate::auth;
use crate::error::ApiError;
use crate::state::AppState;

/// Password length bounds for registration.
const MIN_PASSWORD_LEN: usize = 6;
const MAX_PASSWORD_LEN: usize = 128;

// =============================================================================
// Request types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct SelectRequest {
    pub document_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct ParseRequest {
    pub document_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

// =============================================================================
// Response types
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub is_active: bool,
    pub selected_document_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            is_active: user.is_active,
            selected_document_id: user.selected_document_id,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DocumentResponse {
    pub id: Uuid,
    pub filename: String,
    pub size_bytes: u64,
    pub is_parsed: bool,
    pub created_at: DateTime<Utc>,
}

impl From<DocumentMetadata> for DocumentResponse {
    fn from(doc: DocumentMetadata) -> Self {
        Self {
            id: doc.id,
            filename: doc.filename,
            size_bytes: doc.size_bytes,
            is_parsed: doc.is_parsed,
            created_at: doc.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SelectResponse {
    pub message: String,
    pub document_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ParseResponse {
    pub document_id: Uuid,
    pub parsed: bool,
    pub text_length: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatMessageResponse {
    pub role: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl From<ChatMessage> for ChatMessageResponse {
    fn from(msg: ChatMessage) -> Self {
        Self {
            role: msg.role.as_str().to_string(),
            content: msg.content,
            created_at: msg.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatHistoryResponse {
    pub messages: Vec<ChatMessageResponse>,
    pub total: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

// =============================================================================
// Auth endpoints
// =============================================================================

/// POST /register - create a new user account.
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let email = payload.email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(ApiError::BadRequest("Invalid email address".to_string()));
    }
    if payload.password.len() < MIN_PASSWORD_LEN || payload.password.len() > MAX_PASSWORD_LEN {
        return Err(ApiError::BadRequest(format!(
            "Password must be between {} and {} characters",
            MIN_PASSWORD_LEN, MAX_PASSWORD_LEN
        )));
    }

    let users = UserRepository::new(Arc::clone(&state.database));
    if users.find_by_email(email)?.is_some() {
        return Err(ApiError::BadRequest("Email already registered".to_string()));
    }

    let user = users.create(email, &auth::hash_password(&payload.password))?;
    tracing::info!(user_id = %user.id, "User registered");
    Ok((StatusCode::CREATED, Json(user.into())))
}

/// POST /login - authenticate and issue an access token.
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let users = UserRepository::new(Arc::clone(&state.database));
    let user = users
        .find_by_email(payload.email.trim())?
        .filter(|u| auth::verify_password(&payload.password, &u.password_hash))
        .ok_or_else(|| ApiError::Unauthorized("Invalid credentials".to_string()))?;

    let token = auth::issue_token(
        state.config.auth.secret_key.as_bytes(),
        user.id,
        state.config.auth.token_ttl_minutes,
    );
    Ok(Json(TokenResponse {
        access_token: token,
        token_type: "bearer".to_string(),
    }))
}

// =============================================================================
// Document endpoints
// =============================================================================

/// POST /pdf-upload - store a PDF for the authenticated user.
pub async fn upload_document(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<DocumentResponse>), ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field
            .file_name()
            .unwrap_or("document.pdf")
            .to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Failed to read upload: {}", e)))?;

        let metadata = state.documents.save(user.id, &filename, &bytes)?;
        return Ok((StatusCode::CREATED, Json(metadata.into())));
    }

    Err(ApiError::BadRequest(
        "Multipart field 'file' is required".to_string(),
    ))
}

/// GET /pdf-list - list the authenticated user's documents.
pub async fn list_documents(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<Json<Vec<DocumentResponse>>, ApiError> {
    let docs = state.documents.list(user.id)?;
    Ok(Json(docs.into_iter().map(Into::into).collect()))
}

/// POST /pdf-select - set the active chat context document.
pub async fn select_document(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(payload): Json<SelectRequest>,
) -> Result<Json<SelectResponse>, ApiError> {
    state
        .documents
        .verify_ownership(payload.document_id, user.id)?;

    let users = UserRepository::new(Arc::clone(&state.database));
    users.set_selected_document(user.id, Some(payload.document_id))?;

    Ok(Json(SelectResponse {
        message: "Document selected".to_string(),
        document_id: payload.document_id,
    }))
}

/// POST /pdf-parse - run text extraction for a document.
pub async fn parse_document(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(payload): Json<ParseRequest>,
) -> Result<Json<ParseResponse>, ApiError> {
    let text = state.documents.parse(payload.document_id, user.id)?;
    Ok(Json(ParseResponse {
        document_id: payload.document_id,
        parsed: true,
        text_length: text.len(),
    }))
}

// =============================================================================
// Chat endpoints
// =============================================================================

/// POST /pdf-chat - one chat turn against the selected document.
pub async fn chat(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatMessageResponse>, ApiError> {
    let reply = state.orchestrator.chat(&user, &payload.message).await?;
    Ok(Json(reply.into()))
}

/// GET /chat-history - the user's full history across all sessions.
pub async fn chat_history(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<Json<ChatHistoryResponse>, ApiError> {
    let history = state.orchestrator.history(&user)?;
    Ok(Json(ChatHistoryResponse {
        messages: history.messages.into_iter().map(Into::into).collect(),
        total: history.total,
    }))
}

// =============================================================================
// Health
// =============================================================================

/// GET /health - liveness probe.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}
