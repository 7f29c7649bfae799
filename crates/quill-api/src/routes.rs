//! Router setup with all API routes and middleware.
//!
//! Configures the axum Router with CORS, tracing, body limits, and all
//! endpoint handlers. Document and chat routes sit behind bearer auth.

use axum::extract::DefaultBodyLimit;
use axum::http::{header, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth;
use crate::handlers;
use crate::state::AppState;

/// Headroom added to the upload body limit for multipart framing.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Create the axum Router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT]);

    // Routes that do NOT require authentication.
    let public_routes = Router::new()
        .route("/health", get(handlers::health))
        .route("/register", post(handlers::register))
        .route("/login", post(handlers::login));

    let upload_limit = state.config.upload.max_file_size + MULTIPART_OVERHEAD;

    // Routes behind bearer auth.
    let protected_routes = Router::new()
        .route(
            "/pdf-upload",
            post(handlers::upload_document).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/pdf-list", get(handlers::list_documents))
        .route("/pdf-select", post(handlers::select_document))
        .route("/pdf-parse", post(handlers::parse_document))
        .route("/pdf-chat", post(handlers::chat))
        .route("/chat-history", get(handlers::chat_history))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth::require_auth,
        ));

    public_routes
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(1024 * 1024)) // 1MB default limit
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server on the configured address.
///
/// Binds to 0.0.0.0 on the given port and serves until shutdown.
pub async fn start_server(state: AppState, port: u16) -> Result<(), quill_core::QuillError> {
    let addr = format!("0.0.0.0:{}", port);

    let router = create_router(state);

    tracing::info!("Starting API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| quill_core::QuillError::Api(format!("Failed to bind: {}", e)))?;

    axum::serve(listener, router)
        .await
        .map_err(|e| quill_core::QuillError::Api(format!("Server error: {}", e)))?;

    Ok(())
}
