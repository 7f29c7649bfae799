//! Quill application binary - composition root.
//!
//! Ties together all Quill crates into a single executable:
//! 1. Load configuration from TOML
//! 2. Initialize storage (SQLite + document blob directory)
//! 3. Construct the generation provider client
//! 4. Start the axum REST API server

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use quill_api::{routes, AppState};
use quill_chat::{ChatOrchestrator, GeminiConfig, GeminiProvider};
use quill_core::config::QuillConfig;
use quill_docs::DocumentStore;
use quill_storage::Database;

mod cli;

/// Expand ~ to the home directory in a path string.
fn resolve_data_dir(data_dir: &str) -> PathBuf {
    if let Some(rest) = data_dir.strip_prefix("~/") {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(rest)
    } else {
        PathBuf::from(data_dir)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = cli::CliArgs::parse();

    // Config.
    let config_file = args.resolve_config_path();
    let mut config = QuillConfig::load_or_default(&config_file);
    if let Some(data_dir) = args.resolve_data_dir() {
        config.general.data_dir = data_dir;
    }
    if let Some(level) = args.resolve_log_level() {
        config.general.log_level = level;
    }

    // Tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.general.log_level)),
        )
        .init();

    tracing::info!("Starting Quill v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(path = %config_file.display(), "Configuration loaded");

    // Storage.
    let data_dir = resolve_data_dir(&config.general.data_dir);
    std::fs::create_dir_all(&data_dir)?;

    let db_path = data_dir.join("quill.db");
    let database = Arc::new(Database::new(&db_path)?);
    tracing::info!(path = %db_path.display(), "SQLite database opened");

    let documents = Arc::new(DocumentStore::new(
        Arc::clone(&database),
        data_dir.join("documents"),
        config.upload.max_file_size,
    )?);

    // Generation provider. Constructed once and injected; a missing API key
    // fails startup instead of the first chat request.
    let provider = GeminiProvider::new(GeminiConfig {
        api_key: config.llm.api_key.clone(),
        model: config.llm.model.clone(),
        endpoint: config.llm.endpoint.clone(),
        timeout: Duration::from_secs(config.llm.timeout_secs),
    })
    .map_err(|e| {
        tracing::error!(error = %e, "Generation provider unavailable");
        e
    })?;
    tracing::info!(model = %config.llm.model, "Generation provider ready");

    let orchestrator = Arc::new(ChatOrchestrator::new(
        Arc::clone(&database),
        Arc::clone(&documents),
        Arc::new(provider),
        config.chat.clone(),
    ));

    // API server.
    let port = args.resolve_port(config.server.port);
    let state = AppState::new(config, database, documents, orchestrator);

    routes::start_server(state, port).await?;

    Ok(())
}
