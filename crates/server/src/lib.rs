//! WAD Server Library
//!
//! Real-time chat over WebSocket with a persistent history and an automated
//! reply after every message, plus signup/login, image uploads and a notebook.

pub mod auth;
pub mod chat;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod notes;
pub mod store;
pub mod uploads;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use auth::AuthManager;
use chat::{AckResponder, ConnectionRegistry};
use config::{AppState, ServerConfig};
use handlers::{
    chat_socket, clear_notes, create_note, get_upload, health_check, list_notes, login, signup,
    upload_image,
};
use models::ChatMessage;
use notes::Notebook;
use store::JsonCollection;
use uploads::UploadStore;

/// Open every store and build the shared state
pub async fn build_state(config: ServerConfig) -> anyhow::Result<AppState> {
    config.ensure_dirs().await?;

    let history = Arc::new(JsonCollection::<ChatMessage>::open(&config.data_dir, "chat").await?);
    info!("Chat history loaded ({} entries)", history.len().await);

    let auth = Arc::new(AuthManager::new(&config.users_db_path(), config.bcrypt_cost).await?);
    let uploads = Arc::new(UploadStore::new(&config.upload_dir).await?);
    let notebook = Arc::new(Notebook::open(&config.data_dir).await?);
    let responder = Arc::new(AckResponder::new(&config.bot_name, &config.bot_reply));

    Ok(AppState {
        registry: Arc::new(ConnectionRegistry::new()),
        history,
        responder,
        auth,
        uploads,
        notebook,
        config,
    })
}

/// Build the router for the given state
pub fn router(state: AppState) -> Router {
    let upload_limit = state.config.max_upload_bytes;

    Router::new()
        // Chat
        .route("/chat/ws", get(chat_socket))
        // Auth
        .route("/signup", post(signup))
        .route("/auth", post(login))
        // Uploads
        .route(
            "/upload",
            post(upload_image).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/uploaded/{filename}", get(get_upload))
        // Notebook
        .route("/notebook", get(list_notes).post(create_note))
        .route("/notebook/clear", post(clear_notes))
        // Health check
        .route("/health", get(health_check))
        .with_state(state)
        .layer(tower_http::cors::CorsLayer::permissive())
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

pub async fn run() -> anyhow::Result<()> {
    // Initialize tracing
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        // Already set, ignore
    }

    info!("=== WAD Server ===");

    let config = ServerConfig::from_env();
    info!("Data directory: {:?}", config.data_dir);
    info!("Upload directory: {:?}", config.upload_dir);

    let addr = config.bind_addr;
    let state = build_state(config).await?;
    let app = router(state);

    info!("Listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
