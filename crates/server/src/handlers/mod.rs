//! HTTP and WebSocket handlers

pub mod auth;
pub mod chat;
pub mod notes;
pub mod uploads;

use crate::config::AppState;
use axum::{extract::State, Json};
use serde_json::{json, Value};

pub use auth::{login, signup};
pub use chat::chat_socket;
pub use notes::{clear_notes, create_note, list_notes};
pub use uploads::{get_upload, upload_image};

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "connections": state.registry.len(),
    }))
}
