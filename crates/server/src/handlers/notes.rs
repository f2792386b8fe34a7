//! Notebook handlers

use crate::config::AppState;
use crate::error::{Error, Result};
use crate::models::{Note, Record};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    Form, Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct NotebookQuery {
    pub number: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NoteForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub note: String,
}

#[derive(Debug, Serialize)]
pub struct NotebookPage {
    pub notes: Vec<Record<Note>>,
    pub number: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flash: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct NoteCreated {
    pub flash: &'static str,
    pub note: Record<Note>,
}

/// `number` must parse as an integer; only positive values limit the list
fn parse_limit(number: Option<&str>) -> Result<Option<usize>> {
    let raw = match number.map(str::trim) {
        None | Some("") => return Ok(None),
        Some(raw) => raw,
    };

    let n: i64 = raw
        .parse()
        .map_err(|_| Error::validation(format!("Invalid number: {}", raw)))?;

    Ok(usize::try_from(n).ok().filter(|n| *n > 0))
}

/// GET /notebook?number=N
pub async fn list_notes(
    State(state): State<AppState>,
    Query(query): Query<NotebookQuery>,
) -> Result<Json<NotebookPage>> {
    let limit = parse_limit(query.number.as_deref())?;
    let notes = state.notebook.list(limit).await;

    let flash = limit.map(|_| format!("Limit applied. Show {} notes", notes.len()));

    Ok(Json(NotebookPage {
        number: notes.len(),
        notes,
        flash,
    }))
}

/// POST /notebook
pub async fn create_note(
    State(state): State<AppState>,
    Form(form): Form<NoteForm>,
) -> Result<(StatusCode, Json<NoteCreated>)> {
    info!("POST /notebook - {}", form.title);

    let note = state.notebook.create(&form.title, &form.note).await?;

    Ok((
        StatusCode::CREATED,
        Json(NoteCreated {
            flash: "New note added!",
            note,
        }),
    ))
}

/// POST /notebook/clear
pub async fn clear_notes(State(state): State<AppState>) -> Result<StatusCode> {
    info!("POST /notebook/clear");
    state.notebook.clear().await?;
    Ok(StatusCode::NO_CONTENT)
}
