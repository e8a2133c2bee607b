//! Note handlers
//!
//! All operations run against the dual-mode store; the auth extractor
//! picks the persistence arm per request.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use validator::Validate;

use crate::AppState;
use studyhall_common::{
    auth::AuthContext,
    domain::{Note, NoteDraft, NotePatch},
    errors::{AppError, Result},
};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateNoteRequest {
    #[validate(length(min = 1, max = 300))]
    pub title: String,

    #[validate(length(max = 100000))]
    pub content: String,

    pub subject: Option<String>,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub is_synthesis: bool,
}

/// List the caller's notes, newest first
pub async fn list_notes(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<Vec<Note>>> {
    let notes = state.store.list_notes(&auth.persistence).await?;
    Ok(Json(notes))
}

/// Create a note
pub async fn create_note(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(request): Json<CreateNoteRequest>,
) -> Result<(StatusCode, Json<Note>)> {
    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: None,
    })?;

    let draft = NoteDraft {
        title: request.title,
        content: request.content,
        subject: request.subject,
        tags: request.tags,
        is_synthesis: request.is_synthesis,
    };

    let note = state.store.create_note(&auth.persistence, draft).await?;

    tracing::info!(note_id = %note.id, mode = auth.persistence.mode(), "Note created");

    Ok((StatusCode::CREATED, Json(note)))
}

/// Patch a note; unknown ids are an idempotent no-op
pub async fn update_note(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
    Json(patch): Json<NotePatch>,
) -> Result<Response> {
    match state.store.update_note(&auth.persistence, &id, &patch).await? {
        Some(note) => Ok(Json(note).into_response()),
        None => Ok(StatusCode::NO_CONTENT.into_response()),
    }
}

/// Delete a note
pub async fn delete_note(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    let removed = state.store.delete_note(&auth.persistence, &id).await?;
    if removed {
        tracing::info!(note_id = %id, mode = auth.persistence.mode(), "Note deleted");
    }
    Ok(StatusCode::NO_CONTENT)
}
