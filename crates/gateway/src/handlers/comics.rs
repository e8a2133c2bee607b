//! Comic handlers
//!
//! Comics are created either manually or from a generated comic script;
//! the panels arrive as a full ordered list either way.

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
    domain::{Comic, ComicDraft, ComicPatch, Panel},
    errors::{AppError, Result},
};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateComicRequest {
    #[validate(length(min = 1, max = 300))]
    pub title: String,

    pub subject: Option<String>,

    pub thumbnail: Option<String>,

    #[serde(default)]
    pub panels: Vec<Panel>,

    pub duration: Option<String>,
}

pub async fn list_comics(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<Vec<Comic>>> {
    let comics = state.store.list_comics(&auth.persistence).await?;
    Ok(Json(comics))
}

pub async fn create_comic(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(request): Json<CreateComicRequest>,
) -> Result<(StatusCode, Json<Comic>)> {
    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: None,
    })?;

    let draft = ComicDraft {
        title: request.title,
        subject: request.subject,
        thumbnail: request.thumbnail,
        panels: request.panels,
        duration: request.duration,
    };

    let comic = state.store.create_comic(&auth.persistence, draft).await?;

    Ok((StatusCode::CREATED, Json(comic)))
}

/// Patch a comic; the reader uses this to advance `progress`
pub async fn update_comic(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
    Json(patch): Json<ComicPatch>,
) -> Result<Response> {
    match state.store.update_comic(&auth.persistence, &id, &patch).await? {
        Some(comic) => Ok(Json(comic).into_response()),
        None => Ok(StatusCode::NO_CONTENT.into_response()),
    }
}

pub async fn delete_comic(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    state.store.delete_comic(&auth.persistence, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
