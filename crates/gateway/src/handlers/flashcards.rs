//! Flashcard handlers

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
    domain::{Flashcard, FlashcardDraft, FlashcardPatch},
    errors::{AppError, Result},
};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateFlashcardRequest {
    #[validate(length(min = 1, max = 200))]
    pub deck_name: String,

    #[validate(length(min = 1, max = 2000))]
    pub front: String,

    #[validate(length(min = 1, max = 5000))]
    pub back: String,

    #[serde(default)]
    pub is_known: bool,

    pub subject: Option<String>,
}

pub async fn list_flashcards(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<Vec<Flashcard>>> {
    let cards = state.store.list_flashcards(&auth.persistence).await?;
    Ok(Json(cards))
}

pub async fn create_flashcard(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(request): Json<CreateFlashcardRequest>,
) -> Result<(StatusCode, Json<Flashcard>)> {
    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: None,
    })?;

    let draft = FlashcardDraft {
        deck_name: request.deck_name,
        front: request.front,
        back: request.back,
        is_known: request.is_known,
        subject: request.subject,
    };

    let card = state.store.create_flashcard(&auth.persistence, draft).await?;

    Ok((StatusCode::CREATED, Json(card)))
}

/// Patch a flashcard; the review UI uses this to flip `is_known`
pub async fn update_flashcard(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
    Json(patch): Json<FlashcardPatch>,
) -> Result<Response> {
    match state
        .store
        .update_flashcard(&auth.persistence, &id, &patch)
        .await?
    {
        Some(card) => Ok(Json(card).into_response()),
        None => Ok(StatusCode::NO_CONTENT.into_response()),
    }
}

pub async fn delete_flashcard(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    state.store.delete_flashcard(&auth.persistence, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
