//! Quiz question handlers

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
    domain::{QuizQuestion, QuizQuestionDraft, QuizQuestionPatch},
    errors::{AppError, Result},
};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuizQuestionRequest {
    #[validate(length(min = 1, max = 200))]
    pub quiz_name: String,

    #[validate(length(min = 1, max = 2000))]
    pub question: String,

    /// Exactly four options; the store enforces the shape invariant
    pub options: Vec<String>,

    pub correct_index: u8,
}

pub async fn list_quiz_questions(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<Vec<QuizQuestion>>> {
    let questions = state.store.list_quiz_questions(&auth.persistence).await?;
    Ok(Json(questions))
}

pub async fn create_quiz_question(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(request): Json<CreateQuizQuestionRequest>,
) -> Result<(StatusCode, Json<QuizQuestion>)> {
    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: None,
    })?;

    let draft = QuizQuestionDraft {
        quiz_name: request.quiz_name,
        question: request.question,
        options: request.options,
        correct_index: request.correct_index,
    };

    let question = state
        .store
        .create_quiz_question(&auth.persistence, draft)
        .await?;

    Ok((StatusCode::CREATED, Json(question)))
}

pub async fn update_quiz_question(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
    Json(patch): Json<QuizQuestionPatch>,
) -> Result<Response> {
    match state
        .store
        .update_quiz_question(&auth.persistence, &id, &patch)
        .await?
    {
        Some(question) => Ok(Json(question).into_response()),
        None => Ok(StatusCode::NO_CONTENT.into_response()),
    }
}

pub async fn delete_quiz_question(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    state
        .store
        .delete_quiz_question(&auth.persistence, &id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
