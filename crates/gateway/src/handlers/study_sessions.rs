//! Study session handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;

use crate::AppState;
use studyhall_common::{
    auth::AuthContext,
    domain::{StudySession, StudySessionDraft, StudySessionPatch},
    errors::Result,
};

#[derive(Debug, Deserialize)]
pub struct CreateStudySessionRequest {
    pub exam_id: Option<String>,

    pub session_date: NaiveDate,

    /// "HH:MM"; the store rejects windows that end before they start
    pub start_time: String,

    pub end_time: String,

    pub subject: Option<String>,

    pub topic: Option<String>,

    #[serde(default)]
    pub completed: bool,
}

pub async fn list_study_sessions(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<Vec<StudySession>>> {
    let sessions = state.store.list_study_sessions(&auth.persistence).await?;
    Ok(Json(sessions))
}

pub async fn create_study_session(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(request): Json<CreateStudySessionRequest>,
) -> Result<(StatusCode, Json<StudySession>)> {
    let draft = StudySessionDraft {
        exam_id: request.exam_id,
        session_date: request.session_date,
        start_time: request.start_time,
        end_time: request.end_time,
        subject: request.subject,
        topic: request.topic,
        completed: request.completed,
    };

    let session = state
        .store
        .create_study_session(&auth.persistence, draft)
        .await?;

    Ok((StatusCode::CREATED, Json(session)))
}

/// Patch a session; the planner uses this to mark sessions completed
pub async fn update_study_session(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
    Json(patch): Json<StudySessionPatch>,
) -> Result<Response> {
    match state
        .store
        .update_study_session(&auth.persistence, &id, &patch)
        .await?
    {
        Some(session) => Ok(Json(session).into_response()),
        None => Ok(StatusCode::NO_CONTENT.into_response()),
    }
}

pub async fn delete_study_session(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    state
        .store
        .delete_study_session(&auth.persistence, &id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
