//! Exam handlers
//!
//! `progress` is derived from the topic checklist and recomputed by the
//! store on every topic change; clients cannot set it directly.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use validator::Validate;

use crate::AppState;
use studyhall_common::{
    auth::AuthContext,
    domain::{Exam, ExamDraft, ExamPatch, ExamTopic},
    errors::{AppError, Result},
};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateExamRequest {
    #[validate(length(min = 1, max = 300))]
    pub title: String,

    pub subject: Option<String>,

    pub exam_date: NaiveDate,

    #[serde(default)]
    pub topics: Vec<ExamTopic>,
}

/// List the caller's exams in date order
pub async fn list_exams(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<Vec<Exam>>> {
    let exams = state.store.list_exams(&auth.persistence).await?;
    Ok(Json(exams))
}

pub async fn create_exam(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(request): Json<CreateExamRequest>,
) -> Result<(StatusCode, Json<Exam>)> {
    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: None,
    })?;

    let draft = ExamDraft {
        title: request.title,
        subject: request.subject,
        exam_date: request.exam_date,
        topics: request.topics,
    };

    let exam = state.store.create_exam(&auth.persistence, draft).await?;

    tracing::info!(exam_id = %exam.id, mode = auth.persistence.mode(), "Exam created");

    Ok((StatusCode::CREATED, Json(exam)))
}

pub async fn update_exam(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
    Json(patch): Json<ExamPatch>,
) -> Result<Response> {
    match state.store.update_exam(&auth.persistence, &id, &patch).await? {
        Some(exam) => Ok(Json(exam).into_response()),
        None => Ok(StatusCode::NO_CONTENT.into_response()),
    }
}

/// Delete an exam; its study sessions go with it in both modes
pub async fn delete_exam(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    let removed = state.store.delete_exam(&auth.persistence, &id).await?;
    if removed {
        tracing::info!(exam_id = %id, mode = auth.persistence.mode(), "Exam and its sessions deleted");
    }
    Ok(StatusCode::NO_CONTENT)
}
