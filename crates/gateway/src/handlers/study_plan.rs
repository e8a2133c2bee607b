//! Study plan generation: exam details in, scheduled sessions plus advice
//! out
//!
//! The model reply is validated session by session; a plan with malformed
//! times never reaches the client.

use axum::{extract::State, Json};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::AppState;
use studyhall_common::{
    ai::{self, prompts, ChatMessage, ModelClient, PlannedSession},
    auth::{authorize_generation, MaybeIdentity},
    domain::ExamTopic,
    errors::Result,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyPlanRequest {
    pub exam_id: String,

    pub exam_title: String,

    #[serde(default)]
    pub exam_subject: Option<String>,

    pub exam_date: NaiveDate,

    #[serde(default)]
    pub topics: Vec<ExamTopic>,

    #[serde(default)]
    pub available_hours_per_day: Option<f32>,

    #[serde(default)]
    pub preferred_start_time: Option<String>,

    #[serde(default)]
    pub guest_mode: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyPlanResponse {
    pub sessions: Vec<PlannedSession>,
    pub advice: String,
    pub exam_id: String,
}

pub async fn generate_study_plan(
    State(state): State<AppState>,
    identity: MaybeIdentity,
    Json(request): Json<StudyPlanRequest>,
) -> Result<Json<StudyPlanResponse>> {
    authorize_generation(request.guest_mode, &identity.0)?;

    let response = run_plan(state.ai.as_ref(), &state.config.ai.language, request).await?;
    Ok(Json(response))
}

async fn run_plan(
    ai_client: &dyn ModelClient,
    language: &str,
    request: StudyPlanRequest,
) -> Result<StudyPlanResponse> {
    let remaining: Vec<&str> = request
        .topics
        .iter()
        .filter(|t| !t.completed)
        .map(|t| t.name.as_str())
        .collect();

    let payload = serde_json::json!({
        "examTitle": request.exam_title,
        "examSubject": request.exam_subject,
        "examDate": request.exam_date,
        "topics": request.topics,
        "topicsStillToCover": remaining,
        "availableHoursPerDay": request.available_hours_per_day,
        "preferredStartTime": request.preferred_start_time,
    });

    let system = prompts::study_plan_prompt(language);
    let raw = ai_client
        .chat(
            &system,
            &[ChatMessage {
                role: "user".to_string(),
                content: payload.to_string(),
            }],
        )
        .await?;

    let plan = ai::parse_study_plan(&raw)?;

    tracing::info!(
        exam_id = %request.exam_id,
        sessions = plan.sessions.len(),
        "Study plan generated"
    );

    Ok(StudyPlanResponse {
        sessions: plan.sessions,
        advice: plan.advice,
        exam_id: request.exam_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use studyhall_common::ai::MockModelClient;
    use studyhall_common::errors::AppError;

    fn request() -> StudyPlanRequest {
        StudyPlanRequest {
            exam_id: "exam-1".to_string(),
            exam_title: "Math Final".to_string(),
            exam_subject: Some("Math".to_string()),
            exam_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            topics: vec![
                ExamTopic { name: "Algebra".into(), completed: true },
                ExamTopic { name: "Geometry".into(), completed: false },
            ],
            available_hours_per_day: Some(2.0),
            preferred_start_time: Some("17:00".to_string()),
            guest_mode: true,
        }
    }

    #[tokio::test]
    async fn test_plan_echoes_exam_id() {
        let mock = MockModelClient::new().with_chat_response(
            r#"{"sessions": [
                {"date": "2025-05-20", "startTime": "17:00", "endTime": "18:30",
                 "subject": "Math", "topic": "Geometry", "description": "Triangles"}
            ], "advice": "Focus on Geometry."}"#,
        );

        let response = run_plan(&mock, "en", request()).await.unwrap();

        assert_eq!(response.exam_id, "exam-1");
        assert_eq!(response.sessions.len(), 1);
        assert_eq!(response.sessions[0].topic, "Geometry");
        assert_eq!(response.advice, "Focus on Geometry.");
    }

    #[tokio::test]
    async fn test_plan_with_bad_times_is_parse_error() {
        let mock = MockModelClient::new().with_chat_response(
            r#"{"sessions": [
                {"date": "2025-05-20", "startTime": "5pm", "endTime": "6pm",
                 "subject": "Math", "topic": "Geometry", "description": ""}
            ], "advice": ""}"#,
        );

        let result = run_plan(&mock, "en", request()).await;
        assert!(matches!(result, Err(AppError::UpstreamParse { .. })));
    }
}
