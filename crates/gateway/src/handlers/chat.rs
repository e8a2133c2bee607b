//! Study chat handler: a stateless pass-through to the text model with a
//! pedagogical system prompt

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::AppState;
use studyhall_common::{
    ai::{prompts, ChatMessage},
    auth::{authorize_generation, MaybeIdentity},
    errors::{AppError, Result},
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,

    #[serde(default)]
    pub subject: Option<String>,

    #[serde(default)]
    pub guest_mode: bool,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub message: String,
    pub role: &'static str,
}

pub async fn chat_ai(
    State(state): State<AppState>,
    identity: MaybeIdentity,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>> {
    authorize_generation(request.guest_mode, &identity.0)?;

    if request.messages.is_empty() {
        return Err(AppError::MissingField {
            field: "messages".to_string(),
        });
    }

    let system = prompts::chat_prompt(request.subject.as_deref(), &state.config.ai.language);
    let message = state.ai.chat(&system, &request.messages).await?;

    Ok(Json(ChatResponse {
        message,
        role: "assistant",
    }))
}
