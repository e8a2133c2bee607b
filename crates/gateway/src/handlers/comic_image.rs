//! Comic panel image generation
//!
//! Panel requests are issued independently by the client, one per panel,
//! and are idempotent to retry. On upstream failure the response carries a
//! subject-matched emoji fallback so the reader can render a placeholder
//! panel instead of a hole.

use axum::{
    extract::State,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::AppState;
use studyhall_common::{
    ai::prompts,
    auth::{authorize_generation, MaybeIdentity},
    errors::Result,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComicImageRequest {
    pub panel_description: String,

    pub subject: String,

    #[serde(default)]
    pub style: Option<String>,

    #[serde(default)]
    pub guest_mode: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComicImageResponse {
    pub success: bool,
    pub image_url: String,
}

/// Placeholder glyph shown when panel art cannot be generated
fn fallback_glyph(subject: &str) -> &'static str {
    let subject = subject.to_lowercase();
    if subject.contains("math") {
        "📐"
    } else if subject.contains("science") || subject.contains("bio") || subject.contains("chem") {
        "🔬"
    } else if subject.contains("hist") {
        "📜"
    } else if subject.contains("lang") || subject.contains("lit") {
        "📚"
    } else {
        "🎨"
    }
}

pub async fn generate_comic_image(
    State(state): State<AppState>,
    identity: MaybeIdentity,
    Json(request): Json<ComicImageRequest>,
) -> Result<Response> {
    authorize_generation(request.guest_mode, &identity.0)?;

    let prompt = prompts::comic_image_prompt(
        &request.panel_description,
        &request.subject,
        request.style.as_deref(),
    );

    match state.ai.generate_image(&prompt).await {
        Ok(image_url) => Ok(Json(ComicImageResponse {
            success: true,
            image_url,
        })
        .into_response()),
        Err(e) => {
            let status = e.status_code();
            tracing::warn!(error = %e, "Panel image generation failed, returning fallback");
            let body = serde_json::json!({
                "error": e.to_string(),
                "fallback": fallback_glyph(&request.subject),
            });
            Ok((status, Json(body)).into_response())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_glyph_by_subject() {
        assert_eq!(fallback_glyph("Mathematics"), "📐");
        assert_eq!(fallback_glyph("Biology"), "🔬");
        assert_eq!(fallback_glyph("History"), "📜");
        assert_eq!(fallback_glyph("English Literature"), "📚");
        assert_eq!(fallback_glyph("Music"), "🎨");
    }
}
