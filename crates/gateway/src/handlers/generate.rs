//! Generate-content handler: file or text in, typed structured artifact out
//!
//! The artifact shape is pinned by a contentType-specific system prompt;
//! the model reply passes through the tolerant JSON boundary and shape
//! validation before it is returned, so clients only ever see the
//! documented shapes.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::AppState;
use studyhall_common::{
    ai::{self, prompts, ChatMessage, ContentType, ModelClient, DEFAULT_ITEM_COUNT},
    auth::{authorize_generation, MaybeIdentity},
    errors::{AppError, Result},
    metrics,
};

/// Upper bound on requested item counts; larger asks degrade output quality
const MAX_ITEM_COUNT: usize = 20;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    #[serde(default)]
    pub image_base64: Option<String>,

    #[serde(default)]
    pub text_content: Option<String>,

    pub content_type: ContentType,

    #[serde(default)]
    pub subject: Option<String>,

    #[serde(default)]
    pub guest_mode: bool,

    #[serde(default)]
    pub options: GenerateOptions,
}

#[derive(Debug, Default, Deserialize)]
pub struct GenerateOptions {
    pub count: Option<usize>,

    /// Optional name for the produced deck/quiz/comic
    pub title: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub success: bool,
    pub content_type: ContentType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extracted_text: Option<String>,
    pub data: serde_json::Value,
}

pub async fn generate_content(
    State(state): State<AppState>,
    identity: MaybeIdentity,
    Json(request): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>> {
    authorize_generation(request.guest_mode, &identity.0)?;

    let content_type = request.content_type;
    let result = run_generate(state.ai.as_ref(), &state.config.ai.language, request).await;
    metrics::record_generation(content_type.as_str(), result.is_ok());

    result.map(Json)
}

async fn run_generate(
    ai: &dyn ModelClient,
    language: &str,
    request: GenerateRequest,
) -> Result<GenerateResponse> {
    // Source material: an uploaded image to extract, or inline text
    let (source, extracted_text) = match (&request.image_base64, &request.text_content) {
        (Some(image), _) => {
            let extracted = ai.extract_text(image).await?.trim().to_string();
            if extracted.is_empty() {
                return Err(AppError::EmptyExtraction);
            }
            (extracted.clone(), Some(extracted))
        }
        (None, Some(text)) => {
            let text = text.trim().to_string();
            if text.is_empty() {
                return Err(AppError::Validation {
                    message: "textContent is empty".to_string(),
                    field: Some("textContent".into()),
                });
            }
            (text, None)
        }
        (None, None) => {
            return Err(AppError::MissingField {
                field: "imageBase64 | textContent".to_string(),
            });
        }
    };

    let count = request
        .options
        .count
        .unwrap_or(DEFAULT_ITEM_COUNT)
        .clamp(1, MAX_ITEM_COUNT);

    let system = prompts::artifact_prompt(
        request.content_type,
        count,
        request.subject.as_deref(),
        language,
    );

    let user_content = match &request.options.title {
        Some(title) => format!("Title: {}\n\nMaterial:\n{}", title, source),
        None => source,
    };

    let raw = ai
        .chat(
            &system,
            &[ChatMessage {
                role: "user".to_string(),
                content: user_content,
            }],
        )
        .await?;

    let artifact = ai::parse_artifact(request.content_type, &raw)?;

    Ok(GenerateResponse {
        success: true,
        content_type: request.content_type,
        extracted_text,
        data: artifact.into_value(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use studyhall_common::ai::MockModelClient;

    fn text_request(content_type: ContentType, count: Option<usize>) -> GenerateRequest {
        GenerateRequest {
            image_base64: None,
            text_content: Some("Photosynthesis converts light into energy".to_string()),
            content_type,
            subject: Some("Biology".to_string()),
            guest_mode: true,
            options: GenerateOptions {
                count,
                title: None,
            },
        }
    }

    fn quiz_json(n: usize) -> String {
        let questions: Vec<String> = (0..n)
            .map(|i| {
                format!(
                    r#"{{"question": "Q{i}", "options": ["a", "b", "c", "d"], "correct_index": {}}}"#,
                    i % 4
                )
            })
            .collect();
        format!(r#"{{"questions": [{}]}}"#, questions.join(","))
    }

    #[tokio::test]
    async fn test_quiz_generation_shape() {
        let mock = MockModelClient::new().with_chat_response(quiz_json(3));

        let response = run_generate(&mock, "en", text_request(ContentType::Quiz, Some(3)))
            .await
            .unwrap();

        assert!(response.success);
        assert_eq!(response.content_type, ContentType::Quiz);
        assert!(response.extracted_text.is_none());

        let questions = response.data["questions"].as_array().unwrap();
        assert_eq!(questions.len(), 3);
        for question in questions {
            assert_eq!(question["options"].as_array().unwrap().len(), 4);
            let index = question["correct_index"].as_u64().unwrap();
            assert!(index < 4);
        }
    }

    #[tokio::test]
    async fn test_prose_wrapped_reply_still_parses() {
        let raw = format!("Here you go!\n{}\nHope this helps.", quiz_json(2));
        let mock = MockModelClient::new().with_chat_response(raw);

        let response = run_generate(&mock, "en", text_request(ContentType::Quiz, Some(2)))
            .await
            .unwrap();

        assert_eq!(response.data["questions"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_reply_without_json_is_parse_error_with_raw() {
        let mock = MockModelClient::new().with_chat_response("Sorry, I can't do that.");

        let result = run_generate(&mock, "en", text_request(ContentType::Flashcards, None)).await;

        match result {
            Err(AppError::UpstreamParse { raw }) => assert!(raw.contains("Sorry")),
            other => panic!("expected parse error, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_image_with_empty_extraction_makes_no_generation_call() {
        let mock = MockModelClient::new().with_extraction("  ");
        let request = GenerateRequest {
            image_base64: Some("aGVsbG8=".to_string()),
            ..text_request(ContentType::Synthesis, None)
        };

        let result = run_generate(&mock, "en", request).await;

        assert!(matches!(result, Err(AppError::EmptyExtraction)));
        assert_eq!(mock.chat_calls(), 0);
    }

    #[tokio::test]
    async fn test_image_source_reports_extracted_text() {
        let mock = MockModelClient::new()
            .with_extraction("The water cycle")
            .with_chat_response(
                r#"{"title": "Water Cycle", "content": "Evaporation...", "tags": ["science"]}"#,
            );
        let request = GenerateRequest {
            image_base64: Some("aGVsbG8=".to_string()),
            text_content: None,
            ..text_request(ContentType::Synthesis, None)
        };

        let response = run_generate(&mock, "en", request).await.unwrap();

        assert_eq!(response.extracted_text.as_deref(), Some("The water cycle"));
        assert_eq!(response.data["title"], "Water Cycle");
    }

    #[tokio::test]
    async fn test_missing_source_rejected() {
        let mock = MockModelClient::new();
        let request = GenerateRequest {
            text_content: None,
            ..text_request(ContentType::Flashcards, None)
        };

        let result = run_generate(&mock, "en", request).await;

        assert!(matches!(result, Err(AppError::MissingField { .. })));
        assert_eq!(mock.chat_calls(), 0);
    }
}
