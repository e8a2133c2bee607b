//! Analyze handler: image/PDF in, extracted text plus worked solution out
//!
//! Exactly one file variant must be supplied. Authorization is checked
//! before any model call so unauthenticated traffic never reaches the
//! paid upstream, and an empty extraction stops the pipeline before the
//! solution step.

use axum::{extract::State, Json};
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::AppState;
use studyhall_common::{
    ai::{prompts, ChatMessage, ModelClient},
    auth::{authorize_generation, MaybeIdentity},
    errors::{AppError, Result},
    pdf,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub image_base64: Option<String>,

    #[serde(default)]
    pub pdf_base64: Option<String>,

    #[serde(default)]
    pub subject: Option<String>,

    #[serde(default)]
    pub guest_mode: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResponse {
    pub extracted_text: String,
    pub solution: String,
}

pub async fn analyze_image(
    State(state): State<AppState>,
    identity: MaybeIdentity,
    Json(request): Json<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>> {
    authorize_generation(request.guest_mode, &identity.0)?;

    let response = run_analyze(state.ai.as_ref(), &state.config.ai.language, request).await?;
    Ok(Json(response))
}

/// Decode a client-supplied base64 payload, tolerating a data-URL prefix
fn decode_base64(payload: &str) -> Result<Vec<u8>> {
    let raw = payload
        .split_once("base64,")
        .map(|(_, rest)| rest)
        .unwrap_or(payload);

    base64::engine::general_purpose::STANDARD
        .decode(raw.trim())
        .map_err(|e| AppError::InvalidFormat {
            message: format!("invalid base64 payload: {}", e),
        })
}

/// The two-step pipeline: extract, then solve. Split from the axum
/// handler so tests can drive it with a mock client.
async fn run_analyze(
    ai: &dyn ModelClient,
    language: &str,
    request: AnalyzeRequest,
) -> Result<AnalyzeResponse> {
    let extracted = match (&request.image_base64, &request.pdf_base64) {
        (Some(_), Some(_)) => {
            return Err(AppError::Validation {
                message: "provide either imageBase64 or pdfBase64, not both".to_string(),
                field: None,
            });
        }
        (Some(image), None) => ai.extract_text(image).await?,
        (None, Some(pdf)) => {
            let bytes = decode_base64(pdf)?;
            pdf::extract_text(&bytes)?.text
        }
        (None, None) => {
            return Err(AppError::MissingField {
                field: "imageBase64 | pdfBase64".to_string(),
            });
        }
    };

    let extracted = extracted.trim().to_string();
    if extracted.is_empty() {
        // Fail before the solution call; there is nothing to solve
        return Err(AppError::EmptyExtraction);
    }

    let system = prompts::solution_prompt(request.subject.as_deref(), language);
    let solution = ai
        .chat(
            &system,
            &[ChatMessage {
                role: "user".to_string(),
                content: extracted.clone(),
            }],
        )
        .await?;

    Ok(AnalyzeResponse {
        extracted_text: extracted,
        solution,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use studyhall_common::ai::{MockFailure, MockModelClient};

    fn image_request() -> AnalyzeRequest {
        AnalyzeRequest {
            image_base64: Some("aGVsbG8=".to_string()),
            pdf_base64: None,
            subject: Some("Math".to_string()),
            guest_mode: true,
        }
    }

    #[tokio::test]
    async fn test_image_pipeline_happy_path() {
        let mock = MockModelClient::new()
            .with_extraction("2x + 4 = 10, solve for x")
            .with_chat_response("Subtract 4, then divide by 2: x = 3");

        let response = run_analyze(&mock, "en", image_request()).await.unwrap();

        assert_eq!(response.extracted_text, "2x + 4 = 10, solve for x");
        assert!(response.solution.contains("x = 3"));
        assert_eq!(mock.extract_calls(), 1);
        assert_eq!(mock.chat_calls(), 1);
    }

    #[tokio::test]
    async fn test_empty_extraction_skips_solution_call() {
        let mock = MockModelClient::new().with_extraction("   \n  ");

        let result = run_analyze(&mock, "en", image_request()).await;

        assert!(matches!(result, Err(AppError::EmptyExtraction)));
        assert_eq!(mock.chat_calls(), 0);
    }

    #[tokio::test]
    async fn test_no_file_variant_rejected() {
        let mock = MockModelClient::new();
        let request = AnalyzeRequest {
            image_base64: None,
            pdf_base64: None,
            subject: None,
            guest_mode: true,
        };

        let result = run_analyze(&mock, "en", request).await;

        assert!(matches!(result, Err(AppError::MissingField { .. })));
        assert_eq!(mock.extract_calls(), 0);
    }

    #[tokio::test]
    async fn test_both_file_variants_rejected() {
        let mock = MockModelClient::new();
        let request = AnalyzeRequest {
            image_base64: Some("aGVsbG8=".to_string()),
            pdf_base64: Some("aGVsbG8=".to_string()),
            subject: None,
            guest_mode: true,
        };

        assert!(run_analyze(&mock, "en", request).await.is_err());
    }

    #[tokio::test]
    async fn test_upstream_rate_limit_propagates() {
        let mock = MockModelClient::new().failing(MockFailure::RateLimited);

        let result = run_analyze(&mock, "en", image_request()).await;

        assert!(matches!(result, Err(AppError::UpstreamRateLimited)));
    }

    #[test]
    fn test_decode_base64_tolerates_data_url() {
        assert_eq!(decode_base64("aGVsbG8=").unwrap(), b"hello");
        assert_eq!(
            decode_base64("data:application/pdf;base64,aGVsbG8=").unwrap(),
            b"hello"
        );
        assert!(decode_base64("!!not base64!!").is_err());
    }
}
