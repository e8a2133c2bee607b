//! AI gateway abstraction
//!
//! Provides a unified interface over the upstream model provider:
//! - Chat / solution generation (text model)
//! - Text extraction from images (vision model)
//! - Comic panel image generation (image model)
//!
//! Upstream status mapping is part of the client contract: a provider 429
//! surfaces as 429, a 402 as 402, anything else as a generic AI service
//! error. Structured output goes through a two-stage boundary: the model
//! is instructed to emit strict JSON, then the reply is run through a
//! tolerant extraction plus typed validation with a raw-text-preserving
//! failure path, so the rest of the pipeline only ever sees valid data.

pub mod prompts;

use crate::config::AiConfig;
use crate::domain::{self, Panel};
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Default number of items a generation request produces
pub const DEFAULT_ITEM_COUNT: usize = 5;

/// A chat turn as sent by clients
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// The artifact kinds the generation endpoint can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Flashcards,
    Quiz,
    Synthesis,
    Comic,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Flashcards => "flashcards",
            ContentType::Quiz => "quiz",
            ContentType::Synthesis => "synthesis",
            ContentType::Comic => "comic",
        }
    }
}

/// Trait for upstream model access
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Run a chat completion with a system prompt and prior turns
    async fn chat(&self, system: &str, messages: &[ChatMessage]) -> Result<String>;

    /// Extract raw text from a base64-encoded image via the vision model
    async fn extract_text(&self, image_base64: &str) -> Result<String>;

    /// Generate an image for a comic panel, returning its URL
    async fn generate_image(&self, prompt: &str) -> Result<String>;
}

/// Map an upstream provider status onto the client contract
pub fn map_upstream_status(status: u16, body: &str) -> AppError {
    match status {
        429 => AppError::UpstreamRateLimited,
        402 => AppError::UpstreamCredits,
        _ => AppError::AiService {
            message: format!("upstream status {}: {}", status, body),
        },
    }
}

/// Whether a failed upstream call is worth retrying
fn is_retryable(status: u16) -> bool {
    status >= 500
}

// ============================================================================
// OpenAI-compatible client
// ============================================================================

#[derive(Serialize)]
struct ApiMessage {
    role: String,
    /// Either a plain string or a multimodal part array
    content: serde_json::Value,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ApiMessage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Serialize)]
struct ImageRequest {
    model: String,
    prompt: String,
    n: u8,
    size: String,
}

#[derive(Deserialize)]
struct ImageDatum {
    url: Option<String>,
    b64_json: Option<String>,
}

#[derive(Deserialize)]
struct ImageResponse {
    data: Vec<ImageDatum>,
}

/// Client for an OpenAI-compatible gateway
pub struct OpenAiClient {
    client: reqwest::Client,
    config: AiConfig,
}

impl OpenAiClient {
    pub fn new(config: AiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Internal {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self { client, config })
    }

    fn api_key(&self) -> Result<&str> {
        self.config.api_key.as_deref().ok_or_else(|| AppError::Configuration {
            message: "AI gateway API key not configured".to_string(),
        })
    }

    /// POST a chat request, retrying transient upstream failures. Expected
    /// rate/credit statuses surface immediately so the caller-facing
    /// mapping stays exact.
    async fn chat_completion(&self, model: &str, messages: Vec<ApiMessage>) -> Result<String> {
        let url = format!("{}/chat/completions", self.config.api_base);
        let api_key = self.api_key()?.to_string();
        let request = ChatRequest {
            model: model.to_string(),
            messages,
        };

        let started = std::time::Instant::now();
        let mut attempt = 0;
        let result = loop {
            if attempt > 0 {
                let delay = Duration::from_millis(200 * (2_u64.pow(attempt - 1)));
                tokio::time::sleep(delay).await;
            }

            let response = match self
                .client
                .post(&url)
                .header("Authorization", format!("Bearer {}", api_key))
                .json(&request)
                .send()
                .await
            {
                Ok(response) => response,
                Err(e) => {
                    if attempt < self.config.max_retries {
                        tracing::warn!(attempt = attempt + 1, error = %e, "Model request failed, retrying");
                        attempt += 1;
                        continue;
                    }
                    break Err(e.into());
                }
            };

            let status = response.status().as_u16();
            if response.status().is_success() {
                let parsed: ChatResponse = response.json().await.map_err(|e| AppError::AiService {
                    message: format!("Failed to decode model response: {}", e),
                })?;
                let content = parsed
                    .choices
                    .into_iter()
                    .next()
                    .map(|c| c.message.content)
                    .ok_or_else(|| AppError::AiService {
                        message: "Empty choices in model response".to_string(),
                    })?;
                break Ok(content);
            }

            let body = response.text().await.unwrap_or_default();
            if is_retryable(status) && attempt < self.config.max_retries {
                tracing::warn!(attempt = attempt + 1, status, "Upstream error, retrying");
                attempt += 1;
                continue;
            }
            break Err(map_upstream_status(status, &body));
        };

        crate::metrics::record_ai_call(model, started.elapsed().as_secs_f64(), result.is_ok());
        result
    }
}

/// Normalize a client-supplied base64 payload into a data URL
fn to_data_url(image_base64: &str) -> String {
    if image_base64.starts_with("data:") {
        image_base64.to_string()
    } else {
        format!("data:image/jpeg;base64,{}", image_base64)
    }
}

#[async_trait]
impl ModelClient for OpenAiClient {
    async fn chat(&self, system: &str, messages: &[ChatMessage]) -> Result<String> {
        let mut api_messages = Vec::with_capacity(messages.len() + 1);
        api_messages.push(ApiMessage {
            role: "system".to_string(),
            content: serde_json::Value::String(system.to_string()),
        });
        for message in messages {
            api_messages.push(ApiMessage {
                role: message.role.clone(),
                content: serde_json::Value::String(message.content.clone()),
            });
        }

        self.chat_completion(&self.config.text_model, api_messages).await
    }

    async fn extract_text(&self, image_base64: &str) -> Result<String> {
        let messages = vec![
            ApiMessage {
                role: "system".to_string(),
                content: serde_json::Value::String(prompts::extraction_prompt().to_string()),
            },
            ApiMessage {
                role: "user".to_string(),
                content: serde_json::json!([
                    { "type": "text", "text": "Extract all text from this document." },
                    {
                        "type": "image_url",
                        "image_url": { "url": to_data_url(image_base64), "detail": "high" }
                    }
                ]),
            },
        ];

        self.chat_completion(&self.config.vision_model, messages).await
    }

    async fn generate_image(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/images/generations", self.config.api_base);
        let request = ImageRequest {
            model: self.config.image_model.clone(),
            prompt: prompt.to_string(),
            n: 1,
            size: "1024x1024".to_string(),
        };

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key()?))
            .json(&request)
            .send()
            .await?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_upstream_status(status, &body));
        }

        let parsed: ImageResponse = response.json().await.map_err(|e| AppError::AiService {
            message: format!("Failed to decode image response: {}", e),
        })?;

        let datum = parsed.data.into_iter().next().ok_or_else(|| AppError::AiService {
            message: "Empty data in image response".to_string(),
        })?;

        match (datum.url, datum.b64_json) {
            (Some(url), _) => Ok(url),
            (None, Some(b64)) => Ok(format!("data:image/png;base64,{}", b64)),
            (None, None) => Err(AppError::AiService {
                message: "Image response carried neither url nor payload".to_string(),
            }),
        }
    }
}

// ============================================================================
// Tolerant JSON extraction
// ============================================================================

/// Pull the first `{...}` span out of a free-form model reply and parse it.
/// Models asked for strict JSON still occasionally wrap the object in prose
/// or a code fence; the span search tolerates that. A reply with no
/// parseable object fails with the raw text attached for diagnosis.
pub fn extract_json_object(raw: &str) -> Result<serde_json::Value> {
    let start = raw.find('{').ok_or_else(|| AppError::UpstreamParse {
        raw: raw.to_string(),
    })?;
    let end = raw.rfind('}').filter(|&end| end > start).ok_or_else(|| {
        AppError::UpstreamParse {
            raw: raw.to_string(),
        }
    })?;

    serde_json::from_str(&raw[start..=end]).map_err(|_| AppError::UpstreamParse {
        raw: raw.to_string(),
    })
}

// ============================================================================
// Typed artifacts
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlashcardFace {
    pub front: String,
    pub back: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlashcardsArtifact {
    pub flashcards: Vec<FlashcardFace>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub correct_index: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizArtifact {
    pub questions: Vec<GeneratedQuestion>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisArtifact {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComicArtifact {
    pub title: String,
    pub panels: Vec<Panel>,
}

/// A parsed, validated generation result
#[derive(Debug, Clone)]
pub enum GeneratedArtifact {
    Flashcards(FlashcardsArtifact),
    Quiz(QuizArtifact),
    Synthesis(SynthesisArtifact),
    Comic(ComicArtifact),
}

impl GeneratedArtifact {
    /// Wire representation for the `data` field of the response
    pub fn into_value(self) -> serde_json::Value {
        match self {
            GeneratedArtifact::Flashcards(a) => serde_json::to_value(a),
            GeneratedArtifact::Quiz(a) => serde_json::to_value(a),
            GeneratedArtifact::Synthesis(a) => serde_json::to_value(a),
            GeneratedArtifact::Comic(a) => serde_json::to_value(a),
        }
        .expect("artifacts serialize infallibly")
    }
}

/// Parse and validate a model reply into the requested artifact shape.
/// Both malformed JSON and shape violations fail with the raw text.
pub fn parse_artifact(content_type: ContentType, raw: &str) -> Result<GeneratedArtifact> {
    let value = extract_json_object(raw)?;
    let parse_failure = || AppError::UpstreamParse {
        raw: raw.to_string(),
    };

    match content_type {
        ContentType::Flashcards => {
            let artifact: FlashcardsArtifact =
                serde_json::from_value(value).map_err(|_| parse_failure())?;
            if artifact.flashcards.is_empty() {
                return Err(parse_failure());
            }
            Ok(GeneratedArtifact::Flashcards(artifact))
        }
        ContentType::Quiz => {
            let artifact: QuizArtifact =
                serde_json::from_value(value).map_err(|_| parse_failure())?;
            if artifact.questions.is_empty() {
                return Err(parse_failure());
            }
            for question in &artifact.questions {
                domain::validate_quiz_shape(&question.options, question.correct_index)
                    .map_err(|_| parse_failure())?;
            }
            Ok(GeneratedArtifact::Quiz(artifact))
        }
        ContentType::Synthesis => {
            let artifact: SynthesisArtifact =
                serde_json::from_value(value).map_err(|_| parse_failure())?;
            Ok(GeneratedArtifact::Synthesis(artifact))
        }
        ContentType::Comic => {
            let artifact: ComicArtifact =
                serde_json::from_value(value).map_err(|_| parse_failure())?;
            if artifact.panels.is_empty() {
                return Err(parse_failure());
            }
            Ok(GeneratedArtifact::Comic(artifact))
        }
    }
}

// ============================================================================
// Study plan artifact
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedSession {
    pub date: chrono::NaiveDate,
    pub start_time: String,
    pub end_time: String,
    pub subject: String,
    pub topic: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudyPlanArtifact {
    pub sessions: Vec<PlannedSession>,
    #[serde(default)]
    pub advice: String,
}

/// Parse and validate a study-plan reply; sessions with malformed times or
/// a window that ends before it starts are treated as parse failures
pub fn parse_study_plan(raw: &str) -> Result<StudyPlanArtifact> {
    let value = extract_json_object(raw)?;
    let parse_failure = || AppError::UpstreamParse {
        raw: raw.to_string(),
    };

    let artifact: StudyPlanArtifact =
        serde_json::from_value(value).map_err(|_| parse_failure())?;
    if artifact.sessions.is_empty() {
        return Err(parse_failure());
    }
    for session in &artifact.sessions {
        domain::validate_session_window(&session.start_time, &session.end_time)
            .map_err(|_| parse_failure())?;
    }
    Ok(artifact)
}

// ============================================================================
// Mock client for testing
// ============================================================================

/// Forced failure modes for the mock client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFailure {
    RateLimited,
    Credits,
    Service,
}

impl MockFailure {
    fn to_error(self) -> AppError {
        match self {
            MockFailure::RateLimited => AppError::UpstreamRateLimited,
            MockFailure::Credits => AppError::UpstreamCredits,
            MockFailure::Service => AppError::AiService {
                message: "mock upstream failure".to_string(),
            },
        }
    }
}

/// Deterministic client for tests; counts calls so tests can assert that a
/// failed extraction never triggers a generation call
#[derive(Default)]
pub struct MockModelClient {
    chat_response: String,
    extraction_response: String,
    image_url: String,
    failure: Option<MockFailure>,
    chat_calls: AtomicUsize,
    extract_calls: AtomicUsize,
    image_calls: AtomicUsize,
}

impl MockModelClient {
    pub fn new() -> Self {
        Self {
            chat_response: "mock reply".to_string(),
            extraction_response: "mock extracted text".to_string(),
            image_url: "https://images.example/panel.png".to_string(),
            ..Default::default()
        }
    }

    pub fn with_chat_response(mut self, response: impl Into<String>) -> Self {
        self.chat_response = response.into();
        self
    }

    pub fn with_extraction(mut self, response: impl Into<String>) -> Self {
        self.extraction_response = response.into();
        self
    }

    pub fn failing(mut self, failure: MockFailure) -> Self {
        self.failure = Some(failure);
        self
    }

    pub fn chat_calls(&self) -> usize {
        self.chat_calls.load(Ordering::SeqCst)
    }

    pub fn extract_calls(&self) -> usize {
        self.extract_calls.load(Ordering::SeqCst)
    }

    pub fn image_calls(&self) -> usize {
        self.image_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ModelClient for MockModelClient {
    async fn chat(&self, _system: &str, _messages: &[ChatMessage]) -> Result<String> {
        self.chat_calls.fetch_add(1, Ordering::SeqCst);
        match self.failure {
            Some(failure) => Err(failure.to_error()),
            None => Ok(self.chat_response.clone()),
        }
    }

    async fn extract_text(&self, _image_base64: &str) -> Result<String> {
        self.extract_calls.fetch_add(1, Ordering::SeqCst);
        match self.failure {
            Some(failure) => Err(failure.to_error()),
            None => Ok(self.extraction_response.clone()),
        }
    }

    async fn generate_image(&self, _prompt: &str) -> Result<String> {
        self.image_calls.fetch_add(1, Ordering::SeqCst);
        match self.failure {
            Some(failure) => Err(failure.to_error()),
            None => Ok(self.image_url.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping_contract() {
        assert!(matches!(
            map_upstream_status(429, ""),
            AppError::UpstreamRateLimited
        ));
        assert!(matches!(
            map_upstream_status(402, ""),
            AppError::UpstreamCredits
        ));
        assert!(matches!(
            map_upstream_status(503, "overloaded"),
            AppError::AiService { .. }
        ));
    }

    #[test]
    fn test_extract_json_surrounded_by_prose() {
        let raw = "Sure! Here is your quiz:\n```json\n{\"questions\": []}\n```\nEnjoy!";
        let value = extract_json_object(raw).unwrap();
        assert!(value["questions"].is_array());
    }

    #[test]
    fn test_extract_json_without_object_keeps_raw() {
        let raw = "I could not produce a quiz for that input.";
        match extract_json_object(raw) {
            Err(AppError::UpstreamParse { raw: attached }) => assert_eq!(attached, raw),
            other => panic!("expected parse error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_parse_quiz_artifact() {
        let raw = r#"{"questions": [
            {"question": "What does photosynthesis produce?",
             "options": ["Glucose", "Salt", "Iron", "Wool"],
             "correct_index": 0}
        ]}"#;
        let artifact = parse_artifact(ContentType::Quiz, raw).unwrap();
        match artifact {
            GeneratedArtifact::Quiz(quiz) => {
                assert_eq!(quiz.questions.len(), 1);
                assert_eq!(quiz.questions[0].options.len(), 4);
            }
            _ => panic!("wrong artifact kind"),
        }
    }

    #[test]
    fn test_parse_quiz_rejects_bad_shape() {
        let raw = r#"{"questions": [
            {"question": "Broken", "options": ["a", "b"], "correct_index": 0}
        ]}"#;
        assert!(matches!(
            parse_artifact(ContentType::Quiz, raw),
            Err(AppError::UpstreamParse { .. })
        ));

        let raw = r#"{"questions": [
            {"question": "Broken", "options": ["a", "b", "c", "d"], "correct_index": 4}
        ]}"#;
        assert!(matches!(
            parse_artifact(ContentType::Quiz, raw),
            Err(AppError::UpstreamParse { .. })
        ));
    }

    #[test]
    fn test_parse_comic_artifact_wire_shape() {
        let raw = r#"{"title": "Fraction Quest", "panels": [
            {"id": 1, "content": "A knight splits a pizza", "hasDialog": true, "dialog": "Halves!"}
        ]}"#;
        let artifact = parse_artifact(ContentType::Comic, raw).unwrap();
        let value = artifact.into_value();
        assert_eq!(value["panels"][0]["hasDialog"], true);
    }

    #[test]
    fn test_parse_synthesis_artifact() {
        let raw = r#"before {"title": "WWII", "content": "Summary...", "tags": ["history"]} after"#;
        let artifact = parse_artifact(ContentType::Synthesis, raw).unwrap();
        match artifact {
            GeneratedArtifact::Synthesis(s) => assert_eq!(s.tags, vec!["history".to_string()]),
            _ => panic!("wrong artifact kind"),
        }
    }

    #[test]
    fn test_parse_study_plan_validates_windows() {
        let good = r#"{"sessions": [
            {"date": "2025-05-20", "startTime": "09:00", "endTime": "10:30",
             "subject": "Math", "topic": "Algebra", "description": "Drill equations"}
        ], "advice": "Short daily sessions beat cramming."}"#;
        let plan = parse_study_plan(good).unwrap();
        assert_eq!(plan.sessions.len(), 1);

        let backwards = r#"{"sessions": [
            {"date": "2025-05-20", "startTime": "10:30", "endTime": "09:00",
             "subject": "Math", "topic": "Algebra", "description": ""}
        ]}"#;
        assert!(matches!(
            parse_study_plan(backwards),
            Err(AppError::UpstreamParse { .. })
        ));
    }

    #[test]
    fn test_data_url_normalization() {
        assert!(to_data_url("abc123").starts_with("data:image/jpeg;base64,"));
        assert_eq!(to_data_url("data:image/png;base64,xyz"), "data:image/png;base64,xyz");
    }

    #[tokio::test]
    async fn test_mock_counts_calls() {
        let mock = MockModelClient::new();
        mock.chat("system", &[]).await.unwrap();
        mock.chat("system", &[]).await.unwrap();
        assert_eq!(mock.chat_calls(), 2);
        assert_eq!(mock.extract_calls(), 0);
    }
}
