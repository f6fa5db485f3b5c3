//! # API Module
//!
//! Wire adapters for the external generation service.
//!
//! Every adapter implements [`GenerationBackend`], which takes one
//! provider-neutral [`GenerationRequest`] and returns the produced text:
//!
//! - `Ok(Some(text))` when the service produced non-empty text,
//! - `Ok(None)` when it answered without usable text,
//! - `Err(GenerationError)` for anything that went wrong on the way.
//!
//! Two adapters are provided:
//!
//! - [`GeminiBackend`] speaks Google's `generateContent` JSON over `reqwest`.
//! - [`OpenAiBackend`] uses `async-openai` against any OpenAI-compatible
//!   `/chat/completions` endpoint. The `model` role maps to `assistant`.
//!
//! A backend is built once per process with [`create_backend`] and shared
//! read-only behind an `Arc`; it holds nothing but the credential and an HTTP
//! client, so concurrent requests need no locking.
//!
//! # Example
//!
//! ```no_run
//! use applemar_bot::api::{create_backend, Content, GenerationRequest};
//! use applemar_bot::config::AppConfig;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let backend = create_backend(&AppConfig::default())?;
//! let request = GenerationRequest::new(
//!     "gemini-3-flash-preview",
//!     "You are a helpful assistant.",
//!     vec![Content::user("Olá!")],
//! );
//! let text = backend.generate(&request).await?;
//! println!("{text:?}");
//! # Ok(()) }
//! ```

use std::{sync::Arc, time::Duration};

use async_openai::{
    Client,
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
};
use async_trait::async_trait;
use backoff::ExponentialBackoff;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{AppConfig, Provider};

/// Sampling temperature sent with every request.
pub const TEMPERATURE: f64 = 0.7;

/// Nucleus sampling parameter sent with every request.
pub const TOP_P: f64 = 0.95;

/// Errors raised by a [`GenerationBackend`].
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("upstream returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("OpenAI-compatible API error: {0}")]
    OpenAi(#[from] OpenAIError),

    #[error("upstream call timed out after {0:?}")]
    Timeout(Duration),

    #[error("could not build request: {0}")]
    Build(String),
}

/// Speaker of a request entry, in the generation service's vocabulary.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Model => "model",
        }
    }
}

/// One role-tagged entry of the request's message sequence.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Content {
    pub role: Role,
    pub text: String,
}

impl Content {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            text: text.into(),
        }
    }
}

/// Provider-neutral generation request.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub model: String,
    pub system_instruction: String,
    pub contents: Vec<Content>,
    pub temperature: f64,
    pub top_p: f64,
}

impl GenerationRequest {
    /// Build a request with the fixed sampling parameters.
    pub fn new(
        model: impl Into<String>,
        system_instruction: impl Into<String>,
        contents: Vec<Content>,
    ) -> Self {
        Self {
            model: model.into(),
            system_instruction: system_instruction.into(),
            contents,
            temperature: TEMPERATURE,
            top_p: TOP_P,
        }
    }
}

/// A generation service the reply generator can delegate to.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &str;

    /// Send `request` and return the produced text, if any.
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<Option<String>, GenerationError>;
}

/// Build the backend selected by `config`.
///
/// The API key is resolved here, once, and never validated.
pub fn create_backend(config: &AppConfig) -> Result<Arc<dyn GenerationBackend>, GenerationError> {
    let api_key = config.resolve_api_key();
    let backend: Arc<dyn GenerationBackend> = match config.provider {
        Provider::Gemini => Arc::new(GeminiBackend::new(config.api_base.clone(), api_key)?),
        Provider::OpenAi => Arc::new(OpenAiBackend::new(config.api_base.clone(), api_key)),
    };
    debug!(
        "Created {} backend for {}",
        backend.name(),
        config.api_base
    );
    Ok(backend)
}

// --- Gemini --------------------------------------------------------------------------------

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<WireContent<'a>>,
    system_instruction: WireInstruction<'a>,
    generation_config: WireGenerationConfig,
}

#[derive(Serialize, Debug)]
struct WireContent<'a> {
    role: &'static str,
    parts: Vec<WirePart<'a>>,
}

#[derive(Serialize, Debug)]
struct WireInstruction<'a> {
    parts: Vec<WirePart<'a>>,
}

#[derive(Serialize, Debug)]
struct WirePart<'a> {
    text: &'a str,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct WireGenerationConfig {
    temperature: f64,
    top_p: f64,
}

#[derive(Deserialize, Debug, Default)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize, Debug)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize, Debug)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize, Debug)]
struct ResponsePart {
    text: Option<String>,
    #[serde(default)]
    thought: bool,
}

impl<'a> From<&'a GenerationRequest> for GenerateContentRequest<'a> {
    fn from(request: &'a GenerationRequest) -> Self {
        Self {
            contents: request
                .contents
                .iter()
                .map(|content| WireContent {
                    role: content.role.as_str(),
                    parts: vec![WirePart {
                        text: &content.text,
                    }],
                })
                .collect(),
            system_instruction: WireInstruction {
                parts: vec![WirePart {
                    text: &request.system_instruction,
                }],
            },
            generation_config: WireGenerationConfig {
                temperature: request.temperature,
                top_p: request.top_p,
            },
        }
    }
}

impl GenerateContentResponse {
    /// Text of the first candidate, thought parts excluded.
    fn text(self) -> Option<String> {
        let content = self.candidates.into_iter().next()?.content?;
        let text: String = content
            .parts
            .into_iter()
            .filter(|part| !part.thought)
            .filter_map(|part| part.text)
            .collect();
        (!text.is_empty()).then_some(text)
    }
}

/// Google Gemini `generateContent` adapter.
#[derive(Debug, Clone)]
pub struct GeminiBackend {
    http: reqwest::Client,
    api_base: String,
    api_key: String,
}

impl GeminiBackend {
    pub fn new(
        api_base: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self, GenerationError> {
        Ok(Self {
            http: reqwest::Client::builder()
                .build()
                .map_err(|e| GenerationError::Build(e.to_string()))?,
            api_base: api_base.into(),
            api_key: api_key.into(),
        })
    }

    fn endpoint(&self, model: &str) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.api_base.trim_end_matches('/'),
            model
        )
    }
}

#[async_trait]
impl GenerationBackend for GeminiBackend {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<Option<String>, GenerationError> {
        let url = self.endpoint(&request.model);
        let body = GenerateContentRequest::from(request);
        debug!(
            "Sending generateContent to {} with {} contents",
            url,
            body.contents.len()
        );

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateContentResponse = response.json().await?;
        Ok(parsed.text())
    }
}

// --- OpenAI-compatible ---------------------------------------------------------------------

/// A backoff that never schedules a retry: one upstream attempt per call.
fn single_attempt() -> ExponentialBackoff {
    ExponentialBackoff {
        max_elapsed_time: Some(Duration::ZERO),
        ..ExponentialBackoff::default()
    }
}

fn build_error(err: OpenAIError) -> GenerationError {
    GenerationError::Build(err.to_string())
}

/// Chat-completions adapter for OpenAI-compatible servers.
#[derive(Debug, Clone)]
pub struct OpenAiBackend {
    client: Client<OpenAIConfig>,
}

impl OpenAiBackend {
    pub fn new(api_base: impl Into<String>, api_key: impl Into<String>) -> Self {
        let openai_config = OpenAIConfig::new()
            .with_api_key(api_key.into())
            .with_api_base(api_base.into());
        Self {
            client: Client::with_config(openai_config).with_backoff(single_attempt()),
        }
    }

    /// System message first, then the conversation with `model` as `assistant`.
    fn messages(
        request: &GenerationRequest,
    ) -> Result<Vec<ChatCompletionRequestMessage>, GenerationError> {
        let mut messages: Vec<ChatCompletionRequestMessage> =
            Vec::with_capacity(request.contents.len() + 1);
        messages.push(
            ChatCompletionRequestSystemMessageArgs::default()
                .content(request.system_instruction.clone())
                .build()
                .map_err(build_error)?
                .into(),
        );

        for content in &request.contents {
            let message: ChatCompletionRequestMessage = match content.role {
                Role::User => ChatCompletionRequestUserMessageArgs::default()
                    .content(content.text.clone())
                    .build()
                    .map_err(build_error)?
                    .into(),
                Role::Model => ChatCompletionRequestAssistantMessageArgs::default()
                    .content(content.text.clone())
                    .build()
                    .map_err(build_error)?
                    .into(),
            };
            messages.push(message);
        }

        Ok(messages)
    }
}

#[async_trait]
impl GenerationBackend for OpenAiBackend {
    fn name(&self) -> &str {
        "openai"
    }

    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<Option<String>, GenerationError> {
        let chat_request = CreateChatCompletionRequestArgs::default()
            .model(request.model.clone())
            .messages(Self::messages(request)?)
            .temperature(request.temperature as f32)
            .top_p(request.top_p as f32)
            .build()
            .map_err(build_error)?;

        debug!("Sending request: {:?}", chat_request);

        let response = self.client.chat().create(chat_request).await?;

        Ok(response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|text| !text.is_empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn sample_request() -> GenerationRequest {
        GenerationRequest::new(
            "test-model",
            "You are a test.",
            vec![
                Content::user("Olá"),
                Content::model("Olá! Como posso ajudar?"),
                Content::user("Têm stock?"),
            ],
        )
    }

    #[test]
    fn test_gemini_wire_body_shape() {
        let request = sample_request();
        let body = serde_json::to_value(GenerateContentRequest::from(&request)).unwrap();

        assert_eq!(
            body,
            json!({
                "contents": [
                    {"role": "user", "parts": [{"text": "Olá"}]},
                    {"role": "model", "parts": [{"text": "Olá! Como posso ajudar?"}]},
                    {"role": "user", "parts": [{"text": "Têm stock?"}]}
                ],
                "systemInstruction": {"parts": [{"text": "You are a test."}]},
                "generationConfig": {"temperature": 0.7, "topP": 0.95}
            })
        );
    }

    #[test]
    fn test_gemini_response_text_joins_parts_and_skips_thoughts() {
        let parsed: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {"role": "model", "parts": [
                    {"text": "pensando...", "thought": true},
                    {"text": "Sim, "},
                    {"text": "temos."}
                ]},
                "finishReason": "STOP"
            }]
        }))
        .unwrap();
        assert_eq!(parsed.text().as_deref(), Some("Sim, temos."));
    }

    #[test]
    fn test_gemini_response_without_text_is_none() {
        let no_candidates: GenerateContentResponse = serde_json::from_value(json!({})).unwrap();
        assert_eq!(no_candidates.text(), None);

        let blocked: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{"finishReason": "SAFETY"}]
        }))
        .unwrap();
        assert_eq!(blocked.text(), None);

        let empty: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{"content": {"parts": [{"text": ""}]}}]
        }))
        .unwrap();
        assert_eq!(empty.text(), None);
    }

    #[tokio::test]
    async fn test_gemini_backend_happy_path() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1beta/models/test-model:generateContent")
                    .header("x-goog-api-key", "test-key");
                then.status(200)
                    .header("content-type", "application/json")
                    .json_body(json!({
                        "candidates": [{
                            "content": {"role": "model", "parts": [{"text": "Temos sim."}]}
                        }]
                    }));
            })
            .await;

        let backend = GeminiBackend::new(server.url("/v1beta/"), "test-key").unwrap();
        let text = backend.generate(&sample_request()).await.unwrap();

        mock.assert_async().await;
        assert_eq!(text.as_deref(), Some("Temos sim."));
    }

    #[tokio::test]
    async fn test_gemini_backend_error_status() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(429).body("quota exceeded");
            })
            .await;

        let backend = GeminiBackend::new(server.url("/v1beta"), "test-key").unwrap();
        let err = backend.generate(&sample_request()).await.unwrap_err();

        match err {
            GenerationError::Status { status, body } => {
                assert_eq!(status, 429);
                assert_eq!(body, "quota exceeded");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_gemini_backend_malformed_body() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(200).body("<html>not json</html>");
            })
            .await;

        let backend = GeminiBackend::new(server.url("/v1beta"), "test-key").unwrap();
        let result = backend.generate(&sample_request()).await;
        assert!(matches!(result, Err(GenerationError::Http(_))));
    }

    #[test]
    fn test_openai_messages_map_model_to_assistant() {
        let messages = OpenAiBackend::messages(&sample_request()).unwrap();
        assert_eq!(messages.len(), 4);
        assert!(matches!(messages[0], ChatCompletionRequestMessage::System(_)));
        assert!(matches!(messages[1], ChatCompletionRequestMessage::User(_)));
        assert!(matches!(messages[2], ChatCompletionRequestMessage::Assistant(_)));
        assert!(matches!(messages[3], ChatCompletionRequestMessage::User(_)));
    }

    #[tokio::test]
    async fn test_openai_backend_happy_path() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/chat/completions");
                then.status(200)
                    .header("content-type", "application/json")
                    .json_body(json!({
                        "id": "chatcmpl-1",
                        "object": "chat.completion",
                        "created": 1_700_000_000,
                        "model": "test-model",
                        "choices": [{
                            "index": 0,
                            "message": {"role": "assistant", "content": "Bom dia!"},
                            "finish_reason": "stop"
                        }]
                    }));
            })
            .await;

        let backend = OpenAiBackend::new(server.url("/v1"), "test-key");
        let text = backend.generate(&sample_request()).await.unwrap();

        mock.assert_async().await;
        assert_eq!(text.as_deref(), Some("Bom dia!"));
    }

    #[tokio::test]
    async fn test_openai_backend_auth_failure() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/chat/completions");
                then.status(401)
                    .header("content-type", "application/json")
                    .json_body(json!({
                        "error": {
                            "message": "Incorrect API key provided",
                            "type": "invalid_request_error",
                            "param": null,
                            "code": "invalid_api_key"
                        }
                    }));
            })
            .await;

        let backend = OpenAiBackend::new(server.url("/v1"), "");
        let result = backend.generate(&sample_request()).await;
        assert!(matches!(result, Err(GenerationError::OpenAi(_))));
    }

    #[tokio::test]
    async fn test_openai_backend_server_error_is_not_retried() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/chat/completions");
                then.status(503)
                    .header("content-type", "application/json")
                    .json_body(json!({
                        "error": {
                            "message": "The server is overloaded",
                            "type": "server_error",
                            "param": null,
                            "code": null
                        }
                    }));
            })
            .await;

        let backend = OpenAiBackend::new(server.url("/v1"), "test-key");
        let result = tokio::time::timeout(
            Duration::from_secs(5),
            backend.generate(&sample_request()),
        )
        .await
        .expect("backend returned before the deadline");

        assert!(matches!(result, Err(GenerationError::OpenAi(_))));
        assert_eq!(mock.hits_async().await, 1);
    }

    #[tokio::test]
    async fn test_openai_backend_rate_limit_is_not_retried() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/chat/completions");
                then.status(429)
                    .header("content-type", "application/json")
                    .json_body(json!({
                        "error": {
                            "message": "Rate limit reached",
                            "type": "requests",
                            "param": null,
                            "code": "rate_limit_exceeded"
                        }
                    }));
            })
            .await;

        let backend = OpenAiBackend::new(server.url("/v1"), "test-key");
        let result = backend.generate(&sample_request()).await;

        assert!(result.is_err());
        assert_eq!(mock.hits_async().await, 1);
    }

    #[test]
    fn test_sampling_parameters_are_exact() {
        let request = sample_request();
        assert_eq!(request.temperature, 0.7);
        assert_eq!(request.top_p, 0.95);

        let body = serde_json::to_string(&GenerateContentRequest::from(&request)).unwrap();
        assert!(body.contains(r#""generationConfig":{"temperature":0.7,"topP":0.95}"#));
    }

    #[test]
    fn test_create_backend_selects_provider() {
        let gemini = create_backend(&AppConfig::default()).unwrap();
        assert_eq!(gemini.name(), "gemini");

        let openai = create_backend(&AppConfig {
            provider: Provider::OpenAi,
            api_base: "http://localhost:5001/v1".to_string(),
            ..AppConfig::default()
        })
        .unwrap();
        assert_eq!(openai.name(), "openai");
    }
}
