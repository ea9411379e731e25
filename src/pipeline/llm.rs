//! Remote generation: send one prompt, get the raw generated text back.
//!
//! Two backends implement [`GenerationClient`]:
//!
//! * [`GeminiClient`]: the Gemini `generateContent` REST call over
//!   `reqwest`. This is the default.
//! * [`ProviderClient`]: any `edgequake_llm` provider, used when the config
//!   names one (`provider_name`) or supplies one (`provider`).
//!
//! ## No retry
//!
//! Exactly one request is sent per call. Every failure is terminal for the
//! request and surfaced to the caller, who decides whether to try again.
//!
//! ## Wire format
//!
//! ```text
//! POST {base}/v1beta/models/{model}:generateContent
//! x-goog-api-key: <key>
//!
//! {"contents":[{"role":"user","parts":[{"text":"<prompt>"}]}],
//!  "generationConfig":{"responseMimeType":"application/json"}}
//! ```

use crate::config::GenerationConfig;
use crate::error::Pdf2QuizError;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Sends a prompt to a text-generation model.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Generate text for `prompt`. One request, no retry.
    async fn generate(&self, prompt: &str) -> Result<String, Pdf2QuizError>;

    /// Model name, for logs and run statistics.
    fn model(&self) -> &str;
}

// ── Gemini REST client ───────────────────────────────────────────────────

/// Client for the Gemini `generateContent` endpoint.
#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
    temperature: Option<f32>,
    timeout_secs: u64,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &"<redacted>")
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: crate::config::DEFAULT_API_BASE.to_string(),
            model: model.into(),
            api_key: api_key.into(),
            temperature: None,
            timeout_secs: 120,
        }
    }

    /// Build a client from the config, resolving key, model and host from
    /// the environment now.
    ///
    /// Fails with [`Pdf2QuizError::MissingApiKey`] before any network call.
    pub fn from_config(config: &GenerationConfig) -> Result<Self, Pdf2QuizError> {
        let api_key = config.resolve_api_key()?;
        let mut client = Self::new(api_key, config.resolve_model())
            .with_base_url(config.resolve_api_base())
            .with_timeout_secs(config.api_timeout_secs);
        client.temperature = config.temperature;
        Ok(client)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn with_temperature(mut self, t: f32) -> Self {
        self.temperature = Some(t);
        self
    }

    /// Full `generateContent` URL for this client's model.
    pub fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }

    fn request_body<'a>(&self, prompt: &'a str) -> GenerateRequest<'a> {
        GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationSettings {
                response_mime_type: "application/json",
                temperature: self.temperature,
            },
        }
    }
}

#[async_trait]
impl GenerationClient for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, Pdf2QuizError> {
        if self.api_key.trim().is_empty() {
            return Err(Pdf2QuizError::MissingApiKey {
                env_var: crate::config::API_KEY_ENV,
            });
        }

        let url = self.endpoint();
        debug!("Gemini request to model={} ({} prompt chars)", self.model, prompt.chars().count());

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .timeout(Duration::from_secs(self.timeout_secs))
            .json(&self.request_body(prompt))
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| self.transport_error(e))?;

        let text = interpret_response(status, &body, &self.model)?;
        info!("Gemini returned {} chars", text.chars().count());
        Ok(text)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

impl GeminiClient {
    fn transport_error(&self, e: reqwest::Error) -> Pdf2QuizError {
        if e.is_timeout() {
            Pdf2QuizError::ApiTimeout {
                secs: self.timeout_secs,
            }
        } else {
            Pdf2QuizError::Transport(e.to_string())
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationSettings,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationSettings {
    response_mime_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Turn an HTTP status and body into generated text or a typed error.
///
/// * non-success with a "not found" condition → [`Pdf2QuizError::ModelNotFound`]
/// * other non-success → [`Pdf2QuizError::ApiError`] with the provider message
/// * success without text → [`Pdf2QuizError::EmptyGeneration`]
///
/// Text from all parts of the first candidate is concatenated.
pub fn interpret_response(status: u16, body: &str, model: &str) -> Result<String, Pdf2QuizError> {
    if !(200..300).contains(&status) {
        let message = serde_json::from_str::<ErrorEnvelope>(body)
            .map(|env| env.error.message)
            .unwrap_or_else(|_| {
                let trimmed = body.trim();
                if trimmed.is_empty() {
                    format!("HTTP {status}")
                } else {
                    trimmed.to_string()
                }
            });

        if status == 404 || message.to_lowercase().contains("not found") {
            return Err(Pdf2QuizError::ModelNotFound {
                status,
                model: model.to_string(),
                message,
            });
        }
        return Err(Pdf2QuizError::ApiError { status, message });
    }

    let parsed: GenerateResponse =
        serde_json::from_str(body).map_err(|e| Pdf2QuizError::ApiError {
            status,
            message: format!("unreadable response body: {e}"),
        })?;

    let first = parsed.candidates.first();
    let text: String = first
        .and_then(|c| c.content.as_ref())
        .map(|content| {
            content
                .parts
                .iter()
                .filter_map(|p| p.text.as_deref())
                .collect()
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        let reason = parsed
            .prompt_feedback
            .and_then(|f| f.block_reason)
            .or_else(|| first.and_then(|c| c.finish_reason.clone()));
        return Err(Pdf2QuizError::EmptyGeneration { reason });
    }

    Ok(text)
}

// ── edgequake-llm backend ────────────────────────────────────────────────

/// Generation through an `edgequake_llm` provider.
pub struct ProviderClient {
    provider: Arc<dyn LLMProvider>,
    model: String,
    temperature: Option<f32>,
    max_tokens: usize,
    timeout_secs: u64,
}

impl ProviderClient {
    pub fn new(provider: Arc<dyn LLMProvider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: None,
            max_tokens: 8192,
            timeout_secs: 120,
        }
    }

    fn from_config(provider: Arc<dyn LLMProvider>, config: &GenerationConfig) -> Self {
        Self {
            provider,
            model: config.resolve_model(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout_secs: config.api_timeout_secs,
        }
    }

    fn options(&self) -> CompletionOptions {
        CompletionOptions {
            temperature: self.temperature,
            max_tokens: Some(self.max_tokens),
            ..Default::default()
        }
    }
}

#[async_trait]
impl GenerationClient for ProviderClient {
    async fn generate(&self, prompt: &str) -> Result<String, Pdf2QuizError> {
        let messages = vec![ChatMessage::user(prompt)];
        let options = self.options();

        let response = tokio::time::timeout(
            Duration::from_secs(self.timeout_secs),
            self.provider.chat(&messages, Some(&options)),
        )
        .await
        .map_err(|_| Pdf2QuizError::ApiTimeout {
            secs: self.timeout_secs,
        })?
        .map_err(|e| Pdf2QuizError::Transport(e.to_string()))?;

        debug!(
            "Provider returned {} input tokens, {} output tokens",
            response.prompt_tokens, response.completion_tokens
        );

        if response.content.trim().is_empty() {
            return Err(Pdf2QuizError::EmptyGeneration { reason: None });
        }
        Ok(response.content)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Pick the generation backend for `config`, from most to least specific.
///
/// 1. **Pre-built provider** (`config.provider`): used as-is.
/// 2. **Named provider** (`config.provider_name`): created through
///    [`ProviderFactory::create_llm_provider`], which reads that provider's
///    own API key variable.
/// 3. **Gemini REST**: the default; needs `GEMINI_API_KEY`.
pub fn resolve_client(config: &GenerationConfig) -> Result<Arc<dyn GenerationClient>, Pdf2QuizError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::new(ProviderClient::from_config(Arc::clone(provider), config)));
    }

    if let Some(ref name) = config.provider_name {
        let model = config.resolve_model();
        let provider = ProviderFactory::create_llm_provider(name, &model).map_err(|e| {
            Pdf2QuizError::ProviderNotConfigured {
                provider: name.clone(),
                hint: format!("{e}"),
            }
        })?;
        return Ok(Arc::new(ProviderClient::from_config(provider, config)));
    }

    Ok(Arc::new(GeminiClient::from_config(config)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_structure() {
        let client = GeminiClient::new("k", "gemini-2.0-flash");
        let body = serde_json::to_value(client.request_body("Write a quiz")).unwrap();

        let contents = body["contents"].as_array().unwrap();
        assert_eq!(contents.len(), 1);
        assert_eq!(contents[0]["role"], "user");
        assert_eq!(contents[0]["parts"][0]["text"], "Write a quiz");
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
        assert!(body["generationConfig"].get("temperature").is_none());

        let warm = client.with_temperature(0.4).request_body("x");
        let body = serde_json::to_value(warm).unwrap();
        let t = body["generationConfig"]["temperature"].as_f64().unwrap();
        assert!((t - 0.4).abs() < 1e-6);
    }

    #[test]
    fn endpoint_uses_model_and_base() {
        let client =
            GeminiClient::new("k", "gemini-1.5-pro").with_base_url("http://localhost:8080/");
        assert_eq!(
            client.endpoint(),
            "http://localhost:8080/v1beta/models/gemini-1.5-pro:generateContent"
        );
    }

    #[test]
    fn parts_are_concatenated() {
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"[{\"a\":"},{"text":"1}]"}]}}]}"#;
        assert_eq!(interpret_response(200, body, "m").unwrap(), r#"[{"a":1}]"#);
    }

    #[test]
    fn model_not_found_adds_guidance() {
        let err = interpret_response(404, r#"{"error":{"message":"model not found"}}"#, "gemini-9")
            .unwrap_err();
        assert!(matches!(err, Pdf2QuizError::ModelNotFound { status: 404, .. }));
        let msg = err.to_string();
        assert!(msg.contains("model not found"));
        assert!(msg.contains("GEMINI_MODEL"));
    }

    #[test]
    fn not_found_message_on_other_status() {
        let body = r#"{"error":{"message":"models/foo is not found for API version v1beta"}}"#;
        let err = interpret_response(400, body, "foo").unwrap_err();
        assert!(matches!(err, Pdf2QuizError::ModelNotFound { status: 400, .. }));
    }

    #[test]
    fn provider_error_message_is_kept() {
        let body = r#"{"error":{"code":403,"message":"API key not valid","status":"PERMISSION_DENIED"}}"#;
        match interpret_response(403, body, "m").unwrap_err() {
            Pdf2QuizError::ApiError { status, message } => {
                assert_eq!(status, 403);
                assert_eq!(message, "API key not valid");
            }
            other => panic!("unexpected: {other:?}"),
        }

        match interpret_response(502, "Bad Gateway", "m").unwrap_err() {
            Pdf2QuizError::ApiError { message, .. } => assert_eq!(message, "Bad Gateway"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn empty_generation_reports_block_reason() {
        let body = r#"{"candidates":[],"promptFeedback":{"blockReason":"SAFETY"}}"#;
        match interpret_response(200, body, "m").unwrap_err() {
            Pdf2QuizError::EmptyGeneration { reason } => assert_eq!(reason.as_deref(), Some("SAFETY")),
            other => panic!("unexpected: {other:?}"),
        }

        let body = r#"{"candidates":[{"content":{"parts":[{"text":"  "}]},"finishReason":"MAX_TOKENS"}]}"#;
        match interpret_response(200, body, "m").unwrap_err() {
            Pdf2QuizError::EmptyGeneration { reason } => {
                assert_eq!(reason.as_deref(), Some("MAX_TOKENS"))
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_key_fails_before_network() {
        // The base URL is unroutable; reaching the network would be a Transport error.
        let client = GeminiClient::new("", "m").with_base_url("http://127.0.0.1:9");
        let err = client.generate("prompt").await.unwrap_err();
        assert!(matches!(err, Pdf2QuizError::MissingApiKey { .. }));
    }
}
