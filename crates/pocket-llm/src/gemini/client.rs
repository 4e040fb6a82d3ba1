// Gemini (Generative Language API) client implementation

use crate::traits::{ChatClient, ChatOptions, ChatRequest, ChatResponse, TokenUsage};
use crate::types::{Content, Message};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use serde_json::Value;

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Gemini client (HTTP direct, no SDK)
pub struct GeminiClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl GeminiClient {
    /// Create new client with API key
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_base_url(api_key, GEMINI_API_BASE)
    }

    /// Create client against a custom endpoint (proxies, tests)
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            API_KEY_HEADER,
            HeaderValue::from_str(&api_key).context("Invalid API key format")?,
        );

        let http_client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Build generateContent payload
    ///
    /// System messages are folded into `systemInstruction`; the remaining
    /// turns become `contents` with Gemini's `user`/`model` roles.
    fn build_request(&self, messages: Vec<Message>, options: &ChatOptions) -> Result<Value> {
        let mut system_parts = Vec::new();
        let mut contents = Vec::new();

        for message in messages {
            match message {
                Message::System { content } => {
                    system_parts.push(serde_json::json!({ "text": content.to_plain_text() }));
                }
                Message::Human { content } => contents.push(Self::convert_turn("user", content)),
                Message::AI { content } => contents.push(Self::convert_turn("model", content)),
            }
        }

        let mut request = serde_json::Map::new();
        request.insert("contents".to_string(), Value::Array(contents));

        if !system_parts.is_empty() {
            request.insert(
                "systemInstruction".to_string(),
                serde_json::json!({ "parts": system_parts }),
            );
        }

        let generation_config = GenerationConfig::from(options);
        if !generation_config.is_empty() {
            request.insert(
                "generationConfig".to_string(),
                serde_json::to_value(generation_config)?,
            );
        }

        Ok(Value::Object(request))
    }

    fn convert_turn(role: &str, content: Content) -> Value {
        serde_json::json!({
            "role": role,
            "parts": [{ "text": content.to_plain_text() }],
        })
    }
}

#[async_trait]
impl ChatClient for GeminiClient {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse> {
        let payload = self.build_request(request.messages, &request.options)?;

        let response = self
            .http_client
            .post(format!("{}/models/{}:generateContent", self.base_url, request.model))
            .json(&payload)
            .send()
            .await
            .context("Failed to send request")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Gemini API error ({}): {}", status, error_text);
        }

        let raw: GenerateContentResponse = response
            .json()
            .await
            .context("Failed to parse response")?;

        let candidate = raw.candidates.first().ok_or_else(|| {
            let reason = raw
                .prompt_feedback
                .as_ref()
                .and_then(|f| f.block_reason.clone())
                .unwrap_or_else(|| "no candidates returned".to_string());
            anyhow::anyhow!("Gemini returned no answer: {}", reason)
        })?;

        let content = candidate.content.as_ref().map(|c| {
            c.parts
                .iter()
                .filter_map(|p| p.text.as_deref())
                .collect::<Vec<_>>()
                .join("")
        });

        Ok(ChatResponse {
            content,
            usage: raw.usage_metadata.as_ref().map(|u| TokenUsage {
                input_tokens: u.prompt_token_count,
                output_tokens: u.candidates_token_count,
                total_tokens: u.total_token_count,
            }),
            finish_reason: candidate.finish_reason.clone(),
            raw: serde_json::to_value(&raw)?,
        })
    }
}

// ============================================================================
// GEMINI-SPECIFIC WIRE TYPES
// ============================================================================

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_k: Option<u32>,
}

impl GenerationConfig {
    fn is_empty(&self) -> bool {
        self.max_output_tokens.is_none()
            && self.temperature.is_none()
            && self.top_p.is_none()
            && self.top_k.is_none()
    }
}

impl From<&ChatOptions> for GenerationConfig {
    fn from(options: &ChatOptions) -> Self {
        Self {
            max_output_tokens: options.max_tokens,
            temperature: options.temperature,
            top_p: options.top_p,
            top_k: options.top_k,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    prompt_feedback: Option<PromptFeedback>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
    #[serde(default)]
    role: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
    #[serde(default)]
    total_token_count: u32,
}
