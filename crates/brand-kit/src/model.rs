// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Chat-completion model seam and the Groq HTTP client
//!
//! Every model call in the crate goes through [`ChatModel::complete`], which
//! returns the raw text of the first completion choice. [`GroqClient`] talks
//! to any OpenAI-compatible `chat/completions` endpoint.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{
    Client, ClientBuilder,
    header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue},
};
use serde::{Deserialize, Serialize};
use tracing::{Span, debug, info, instrument, warn};
use url::Url;
use uuid::Uuid;

use crate::error::{BrandKitError, BrandKitResult, ModelError};

/// Default OpenAI-compatible endpoint
pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1/";
/// Default model for text-only requests
pub const DEFAULT_TEXT_MODEL: &str = "llama-3.3-70b-versatile";
/// Default model for requests carrying images
pub const DEFAULT_VISION_MODEL: &str = "meta-llama/llama-4-maverick-17b-128e-instruct";

/// Author of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instructions for the model
    System,
    /// End-user input
    User,
    /// Model output
    Assistant,
}

/// Image reference inside a multimodal message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageUrl {
    /// `data:` URL or remote URL
    pub url: String,
}

/// One part of a multimodal message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    /// Plain text
    Text {
        /// The text
        text: String,
    },
    /// An image
    ImageUrl {
        /// The image reference
        image_url: ImageUrl,
    },
}

impl ContentPart {
    /// Text part
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Inline image part built from a base64 payload
    pub fn image(mime_type: &str, base64_data: &str) -> Self {
        Self::ImageUrl {
            image_url: ImageUrl {
                url: format!("data:{mime_type};base64,{base64_data}"),
            },
        }
    }
}

/// Message content: plain text or a list of parts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    /// Plain text
    Text(String),
    /// Text and image parts
    Parts(Vec<ContentPart>),
}

/// A single message in the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message sender
    pub role: Role,
    /// Content of the message
    pub content: MessageContent,
}

impl ChatMessage {
    /// System message
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: MessageContent::Text(text.into()),
        }
    }

    /// User message with plain text
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Text(text.into()),
        }
    }

    /// User message with multimodal parts
    pub fn user_parts(parts: Vec<ContentPart>) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Parts(parts),
        }
    }

    /// Plain text content, if this message is not multimodal
    pub fn text(&self) -> Option<&str> {
        match &self.content {
            MessageContent::Text(text) => Some(text),
            MessageContent::Parts(_) => None,
        }
    }
}

/// Requested output format
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseFormat {
    /// Format type, e.g. `json_object`
    #[serde(rename = "type")]
    pub kind: String,
}

impl ResponseFormat {
    /// Ask the model for a single JSON object
    pub fn json_object() -> Self {
        Self {
            kind: "json_object".to_string(),
        }
    }
}

/// Chat completion request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// The model to use for completion
    pub model: String,
    /// List of messages for the conversation
    pub messages: Vec<ChatMessage>,
    /// Sampling temperature
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Maximum number of tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Output format constraint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,
}

impl CompletionRequest {
    /// Create a request for a model
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature: None,
            max_tokens: None,
            response_format: None,
        }
    }

    /// Set the sampling temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the maximum number of generated tokens
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Require a JSON object response
    pub fn with_json_response(mut self) -> Self {
        self.response_format = Some(ResponseFormat::json_object());
        self
    }

    /// Text of the first system message, if any
    pub fn system_prompt(&self) -> Option<&str> {
        self.messages
            .iter()
            .find(|m| m.role == Role::System)
            .and_then(ChatMessage::text)
    }

    /// Whether any message carries an image
    pub fn has_image(&self) -> bool {
        self.messages.iter().any(|m| match &m.content {
            MessageContent::Parts(parts) => parts
                .iter()
                .any(|p| matches!(p, ContentPart::ImageUrl { .. })),
            MessageContent::Text(_) => false,
        })
    }
}

/// A hosted chat-completion model
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Run one completion and return the text of the first choice
    ///
    /// A response without content yields an empty string.
    async fn complete(&self, request: CompletionRequest) -> Result<String, ModelError>;
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<TokenUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Token usage statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Number of tokens in the prompt
    pub prompt_tokens: u32,
    /// Number of tokens in the completion
    pub completion_tokens: u32,
    /// Total number of tokens used
    pub total_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

/// HTTP client for an OpenAI-compatible chat-completions API
#[derive(Debug, Clone)]
pub struct GroqClient {
    client: Client,
    base_url: Url,
    timeout: Duration,
}

impl GroqClient {
    /// Create a new client
    ///
    /// An empty API key is reported as [`BrandKitError::NotConfigured`].
    pub fn new(
        api_key: &str,
        base_url: Option<Url>,
        timeout_seconds: u64,
    ) -> BrandKitResult<Self> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(BrandKitError::not_configured());
        }

        let mut base_url = match base_url {
            Some(url) => url,
            None => Url::parse(DEFAULT_BASE_URL)
                .map_err(|e| BrandKitError::config(format!("Invalid base URL: {e}")))?,
        };
        // Url::join drops the last path segment unless the path ends with a slash
        if !base_url.path().ends_with('/') {
            base_url.set_path(&format!("{}/", base_url.path()));
        }

        let timeout = Duration::from_secs(timeout_seconds);

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {api_key}"))
                .map_err(|e| BrandKitError::config(format!("Invalid API key format: {e}")))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = ClientBuilder::new()
            .timeout(timeout)
            .default_headers(headers)
            .user_agent(concat!("brand-kit/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| BrandKitError::config(format!("Failed to create HTTP client: {e}")))?;

        info!(
            "Created model client with base URL: {} and timeout: {}s",
            base_url, timeout_seconds
        );

        Ok(Self {
            client,
            base_url,
            timeout,
        })
    }

    /// Base URL requests are sent to
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Per-request timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn completions_url(&self) -> Result<Url, ModelError> {
        self.base_url
            .join("chat/completions")
            .map_err(|e| ModelError::transport(format!("Invalid base URL: {e}")))
    }
}

#[async_trait]
impl ChatModel for GroqClient {
    #[instrument(skip(self, request), fields(model = %request.model, request_id))]
    async fn complete(&self, request: CompletionRequest) -> Result<String, ModelError> {
        let request_id = Uuid::new_v4();
        Span::current().record("request_id", request_id.to_string());

        let url = self.completions_url()?;
        debug!(
            request_id = %request_id,
            messages = request.messages.len(),
            has_image = request.has_image(),
            "Sending chat completion request"
        );

        let start_time = Instant::now();
        let response = self.client.post(url).json(&request).send().await?;
        let status = response.status();
        let body = response.text().await?;

        debug!(
            request_id = %request_id,
            status = status.as_u16(),
            duration_ms = start_time.elapsed().as_millis(),
            "Chat completion request completed"
        );

        if !status.is_success() {
            let provider_message = serde_json::from_str::<ApiErrorResponse>(&body)
                .map(|e| e.error.message)
                .ok()
                .or_else(|| (!body.trim().is_empty()).then(|| body.clone()));

            warn!(
                request_id = %request_id,
                status = status.as_u16(),
                provider_message = provider_message.as_deref().unwrap_or_default(),
                "Model API returned an error status"
            );

            return Err(ModelError::Status {
                status: status.as_u16(),
                provider_message,
            });
        }

        let completion: ChatCompletionResponse =
            serde_json::from_str(&body).map_err(|e| ModelError::Decode {
                message: e.to_string(),
            })?;

        if let Some(ref usage) = completion.usage {
            debug!(
                request_id = %request_id,
                model = completion.model.as_deref().unwrap_or_default(),
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                total_tokens = usage.total_tokens,
                "Token usage statistics"
            );
        }

        let Some(choice) = completion.choices.into_iter().next() else {
            debug!(request_id = %request_id, "Completion carried no choices");
            return Ok(String::new());
        };

        debug!(
            request_id = %request_id,
            finish_reason = choice.finish_reason.as_deref().unwrap_or_default(),
            "Received completion"
        );

        Ok(choice.message.content.unwrap_or_default())
    }
}
