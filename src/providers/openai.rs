//! OpenAI-compatible provider implementation for Boardnotes
//!
//! Talks to any `/chat/completions` endpoint that accepts `image_url`
//! content parts. Images travel inline as base64 `data:` URLs.

use crate::config::OpenAiConfig;
use crate::error::{BoardnotesError, Result};
use crate::markdown::lossy_text;
use crate::providers::{CompletionResponse, Message, Provider, TokenUsage};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// OpenAI chat completions provider
///
/// # Examples
///
/// ```no_run
/// use boardnotes::config::OpenAiConfig;
/// use boardnotes::providers::{Message, OpenAiProvider, Provider};
/// use std::time::Duration;
///
/// # async fn example() -> boardnotes::error::Result<()> {
/// let config = OpenAiConfig {
///     api_key: Some("sk-test".to_string()),
///     ..OpenAiConfig::default()
/// };
/// let provider = OpenAiProvider::new(config, Duration::from_secs(120))?;
/// let completion = provider.complete(&[Message::user("Hello!")]).await?;
/// println!("{}", completion.message.content);
/// # Ok(())
/// # }
/// ```
pub struct OpenAiProvider {
    client: Client,
    config: OpenAiConfig,
    api_key: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: ChatContent,
}

/// Plain string for text-only turns, content parts when images are attached
#[derive(Debug, Serialize)]
#[serde(untagged)]
enum ChatContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: usize,
    #[serde(default)]
    completion_tokens: usize,
}

impl OpenAiProvider {
    /// Create a new OpenAI provider
    ///
    /// # Errors
    ///
    /// Returns [`BoardnotesError::MissingCredentials`] when no API key is
    /// configured, or a provider error if the HTTP client cannot be built.
    pub fn new(config: OpenAiConfig, timeout: Duration) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                BoardnotesError::MissingCredentials("openai (set OPENAI_API_KEY)".to_string())
            })?;

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("boardnotes/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| BoardnotesError::Provider(format!("Failed to create HTTP client: {}", e)))?;

        tracing::info!(
            "Initialized OpenAI provider: api_base={}, model={}",
            config.api_base,
            config.model
        );

        Ok(Self {
            client,
            config,
            api_key,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.api_base.trim_end_matches('/'))
    }

    fn convert_messages(messages: &[Message]) -> Vec<ChatMessage> {
        messages
            .iter()
            .map(|msg| {
                let content = if msg.images.is_empty() {
                    ChatContent::Text(msg.content.clone())
                } else {
                    let mut parts = vec![ContentPart::Text {
                        text: msg.content.clone(),
                    }];
                    parts.extend(msg.images.iter().map(|image| ContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: image.data_url(),
                        },
                    }));
                    ChatContent::Parts(parts)
                };
                ChatMessage {
                    role: msg.role.clone(),
                    content,
                }
            })
            .collect()
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    async fn complete(&self, messages: &[Message]) -> Result<CompletionResponse> {
        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: Self::convert_messages(messages),
        };

        tracing::debug!(
            "Sending OpenAI request: {} messages, {} images",
            request.messages.len(),
            messages.iter().map(|m| m.images.len()).sum::<usize>()
        );

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("OpenAI request failed: {}", e);
                BoardnotesError::Provider(format!("OpenAI request failed: {}", e))
            })?;

        let status = response.status();
        let body = response.bytes().await.map_err(|e| {
            tracing::error!("Failed to read OpenAI response body: {}", e);
            BoardnotesError::Provider(format!("Failed to read OpenAI response: {}", e))
        })?;
        let body = lossy_text(&body);

        if status == reqwest::StatusCode::UNAUTHORIZED {
            tracing::error!("OpenAI rejected the API key: {}", body);
            return Err(BoardnotesError::ProviderAuthentication(format!(
                "OpenAI returned 401 Unauthorized: {}",
                body
            ))
            .into());
        }

        if !status.is_success() {
            tracing::error!("OpenAI returned error {}: {}", status, body);
            return Err(BoardnotesError::Provider(format!(
                "OpenAI returned error {}: {}",
                status, body
            ))
            .into());
        }

        let chat: ChatResponse = serde_json::from_str(&body).map_err(|e| {
            tracing::error!("Failed to parse OpenAI response: {}", e);
            BoardnotesError::Provider(format!("Failed to parse OpenAI response: {}", e))
        })?;

        let content = chat
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                tracing::error!("OpenAI response contained no message content");
                BoardnotesError::Provider("OpenAI response contained no message content".to_string())
            })?;

        let message = Message::assistant(content);
        Ok(match chat.usage {
            Some(usage) => {
                tracing::debug!(
                    "OpenAI usage: prompt_tokens={}, completion_tokens={}",
                    usage.prompt_tokens,
                    usage.completion_tokens
                );
                CompletionResponse::with_usage(
                    message,
                    TokenUsage::new(usage.prompt_tokens, usage.completion_tokens),
                )
            }
            None => CompletionResponse::new(message),
        })
    }

    fn model_name(&self) -> String {
        self.config.model.clone()
    }
}
