//! Provider module for Boardnotes
//!
//! This module contains the multimodal model abstraction and implementations
//! for OpenAI-compatible APIs and Ollama.

pub mod base;
pub mod ollama;
pub mod openai;

pub use base::{CompletionResponse, ImageAttachment, Message, Provider, TokenUsage};
pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;

use crate::config::ProviderConfig;
use crate::error::{BoardnotesError, Result};
use std::time::Duration;

/// Create a provider instance based on configuration
///
/// # Errors
///
/// Returns error if the provider type is unknown or initialization fails
/// (for example a missing OpenAI API key)
///
/// # Examples
///
/// ```
/// use boardnotes::config::ProviderConfig;
/// use boardnotes::providers::create_provider;
///
/// let config = ProviderConfig {
///     provider_type: "ollama".to_string(),
///     ..ProviderConfig::default()
/// };
/// let provider = create_provider(&config).unwrap();
/// assert_eq!(provider.model_name(), "llava:latest");
/// ```
pub fn create_provider(config: &ProviderConfig) -> Result<Box<dyn Provider>> {
    let timeout = Duration::from_secs(config.timeout_seconds);
    match config.provider_type.as_str() {
        "openai" => Ok(Box::new(OpenAiProvider::new(config.openai.clone(), timeout)?)),
        "ollama" => Ok(Box::new(OllamaProvider::new(config.ollama.clone(), timeout)?)),
        other => Err(BoardnotesError::Provider(format!("Unknown provider type: {}", other)).into()),
    }
}
