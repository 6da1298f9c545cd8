//! Test utilities for Boardnotes
//!
//! This module provides a scripted model provider, a fully wired
//! [`NoteService`] on temporary directories, and assertion helpers.

use crate::config::{Config, GenerationConfig};
use crate::error::{BoardnotesError, Result};
use crate::images::ImageStore;
use crate::notes::NoteService;
use crate::providers::{CompletionResponse, Message, Provider};
use crate::storage::SqliteStorage;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Create a temporary directory for testing
pub fn temp_dir() -> TempDir {
    TempDir::new().expect("Failed to create temporary directory")
}

/// Provider that answers every request with the same text
///
/// Records each request so tests can inspect the prompt and image count.
#[derive(Default)]
pub struct StaticProvider {
    reply: Option<String>,
    requests: Mutex<Vec<Message>>,
}

impl StaticProvider {
    /// Provider that always replies with `reply`
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: Some(reply.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Provider whose every call fails
    pub fn failing() -> Self {
        Self::default()
    }

    /// Number of completed or failed calls
    pub fn calls(&self) -> usize {
        self.requests.lock().expect("lock").len()
    }

    /// Prompt text of the most recent request
    pub fn last_prompt(&self) -> Option<String> {
        self.requests.lock().expect("lock").last().map(|m| m.content.clone())
    }

    /// Images attached to the most recent request
    pub fn last_image_count(&self) -> Option<usize> {
        self.requests.lock().expect("lock").last().map(|m| m.images.len())
    }
}

#[async_trait]
impl Provider for StaticProvider {
    async fn complete(&self, messages: &[Message]) -> Result<CompletionResponse> {
        if let Some(last) = messages.last() {
            self.requests.lock().expect("lock").push(last.clone());
        }
        match &self.reply {
            Some(reply) => Ok(CompletionResponse::new(Message::assistant(reply.clone()))),
            None => Err(BoardnotesError::Provider("scripted failure".to_string()).into()),
        }
    }

    fn model_name(&self) -> String {
        "static".to_string()
    }
}

/// Build a [`NoteService`] on fresh temporary storage with default limits
///
/// The returned `TempDir` must be kept alive for the duration of the test.
pub fn test_service(provider: Arc<dyn Provider>) -> (NoteService, TempDir) {
    let dir = temp_dir();
    let storage = SqliteStorage::new_with_path(dir.path().join("boardnotes.db"))
        .expect("failed to create storage");
    let images = ImageStore::new(dir.path().join("saved"), dir.path().join("uploads"))
        .expect("failed to create image store");
    let service = NoteService::new(provider, storage, images, &GenerationConfig::default());
    (service, dir)
}

/// Assert that an error's display contains the expected message
pub fn assert_error_contains<T>(result: Result<T>, expected: &str) {
    match result {
        Ok(_) => panic!("Expected error containing '{}' but got Ok", expected),
        Err(e) => {
            let error_msg = e.to_string();
            assert!(
                error_msg.contains(expected),
                "Error message '{}' does not contain '{}'",
                error_msg,
                expected
            );
        }
    }
}

/// A complete configuration file using the Ollama provider
pub fn test_config_yaml() -> String {
    r#"
provider:
  type: ollama
  timeout_seconds: 30
  ollama:
    host: http://localhost:11434
    model: llava:13b
server:
  bind: 127.0.0.1:8080
  session_ttl_hours: 24
storage:
  database_path: /tmp/boardnotes-test/boardnotes.db
  saved_dir: /tmp/boardnotes-test/saved
  uploads_dir: /tmp/boardnotes-test/uploads
generation:
  max_images: 5
  cooldown_ms: 250
"#
    .to_string()
}

/// Default configuration
pub fn test_config() -> Config {
    Config::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assert_error_contains_success() {
        let result: Result<()> = Err(BoardnotesError::Config("test error message".to_string()).into());
        assert_error_contains(result, "test error");
    }

    #[test]
    #[should_panic(expected = "Expected error containing")]
    fn test_assert_error_contains_ok() {
        assert_error_contains(Ok(()), "error");
    }

    #[test]
    fn test_test_config_yaml_parses_and_validates() {
        let config: Config = serde_yaml::from_str(&test_config_yaml()).unwrap();
        assert_eq!(config.provider.provider_type, "ollama");
        assert_eq!(config.provider.ollama.model, "llava:13b");
        assert_eq!(config.generation.max_images, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_test_config_is_valid() {
        assert!(test_config().validate().is_ok());
    }

    #[tokio::test]
    async fn test_static_provider_records_requests() {
        let provider = StaticProvider::new("ok");
        let response = provider.complete(&[Message::user("prompt")]).await.unwrap();
        assert_eq!(response.message.content, "ok");
        assert_eq!(provider.calls(), 1);
        assert_eq!(provider.last_prompt().as_deref(), Some("prompt"));
    }

    #[tokio::test]
    async fn test_failing_provider() {
        let provider = StaticProvider::failing();
        assert!(provider.complete(&[Message::user("x")]).await.is_err());
        assert_eq!(provider.calls(), 1);
    }
}
