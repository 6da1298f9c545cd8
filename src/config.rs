//! Configuration management for Boardnotes
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::error::{BoardnotesError, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Development-only session signing secret used when none is configured
pub const INSECURE_DEV_SECRET: &str = "boardnotes-insecure-development-secret";

/// Main configuration structure for Boardnotes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Model provider configuration (OpenAI-compatible, Ollama)
    pub provider: ProviderConfig,
    /// Web server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Database and image storage locations
    #[serde(default)]
    pub storage: StorageConfig,
    /// Generation limits
    #[serde(default)]
    pub generation: GenerationConfig,
}

/// Provider configuration
///
/// Specifies which multimodal model provider to use and its settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Type of provider to use
    #[serde(rename = "type")]
    pub provider_type: String,

    /// Timeout for a single model request (seconds)
    #[serde(default = "default_provider_timeout")]
    pub timeout_seconds: u64,

    /// OpenAI-compatible chat completions configuration
    #[serde(default)]
    pub openai: OpenAiConfig,

    /// Ollama configuration
    #[serde(default)]
    pub ollama: OllamaConfig,
}

fn default_provider_timeout() -> u64 {
    120
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            provider_type: "openai".to_string(),
            timeout_seconds: default_provider_timeout(),
            openai: OpenAiConfig::default(),
            ollama: OllamaConfig::default(),
        }
    }
}

/// OpenAI-compatible provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    /// Vision-capable model name
    #[serde(default = "default_openai_model")]
    pub model: String,

    /// API base URL; tests point this at a mock server
    #[serde(default = "default_openai_api_base")]
    pub api_base: String,

    /// API key. Never read from the config file; filled from `OPENAI_API_KEY`.
    #[serde(skip)]
    pub api_key: Option<String>,
}

fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_openai_api_base() -> String {
    "https://api.openai.com/v1".to_string()
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            model: default_openai_model(),
            api_base: default_openai_api_base(),
            api_key: None,
        }
    }
}

/// Ollama provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    /// Ollama server host
    #[serde(default = "default_ollama_host")]
    pub host: String,

    /// Vision model to use for Ollama
    #[serde(default = "default_ollama_model")]
    pub model: String,
}

fn default_ollama_host() -> String {
    "http://localhost:11434".to_string()
}

fn default_ollama_model() -> String {
    "llava:latest".to_string()
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: default_ollama_host(),
            model: default_ollama_model(),
        }
    }
}

/// Web server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address the HTTP listener binds to
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Session lifetime after the last request (hours)
    #[serde(default = "default_session_ttl_hours")]
    pub session_ttl_hours: i64,

    /// Maximum request body size for uploads (bytes)
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,

    /// Secret used to sign session cookies. Never read from the config file.
    #[serde(skip)]
    pub secret_key: Option<String>,
}

fn default_bind() -> String {
    "127.0.0.1:5000".to_string()
}

fn default_session_ttl_hours() -> i64 {
    168
}

/// Longest accepted session lifetime: one year
pub const MAX_SESSION_TTL_HOURS: i64 = 24 * 366;

fn default_max_upload_bytes() -> usize {
    25 * 1024 * 1024 // 25 MB
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            session_ttl_hours: default_session_ttl_hours(),
            max_upload_bytes: default_max_upload_bytes(),
            secret_key: None,
        }
    }
}

impl ServerConfig {
    /// Returns the configured signing secret, falling back to the insecure
    /// development default with a warning.
    pub fn secret_or_default(&self) -> String {
        match &self.secret_key {
            Some(secret) if !secret.is_empty() => secret.clone(),
            _ => {
                tracing::warn!(
                    "BOARDNOTES_SECRET_KEY is not set; using an insecure development secret"
                );
                INSECURE_DEV_SECRET.to_string()
            }
        }
    }
}

/// Storage locations for the database and image files
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite database file
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// Root for images attached to saved notes
    #[serde(default = "default_saved_dir")]
    pub saved_dir: PathBuf,

    /// Root for temporary images from anonymous generations
    #[serde(default = "default_uploads_dir")]
    pub uploads_dir: PathBuf,
}

/// Application data directory, or `./data` when the platform has none
fn data_dir() -> PathBuf {
    ProjectDirs::from("com", "boardnotes", "boardnotes")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("data"))
}

fn default_database_path() -> PathBuf {
    data_dir().join("boardnotes.db")
}

fn default_saved_dir() -> PathBuf {
    data_dir().join("saved")
}

fn default_uploads_dir() -> PathBuf {
    data_dir().join("uploads")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            saved_dir: default_saved_dir(),
            uploads_dir: default_uploads_dir(),
        }
    }
}

/// Limits applied to each generation request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Maximum number of images per request
    #[serde(default = "default_max_images")]
    pub max_images: usize,

    /// Minimum time between two generation attempts from one session (ms)
    #[serde(default = "default_cooldown_ms")]
    pub cooldown_ms: u64,
}

fn default_max_images() -> usize {
    10
}

fn default_cooldown_ms() -> u64 {
    1000
}

/// Longest accepted generation cooldown: one day
pub const MAX_COOLDOWN_MS: u64 = 24 * 60 * 60 * 1000;

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_images: default_max_images(),
            cooldown_ms: default_cooldown_ms(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider: ProviderConfig::default(),
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            generation: GenerationConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// A missing file is not an error: defaults are used and a warning is
    /// logged.
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| BoardnotesError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| BoardnotesError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        // Secrets only ever come from the environment
        self.provider.openai.api_key = std::env::var("OPENAI_API_KEY").ok();
        self.server.secret_key = std::env::var("BOARDNOTES_SECRET_KEY").ok();

        if let Ok(provider_type) = std::env::var("BOARDNOTES_PROVIDER") {
            self.provider.provider_type = provider_type;
        }

        if let Ok(model) = std::env::var("BOARDNOTES_OPENAI_MODEL") {
            self.provider.openai.model = model;
        }

        if let Ok(api_base) = std::env::var("BOARDNOTES_OPENAI_API_BASE") {
            self.provider.openai.api_base = api_base;
        }

        if let Ok(host) = std::env::var("BOARDNOTES_OLLAMA_HOST") {
            self.provider.ollama.host = host;
        }

        if let Ok(model) = std::env::var("BOARDNOTES_OLLAMA_MODEL") {
            self.provider.ollama.model = model;
        }

        if let Ok(bind) = std::env::var("BOARDNOTES_BIND") {
            self.server.bind = bind;
        }

        if let Ok(db) = std::env::var("BOARDNOTES_DB") {
            self.storage.database_path = PathBuf::from(db);
        }

        if let Ok(dir) = std::env::var("BOARDNOTES_SAVED_DIR") {
            self.storage.saved_dir = PathBuf::from(dir);
        }

        if let Ok(dir) = std::env::var("BOARDNOTES_UPLOADS_DIR") {
            self.storage.uploads_dir = PathBuf::from(dir);
        }

        if let Ok(max_images) = std::env::var("BOARDNOTES_MAX_IMAGES") {
            match max_images.parse::<usize>() {
                Ok(value) => self.generation.max_images = value,
                Err(_) => tracing::warn!("Invalid BOARDNOTES_MAX_IMAGES: {}", max_images),
            }
        }

        if let Ok(cooldown) = std::env::var("BOARDNOTES_COOLDOWN_MS") {
            match cooldown.parse::<u64>() {
                Ok(value) => self.generation.cooldown_ms = value,
                Err(_) => tracing::warn!("Invalid BOARDNOTES_COOLDOWN_MS: {}", cooldown),
            }
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if cli.verbose {
            tracing::debug!("Verbose mode enabled");
        }

        if let crate::cli::Commands::Serve { bind: Some(bind) } = &cli.command {
            self.server.bind = bind.clone();
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns error if any validation check fails
    pub fn validate(&self) -> Result<()> {
        let valid_providers = ["openai", "ollama"];
        if !valid_providers.contains(&self.provider.provider_type.as_str()) {
            return Err(BoardnotesError::Config(format!(
                "Invalid provider type: {}. Must be one of: {}",
                self.provider.provider_type,
                valid_providers.join(", ")
            ))
            .into());
        }

        if self.provider.timeout_seconds == 0 {
            return Err(BoardnotesError::Config(
                "provider.timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        if self.provider.openai.model.trim().is_empty()
            || self.provider.ollama.model.trim().is_empty()
        {
            return Err(
                BoardnotesError::Config("provider model names cannot be empty".to_string()).into(),
            );
        }

        if self.generation.max_images == 0 || self.generation.max_images > 50 {
            return Err(BoardnotesError::Config(
                "generation.max_images must be between 1 and 50".to_string(),
            )
            .into());
        }

        if self.server.bind.parse::<SocketAddr>().is_err() {
            return Err(BoardnotesError::Config(format!(
                "server.bind is not a valid socket address: {}",
                self.server.bind
            ))
            .into());
        }

        if self.server.session_ttl_hours <= 0
            || self.server.session_ttl_hours > MAX_SESSION_TTL_HOURS
        {
            return Err(BoardnotesError::Config(format!(
                "server.session_ttl_hours must be between 1 and {}",
                MAX_SESSION_TTL_HOURS
            ))
            .into());
        }

        if self.generation.cooldown_ms > MAX_COOLDOWN_MS {
            return Err(BoardnotesError::Config(format!(
                "generation.cooldown_ms must be at most {}",
                MAX_COOLDOWN_MS
            ))
            .into());
        }

        for (name, path) in [
            ("storage.database_path", &self.storage.database_path),
            ("storage.saved_dir", &self.storage.saved_dir),
            ("storage.uploads_dir", &self.storage.uploads_dir),
        ] {
            if path.as_os_str().is_empty() {
                return Err(BoardnotesError::Config(format!("{} cannot be empty", name)).into());
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.provider.provider_type, "openai");
        assert_eq!(config.provider.openai.model, "gpt-4o-mini");
        assert_eq!(config.generation.max_images, 10);
        assert_eq!(config.generation.cooldown_ms, 1000);
    }

    #[test]
    fn test_config_validation_success() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_invalid_provider() {
        let mut config = Config::default();
        config.provider.provider_type = "anthropic".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_zero_max_images() {
        let mut config = Config::default();
        config.generation.max_images = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_duration_bounds() {
        let mut config = Config::default();
        config.generation.cooldown_ms = MAX_COOLDOWN_MS;
        config.server.session_ttl_hours = MAX_SESSION_TTL_HOURS;
        assert!(config.validate().is_ok());

        config.generation.cooldown_ms = u64::MAX;
        assert!(config.validate().is_err());

        config.generation.cooldown_ms = 1000;
        config.server.session_ttl_hours = i64::MAX;
        assert!(config.validate().is_err());
        config.server.session_ttl_hours = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_bad_bind() {
        let mut config = Config::default();
        config.server.bind = "not-an-address".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_from_yaml() {
        let yaml = r#"
provider:
  type: ollama
  ollama:
    host: http://gpu-box:11434
    model: llava:13b
server:
  bind: 0.0.0.0:8080
generation:
  max_images: 4
  cooldown_ms: 500
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.provider.provider_type, "ollama");
        assert_eq!(config.provider.ollama.host, "http://gpu-box:11434");
        assert_eq!(config.provider.ollama.model, "llava:13b");
        assert_eq!(config.provider.openai.model, "gpt-4o-mini");
        assert_eq!(config.server.bind, "0.0.0.0:8080");
        assert_eq!(config.generation.max_images, 4);
        assert_eq!(config.generation.cooldown_ms, 500);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_secrets_are_not_read_from_yaml() {
        let yaml = r#"
provider:
  type: openai
  openai:
    api_key: sk-should-not-load
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(config.provider.openai.api_key.is_none());
    }

    #[test]
    fn test_secret_or_default_falls_back() {
        let server = ServerConfig::default();
        assert_eq!(server.secret_or_default(), INSECURE_DEV_SECRET);

        let server = ServerConfig {
            secret_key: Some("real-secret".to_string()),
            ..ServerConfig::default()
        };
        assert_eq!(server.secret_or_default(), "real-secret");
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        std::env::set_var("BOARDNOTES_PROVIDER", "ollama");
        std::env::set_var("BOARDNOTES_MAX_IMAGES", "3");
        std::env::set_var("BOARDNOTES_COOLDOWN_MS", "not-a-number");

        let mut config = Config::default();
        config.apply_env_vars();

        assert_eq!(config.provider.provider_type, "ollama");
        assert_eq!(config.generation.max_images, 3);
        // Invalid values keep the default
        assert_eq!(config.generation.cooldown_ms, 1000);

        std::env::remove_var("BOARDNOTES_PROVIDER");
        std::env::remove_var("BOARDNOTES_MAX_IMAGES");
        std::env::remove_var("BOARDNOTES_COOLDOWN_MS");
    }

    #[test]
    #[serial]
    fn test_load_missing_file_uses_defaults() {
        let cli = crate::cli::Cli::default();
        let config = Config::load("/nonexistent/boardnotes.yaml", &cli).unwrap();
        assert_eq!(config.generation.max_images, 10);
    }
}
