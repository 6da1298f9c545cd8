//! Boardnotes - whiteboard photos to study notes
//!
//! This library turns photos of whiteboards and handwritten notes into
//! structured study notes with a multimodal model, and keeps them for
//! signed-in users.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `notes`: Generation workflow and the note operations behind each route
//! - `providers`: Multimodal model abstraction and implementations (OpenAI-compatible, Ollama)
//! - `prompts`: Prompt text for each note style
//! - `markdown`: Cleanup of model output and HTML rendering
//! - `auth`: Passwords, sessions and the generation cooldown
//! - `storage`: SQLite persistence for accounts and notes
//! - `images`: Image uploads on disk
//! - `server`: HTTP routes, pages and error mapping
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//!
//! # Example
//!
//! ```no_run
//! use boardnotes::{commands, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config/config.yaml", &Default::default())?;
//!     config.validate()?;
//!
//!     let service = commands::build_service(&config)?;
//!     println!("up to {} images per upload", service.max_images());
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod images;
pub mod markdown;
pub mod note_mode;
pub mod notes;
pub mod prompts;
pub mod providers;
pub mod server;
pub mod storage;

// Re-export commonly used types
pub use config::Config;
pub use error::{BoardnotesError, Result};
pub use note_mode::NoteMode;
pub use notes::{GeneratedNotes, NoteService};

#[cfg(test)]
pub mod test_utils;
