//! Command-line interface definition for Boardnotes
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands for serving the web app, one-off generation, and
//! account administration.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Boardnotes - whiteboard photos to study notes
#[derive(Parser, Debug, Clone)]
#[command(name = "boardnotes")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for Boardnotes
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run the web server
    Serve {
        /// Override the bind address from config (e.g. 0.0.0.0:8080)
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Generate notes from image files without an account
    Generate {
        /// Note style: bullet, cornell, summary, definitions, steps
        #[arg(short, long, default_value = "bullet")]
        mode: String,

        /// Print rendered HTML instead of markdown
        #[arg(long)]
        html: bool,

        /// Image files to send to the model
        #[arg(required = true)]
        images: Vec<PathBuf>,
    },

    /// Manage accounts
    Account {
        /// Account management subcommand
        #[command(subcommand)]
        command: AccountCommand,
    },
}

/// Account management subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum AccountCommand {
    /// Delete an account with all of its notes and saved images
    Delete {
        /// Email address of the account
        #[arg(short, long)]
        email: String,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            config: "config/config.yaml".to_string(),
            verbose: false,
            command: Commands::Serve { bind: None },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_default() {
        let cli = Cli::default();
        assert_eq!(cli.config, "config/config.yaml");
        assert!(!cli.verbose);
        assert!(matches!(cli.command, Commands::Serve { bind: None }));
    }

    #[test]
    fn test_cli_config_path_defaults_when_omitted() {
        let cli = Cli::try_parse_from(["boardnotes", "serve"]).unwrap();
        assert_eq!(cli.config, "config/config.yaml");
    }

    #[test]
    fn test_cli_parse_serve_with_bind() {
        let cli = Cli::try_parse_from(["boardnotes", "serve", "--bind", "0.0.0.0:9000"]).unwrap();
        if let Commands::Serve { bind } = cli.command {
            assert_eq!(bind, Some("0.0.0.0:9000".to_string()));
        } else {
            panic!("Expected Serve command");
        }
    }

    #[test]
    fn test_cli_parse_generate() {
        let cli = Cli::try_parse_from([
            "boardnotes",
            "generate",
            "--mode",
            "cornell",
            "board1.jpg",
            "board2.png",
        ])
        .unwrap();
        if let Commands::Generate { mode, html, images } = cli.command {
            assert_eq!(mode, "cornell");
            assert!(!html);
            assert_eq!(
                images,
                vec![PathBuf::from("board1.jpg"), PathBuf::from("board2.png")]
            );
        } else {
            panic!("Expected Generate command");
        }
    }

    #[test]
    fn test_cli_generate_requires_images() {
        let cli = Cli::try_parse_from(["boardnotes", "generate"]);
        assert!(cli.is_err());
    }

    #[test]
    fn test_cli_parse_account_delete() {
        let cli = Cli::try_parse_from([
            "boardnotes",
            "account",
            "delete",
            "--email",
            "a@example.com",
        ])
        .unwrap();
        match cli.command {
            Commands::Account {
                command: AccountCommand::Delete { email },
            } => assert_eq!(email, "a@example.com"),
            _ => panic!("Expected Account Delete command"),
        }
    }

    #[test]
    fn test_cli_verbose_and_config() {
        let cli = Cli::try_parse_from(["boardnotes", "-v", "-c", "custom.yaml", "serve"]).unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.config, "custom.yaml");
    }
}
