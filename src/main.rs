//! Boardnotes - whiteboard photos to study notes
//!
#![doc = "Boardnotes - whiteboard photos to study notes"]
#![doc = "Main entry point for the Boardnotes web application."]

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use boardnotes::cli::{AccountCommand, Cli, Commands};
use boardnotes::commands;
use boardnotes::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    init_tracing(cli.verbose);

    // Load configuration
    let config = Config::load(&cli.config, &cli)?;

    // Validate configuration
    config.validate()?;

    match cli.command {
        Commands::Serve { .. } => {
            // A --bind override was already folded into `config`
            commands::serve::run_serve(config).await?;
            Ok(())
        }
        Commands::Generate { mode, html, images } => {
            tracing::info!("Generating {} notes from {} image(s)", mode, images.len());
            commands::generate::run_generate(config, mode, html, images).await?;
            Ok(())
        }
        Commands::Account { command } => match command {
            AccountCommand::Delete { email } => {
                tracing::info!("Deleting account {}", email);
                commands::account::run_delete(config, email).await?;
                Ok(())
            }
        },
    }
}

/// Initialize tracing subscriber with environment filter
///
/// `RUST_LOG` wins; otherwise `--verbose` switches the crate to debug.
fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "boardnotes=debug,tower_http=debug"
    } else {
        "boardnotes=info,tower_http=info"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
