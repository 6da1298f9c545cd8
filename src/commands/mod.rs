/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint.

It exposes three top-level command modules:

- `serve`    Run the web application
- `generate` One-off anonymous generation from image files
- `account`  Account administration

All of them build the same [`NoteService`] from configuration.
*/

use crate::config::Config;
use crate::error::{BoardnotesError, Result};
use crate::images::ImageStore;
use crate::notes::NoteService;
use crate::providers::{create_provider, Provider};
use crate::storage::SqliteStorage;
use std::sync::Arc;

/// Wire provider, database and image store from configuration
pub fn build_service(config: &Config) -> Result<NoteService> {
    let provider: Arc<dyn Provider> = Arc::from(create_provider(&config.provider)?);
    build_service_with_provider(config, provider)
}

/// Same as [`build_service`] with an explicit provider
pub fn build_service_with_provider(
    config: &Config,
    provider: Arc<dyn Provider>,
) -> Result<NoteService> {
    let storage = SqliteStorage::new_with_path(&config.storage.database_path)?;
    let images = ImageStore::new(&config.storage.saved_dir, &config.storage.uploads_dir)?;
    Ok(NoteService::new(provider, storage, images, &config.generation))
}

// Web server command handler
pub mod serve {
    //! Starts the HTTP server and blocks until shutdown.

    use super::*;
    use crate::server::{self, AppState};

    /// Run the web server
    pub async fn run_serve(config: Config) -> Result<()> {
        let service = build_service(&config)?;
        tracing::info!(
            provider = %config.provider.provider_type,
            database = %config.storage.database_path.display(),
            "Starting Boardnotes server"
        );
        server::serve(AppState::new(service), &config.server).await
    }
}

// One-off generation command handler
pub mod generate {
    //! Generates notes for local image files without an account and prints
    //! them to stdout.

    use super::*;
    use crate::auth::SessionContext;
    use crate::images::ImageUpload;
    use crate::notes::GeneratedNotes;
    use std::path::PathBuf;

    /// Read the image files in order
    pub async fn read_images(paths: &[PathBuf]) -> Result<Vec<ImageUpload>> {
        let mut images = Vec::with_capacity(paths.len());
        for path in paths {
            let data = tokio::fs::read(path).await.map_err(|e| {
                BoardnotesError::Validation(format!("Cannot read {}: {}", path.display(), e))
            })?;
            let filename = path.file_name().and_then(|name| name.to_str());
            images.push(ImageUpload::new(data, filename));
        }
        Ok(images)
    }

    /// Generate notes with an explicit service
    pub async fn generate_notes(
        service: &NoteService,
        mode: &str,
        paths: &[PathBuf],
    ) -> Result<GeneratedNotes> {
        let images = read_images(paths).await?;
        let mut ctx = SessionContext::default();
        service.generate(&mut ctx, mode, images).await
    }

    /// Run the generate command
    pub async fn run_generate(
        config: Config,
        mode: String,
        html: bool,
        images: Vec<PathBuf>,
    ) -> Result<()> {
        let service = build_service(&config)?;
        let notes = generate_notes(&service, &mode, &images).await?;

        if html {
            println!("{}", notes.html);
        } else {
            println!("{}", notes.markdown);
        }
        for url in &notes.image_urls {
            tracing::debug!("Stored source image at {}", url);
        }
        Ok(())
    }
}

// Account administration command handler
pub mod account {
    //! Deletes accounts together with their notes and saved images.

    use super::*;
    use crate::auth::password::normalize_email;

    /// Delete the account registered under `email`
    ///
    /// Returns [`BoardnotesError::NotFound`] when no such account exists.
    pub async fn delete_account(service: &NoteService, email: &str) -> Result<()> {
        let email = normalize_email(email);
        let Some((account, _)) = service.storage().find_account_by_email(&email)? else {
            return Err(BoardnotesError::NotFound(format!("account {}", email)).into());
        };
        service.delete_account(&account.id).await?;
        Ok(())
    }

    /// Run the account delete command
    pub async fn run_delete(config: Config, email: String) -> Result<()> {
        let storage = SqliteStorage::new_with_path(&config.storage.database_path)?;
        let images = ImageStore::new(&config.storage.saved_dir, &config.storage.uploads_dir)?;
        // Account removal never calls the model
        let provider: Arc<dyn Provider> = Arc::new(NoModel);
        let service = NoteService::new(provider, storage, images, &config.generation);

        delete_account(&service, &email).await?;
        println!("Deleted account {}", normalize_email(&email));
        Ok(())
    }

    struct NoModel;

    #[async_trait::async_trait]
    impl Provider for NoModel {
        async fn complete(
            &self,
            _messages: &[crate::providers::Message],
        ) -> Result<crate::providers::CompletionResponse> {
            Err(BoardnotesError::Provider("no model configured".to_string()).into())
        }

        fn model_name(&self) -> String {
            "none".to_string()
        }
    }
}
