//! Note generation and saved-note management
//!
//! [`NoteService`] owns the provider, the database and the image store. The
//! HTTP handlers and the CLI both go through it.

use crate::auth::{Cooldown, SessionContext};
use crate::config::GenerationConfig;
use crate::error::{BoardnotesError, Result};
use crate::images::{ImageStore, ImageUpload};
use crate::markdown::{clean_markdown, render_html};
use crate::note_mode::NoteMode;
use crate::prompts::build_prompt_for;
use crate::providers::{ImageAttachment, Message, Provider};
use crate::storage::{NewNote, Note, SqliteStorage};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

/// URL prefix under which saved-note images are served
pub const SAVED_URL_PREFIX: &str = "/saved";

/// URL prefix under which anonymous uploads are served
pub const UPLOADS_URL_PREFIX: &str = "/uploads";

/// Result of one generation
#[derive(Debug, Clone)]
pub struct GeneratedNotes {
    /// Mode the notes were generated in
    pub mode: NoteMode,
    /// Cleaned model output
    pub markdown: String,
    /// Rendered HTML of `markdown`
    pub html: String,
    /// URLs of the stored source images, in upload order
    pub image_urls: Vec<String>,
    /// The saved note, for authenticated sessions
    pub note: Option<Note>,
}

/// Generation workflow plus the owner-scoped note operations around it
pub struct NoteService {
    provider: Arc<dyn Provider>,
    storage: SqliteStorage,
    images: ImageStore,
    cooldown: Cooldown,
    max_images: usize,
}

impl NoteService {
    pub fn new(
        provider: Arc<dyn Provider>,
        storage: SqliteStorage,
        images: ImageStore,
        generation: &GenerationConfig,
    ) -> Self {
        Self {
            provider,
            storage,
            images,
            cooldown: Cooldown::from_millis(generation.cooldown_ms),
            max_images: generation.max_images,
        }
    }

    pub fn storage(&self) -> &SqliteStorage {
        &self.storage
    }

    pub fn images(&self) -> &ImageStore {
        &self.images
    }

    pub fn max_images(&self) -> usize {
        self.max_images
    }

    /// Turn uploaded images into notes
    ///
    /// [`admit`](Self::admit) followed by
    /// [`generate_admitted`](Self::generate_admitted). Callers that share the
    /// session between concurrent requests persist the context in between.
    ///
    /// # Errors
    ///
    /// - [`BoardnotesError::Validation`] for zero or too many images
    /// - [`BoardnotesError::RateLimited`] inside the cooldown
    /// - [`BoardnotesError::Generation`] when the model call fails or returns nothing
    pub async fn generate(
        &self,
        ctx: &mut SessionContext,
        mode: &str,
        images: Vec<ImageUpload>,
    ) -> Result<GeneratedNotes> {
        self.admit(ctx, images.len())?;
        self.generate_admitted(ctx, mode, images).await
    }

    /// Check the image count, then the session cooldown
    ///
    /// An admitted attempt is recorded in `ctx` before any model work, so it
    /// counts against the cooldown whatever happens next.
    pub fn admit(&self, ctx: &mut SessionContext, image_count: usize) -> Result<()> {
        self.check_image_count(image_count)?;
        self.cooldown.check_and_record(ctx, Utc::now())
    }

    /// Make the model call for an admitted attempt and keep the result
    ///
    /// Authenticated sessions get a saved note; anonymous ones get their
    /// images kept in the uploads area. Nothing is persisted when the model
    /// call fails.
    pub async fn generate_admitted(
        &self,
        ctx: &SessionContext,
        mode: &str,
        images: Vec<ImageUpload>,
    ) -> Result<GeneratedNotes> {
        let mode = NoteMode::parse(mode);
        let markdown = self.call_model(mode, &images).await?;
        let html = render_html(&markdown);

        match ctx.account_id.as_deref() {
            Some(owner) => {
                let note = self.save_note(owner, mode, html.clone(), &images).await?;
                let image_urls = note
                    .image_paths
                    .iter()
                    .map(|path| format!("{}/{}", SAVED_URL_PREFIX, path))
                    .collect();
                Ok(GeneratedNotes {
                    mode,
                    markdown,
                    html,
                    image_urls,
                    note: Some(note),
                })
            }
            None => {
                let names = self.images.save_temporary_images(&images).await?;
                let image_urls = names
                    .iter()
                    .map(|name| format!("{}/{}", UPLOADS_URL_PREFIX, name))
                    .collect();
                Ok(GeneratedNotes {
                    mode,
                    markdown,
                    html,
                    image_urls,
                    note: None,
                })
            }
        }
    }

    fn check_image_count(&self, count: usize) -> Result<()> {
        if count == 0 {
            return Err(BoardnotesError::Validation("Please upload at least one image".to_string()).into());
        }
        if count > self.max_images {
            return Err(BoardnotesError::Validation(format!(
                "Please upload at most {} images",
                self.max_images
            ))
            .into());
        }
        Ok(())
    }

    async fn call_model(&self, mode: NoteMode, images: &[ImageUpload]) -> Result<String> {
        let attachments = images.iter().map(ImageAttachment::from).collect();
        let message = Message::user_with_images(build_prompt_for(mode), attachments);

        tracing::info!(
            mode = %mode,
            images = images.len(),
            model = %self.provider.model_name(),
            "Requesting notes"
        );

        let response = self.provider.complete(&[message]).await.map_err(|e| {
            tracing::error!("Note generation failed: {:#}", e);
            BoardnotesError::Generation(e.to_string())
        })?;

        if let Some(usage) = response.usage {
            tracing::debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "Model usage"
            );
        }

        let markdown = clean_markdown(&response.message.content);
        if markdown.is_empty() {
            tracing::error!("Model returned no usable content");
            return Err(BoardnotesError::Generation("empty response".to_string()).into());
        }
        Ok(markdown)
    }

    async fn save_note(
        &self,
        owner: &str,
        mode: NoteMode,
        content_html: String,
        images: &[ImageUpload],
    ) -> Result<Note> {
        let note_id = Uuid::new_v4().to_string();

        let image_paths = match self.images.save_note_images(owner, &note_id, images).await {
            Ok(paths) => paths,
            Err(e) => {
                self.discard_note_images(owner, &note_id).await;
                return Err(e);
            }
        };

        let new_note = NewNote {
            id: note_id.clone(),
            title: mode.default_title(),
            category: mode.as_str().to_string(),
            content_html,
            image_paths,
        };

        match self.storage.create_note(owner, new_note) {
            Ok(note) => {
                tracing::info!(note_id = %note.id, account_id = owner, "Saved note");
                Ok(note)
            }
            Err(e) => {
                self.discard_note_images(owner, &note_id).await;
                Err(e)
            }
        }
    }

    async fn discard_note_images(&self, owner: &str, note_id: &str) {
        if let Err(e) = self.images.remove_note_images(owner, note_id).await {
            tracing::warn!(note_id, "Failed to remove images of unsaved note: {}", e);
        }
    }

    /// Notes owned by `owner`, most recently visited first
    pub fn list_notes(&self, owner: &str) -> Result<Vec<Note>> {
        self.storage.list_notes(owner)
    }

    /// Open a note, updating its last-visited time
    ///
    /// Missing notes and notes owned by someone else are both
    /// [`BoardnotesError::NotFound`].
    pub fn open_note(&self, owner: &str, id: &str) -> Result<Note> {
        self.storage
            .get_note(owner, id)?
            .ok_or_else(|| BoardnotesError::NotFound(format!("note {}", id)).into())
    }

    /// Rename a note; blank titles become "Untitled notes"
    pub fn rename_note(&self, owner: &str, id: &str, title: &str) -> Result<Note> {
        self.storage
            .rename_note(owner, id, title)?
            .ok_or_else(|| BoardnotesError::NotFound(format!("note {}", id)).into())
    }

    /// Delete a note and its images; returns whether the note existed
    ///
    /// Once the row is gone the delete has succeeded; a leftover image
    /// directory is only logged.
    pub async fn delete_note(&self, owner: &str, id: &str) -> Result<bool> {
        let removed = self.storage.delete_note(owner, id)?;
        if removed {
            if let Err(e) = self.images.remove_note_images(owner, id).await {
                tracing::warn!(note_id = id, "Failed to remove images of deleted note: {}", e);
            }
            tracing::info!(note_id = id, account_id = owner, "Deleted note");
        }
        Ok(removed)
    }

    /// Delete an account, its notes and every saved image
    pub async fn delete_account(&self, account_id: &str) -> Result<bool> {
        let removed = self.storage.delete_account(account_id)?;
        self.images.remove_account_images(account_id).await?;
        if removed {
            tracing::info!(account_id, "Deleted account");
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{test_service, StaticProvider};

    fn upload(name: &str) -> ImageUpload {
        ImageUpload::new(b"fake image".to_vec(), Some(name))
    }

    fn uploads(count: usize) -> Vec<ImageUpload> {
        (0..count).map(|i| upload(&format!("board{}.png", i))).collect()
    }

    fn error_kind(err: &anyhow::Error) -> &BoardnotesError {
        err.downcast_ref::<BoardnotesError>()
            .expect("expected a BoardnotesError")
    }

    #[tokio::test]
    async fn test_zero_images_rejected_without_model_call() {
        let provider = Arc::new(StaticProvider::new("- a"));
        let (service, _dir) = test_service(provider.clone());
        let mut ctx = SessionContext::default();

        let err = service.generate(&mut ctx, "bullet", vec![]).await.unwrap_err();
        assert!(matches!(error_kind(&err), BoardnotesError::Validation(_)));
        assert_eq!(provider.calls(), 0);
        assert!(ctx.last_generation.is_none());
    }

    #[tokio::test]
    async fn test_image_count_bounds() {
        let provider = Arc::new(StaticProvider::new("- a"));
        let (service, _dir) = test_service(provider.clone());

        let mut ctx = SessionContext::default();
        let err = service.generate(&mut ctx, "bullet", uploads(11)).await.unwrap_err();
        assert!(matches!(error_kind(&err), BoardnotesError::Validation(_)));

        let mut ctx = SessionContext::default();
        let notes = service.generate(&mut ctx, "bullet", uploads(10)).await.unwrap();
        assert_eq!(notes.image_urls.len(), 10);
        assert_eq!(provider.last_image_count(), Some(10));
    }

    #[tokio::test]
    async fn test_second_generation_inside_cooldown_is_rate_limited() {
        let provider = Arc::new(StaticProvider::new("- a"));
        let (service, _dir) = test_service(provider.clone());
        let mut ctx = SessionContext::default();

        service.generate(&mut ctx, "bullet", uploads(1)).await.unwrap();
        let err = service.generate(&mut ctx, "bullet", uploads(1)).await.unwrap_err();

        assert!(matches!(error_kind(&err), BoardnotesError::RateLimited { .. }));
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_admit_records_attempt_before_model_call() {
        let provider = Arc::new(StaticProvider::new("- a"));
        let (service, _dir) = test_service(provider.clone());
        let mut ctx = SessionContext::default();

        service.admit(&mut ctx, 1).unwrap();
        assert!(ctx.last_generation.is_some());
        assert_eq!(provider.calls(), 0);

        let err = service.admit(&mut ctx, 1).unwrap_err();
        assert!(matches!(error_kind(&err), BoardnotesError::RateLimited { .. }));
    }

    #[tokio::test]
    async fn test_generation_allowed_after_cooldown() {
        let provider = Arc::new(StaticProvider::new("- a"));
        let (service, _dir) = test_service(provider.clone());
        let mut ctx = SessionContext::default();

        service.generate(&mut ctx, "bullet", uploads(1)).await.unwrap();
        // Pretend the previous attempt happened long ago
        ctx.last_generation = Some(Utc::now() - chrono::Duration::seconds(5));
        service.generate(&mut ctx, "bullet", uploads(1)).await.unwrap();
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_anonymous_generation_cleans_output_and_keeps_temp_images() {
        let provider = Arc::new(StaticProvider::new("Here's your notes:\n###Cells\n---\n- nucleus"));
        let (service, _dir) = test_service(provider.clone());
        let mut ctx = SessionContext::default();

        let notes = service.generate(&mut ctx, "summary", uploads(2)).await.unwrap();

        assert_eq!(notes.markdown, "### Cells\n- nucleus");
        assert!(notes.html.contains("<h3>Cells</h3>"));
        assert!(notes.note.is_none());
        assert_eq!(notes.image_urls.len(), 2);
        for url in &notes.image_urls {
            let name = url.strip_prefix("/uploads/").expect("uploads url");
            assert!(service.images().uploads_root().join(name).exists());
        }
        assert!(provider.last_prompt().unwrap().contains("exam"));
    }

    #[tokio::test]
    async fn test_authenticated_generation_saves_note() {
        let provider = Arc::new(StaticProvider::new("term: meaning"));
        let (service, _dir) = test_service(provider);
        let account = service
            .storage()
            .create_account("a@example.com", "hash")
            .unwrap();
        let mut ctx = SessionContext::authenticated(account.id.clone());

        let notes = service
            .generate(&mut ctx, "definitions", vec![upload("board.jpg")])
            .await
            .unwrap();

        let note = notes.note.expect("note saved");
        assert_eq!(note.title, "Definitions notes");
        assert_eq!(note.category, "definitions");
        assert_eq!(
            note.image_paths,
            vec![format!("{}/{}/image_0.jpg", account.id, note.id)]
        );
        assert_eq!(notes.image_urls[0], format!("/saved/{}", note.image_paths[0]));
        assert!(service
            .images()
            .saved_root()
            .join(&note.image_paths[0])
            .exists());

        let listed = service.list_notes(&account.id).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, note.id);
    }

    #[tokio::test]
    async fn test_provider_failure_persists_nothing() {
        let provider = Arc::new(StaticProvider::failing());
        let (service, _dir) = test_service(provider);
        let account = service
            .storage()
            .create_account("a@example.com", "hash")
            .unwrap();
        let mut ctx = SessionContext::authenticated(account.id.clone());

        let err = service.generate(&mut ctx, "bullet", uploads(1)).await.unwrap_err();

        assert!(matches!(error_kind(&err), BoardnotesError::Generation(_)));
        assert_eq!(err.to_string(), "Note generation failed, please try again");
        assert!(service.list_notes(&account.id).unwrap().is_empty());
        assert!(!service.images().saved_root().join(&account.id).exists());
        // The failed attempt still counts against the cooldown
        assert!(ctx.last_generation.is_some());
    }

    #[tokio::test]
    async fn test_empty_model_output_is_generation_error() {
        let provider = Arc::new(StaticProvider::new("---\n   \n"));
        let (service, _dir) = test_service(provider);
        let mut ctx = SessionContext::default();

        let err = service.generate(&mut ctx, "bullet", uploads(1)).await.unwrap_err();
        assert!(matches!(error_kind(&err), BoardnotesError::Generation(_)));
    }

    #[tokio::test]
    async fn test_unknown_mode_generates_general_notes() {
        let provider = Arc::new(StaticProvider::new("# Notes"));
        let (service, _dir) = test_service(provider.clone());
        let account = service
            .storage()
            .create_account("a@example.com", "hash")
            .unwrap();
        let mut ctx = SessionContext::authenticated(account.id);

        let notes = service.generate(&mut ctx, "haiku", uploads(1)).await.unwrap();
        let note = notes.note.unwrap();
        assert_eq!(note.category, "general");
        assert_eq!(note.title, "General notes");
    }

    #[tokio::test]
    async fn test_delete_note_removes_images_and_is_idempotent() {
        let provider = Arc::new(StaticProvider::new("- a"));
        let (service, _dir) = test_service(provider);
        let account = service
            .storage()
            .create_account("a@example.com", "hash")
            .unwrap();
        let mut ctx = SessionContext::authenticated(account.id.clone());
        let note = service
            .generate(&mut ctx, "bullet", uploads(1))
            .await
            .unwrap()
            .note
            .unwrap();
        let note_dir = service.images().saved_root().join(&account.id).join(&note.id);
        assert!(note_dir.exists());

        assert!(service.delete_note(&account.id, &note.id).await.unwrap());
        assert!(!note_dir.exists());
        assert!(service.list_notes(&account.id).unwrap().is_empty());
        assert!(!service.delete_note(&account.id, &note.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_note_succeeds_when_images_cannot_be_removed() {
        let provider = Arc::new(StaticProvider::new("- a"));
        let (service, _dir) = test_service(provider);
        let account = service
            .storage()
            .create_account("a@example.com", "hash")
            .unwrap();
        let mut ctx = SessionContext::authenticated(account.id.clone());
        let note = service
            .generate(&mut ctx, "bullet", uploads(1))
            .await
            .unwrap()
            .note
            .unwrap();

        // A plain file where the image directory should be makes removal fail
        let note_dir = service.images().saved_root().join(&account.id).join(&note.id);
        std::fs::remove_dir_all(&note_dir).unwrap();
        std::fs::write(&note_dir, b"not a directory").unwrap();

        assert!(service.delete_note(&account.id, &note.id).await.unwrap());
        assert!(service.list_notes(&account.id).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_open_and_rename_enforce_ownership() {
        let provider = Arc::new(StaticProvider::new("- a"));
        let (service, _dir) = test_service(provider);
        let alice = service.storage().create_account("alice@example.com", "h").unwrap();
        let bob = service.storage().create_account("bob@example.com", "h").unwrap();
        let mut ctx = SessionContext::authenticated(alice.id.clone());
        let note = service
            .generate(&mut ctx, "bullet", uploads(1))
            .await
            .unwrap()
            .note
            .unwrap();

        let err = service.open_note(&bob.id, &note.id).unwrap_err();
        assert!(matches!(error_kind(&err), BoardnotesError::NotFound(_)));
        let err = service.rename_note(&bob.id, &note.id, "mine now").unwrap_err();
        assert!(matches!(error_kind(&err), BoardnotesError::NotFound(_)));

        let renamed = service.rename_note(&alice.id, &note.id, "").unwrap();
        assert_eq!(renamed.title, "Untitled notes");
    }

    #[tokio::test]
    async fn test_delete_account_removes_notes_and_images() {
        let provider = Arc::new(StaticProvider::new("- a"));
        let (service, _dir) = test_service(provider);
        let account = service
            .storage()
            .create_account("a@example.com", "hash")
            .unwrap();
        let mut ctx = SessionContext::authenticated(account.id.clone());
        service.generate(&mut ctx, "bullet", uploads(1)).await.unwrap();

        assert!(service.delete_account(&account.id).await.unwrap());
        assert!(service.list_notes(&account.id).unwrap().is_empty());
        assert!(!service.images().saved_root().join(&account.id).exists());
    }
}
