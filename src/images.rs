//! Image payloads and their on-disk storage
//!
//! Saved-note images live under `<saved_root>/<account_id>/<note_id>/`.
//! Anonymous images go to a flat uploads directory with a per-request UUID
//! in every filename.

use crate::error::{BoardnotesError, Result};
use base64::Engine;
use bytes::Bytes;
use std::path::{Component, Path, PathBuf};
use uuid::Uuid;

/// Extension used when neither the filename nor the bytes identify a format
pub const DEFAULT_EXTENSION: &str = "png";

/// One uploaded image
#[derive(Debug, Clone)]
pub struct ImageUpload {
    /// Raw file bytes
    pub data: Bytes,
    /// Normalized extension without the dot, e.g. `"jpg"`
    pub extension: String,
}

impl ImageUpload {
    /// Build an upload from its bytes and the client-supplied filename
    ///
    /// The extension comes from the filename when it is a short alphanumeric
    /// suffix, otherwise from sniffing the bytes, otherwise `png`.
    ///
    /// # Examples
    ///
    /// ```
    /// use boardnotes::images::ImageUpload;
    ///
    /// let upload = ImageUpload::new(vec![1, 2, 3], Some("Board.JPG"));
    /// assert_eq!(upload.extension, "jpg");
    ///
    /// let upload = ImageUpload::new(vec![1, 2, 3], None);
    /// assert_eq!(upload.extension, "png");
    /// ```
    pub fn new(data: impl Into<Bytes>, filename: Option<&str>) -> Self {
        let data = data.into();
        let extension = filename
            .and_then(extension_from_filename)
            .or_else(|| sniff_extension(&data))
            .unwrap_or_else(|| DEFAULT_EXTENSION.to_string());
        Self { data, extension }
    }

    /// MIME type derived from the extension
    pub fn mime_type(&self) -> &'static str {
        mime_for_extension(&self.extension)
    }

    /// Base64 encoding of the bytes
    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.data)
    }

    /// `data:` URL suitable for OpenAI-style `image_url` content parts
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type(), self.to_base64())
    }
}

fn extension_from_filename(filename: &str) -> Option<String> {
    let ext = Path::new(filename).extension()?.to_str()?.to_lowercase();
    let valid = !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric());
    valid.then_some(ext)
}

fn sniff_extension(data: &[u8]) -> Option<String> {
    let format = image::guess_format(data).ok()?;
    format.extensions_str().first().map(|ext| ext.to_string())
}

/// MIME type for a stored image extension
pub fn mime_for_extension(extension: &str) -> &'static str {
    match extension {
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        "heic" => "image/heic",
        _ => "image/png",
    }
}

/// Filesystem storage for saved and temporary images
#[derive(Debug, Clone)]
pub struct ImageStore {
    saved_root: PathBuf,
    uploads_root: PathBuf,
}

impl ImageStore {
    /// Create a store rooted at the given directories, creating them if needed
    pub fn new(saved_root: impl Into<PathBuf>, uploads_root: impl Into<PathBuf>) -> Result<Self> {
        let store = Self {
            saved_root: saved_root.into(),
            uploads_root: uploads_root.into(),
        };
        std::fs::create_dir_all(&store.saved_root)?;
        std::fs::create_dir_all(&store.uploads_root)?;
        Ok(store)
    }

    /// Root directory for saved-note images
    pub fn saved_root(&self) -> &Path {
        &self.saved_root
    }

    /// Root directory for anonymous uploads
    pub fn uploads_root(&self) -> &Path {
        &self.uploads_root
    }

    /// Write a note's images and return their paths relative to the saved root
    ///
    /// Paths look like `<account>/<note>/image_0.png`, in upload order.
    pub async fn save_note_images(
        &self,
        account_id: &str,
        note_id: &str,
        images: &[ImageUpload],
    ) -> Result<Vec<String>> {
        let dir = self.note_dir(account_id, note_id)?;
        tokio::fs::create_dir_all(&dir).await?;

        let mut paths = Vec::with_capacity(images.len());
        for (index, image) in images.iter().enumerate() {
            let filename = format!("image_{}.{}", index, image.extension);
            tokio::fs::write(dir.join(&filename), &image.data).await?;
            paths.push(format!("{}/{}/{}", account_id, note_id, filename));
        }

        tracing::debug!(
            account_id,
            note_id,
            count = paths.len(),
            "Saved note images"
        );
        Ok(paths)
    }

    /// Write anonymous images and return their filenames in the uploads root
    pub async fn save_temporary_images(&self, images: &[ImageUpload]) -> Result<Vec<String>> {
        let request_id = Uuid::new_v4().simple().to_string();

        let mut names = Vec::with_capacity(images.len());
        for (index, image) in images.iter().enumerate() {
            let filename = format!("{}_{}.{}", request_id, index, image.extension);
            tokio::fs::write(self.uploads_root.join(&filename), &image.data).await?;
            names.push(filename);
        }
        Ok(names)
    }

    /// Remove a note's image directory; missing directories are fine
    pub async fn remove_note_images(&self, account_id: &str, note_id: &str) -> Result<()> {
        let dir = self.note_dir(account_id, note_id)?;
        remove_dir_if_present(&dir).await
    }

    /// Remove every image belonging to an account
    pub async fn remove_account_images(&self, account_id: &str) -> Result<()> {
        let dir = self.saved_root.join(safe_segment(account_id)?);
        remove_dir_if_present(&dir).await
    }

    /// Resolve a saved image path, refusing anything outside the saved root
    pub fn resolve_saved(&self, account_id: &str, note_id: &str, filename: &str) -> Result<PathBuf> {
        Ok(self
            .note_dir(account_id, note_id)?
            .join(safe_segment(filename)?))
    }

    fn note_dir(&self, account_id: &str, note_id: &str) -> Result<PathBuf> {
        Ok(self
            .saved_root
            .join(safe_segment(account_id)?)
            .join(safe_segment(note_id)?))
    }
}

/// Accept a single normal path component only
fn safe_segment(segment: &str) -> Result<&str> {
    let mut components = Path::new(segment).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(segment),
        _ => Err(BoardnotesError::Validation(format!("Invalid path segment: {}", segment)).into()),
    }
}

async fn remove_dir_if_present(dir: &Path) -> Result<()> {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(BoardnotesError::Io(e).into()),
    }
}
