use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registered user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Opaque UUID string
    pub id: String,
    /// Trimmed, lowercased email address
    pub email: String,
    /// When the account was created
    pub created_at: DateTime<Utc>,
}

/// A saved note owned by one account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    /// Opaque UUID string
    pub id: String,
    /// Owning account id
    pub user_id: String,
    /// Display title, never empty
    pub title: String,
    /// Mode the note was generated with
    pub category: String,
    /// Rendered HTML of the cleaned markdown
    pub content_html: String,
    /// Image paths relative to the saved-images root, in upload order
    pub image_paths: Vec<String>,
    /// When the note was generated
    pub created_at: DateTime<Utc>,
    /// Last time the owner opened the note
    pub last_visited: DateTime<Utc>,
}

/// Fields for inserting a note
///
/// The id is chosen by the caller so images can be written under the note's
/// directory before the row exists.
#[derive(Debug, Clone)]
pub struct NewNote {
    pub id: String,
    pub title: String,
    pub category: String,
    pub content_html: String,
    pub image_paths: Vec<String>,
}
