use crate::error::{BoardnotesError, Result};
use anyhow::Context;
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub mod types;
pub use types::{Account, NewNote, Note};

/// Title given to notes renamed to an empty string
pub const UNTITLED: &str = "Untitled notes";

const NOTE_COLUMNS: &str =
    "id, user_id, title, category, content_html, image_paths, created_at, last_visited";

/// SQLite storage for accounts and notes
///
/// Every operation opens its own connection. Note operations take the owning
/// account id and filter on it, so a caller can never read or modify another
/// account's notes.
#[derive(Debug, Clone)]
pub struct SqliteStorage {
    db_path: PathBuf,
}

impl SqliteStorage {
    /// Create a storage instance backed by the given database file
    ///
    /// Creates the parent directory and the schema if they do not exist.
    ///
    /// # Examples
    ///
    /// ```
    /// use boardnotes::storage::SqliteStorage;
    ///
    /// let dir = tempfile::tempdir().unwrap();
    /// let storage = SqliteStorage::new_with_path(dir.path().join("notes.db")).unwrap();
    /// assert!(storage.list_notes("nobody").unwrap().is_empty());
    /// ```
    pub fn new_with_path<P: Into<PathBuf>>(db_path: P) -> Result<Self> {
        let db_path = db_path.into();

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .context("Failed to create parent directory for database")
                .map_err(|e| BoardnotesError::Storage(e.to_string()))?;
        }

        let storage = Self { db_path };
        storage.init()?;
        Ok(storage)
    }

    /// Path of the database file
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn connect(&self) -> Result<Connection> {
        let conn = Connection::open(&self.db_path)
            .context("Failed to open database")
            .map_err(|e| BoardnotesError::Storage(e.to_string()))?;

        // Foreign keys are off by default and apply per connection
        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .context("Failed to enable foreign keys")
            .map_err(|e| BoardnotesError::Storage(e.to_string()))?;

        Ok(conn)
    }

    fn init(&self) -> Result<()> {
        let conn = self.connect()?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS notes (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                title TEXT NOT NULL,
                category TEXT NOT NULL,
                content_html TEXT NOT NULL,
                image_paths JSON NOT NULL,
                created_at TEXT NOT NULL,
                last_visited TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_notes_user ON notes(user_id);",
        )
        .context("Failed to create tables")
        .map_err(|e| BoardnotesError::Storage(e.to_string()))?;

        Ok(())
    }

    // ---------------------------------------------------------------------
    // Accounts
    // ---------------------------------------------------------------------

    /// Insert an account
    ///
    /// Returns [`BoardnotesError::Conflict`] when the email is already taken.
    /// The email is expected to be normalized already.
    pub fn create_account(&self, email: &str, password_hash: &str) -> Result<Account> {
        let conn = self.connect()?;

        let taken = conn
            .query_row("SELECT 1 FROM users WHERE email = ?", params![email], |_| {
                Ok(())
            })
            .optional()
            .context("Failed to check email")
            .map_err(|e| BoardnotesError::Storage(e.to_string()))?
            .is_some();
        if taken {
            return Err(email_taken());
        }

        let account = Account {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            created_at: now(),
        };

        let inserted = conn.execute(
            "INSERT INTO users (id, email, password_hash, created_at) VALUES (?, ?, ?, ?)",
            params![
                account.id,
                account.email,
                password_hash,
                timestamp(account.created_at)
            ],
        );

        match inserted {
            Ok(_) => {
                tracing::info!(account_id = %account.id, "Created account");
                Ok(account)
            }
            // Lost a race with another signup for the same email
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(email_taken())
            }
            Err(e) => Err(BoardnotesError::Storage(format!("Failed to insert account: {}", e)).into()),
        }
    }

    /// Look up an account and its password hash by email
    pub fn find_account_by_email(&self, email: &str) -> Result<Option<(Account, String)>> {
        let conn = self.connect()?;

        conn.query_row(
            "SELECT id, email, created_at, password_hash FROM users WHERE email = ?",
            params![email],
            |row| Ok((account_from_row(row)?, row.get::<_, String>(3)?)),
        )
        .optional()
        .context("Failed to query account")
        .map_err(|e| BoardnotesError::Storage(e.to_string()).into())
    }

    /// Look up an account by id
    pub fn get_account(&self, id: &str) -> Result<Option<Account>> {
        let conn = self.connect()?;

        conn.query_row(
            "SELECT id, email, created_at FROM users WHERE id = ?",
            params![id],
            account_from_row,
        )
        .optional()
        .context("Failed to query account")
        .map_err(|e| BoardnotesError::Storage(e.to_string()).into())
    }

    /// Delete an account and, through the foreign key, all of its notes
    ///
    /// Returns whether an account was removed.
    pub fn delete_account(&self, id: &str) -> Result<bool> {
        let conn = self.connect()?;

        let removed = conn
            .execute("DELETE FROM users WHERE id = ?", params![id])
            .context("Failed to delete account")
            .map_err(|e| BoardnotesError::Storage(e.to_string()))?;

        Ok(removed > 0)
    }

    // ---------------------------------------------------------------------
    // Notes
    // ---------------------------------------------------------------------

    /// Insert a note for `owner` with its image list already set
    pub fn create_note(&self, owner: &str, note: NewNote) -> Result<Note> {
        let conn = self.connect()?;

        let created = now();
        let images_json = serde_json::to_string(&note.image_paths)
            .context("Failed to serialize image paths")
            .map_err(|e| BoardnotesError::Storage(e.to_string()))?;

        conn.execute(
            "INSERT INTO notes (id, user_id, title, category, content_html, image_paths, created_at, last_visited)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                note.id,
                owner,
                note.title,
                note.category,
                note.content_html,
                images_json,
                timestamp(created),
                timestamp(created)
            ],
        )
        .context("Failed to insert note")
        .map_err(|e| BoardnotesError::Storage(e.to_string()))?;

        Ok(Note {
            id: note.id,
            user_id: owner.to_string(),
            title: note.title,
            category: note.category,
            content_html: note.content_html,
            image_paths: note.image_paths,
            created_at: created,
            last_visited: created,
        })
    }

    /// Replace a note's image list
    ///
    /// Returns [`BoardnotesError::NotFound`] when the note does not exist or
    /// belongs to another account.
    pub fn attach_images(&self, owner: &str, id: &str, image_paths: &[String]) -> Result<()> {
        let conn = self.connect()?;

        let images_json = serde_json::to_string(image_paths)
            .context("Failed to serialize image paths")
            .map_err(|e| BoardnotesError::Storage(e.to_string()))?;

        let updated = conn
            .execute(
                "UPDATE notes SET image_paths = ? WHERE id = ? AND user_id = ?",
                params![images_json, id, owner],
            )
            .context("Failed to update note images")
            .map_err(|e| BoardnotesError::Storage(e.to_string()))?;

        if updated == 0 {
            return Err(BoardnotesError::NotFound(format!("note {}", id)).into());
        }
        Ok(())
    }

    /// All notes owned by `owner`, most recently visited first
    pub fn list_notes(&self, owner: &str) -> Result<Vec<Note>> {
        let conn = self.connect()?;

        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM notes WHERE user_id = ?
                ORDER BY last_visited DESC, created_at DESC",
                NOTE_COLUMNS
            ))
            .context("Failed to prepare statement")
            .map_err(|e| BoardnotesError::Storage(e.to_string()))?;

        let rows = stmt
            .query_map(params![owner], note_from_row)
            .context("Failed to query notes")
            .map_err(|e| BoardnotesError::Storage(e.to_string()))?;

        let mut notes = Vec::new();
        for row in rows {
            notes.push(row.map_err(|e| BoardnotesError::Storage(e.to_string()))?);
        }
        Ok(notes)
    }

    /// Fetch a note and mark it visited
    pub fn get_note(&self, owner: &str, id: &str) -> Result<Option<Note>> {
        let conn = self.connect()?;

        let touched = conn
            .execute(
                "UPDATE notes SET last_visited = ? WHERE id = ? AND user_id = ?",
                params![timestamp(now()), id, owner],
            )
            .context("Failed to update last visited")
            .map_err(|e| BoardnotesError::Storage(e.to_string()))?;
        if touched == 0 {
            return Ok(None);
        }

        select_note(&conn, owner, id)
    }

    /// Rename a note
    ///
    /// The title is trimmed; an empty result becomes [`UNTITLED`].
    pub fn rename_note(&self, owner: &str, id: &str, title: &str) -> Result<Option<Note>> {
        let conn = self.connect()?;

        let title = match title.trim() {
            "" => UNTITLED,
            trimmed => trimmed,
        };

        let updated = conn
            .execute(
                "UPDATE notes SET title = ? WHERE id = ? AND user_id = ?",
                params![title, id, owner],
            )
            .context("Failed to rename note")
            .map_err(|e| BoardnotesError::Storage(e.to_string()))?;
        if updated == 0 {
            return Ok(None);
        }

        select_note(&conn, owner, id)
    }

    /// Delete a note; returns whether a row was removed
    pub fn delete_note(&self, owner: &str, id: &str) -> Result<bool> {
        let conn = self.connect()?;

        let removed = conn
            .execute(
                "DELETE FROM notes WHERE id = ? AND user_id = ?",
                params![id, owner],
            )
            .context("Failed to delete note")
            .map_err(|e| BoardnotesError::Storage(e.to_string()))?;

        Ok(removed > 0)
    }
}

fn email_taken() -> anyhow::Error {
    BoardnotesError::Conflict("An account with that email already exists".to_string()).into()
}

fn select_note(conn: &Connection, owner: &str, id: &str) -> Result<Option<Note>> {
    conn.query_row(
        &format!(
            "SELECT {} FROM notes WHERE id = ? AND user_id = ?",
            NOTE_COLUMNS
        ),
        params![id, owner],
        note_from_row,
    )
    .optional()
    .context("Failed to query note")
    .map_err(|e| BoardnotesError::Storage(e.to_string()).into())
}

/// Current time at the precision stored in the database
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Fixed-width RFC 3339 so text ordering matches time ordering
fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e)))
}

fn account_from_row(row: &Row<'_>) -> rusqlite::Result<Account> {
    Ok(Account {
        id: row.get(0)?,
        email: row.get(1)?,
        created_at: parse_timestamp(row, 2)?,
    })
}

fn note_from_row(row: &Row<'_>) -> rusqlite::Result<Note> {
    let images_json: String = row.get(5)?;
    let image_paths: Vec<String> = serde_json::from_str(&images_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(Note {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        category: row.get(3)?,
        content_html: row.get(4)?,
        image_paths,
        created_at: parse_timestamp(row, 6)?,
        last_visited: parse_timestamp(row, 7)?,
    })
}
