//! Note mode types
//!
//! A mode is the formatting style requested for a generation. It selects the
//! prompt instruction, becomes the saved note's category, and names the
//! default title.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Requested note style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteMode {
    /// Bullet point notes
    Bullet,
    /// Main Notes / Cues / Summary sections
    Cornell,
    /// Short exam-oriented summary
    Summary,
    /// Key terms and definitions, one per line
    Definitions,
    /// Numbered step-by-step explanation
    Steps,
    /// Generic structured notes; used for any unrecognized mode
    General,
}

impl NoteMode {
    /// Every recognized mode, in the order the upload form lists them
    pub const ALL: [NoteMode; 6] = [
        Self::Bullet,
        Self::Cornell,
        Self::Summary,
        Self::Definitions,
        Self::Steps,
        Self::General,
    ];

    /// Parse a mode from user input
    ///
    /// Total over all strings: input is trimmed and lowercased, and anything
    /// unrecognized becomes [`NoteMode::General`].
    ///
    /// # Examples
    ///
    /// ```
    /// use boardnotes::note_mode::NoteMode;
    ///
    /// assert_eq!(NoteMode::parse(" Cornell "), NoteMode::Cornell);
    /// assert_eq!(NoteMode::parse("haiku"), NoteMode::General);
    /// ```
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "bullet" => Self::Bullet,
            "cornell" => Self::Cornell,
            "summary" => Self::Summary,
            "definitions" => Self::Definitions,
            "steps" => Self::Steps,
            _ => Self::General,
        }
    }

    /// Stored category value
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bullet => "bullet",
            Self::Cornell => "cornell",
            Self::Summary => "summary",
            Self::Definitions => "definitions",
            Self::Steps => "steps",
            Self::General => "general",
        }
    }

    /// Capitalized label used in titles and the upload form
    pub fn label(&self) -> &'static str {
        match self {
            Self::Bullet => "Bullet",
            Self::Cornell => "Cornell",
            Self::Summary => "Summary",
            Self::Definitions => "Definitions",
            Self::Steps => "Steps",
            Self::General => "General",
        }
    }

    /// Default title for a note generated in this mode, e.g. `"Definitions notes"`
    pub fn default_title(&self) -> String {
        format!("{} notes", self.label())
    }
}

impl Default for NoteMode {
    fn default() -> Self {
        Self::General
    }
}

impl fmt::Display for NoteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
