//! Prompts sent to the multimodal model
//!
//! Every prompt is the fixed preamble followed by one mode-specific
//! instruction.

use crate::note_mode::NoteMode;

/// Shared instructions that keep the model from inventing content
pub const PREAMBLE: &str = "You are turning photographs of a whiteboard or handwritten notes \
into study notes. Use only what is visible in the images: do not invent content, \
do not add introductions or closing remarks, and output only the requested format \
in Markdown.";

/// Mode-specific part of the prompt
pub fn mode_instruction(mode: NoteMode) -> &'static str {
    match mode {
        NoteMode::Bullet => {
            "Organize the content as concise bullet points, nesting sub-points under their topic."
        }
        NoteMode::Cornell => {
            "Produce Cornell notes with exactly three labeled sections: \
             ## Main Notes, ## Cues, and ## Summary."
        }
        NoteMode::Summary => {
            "Write a short exam-oriented summary covering only the material likely to be tested."
        }
        NoteMode::Definitions => {
            "Extract only the key terms and their definitions, one `term: definition` per line."
        }
        NoteMode::Steps => {
            "Explain the content as a numbered step-by-step walkthrough, one step per line."
        }
        NoteMode::General => {
            "Turn the board content into clean, structured class notes with headings."
        }
    }
}

/// Builds the complete prompt for a requested mode
///
/// Pure and total: unrecognized mode strings produce the general instruction.
///
/// # Examples
///
/// ```
/// use boardnotes::prompts::{build_prompt, PREAMBLE};
///
/// let prompt = build_prompt("cornell");
/// assert!(prompt.starts_with(PREAMBLE));
/// assert!(prompt.contains("Cues"));
/// ```
pub fn build_prompt(mode: &str) -> String {
    build_prompt_for(NoteMode::parse(mode))
}

/// Builds the prompt for an already-parsed mode
pub fn build_prompt_for(mode: NoteMode) -> String {
    format!("{}\n\n{}", PREAMBLE, mode_instruction(mode))
}
