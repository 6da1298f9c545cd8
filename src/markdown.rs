//! Cleanup and rendering of model output
//!
//! Models wrap their answer in filler ("Here's your notes:"), emit stray
//! horizontal rules, and sometimes write `###Heading` without the space
//! Markdown needs. [`clean_markdown`] fixes those; [`render_html`] turns the
//! result into HTML for the note page.

use pulldown_cmark::{html, Event, Options, Parser};
use regex::Regex;
use std::borrow::Cow;
use std::sync::OnceLock;

fn rule_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^[ \t]*[-–—]{3,}[ \t]*(?:\r?\n|$)").expect("valid regex"))
}

fn filler_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\A(?:\s*here(?:'s|’s| is| are)\b[^\n]*?:[ \t]*(?:\r?\n|$))+\s*")
            .expect("valid regex")
    })
}

fn heading_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^([ \t]{0,3}#{1,6})([^#\s])").expect("valid regex"))
}

/// Decode a provider response body, replacing invalid UTF-8 sequences
pub fn lossy_text(bytes: &[u8]) -> Cow<'_, str> {
    String::from_utf8_lossy(bytes)
}

/// Clean raw model output
///
/// Removes horizontal-rule lines made of three or more `-`, `–` or `—`,
/// strips leading "here's ...:" lines, inserts the missing space after
/// heading markers, and trims. Passes repeat until the text stops changing,
/// so the function is idempotent.
///
/// # Examples
///
/// ```
/// use boardnotes::markdown::clean_markdown;
///
/// let raw = "Here's your notes:\n###Cells\n---\n- nucleus";
/// assert_eq!(clean_markdown(raw), "### Cells\n- nucleus");
/// ```
pub fn clean_markdown(raw: &str) -> String {
    // Every pass either shrinks the text or adds one space per unspaced
    // heading, so this settles
    let mut text = raw.replace('\0', "");
    loop {
        let next = cleanup_pass(&text);
        if next == text {
            return text;
        }
        text = next;
    }
}

fn cleanup_pass(text: &str) -> String {
    let without_rules = rule_line_re().replace_all(text, "");
    let without_filler = filler_re().replace(&without_rules, "");
    let headings = heading_re().replace_all(&without_filler, "$1 $2");
    headings.trim().to_string()
}

/// Render cleaned markdown as HTML
///
/// Raw HTML in the model output is escaped rather than passed through.
pub fn render_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    let parser = Parser::new_ext(markdown, options).map(|event| match event {
        Event::Html(raw) => Event::Text(raw),
        other => other,
    });

    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}

/// Escape text for interpolation into HTML
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    // Writing into a String cannot fail
    let _ = pulldown_cmark::escape::escape_html(&mut out, text);
    out
}
