//! Server-rendered HTML pages
//!
//! Every interpolated value goes through [`escape_html`] except note bodies,
//! which were produced by [`crate::markdown::render_html`] with raw HTML
//! already escaped.

use crate::markdown::escape_html;
use crate::note_mode::NoteMode;
use crate::notes::GeneratedNotes;
use crate::storage::Note;
use axum::http::StatusCode;
use axum::response::Html;

const STYLE: &str = "body{font-family:system-ui,sans-serif;max-width:52rem;margin:2rem auto;padding:0 1rem;line-height:1.5}\
nav a{margin-right:1rem}.error{color:#b00020}.images img{max-width:12rem;margin:.25rem;border:1px solid #ccc}\
table{border-collapse:collapse}td,th{border:1px solid #ccc;padding:.25rem .5rem}form.inline{display:inline}";

fn layout(title: &str, logged_in: bool, body: &str) -> Html<String> {
    let nav = if logged_in {
        r#"<a href="/">New notes</a><a href="/notes">My notes</a><a href="/logout">Log out</a>"#
    } else {
        r#"<a href="/">New notes</a><a href="/login">Log in</a><a href="/signup">Sign up</a>"#
    };
    Html(format!(
        "<!DOCTYPE html>\n<html lang=\"en\"><head><meta charset=\"utf-8\">\
<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\
<title>{title} · Boardnotes</title><style>{STYLE}</style></head>\
<body><nav>{nav}</nav><main>{body}</main></body></html>",
        title = escape_html(title),
        STYLE = STYLE,
        nav = nav,
        body = body,
    ))
}

fn error_block(error: Option<&str>) -> String {
    error
        .map(|msg| format!("<p class=\"error\">{}</p>", escape_html(msg)))
        .unwrap_or_default()
}

fn image_list(urls: &[String]) -> String {
    if urls.is_empty() {
        return String::new();
    }
    let items: String = urls
        .iter()
        .map(|url| {
            let url = escape_html(url);
            format!("<a href=\"{url}\"><img src=\"{url}\" alt=\"Source image\"></a>")
        })
        .collect();
    format!("<div class=\"images\">{}</div>", items)
}

/// Landing page with the upload form
pub fn index_page(logged_in: bool, max_images: usize) -> Html<String> {
    let options: String = NoteMode::ALL
        .iter()
        .map(|mode| {
            let selected = if *mode == NoteMode::Bullet { " selected" } else { "" };
            format!(
                "<option value=\"{}\"{}>{}</option>",
                mode.as_str(),
                selected,
                mode.label()
            )
        })
        .collect();

    let hint = if logged_in {
        "Your notes will be saved to your account."
    } else {
        "Log in to keep your notes."
    };

    let body = format!(
        "<h1>Whiteboard to study notes</h1>\
<p>Upload up to {max_images} photos of a whiteboard or handwritten notes. {hint}</p>\
<form method=\"post\" action=\"/results\" enctype=\"multipart/form-data\">\
<label>Style <select name=\"mode\">{options}</select></label>\
<p><input type=\"file\" name=\"images\" accept=\"image/*\" multiple required></p>\
<button type=\"submit\">Generate notes</button></form>",
    );
    layout("New notes", logged_in, &body)
}

/// Which credentials form to show
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthForm {
    Login,
    Signup,
}

/// Login or signup form, optionally with an error and the email kept
pub fn auth_page(form: AuthForm, error: Option<&str>, email: &str) -> Html<String> {
    let (title, action, button, extra) = match form {
        AuthForm::Login => (
            "Log in",
            "/login",
            "Log in",
            "<p>No account? <a href=\"/signup\">Sign up</a></p>",
        ),
        AuthForm::Signup => (
            "Sign up",
            "/signup",
            "Create account",
            "<p>Passwords need 6 to 72 characters with a lowercase letter, an uppercase letter, a digit and a symbol.</p>",
        ),
    };

    let body = format!(
        "<h1>{title}</h1>{error}\
<form method=\"post\" action=\"{action}\">\
<p><label>Email <input type=\"email\" name=\"email\" value=\"{email}\" required></label></p>\
<p><label>Password <input type=\"password\" name=\"password\" required></label></p>\
<button type=\"submit\">{button}</button></form>{extra}",
        error = error_block(error),
        email = escape_html(email),
    );
    layout(title, false, &body)
}

/// Result of a generation
pub fn results_page(notes: &GeneratedNotes, logged_in: bool) -> Html<String> {
    let saved = match &notes.note {
        Some(note) => format!(
            "<p>Saved as <a href=\"/notes/{}\">{}</a>.</p>",
            escape_html(&note.id),
            escape_html(&note.title)
        ),
        None => "<p><a href=\"/signup\">Create an account</a> to save notes.</p>".to_string(),
    };

    let body = format!(
        "<h1>{} notes</h1>{}<article>{}</article>{}",
        notes.mode.label(),
        saved,
        notes.html,
        image_list(&notes.image_urls)
    );
    layout("Results", logged_in, &body)
}

fn rename_form(note: &Note, source: &str) -> String {
    format!(
        "<form class=\"inline\" method=\"post\" action=\"/notes/{id}/rename\">\
<input type=\"hidden\" name=\"source\" value=\"{source}\">\
<input type=\"text\" name=\"title\" value=\"{title}\" aria-label=\"Title\">\
<button type=\"submit\">Rename</button></form>",
        id = escape_html(&note.id),
        source = source,
        title = escape_html(&note.title),
    )
}

fn delete_form(note: &Note) -> String {
    format!(
        "<form class=\"inline\" method=\"post\" action=\"/notes/{}/delete\">\
<button type=\"submit\">Delete</button></form>",
        escape_html(&note.id)
    )
}

/// The account's saved notes
pub fn notes_list_page(notes: &[Note]) -> Html<String> {
    let body = if notes.is_empty() {
        "<h1>My notes</h1><p>No saved notes yet. <a href=\"/\">Generate some</a>.</p>".to_string()
    } else {
        let rows: String = notes
            .iter()
            .map(|note| {
                format!(
                    "<tr><td><a href=\"/notes/{id}\">{title}</a></td><td>{category}</td>\
<td>{created}</td><td>{rename} {delete}</td></tr>",
                    id = escape_html(&note.id),
                    title = escape_html(&note.title),
                    category = escape_html(&note.category),
                    created = note.created_at.format("%Y-%m-%d %H:%M"),
                    rename = rename_form(note, "list"),
                    delete = delete_form(note),
                )
            })
            .collect();
        format!(
            "<h1>My notes</h1><table><thead><tr><th>Title</th><th>Style</th><th>Created</th><th></th></tr></thead>\
<tbody>{}</tbody></table>",
            rows
        )
    };
    layout("My notes", true, &body)
}

/// One saved note
pub fn note_page(note: &Note) -> Html<String> {
    let image_urls: Vec<String> = note
        .image_paths
        .iter()
        .map(|path| format!("{}/{}", crate::notes::SAVED_URL_PREFIX, path))
        .collect();

    let body = format!(
        "<h1>{title}</h1><p>{rename} {delete}</p><article>{content}</article>{images}",
        title = escape_html(&note.title),
        rename = rename_form(note, "note"),
        delete = delete_form(note),
        content = note.content_html,
        images = image_list(&image_urls),
    );
    layout(&note.title, true, &body)
}

/// Error page for a failed request
pub fn error_page(status: StatusCode, message: &str) -> Html<String> {
    let body = format!(
        "<h1>{}</h1><p class=\"error\">{}</p><p><a href=\"/\">Back to start</a></p>",
        status.as_u16(),
        escape_html(message)
    );
    layout("Error", false, &body)
}
