//! HTTP handlers

use crate::auth::{self, session, SessionContext};
use crate::error::BoardnotesError;
use crate::images::{mime_for_extension, ImageUpload};
use crate::server::error::AppError;
use crate::server::views::{self, AuthForm};
use crate::server::AppState;
use anyhow::Result;
use axum::extract::{Form, Multipart, Path, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use serde::Deserialize;
use tower_sessions::Session;

/// Form fields for login and signup
#[derive(Debug, Deserialize)]
pub struct CredentialsForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Form fields for renaming a note
#[derive(Debug, Deserialize)]
pub struct RenameForm {
    #[serde(default)]
    pub title: String,
    /// `note` when submitted from the note page
    #[serde(default)]
    pub source: Option<String>,
}

/// Load the session context, dropping bindings to accounts that no longer exist
async fn load_context(state: &AppState, session: &Session) -> Result<SessionContext> {
    let mut ctx = SessionContext::load(session).await?;
    if let Some(account_id) = ctx.account_id.as_deref() {
        if state.notes.storage().get_account(account_id)?.is_none() {
            tracing::debug!(account_id, "Session refers to a deleted account");
            ctx.account_id = None;
            ctx.store(session).await?;
        }
    }
    Ok(ctx)
}

pub async fn index(State(state): State<AppState>, session: Session) -> Result<Html<String>, AppError> {
    let ctx = load_context(&state, &session).await?;
    Ok(views::index_page(
        ctx.is_authenticated(),
        state.notes.max_images(),
    ))
}

pub async fn signup_page() -> Html<String> {
    views::auth_page(AuthForm::Signup, None, "")
}

pub async fn login_page() -> Html<String> {
    views::auth_page(AuthForm::Login, None, "")
}

/// Re-render a credentials form for user-facing failures, bubble up the rest
fn form_error(form: AuthForm, email: &str, err: anyhow::Error) -> Result<Response, AppError> {
    let app_error = AppError::from(err);
    let (status, message) = app_error.status_and_message();
    if status.is_server_error() {
        return Err(app_error);
    }
    Ok((status, views::auth_page(form, Some(&message), email)).into_response())
}

pub async fn signup_submit(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<CredentialsForm>,
) -> Result<Response, AppError> {
    match auth::signup(state.notes.storage(), &form.email, &form.password) {
        Ok(account) => {
            session::bind_account(&session, &account.id).await?;
            Ok(Redirect::to("/").into_response())
        }
        Err(e) => form_error(AuthForm::Signup, &form.email, e),
    }
}

pub async fn login_submit(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<CredentialsForm>,
) -> Result<Response, AppError> {
    match auth::login(state.notes.storage(), &form.email, &form.password) {
        Ok(account) => {
            session::bind_account(&session, &account.id).await?;
            Ok(Redirect::to("/notes").into_response())
        }
        Err(e) => form_error(AuthForm::Login, &form.email, e),
    }
}

pub async fn logout(session: Session) -> Result<Redirect, AppError> {
    session::clear(&session).await?;
    Ok(Redirect::to("/"))
}

/// Read the `mode` field and every `images`/`image` file part
async fn read_upload(mut multipart: Multipart) -> Result<(String, Vec<ImageUpload>)> {
    let mut mode = String::new();
    let mut images = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| BoardnotesError::Validation(format!("Invalid upload: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "mode" => {
                mode = field
                    .text()
                    .await
                    .map_err(|e| BoardnotesError::Validation(format!("Invalid upload: {}", e)))?;
            }
            "images" | "image" => {
                let filename = field.file_name().map(str::to_string);
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| BoardnotesError::Validation(format!("Invalid upload: {}", e)))?;
                // Browsers send an empty part when no file was chosen
                if data.is_empty() {
                    continue;
                }
                images.push(ImageUpload::new(data, filename.as_deref()));
            }
            _ => {}
        }
    }

    Ok((mode, images))
}

pub async fn results(
    State(state): State<AppState>,
    session: Session,
    multipart: Multipart,
) -> Result<Html<String>, AppError> {
    let mut ctx = load_context(&state, &session).await?;
    let (mode, images) = read_upload(multipart).await?;

    state.notes.admit(&mut ctx, images.len())?;
    // Overlapping requests from this session must see the attempt before
    // the model call finishes
    ctx.store(&session).await?;
    session::persist(&session).await?;

    let notes = state.notes.generate_admitted(&ctx, &mode, images).await?;

    Ok(views::results_page(&notes, ctx.is_authenticated()))
}

/// Account id bound to the session; callers redirect to `/login` on `None`
async fn require_account(state: &AppState, session: &Session) -> Result<Option<String>> {
    Ok(load_context(state, session).await?.account_id)
}

pub async fn list_notes(State(state): State<AppState>, session: Session) -> Result<Response, AppError> {
    let Some(owner) = require_account(&state, &session).await? else {
        return Ok(Redirect::to("/login").into_response());
    };
    let notes = state.notes.list_notes(&owner)?;
    Ok(views::notes_list_page(&notes).into_response())
}

pub async fn view_note(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let Some(owner) = require_account(&state, &session).await? else {
        return Ok(Redirect::to("/login").into_response());
    };
    let note = state.notes.open_note(&owner, &id)?;
    Ok(views::note_page(&note).into_response())
}

pub async fn delete_note(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
) -> Result<Redirect, AppError> {
    let Some(owner) = require_account(&state, &session).await? else {
        return Ok(Redirect::to("/login"));
    };
    state.notes.delete_note(&owner, &id).await?;
    Ok(Redirect::to("/notes"))
}

pub async fn rename_note(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
    Form(form): Form<RenameForm>,
) -> Result<Redirect, AppError> {
    let Some(owner) = require_account(&state, &session).await? else {
        return Ok(Redirect::to("/login"));
    };
    let note = state.notes.rename_note(&owner, &id, &form.title)?;

    if form.source.as_deref() == Some("note") {
        Ok(Redirect::to(&format!("/notes/{}", note.id)))
    } else {
        Ok(Redirect::to("/notes"))
    }
}

/// Serve a saved image to the account that owns it
pub async fn saved_image(
    State(state): State<AppState>,
    session: Session,
    Path((account, note, filename)): Path<(String, String, String)>,
) -> Result<Response, AppError> {
    let owner = require_account(&state, &session).await?;
    if owner.as_deref() != Some(account.as_str()) {
        return Err(BoardnotesError::NotFound("image".to_string()).into());
    }

    let path = state
        .notes
        .images()
        .resolve_saved(&account, &note, &filename)
        .map_err(|_| BoardnotesError::NotFound("image".to_string()))?;

    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(BoardnotesError::NotFound("image".to_string()).into());
        }
        Err(e) => return Err(BoardnotesError::Io(e).into()),
    };

    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default()
        .to_lowercase();

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, mime_for_extension(&extension)),
            (header::CACHE_CONTROL, "private, max-age=3600"),
        ],
        bytes,
    )
        .into_response())
}
