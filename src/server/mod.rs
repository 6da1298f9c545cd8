//! Web server: router, session layer and graceful shutdown

pub mod error;
pub mod handlers;
pub mod views;

use crate::config::ServerConfig;
use crate::error::{BoardnotesError, Result};
use crate::notes::NoteService;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use sha2::{Digest, Sha512};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use time::Duration;
use tokio::signal;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tower_sessions::cookie::{Key, SameSite};
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub notes: Arc<NoteService>,
}

impl AppState {
    pub fn new(notes: NoteService) -> Self {
        Self {
            notes: Arc::new(notes),
        }
    }
}

/// Derive the 64-byte cookie signing key from the configured secret
fn signing_key(secret: &str) -> Key {
    let digest = Sha512::digest(secret.as_bytes());
    Key::from(digest.as_slice())
}

/// Build the application router with sessions, tracing and upload limits
pub fn build_router(state: AppState, server: &ServerConfig) -> Router {
    let session_layer = SessionManagerLayer::new(MemoryStore::default())
        .with_secure(false)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(Duration::hours(server.session_ttl_hours)))
        .with_signed(signing_key(&server.secret_or_default()));

    let uploads = ServeDir::new(state.notes.images().uploads_root());

    Router::new()
        .route("/", get(handlers::index))
        .route(
            "/signup",
            get(handlers::signup_page).post(handlers::signup_submit),
        )
        .route(
            "/login",
            get(handlers::login_page).post(handlers::login_submit),
        )
        .route("/logout", get(handlers::logout))
        .route("/results", post(handlers::results))
        .route("/notes", get(handlers::list_notes))
        .route("/notes/{id}", get(handlers::view_note))
        .route("/notes/{id}/delete", post(handlers::delete_note))
        .route("/notes/{id}/rename", post(handlers::rename_note))
        .route(
            "/saved/{account}/{note}/{filename}",
            get(handlers::saved_image),
        )
        .nest_service("/uploads", uploads)
        .layer(DefaultBodyLimit::max(server.max_upload_bytes))
        .layer(session_layer)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind the configured address and serve until Ctrl+C or SIGTERM
pub async fn serve(state: AppState, server: &ServerConfig) -> Result<()> {
    let addr: SocketAddr = server
        .bind
        .parse()
        .map_err(|e| BoardnotesError::Config(format!("Invalid bind address {}: {}", server.bind, e)))?;

    let router = build_router(state, server);

    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Boardnotes listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Boardnotes stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, shutting down");
        },
        () = terminate => {
            tracing::info!("Received terminate signal, shutting down");
        },
    }
}
