//! Per-browser session state
//!
//! Handlers load a [`SessionContext`] from the cookie session at the start
//! of a request, pass it explicitly to the services, and store it back.

use crate::error::{BoardnotesError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

/// Session key holding the authenticated account id
pub const SESSION_ACCOUNT_KEY: &str = "account_id";

/// Session key holding the last generation attempt
pub const SESSION_LAST_GENERATION_KEY: &str = "last_generation";

/// State carried between requests from the same browser
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    /// Logged-in account, if any
    pub account_id: Option<String>,
    /// When this session last started a generation
    pub last_generation: Option<DateTime<Utc>>,
}

impl SessionContext {
    /// Context for a logged-in account
    pub fn authenticated(account_id: impl Into<String>) -> Self {
        Self {
            account_id: Some(account_id.into()),
            last_generation: None,
        }
    }

    /// Whether an account is bound to the session
    pub fn is_authenticated(&self) -> bool {
        self.account_id.is_some()
    }

    /// Read the context out of a session
    pub async fn load(session: &Session) -> Result<Self> {
        let account_id = session
            .get::<String>(SESSION_ACCOUNT_KEY)
            .await
            .map_err(session_error)?;
        let last_generation = session
            .get::<DateTime<Utc>>(SESSION_LAST_GENERATION_KEY)
            .await
            .map_err(session_error)?;

        Ok(Self {
            account_id,
            last_generation,
        })
    }

    /// Write the context back into a session
    pub async fn store(&self, session: &Session) -> Result<()> {
        match &self.account_id {
            Some(id) => session
                .insert(SESSION_ACCOUNT_KEY, id)
                .await
                .map_err(session_error)?,
            None => {
                session
                    .remove::<String>(SESSION_ACCOUNT_KEY)
                    .await
                    .map_err(session_error)?;
            }
        }

        if let Some(at) = self.last_generation {
            session
                .insert(SESSION_LAST_GENERATION_KEY, at)
                .await
                .map_err(session_error)?;
        }
        Ok(())
    }
}

/// Bind an account to the session under a fresh session id
pub async fn bind_account(session: &Session, account_id: &str) -> Result<()> {
    session.cycle_id().await.map_err(session_error)?;
    session
        .insert(SESSION_ACCOUNT_KEY, account_id)
        .await
        .map_err(session_error)?;
    Ok(())
}

/// Write the session to its store now instead of when the response is sent
pub async fn persist(session: &Session) -> Result<()> {
    session.save().await.map_err(session_error)?;
    Ok(())
}

/// Drop all session state; logging out twice is harmless
pub async fn clear(session: &Session) -> Result<()> {
    session.flush().await.map_err(session_error)?;
    Ok(())
}

fn session_error(e: tower_sessions::session::Error) -> anyhow::Error {
    BoardnotesError::Storage(format!("Session error: {}", e)).into()
}
