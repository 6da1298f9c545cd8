//! Mapping from domain errors to HTTP responses

use crate::error::BoardnotesError;
use crate::server::views;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

/// Error returned by handlers
///
/// Wraps any `anyhow::Error`; [`BoardnotesError`] values inside decide the
/// status code, everything else is a 500 with a generic message.
#[derive(Debug)]
pub struct AppError(anyhow::Error);

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl AppError {
    /// Status code and the message shown to the user
    pub fn status_and_message(&self) -> (StatusCode, String) {
        let Some(err) = self.0.downcast_ref::<BoardnotesError>() else {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Something went wrong".to_string(),
            );
        };

        let status = match err {
            BoardnotesError::Validation(_) => StatusCode::BAD_REQUEST,
            BoardnotesError::Conflict(_) => StatusCode::CONFLICT,
            BoardnotesError::Authentication => StatusCode::UNAUTHORIZED,
            BoardnotesError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            BoardnotesError::Generation(_) => StatusCode::BAD_GATEWAY,
            BoardnotesError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let message = match err {
            BoardnotesError::NotFound(_) => "Not found".to_string(),
            e if e.is_user_facing() => e.to_string(),
            _ => "Something went wrong".to_string(),
        };

        (status, message)
    }

    fn retry_after_secs(&self) -> Option<u64> {
        match self.0.downcast_ref::<BoardnotesError>() {
            Some(BoardnotesError::RateLimited { retry_after_ms }) => {
                Some(retry_after_ms.div_ceil(1000).max(1))
            }
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        if status.is_server_error() {
            tracing::error!("Request failed: {:#}", self.0);
        } else {
            tracing::debug!("Request rejected ({}): {}", status, self.0);
        }

        let mut response = (status, views::error_page(status, &message)).into_response();
        if let Some(secs) = self.retry_after_secs() {
            if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}
