//! Public API types

use axum::response::{IntoResponse, Response};
use http::StatusCode;
use thiserror::Error;

use crate::availability::InvalidRangeError;
use crate::calendar::CalendarError;

// Errors

/// A request the caller can fix, e.g. a malformed email address.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct BadRequest(pub String);

pub struct ApiError(anyhow::Error);

impl ApiError {
    fn status(&self) -> StatusCode {
        if self.0.downcast_ref::<InvalidRangeError>().is_some()
            || self.0.downcast_ref::<BadRequest>().is_some()
        {
            return StatusCode::BAD_REQUEST;
        }
        match self.0.downcast_ref::<CalendarError>() {
            Some(CalendarError::Auth(_)) => StatusCode::UNAUTHORIZED,
            Some(CalendarError::Backend(_)) => StatusCode::BAD_GATEWAY,
            None => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Convert `ApiError` into an Axum compatible response.
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("{}", self.0);
        } else {
            tracing::debug!("Rejected request: {}", self.0);
        }

        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            format!("Something went wrong: {}", self.0)
        } else {
            self.0.to_string()
        };
        (status, message).into_response()
    }
}

/// Enables using `?` on functions that return `Result<_,
/// anyhow::Error>` to turn them into `Result<_, ApiError>`
impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

// Re-export public types from each route

pub mod availability {
    pub use crate::api::routes::availability::public::*;
}

pub mod slots {
    pub use crate::api::routes::slots::public::*;
}

pub mod turn {
    pub use crate::api::routes::turn::public::*;
}
