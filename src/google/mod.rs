//! Google OAuth and Calendar v3 over plain HTTP with reqwest.

pub mod gcal;
pub mod oauth;

use thiserror::Error;

pub const CALENDAR_SCOPE: &str = "https://www.googleapis.com/auth/calendar";
pub const DEFAULT_API_URL: &str = "https://www.googleapis.com";
pub const DEFAULT_OAUTH_URL: &str = "https://oauth2.googleapis.com";

#[derive(Debug, Error)]
pub enum GoogleApiError {
    #[error("Unauthorized ({status}): {body}")]
    Unauthorized { status: u16, body: String },
    #[error("Google API returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Calendar {calendar_id} reported errors: {errors}")]
    Calendar { calendar_id: String, errors: String },
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Unexpected response body: {0}")]
    Json(#[from] serde_json::Error),
}

impl GoogleApiError {
    pub fn is_auth(&self) -> bool {
        matches!(self, GoogleApiError::Unauthorized { .. })
    }
}

/// Reads the body and maps non-success statuses to errors.
pub(crate) async fn checked_text(res: reqwest::Response) -> Result<String, GoogleApiError> {
    let status = res.status();
    let body = res.text().await.unwrap_or_default();
    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        return Err(GoogleApiError::Unauthorized {
            status: status.as_u16(),
            body,
        });
    }
    if !status.is_success() {
        return Err(GoogleApiError::Status {
            status: status.as_u16(),
            body,
        });
    }
    Ok(body)
}
