//! Router for the turn API. Stateless: the caller sends the session
//! back with every message.

use std::sync::{Arc, RwLock};

use axum::{Router, extract::State, response::Json};

use super::public;
use crate::api::public::{ApiError, BadRequest};
use crate::api::state::AppState;
use crate::conversation::{Session, validate_email};

type SharedState = Arc<RwLock<AppState>>;

async fn turn_handler(
    State(state): State<SharedState>,
    Json(payload): Json<public::TurnRequest>,
) -> Result<Json<public::TurnResponse>, ApiError> {
    if !validate_email(&payload.user.email) {
        return Err(BadRequest(format!("Invalid email address: {}", payload.user.email)).into());
    }
    if payload.message.trim().is_empty() {
        return Err(BadRequest(String::from("Message must not be empty")).into());
    }

    let agent = state.read().expect("Unable to read shared state").agent.clone();
    let session = payload.session.unwrap_or_else(Session::new);
    tracing::debug!("Processing turn for session {}", session.id);

    let outcome = agent
        .process_turn(session, &payload.user, &payload.message)
        .await;

    Ok(Json(public::TurnResponse {
        session: outcome.session,
        replies: outcome.replies,
    }))
}

/// Create the turn router
pub fn router() -> Router<SharedState> {
    Router::new().route("/", axum::routing::post(turn_handler))
}
