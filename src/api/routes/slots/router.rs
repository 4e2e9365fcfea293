//! Router for the slots API: free time on the user's own calendar

use std::sync::{Arc, RwLock};

use axum::{Router, extract::State, response::Json};
use axum_extra::extract::Query;
use chrono::{Duration, DurationRound, Utc};

use super::public;
use crate::api::public::{ApiError, BadRequest};
use crate::api::state::AppState;
use crate::availability::{AvailabilityQuery, TimeInterval, compute_free_slots, days_after};
use crate::conversation::validate_email;

type SharedState = Arc<RwLock<AppState>>;

async fn slots_handler(
    State(state): State<SharedState>,
    Query(params): Query<public::SlotsQuery>,
) -> Result<Json<Vec<TimeInterval>>, ApiError> {
    if !validate_email(&params.email) {
        return Err(BadRequest(format!("Invalid email address: {}", params.email)).into());
    }

    let (calendar, settings) = {
        let shared_state = state.read().expect("Unable to read shared state");
        (
            shared_state.calendar.clone(),
            shared_state.agent.settings().clone(),
        )
    };

    // Default to the configured window and minimum
    let days_ahead = params.days_ahead.unwrap_or(settings.slot_window_days);
    let min_minutes = params.min_minutes.unwrap_or(settings.min_slot_minutes);

    let now = Utc::now();
    let start = now.duration_trunc(Duration::minutes(1)).unwrap_or(now);
    let end = days_after(start, days_ahead)
        .ok_or_else(|| BadRequest(format!("days_ahead is out of range: {}", days_ahead)))?;
    let query = AvailabilityQuery::new(start, end, min_minutes);
    // Reject bad parameters before calling out to the calendar
    query.validate()?;

    let busy = calendar
        .busy_intervals(&params.email, query.window_start, query.window_end)
        .await?;
    let free = compute_free_slots(&busy, &query)?;

    Ok(Json(free))
}

/// Create the slots router
pub fn router() -> Router<SharedState> {
    Router::new().route("/", axum::routing::get(slots_handler))
}
