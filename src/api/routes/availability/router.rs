//! Router for the availability API. Runs the free slot computation on
//! caller supplied busy intervals without touching any calendar.

use std::sync::{Arc, RwLock};

use axum::{Router, response::Json};

use super::public;
use crate::api::public::ApiError;
use crate::api::state::AppState;
use crate::availability::{AvailabilityQuery, TimeInterval, compute_free_slots};

type SharedState = Arc<RwLock<AppState>>;

async fn availability_handler(
    Json(payload): Json<public::AvailabilityRequest>,
) -> Result<Json<Vec<TimeInterval>>, ApiError> {
    let query = AvailabilityQuery::new(
        payload.window_start,
        payload.window_end,
        payload.minimum_duration_minutes,
    );
    let free = compute_free_slots(&payload.busy, &query)?;
    Ok(Json(free))
}

/// Create the availability router
pub fn router() -> Router<SharedState> {
    Router::new().route("/", axum::routing::post(availability_handler))
}
