//! API routes module

pub mod availability;
pub mod slots;
pub mod turn;

use std::sync::{Arc, RwLock};

use crate::api::state::AppState;
use axum::Router;

type SharedState = Arc<RwLock<AppState>>;

/// Create the combined API router
pub fn router() -> Router<SharedState> {
    Router::new()
        .nest("/turn", turn::router())
        .nest("/availability", availability::router())
        .nest("/slots", slots::router())
}
