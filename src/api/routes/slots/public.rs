//! Public types for the slots API
use serde::Deserialize;

#[derive(Deserialize)]
pub struct SlotsQuery {
    pub email: String,
    pub days_ahead: Option<i64>,
    pub min_minutes: Option<i64>,
}
