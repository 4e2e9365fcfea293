//! Public types for the availability API
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::availability::TimeInterval;

#[derive(Serialize, Deserialize)]
pub struct AvailabilityRequest {
    #[serde(default)]
    pub busy: Vec<TimeInterval>,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub minimum_duration_minutes: i64,
}
