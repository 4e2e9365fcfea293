//! Public types for the turn API
use serde::{Deserialize, Serialize};

use crate::conversation::{Session, UserProfile};

#[derive(Serialize, Deserialize)]
pub struct TurnRequest {
    /// Omitted on the first turn of a conversation
    pub session: Option<Session>,
    pub user: UserProfile,
    pub message: String,
}

#[derive(Serialize, Deserialize)]
pub struct TurnResponse {
    pub session: Session,
    pub replies: Vec<String>,
}
