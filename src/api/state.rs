use std::sync::Arc;

use crate::calendar::CalendarBackend;
use crate::conversation::Agent;
use crate::core::AppConfig;

pub struct AppState {
    pub agent: Arc<Agent>,
    // Shared with the agent; used directly for slot lookups
    pub calendar: Arc<dyn CalendarBackend>,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(agent: Arc<Agent>, calendar: Arc<dyn CalendarBackend>, config: AppConfig) -> Self {
        Self {
            agent,
            calendar,
            config,
        }
    }
}
