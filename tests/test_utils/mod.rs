//! Test utilities for integration tests. Collaborators are scripted in
//! memory so turns run without any network access.
#![allow(dead_code)]

use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;
use axum::Router;
use chrono::{DateTime, Utc};

use slotbot::api::{AppState, app};
use slotbot::availability::TimeInterval;
use slotbot::calendar::{BookingError, CalendarBackend, CalendarError, CreatedEvent};
use slotbot::conversation::{Agent, AgentSettings, BookingProposal, UserProfile};
use slotbot::core::AppConfig;
use slotbot::mailer::{DeliveryError, DeliveryReport, EmailSender};
use slotbot::openai::{CollaboratorError, CompletionRequest, TextGenerator};

// Distinctive fragments of each agent's system message
pub const INTENT: &str = "intent recognition";
pub const EXTRACTION: &str = "detail extraction";
pub const ROUTER: &str = "conversation router";
pub const RANKING: &str = "scheduling optimization";
pub const SUGGESTION: &str = "suggestion generation";
pub const CONFIRMATION: &str = "confirmation handler";
pub const BOOKING: &str = "booking communication";
pub const NOTIFICATION: &str = "notification email";

/// Answers each request with the response scripted for the first
/// matching system message fragment. Unscripted requests fail.
#[derive(Default)]
pub struct ScriptedGenerator {
    responses: Mutex<Vec<(&'static str, String)>>,
    pub requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, agent: &'static str, response: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .push((agent, response.to_string()));
        self
    }

    /// How many requests went to the given agent.
    pub fn calls(&self, agent: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.system_message.contains(agent))
            .count()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, request: &CompletionRequest) -> Result<String, CollaboratorError> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .iter()
            .find(|(agent, _)| request.system_message.contains(agent))
            .map(|(_, response)| response.clone())
            .ok_or_else(|| CollaboratorError::Request(String::from("no scripted response")))
    }
}

#[derive(Default)]
pub struct FakeCalendar {
    pub busy: Vec<TimeInterval>,
    pub fail_booking: bool,
    pub created: Mutex<Vec<BookingProposal>>,
    pub updated: Mutex<Vec<(String, BookingProposal)>>,
}

impl FakeCalendar {
    pub fn created_count(&self) -> usize {
        self.created.lock().unwrap().len()
    }
}

#[async_trait]
impl CalendarBackend for FakeCalendar {
    async fn busy_intervals(
        &self,
        account: &str,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
    ) -> Result<Vec<TimeInterval>, CalendarError> {
        if account == "revoked@example.com" {
            return Err(CalendarError::Auth(String::from("refresh token revoked")));
        }
        Ok(self.busy.clone())
    }

    async fn create_event(
        &self,
        _account: &str,
        proposal: &BookingProposal,
    ) -> Result<CreatedEvent, BookingError> {
        if self.fail_booking {
            return Err(BookingError::new("calendar is read only"));
        }
        self.created.lock().unwrap().push(proposal.clone());
        Ok(CreatedEvent {
            event_id: format!("evt_{}", self.created_count()),
            html_link: None,
        })
    }

    async fn update_event(
        &self,
        _account: &str,
        event_id: &str,
        proposal: &BookingProposal,
    ) -> Result<CreatedEvent, BookingError> {
        if self.fail_booking {
            return Err(BookingError::new("calendar is read only"));
        }
        self.updated
            .lock()
            .unwrap()
            .push((event_id.to_string(), proposal.clone()));
        Ok(CreatedEvent {
            event_id: event_id.to_string(),
            html_link: None,
        })
    }
}

#[derive(Default)]
pub struct FakeMailer {
    pub sent: Mutex<Vec<(String, String, String)>>,
}

#[async_trait]
impl EmailSender for FakeMailer {
    async fn send(
        &self,
        to: &str,
        subject: &str,
        body: &str,
        _recipient_name: &str,
    ) -> Result<DeliveryReport, DeliveryError> {
        self.sent
            .lock()
            .unwrap()
            .push((to.to_string(), subject.to_string(), body.to_string()));
        Ok(DeliveryReport {
            delivered: true,
            status_code: Some(202),
            diagnostic: None,
        })
    }
}

pub fn user() -> UserProfile {
    UserProfile {
        name: String::from("Ada"),
        email: String::from("ada@example.com"),
    }
}

pub fn test_agent(
    generator: &Arc<ScriptedGenerator>,
    calendar: &Arc<FakeCalendar>,
    mailer: &Arc<FakeMailer>,
) -> Agent {
    Agent::new(
        generator.clone(),
        calendar.clone(),
        mailer.clone(),
        AgentSettings::default(),
    )
}

/// Creates a test application router around scripted collaborators.
pub fn test_app(generator: ScriptedGenerator, calendar: FakeCalendar) -> Router {
    let calendar: Arc<FakeCalendar> = Arc::new(calendar);
    let agent = Agent::new(
        Arc::new(generator),
        calendar.clone(),
        Arc::new(FakeMailer::default()),
        AgentSettings::default(),
    );
    let app_state = AppState::new(Arc::new(agent), calendar, AppConfig::default());
    app(Arc::new(RwLock::new(app_state)))
}
