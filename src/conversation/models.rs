//! Values passed into and returned from each turn.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::openai::{Message, Role};

/// What the user is trying to do. The vocabulary is open ended so
/// anything unrecognized becomes `Unknown`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum Intent {
    Booking,
    Reschedule,
    Question,
    Complaint,
    Casual,
    #[default]
    Unknown,
}

impl From<String> for Intent {
    fn from(value: String) -> Self {
        Intent::from(value.as_str())
    }
}

impl From<&str> for Intent {
    fn from(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "booking" | "book" | "schedule" | "scheduling" => Intent::Booking,
            "reschedule" | "rescheduling" | "modify" | "update" => Intent::Reschedule,
            "question" => Intent::Question,
            "complaint" => Intent::Complaint,
            "casual" | "greeting" | "small_talk" => Intent::Casual,
            _ => Intent::Unknown,
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            Intent::Booking => "booking",
            Intent::Reschedule => "reschedule",
            Intent::Question => "question",
            Intent::Complaint => "complaint",
            Intent::Casual => "casual",
            Intent::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

/// The conversational stage that runs next.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NextNode {
    #[default]
    Intent,
    Extraction,
    Suggestion,
    Confirmation,
    Booking,
    AskClarification,
    End,
}

impl NextNode {
    /// Accepts the spellings models tend to produce (`ask_clarification`,
    /// `askClarification`, `Ask Clarification`).
    pub fn parse(value: &str) -> Option<Self> {
        let normalized: String = value
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .collect::<String>()
            .to_lowercase();
        match normalized.as_str() {
            "intent" => Some(NextNode::Intent),
            "extraction" => Some(NextNode::Extraction),
            "suggestion" => Some(NextNode::Suggestion),
            "confirmation" => Some(NextNode::Confirmation),
            "booking" => Some(NextNode::Booking),
            "askclarification" | "clarification" => Some(NextNode::AskClarification),
            "end" => Some(NextNode::End),
            _ => None,
        }
    }
}

impl fmt::Display for NextNode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            NextNode::Intent => "intent",
            NextNode::Extraction => "extraction",
            NextNode::Suggestion => "suggestion",
            NextNode::Confirmation => "confirmation",
            NextNode::Booking => "booking",
            NextNode::AskClarification => "ask_clarification",
            NextNode::End => "end",
        };
        write!(f, "{}", s)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationState {
    pub current_node: NextNode,
    pub info_collected: Vec<String>,
}

/// An extra step suggested by the router. Either a bare name or an
/// arbitrary object, depending on the model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ActionDescriptor {
    Named(String),
    Structured(Map<String, Value>),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoutingDecision {
    pub next_node: NextNode,
    pub reason: String,
    #[serde(default)]
    pub additional_actions: Vec<ActionDescriptor>,
    /// Set when the router fell back to `End` because the model could
    /// not be reached or understood.
    #[serde(skip)]
    pub degraded: bool,
}

impl RoutingDecision {
    /// Fallback decision used whenever routing fails.
    pub fn end(reason: String) -> Self {
        Self {
            next_node: NextNode::End,
            reason,
            additional_actions: Vec::new(),
            degraded: true,
        }
    }
}

/// The meeting being negotiated. Built up across turns and consumed
/// once by the calendar backend.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingProposal {
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
    pub duration_minutes: Option<u32>,
    pub participants: BTreeSet<String>,
    pub location: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub timezone: Option<String>,
    /// Required fields the extraction step reported as missing
    pub missing_info: Vec<String>,
    /// The booked event this proposal replaces, when rescheduling
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
}

impl BookingProposal {
    /// Field names that currently hold a value, in display order.
    pub fn collected_fields(&self) -> Vec<String> {
        let mut fields = Vec::new();
        if self.date.is_some() {
            fields.push("date");
        }
        if self.time.is_some() {
            fields.push("time");
        }
        if self.duration_minutes.is_some() {
            fields.push("duration");
        }
        if !self.participants.is_empty() {
            fields.push("participants");
        }
        if self.location.is_some() {
            fields.push("location");
        }
        if self.summary.is_some() {
            fields.push("summary");
        }
        fields.into_iter().map(String::from).collect()
    }

    pub fn is_bookable(&self) -> bool {
        self.date.is_some() && self.time.is_some()
    }

    /// Markdown summary shown before asking for confirmation.
    pub fn summary_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if let Some(summary) = &self.summary {
            lines.push(format!("**Title:** {}", summary));
        }
        if let Some(date) = &self.date {
            lines.push(format!("**Date:** {}", date.format("%Y-%m-%d")));
        }
        if let Some(time) = &self.time {
            lines.push(format!("**Time:** {}", time.format("%H:%M")));
        }
        if let Some(duration) = self.duration_minutes {
            lines.push(format!("**Duration:** {} minutes", duration));
        }
        if !self.participants.is_empty() {
            let participants: Vec<&str> = self.participants.iter().map(String::as_str).collect();
            lines.push(format!("**Participants:** {}", participants.join(", ")));
        }
        if let Some(location) = &self.location {
            lines.push(format!("**Location:** {}", location));
        }
        lines
    }
}

/// Who the assistant is booking on behalf of.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub name: String,
    pub email: String,
}

/// Everything the caller persists between turns.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    #[serde(default)]
    pub state: ConversationState,
    #[serde(default)]
    pub history: Vec<Message>,
    #[serde(default)]
    pub proposal: BookingProposal,
    #[serde(default)]
    pub intent: Intent,
    #[serde(default = "default_style")]
    pub style: String,
    /// The most recent event booked in this session
    #[serde(default)]
    pub booked: Option<BookedEvent>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookedEvent {
    pub event_id: String,
    pub proposal: BookingProposal,
}

fn default_style() -> String {
    String::from("neutral")
}

impl Default for Session {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            state: ConversationState::default(),
            history: Vec::new(),
            proposal: BookingProposal::default(),
            intent: Intent::default(),
            style: default_style(),
            booked: None,
        }
    }
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts changing the last booked event: the proposal is seeded
    /// from it so only the changed fields need collecting. No-op when
    /// nothing is booked or a reschedule is already underway.
    pub fn begin_reschedule(&mut self) {
        if self.proposal.event_id.is_some() {
            return;
        }
        if let Some(booked) = &self.booked {
            self.proposal = BookingProposal {
                event_id: Some(booked.event_id.clone()),
                missing_info: Vec::new(),
                ..booked.proposal.clone()
            };
        }
    }

    /// The most recent message sent by the user, if any.
    pub fn last_user_message(&self) -> Option<&str> {
        self.history
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
    }
}

/// Result of processing one user message.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TurnOutcome {
    pub session: Session,
    pub replies: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unrecognized_intent_is_unknown() {
        let intent: Intent = serde_json::from_str(r#""rescheduling_request""#).unwrap();
        assert_eq!(intent, Intent::Unknown);
        let intent: Intent = serde_json::from_str(r#"" Booking ""#).unwrap();
        assert_eq!(intent, Intent::Booking);
    }

    #[test]
    fn test_next_node_parsing_is_lenient() {
        assert_eq!(NextNode::parse("ask_clarification"), Some(NextNode::AskClarification));
        assert_eq!(NextNode::parse("askClarification"), Some(NextNode::AskClarification));
        assert_eq!(NextNode::parse("Booking"), Some(NextNode::Booking));
        assert_eq!(NextNode::parse("reschedule"), None);
    }

    #[test]
    fn test_collected_fields_follow_display_order() {
        let mut proposal = BookingProposal {
            location: Some(String::from("Room 4")),
            time: NaiveTime::from_hms_opt(15, 0, 0),
            ..Default::default()
        };
        proposal.participants.insert(String::from("a@example.com"));
        assert_eq!(
            proposal.collected_fields(),
            vec!["time", "participants", "location"]
        );
        assert!(!proposal.is_bookable());
    }

    #[test]
    fn test_session_round_trips_with_missing_fields() {
        let session: Session = serde_json::from_str(r#"{"id": "abc"}"#).unwrap();
        assert_eq!(session.style, "neutral");
        assert_eq!(session.state.current_node, NextNode::Intent);
        assert!(session.last_user_message().is_none());
    }

    #[test]
    fn test_begin_reschedule_seeds_from_booked_event() {
        let mut session = Session::new();
        session.begin_reschedule();
        assert_eq!(session.proposal, BookingProposal::default());

        let booked = BookingProposal {
            date: NaiveDate::from_ymd_opt(2025, 6, 10),
            time: NaiveTime::from_hms_opt(15, 0, 0),
            summary: Some(String::from("Sync")),
            ..Default::default()
        };
        session.booked = Some(BookedEvent {
            event_id: String::from("evt_1"),
            proposal: booked.clone(),
        });
        session.begin_reschedule();
        assert_eq!(session.proposal.event_id.as_deref(), Some("evt_1"));
        assert_eq!(session.proposal.summary, booked.summary);

        // Changes made mid-reschedule survive another reschedule intent
        session.proposal.time = NaiveTime::from_hms_opt(16, 0, 0);
        session.begin_reschedule();
        assert_eq!(session.proposal.time, NaiveTime::from_hms_opt(16, 0, 0));
    }
}
