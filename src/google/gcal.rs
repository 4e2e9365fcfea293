//! Google Calendar v3: free/busy queries, event insertion and patching.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::{GoogleApiError, checked_text};
use crate::availability::TimeInterval;

#[derive(Debug, Deserialize)]
struct FreeBusyCalendar {
    #[serde(default)]
    busy: Vec<TimeInterval>,
    #[serde(default)]
    errors: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct FreeBusyResponse {
    #[serde(default)]
    calendars: HashMap<String, FreeBusyCalendar>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventDateTime {
    #[serde(rename = "dateTime")]
    pub date_time: String,
    #[serde(rename = "timeZone")]
    pub time_zone: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventAttendee {
    pub email: String,
}

/// Request body for `events.insert` and `events.patch`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewEvent {
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub description: String,
    pub start: EventDateTime,
    pub end: EventDateTime,
    pub attendees: Vec<EventAttendee>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InsertedEvent {
    pub id: String,
    #[serde(rename = "htmlLink", default)]
    pub html_link: Option<String>,
}

/// Busy blocks for one calendar between `start` and `end`.
pub async fn query_free_busy(
    api_url: &str,
    access_token: &str,
    calendar_id: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Vec<TimeInterval>, GoogleApiError> {
    let url = format!("{}/calendar/v3/freeBusy", api_url.trim_end_matches('/'));
    let payload = json!({
        "timeMin": start.to_rfc3339(),
        "timeMax": end.to_rfc3339(),
        "timeZone": "UTC",
        "items": [{"id": calendar_id}],
    });
    let res = reqwest::Client::new()
        .post(url)
        .bearer_auth(access_token)
        .json(&payload)
        .send()
        .await?;
    let body = checked_text(res).await?;
    let mut resp: FreeBusyResponse = serde_json::from_str(&body)?;

    let calendar = resp.calendars.remove(calendar_id).unwrap_or(FreeBusyCalendar {
        busy: Vec::new(),
        errors: Vec::new(),
    });
    if !calendar.errors.is_empty() {
        return Err(GoogleApiError::Calendar {
            calendar_id: calendar_id.to_string(),
            errors: Value::Array(calendar.errors).to_string(),
        });
    }

    tracing::debug!("Busy periods for {}: {:?}", calendar_id, calendar.busy);
    Ok(calendar.busy)
}

/// Creates the event and emails invitations to every attendee.
pub async fn insert_event(
    api_url: &str,
    access_token: &str,
    calendar_id: &str,
    event: &NewEvent,
) -> Result<InsertedEvent, GoogleApiError> {
    let url = format!(
        "{}/calendar/v3/calendars/{}/events?sendUpdates=all",
        api_url.trim_end_matches('/'),
        urlencoding::encode(calendar_id)
    );
    let res = reqwest::Client::new()
        .post(url)
        .bearer_auth(access_token)
        .json(event)
        .send()
        .await?;
    let body = checked_text(res).await?;
    Ok(serde_json::from_str(&body)?)
}

/// Replaces the time and details of an existing event. Attendees are
/// emailed about the change.
pub async fn patch_event(
    api_url: &str,
    access_token: &str,
    calendar_id: &str,
    event_id: &str,
    event: &NewEvent,
) -> Result<InsertedEvent, GoogleApiError> {
    let url = format!(
        "{}/calendar/v3/calendars/{}/events/{}?sendUpdates=all",
        api_url.trim_end_matches('/'),
        urlencoding::encode(calendar_id),
        urlencoding::encode(event_id)
    );
    let res = reqwest::Client::new()
        .patch(url)
        .bearer_auth(access_token)
        .json(event)
        .send()
        .await?;
    let body = checked_text(res).await?;
    Ok(serde_json::from_str(&body)?)
}
